//! Scripted bus masters.
//!
//! A `TrafficMaster` plays a list of reads, writes, and idle gaps on one arbitrated port,
//! holding each request until its completion arrives. A `DebugRequester` does the same on the
//! debug window, dropping strobe after every ack as the bridge requires.

use std::collections::VecDeque;

use tracing::{trace, warn};

use crate::common::constants::BUS_WORD_BYTES;
use crate::common::{Completion, Transaction};
use crate::soc::{MasterId, Soc};

/// One step of a master's script. Addresses are byte addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrafficOp {
    /// Read a word, optionally checking the value returned.
    Read {
        /// Byte address.
        address: u64,
        /// Expected data.
        expect: Option<u32>,
    },
    /// Write a full word.
    Write {
        /// Byte address.
        address: u64,
        /// Data.
        data: u32,
    },
    /// Leave the port idle for a number of cycles.
    Idle(u32),
}

impl TrafficOp {
    fn transaction(self) -> Option<Transaction> {
        match self {
            Self::Read { address, .. } => Some(Transaction::read((address / BUS_WORD_BYTES) as u32)),
            Self::Write { address, data } => {
                Some(Transaction::write((address / BUS_WORD_BYTES) as u32, data))
            }
            Self::Idle(_) => None,
        }
    }
}

/// Deterministic data pattern for generated traffic.
pub const fn pattern(seed: u32, index: u32) -> u32 {
    seed.wrapping_mul(0x9E37_79B9) ^ index.wrapping_mul(0x85EB_CA6B) ^ index
}

/// A master that plays a fixed script.
#[derive(Clone, Debug)]
pub struct TrafficMaster {
    id: MasterId,
    script: VecDeque<TrafficOp>,
    outstanding: Option<TrafficOp>,
    idle: u32,
    completed: Vec<(TrafficOp, Completion)>,
    mismatches: u64,
    rejected: u64,
}

impl TrafficMaster {
    /// Creates a master playing `ops` on port `id`.
    pub fn new(id: MasterId, ops: impl IntoIterator<Item = TrafficOp>) -> Self {
        Self {
            id,
            script: ops.into_iter().collect(),
            outstanding: None,
            idle: 0,
            completed: Vec::new(),
            mismatches: 0,
            rejected: 0,
        }
    }

    /// Writes `words` consecutive words from `base`, then reads them back and checks them.
    pub fn sequential(id: MasterId, base: u64, words: u32, seed: u32) -> Self {
        let address = |i: u32| base + u64::from(i) * BUS_WORD_BYTES;
        let writes = (0..words).map(|i| TrafficOp::Write {
            address: address(i),
            data: pattern(seed, i),
        });
        let reads = (0..words).map(|i| TrafficOp::Read {
            address: address(i),
            expect: Some(pattern(seed, i)),
        });
        Self::new(id, writes.chain(reads).collect::<Vec<_>>())
    }

    /// Port this master drives.
    pub const fn id(&self) -> MasterId {
        self.id
    }

    /// Returns `true` once the script is exhausted and nothing is outstanding.
    pub fn is_done(&self) -> bool {
        self.script.is_empty() && self.outstanding.is_none() && self.idle == 0
    }

    /// Every finished operation with its completion, in order.
    pub fn completed(&self) -> &[(TrafficOp, Completion)] {
        &self.completed
    }

    /// Reads whose data differed from the expected value.
    pub const fn mismatches(&self) -> u64 {
        self.mismatches
    }

    /// Submissions rejected by the arbiter.
    pub const fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Acts for one cycle: collects a completion, or issues the next operation.
    pub fn step(&mut self, soc: &mut Soc) {
        if let Some(op) = self.outstanding {
            let Some(completion) = soc.take_response(self.id) else {
                return;
            };
            self.outstanding = None;
            if let (TrafficOp::Read { address, expect: Some(want) }, Completion::Ack { data }) =
                (op, completion)
            {
                if data != want {
                    warn!(address, data, want, "read-back mismatch");
                    self.mismatches += 1;
                }
            }
            self.completed.push((op, completion));
            return;
        }

        if self.idle > 0 {
            self.idle -= 1;
            return;
        }

        let Some(op) = self.script.pop_front() else {
            return;
        };
        match op.transaction() {
            None => {
                if let TrafficOp::Idle(cycles) = op {
                    self.idle = cycles.saturating_sub(1);
                }
            }
            Some(txn) => match soc.submit(self.id, txn) {
                Ok(()) => {
                    trace!(master = self.id.index(), ?op, "issued");
                    self.outstanding = Some(op);
                }
                Err(_) => self.rejected += 1,
            },
        }
    }
}

/// One request on the debug window. Offsets are byte offsets within the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugOp {
    /// Write a debug register.
    Write {
        /// Register offset.
        offset: u8,
        /// Data.
        data: u32,
    },
    /// Read a debug register back over the bus.
    Read {
        /// Register offset.
        offset: u8,
    },
    /// Write the refresh register, pulling `selector` into A or B.
    Refresh {
        /// Register selector.
        selector: u8,
    },
}

/// Host-side requester on the debug window.
#[derive(Clone, Debug)]
pub struct DebugRequester {
    base: u64,
    script: VecDeque<DebugOp>,
    outstanding: Option<DebugOp>,
    acks: Vec<(DebugOp, u32)>,
}

impl DebugRequester {
    /// Creates a requester for the window at `base` playing `ops`.
    pub fn new(base: u64, ops: impl IntoIterator<Item = DebugOp>) -> Self {
        Self {
            base,
            script: ops.into_iter().collect(),
            outstanding: None,
            acks: Vec::new(),
        }
    }

    /// Returns `true` once every request was acknowledged.
    pub fn is_done(&self) -> bool {
        self.script.is_empty() && self.outstanding.is_none()
    }

    /// Acknowledged requests with the read data that came back.
    pub fn acks(&self) -> &[(DebugOp, u32)] {
        &self.acks
    }

    fn transaction(&self, op: DebugOp) -> Transaction {
        let word = |offset: u8| ((self.base + u64::from(offset)) / BUS_WORD_BYTES) as u32;
        match op {
            DebugOp::Write { offset, data } => Transaction::write(word(offset), data),
            DebugOp::Read { offset } => Transaction::read(word(offset)),
            DebugOp::Refresh { selector } => Transaction::write(
                word(crate::common::constants::DEBUG_REFRESH),
                u32::from(selector),
            ),
        }
    }

    /// Acts for one cycle: waits for the ack and releases, or drives the next request.
    pub fn step(&mut self, soc: &mut Soc) {
        if let Some(op) = self.outstanding {
            if let Some(out) = soc.debug_output().filter(|out| out.ack) {
                self.acks.push((op, out.read_data));
                self.outstanding = None;
                soc.debug_release();
            }
            return;
        }
        if let Some(op) = self.script.pop_front() {
            soc.debug_drive(self.transaction(op));
            self.outstanding = Some(op);
        }
    }
}
