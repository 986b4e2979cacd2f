//! Debug transport bridge.
//!
//! This module turns bus transactions addressed to the debug window into a request/response
//! handshake with the core's debug register interface. It provides:
//! 1. **Decoding:** The register address is `(raw_address & 0x3F) << 2`. A write to the refresh
//!    offset (0x08) is a read trigger whose selector is the low byte of the write data.
//! 2. **Handshake:** `Idle → Dispatching → AwaitingCompletion → Acknowledging → Idle`, with
//!    one transition function per state.
//! 3. **Capture:** Read-trigger results land in register A (selector 0x00), register B
//!    (selector 0x04), or the sentinel pair `A = 0xFEEDBEEF, B = selector`.
//! 4. **Gating:** After the ack cycle, the requester must drop strobe before the next request
//!    is latched. A request withdrawn mid-handshake drains silently. A request replaced
//!    mid-handshake also drains without an ack, and the replacement is ignored until strobe
//!    drops.

/// Core debug register interface and its model.
pub mod port;

use tracing::{debug, warn};

use crate::common::constants::{
    DEBUG_ADDRESS_MASK, DEBUG_CORE, DEBUG_DATA, DEBUG_INVALID_SENTINEL, DEBUG_REFRESH,
};
use crate::common::{ProtocolViolation, Transaction};
use crate::soc::registry::{CsrRegister, RegisterSurface};

pub use port::{CoreDebugPort, DebugRegisterInterface};

/// Command sent to the register interface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebugCommand {
    /// Register address: 0x00 core, 0x04 data, anything else invalid.
    pub address: u8,
    /// Write flag.
    pub write: bool,
    /// Write payload.
    pub payload: u32,
}

/// Command channel outputs (`valid` plus payload).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebugCommandOut {
    /// Asserted for exactly the dispatching cycle.
    pub valid: bool,
    /// The command.
    pub command: DebugCommand,
}

/// Response channel from the register interface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebugResponse {
    /// Read payload.
    pub payload: u32,
    /// `ready`: the interface finished the command.
    pub valid: bool,
}

/// Bus-side outputs of the bridge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebugBusOut {
    /// Ack, asserted for one cycle per completed handshake.
    pub ack: bool,
    /// Read data returned with the ack.
    pub read_data: u32,
}

/// Registers A and B with their write-enable pulses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegisterCapture {
    /// Register A (debug core).
    pub a: u32,
    /// Register B (debug data).
    pub b: u32,
    /// Write-enable on A during the capture cycle.
    pub a_we: bool,
    /// Write-enable on B during the capture cycle.
    pub b_we: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CommandKind {
    /// Host read or write of a register; read data goes back on the bus.
    Raw,
    /// Refresh write: the result is captured into A/B.
    ReadTrigger { selector: u8 },
}

/// One in-flight debug request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebugSession {
    txn: Transaction,
    command: DebugCommand,
    kind: CommandKind,
    read_data: u32,
    abandoned: bool,
    changed: bool,
}

impl DebugSession {
    fn decode(txn: Transaction) -> Self {
        let offset = ((txn.address & DEBUG_ADDRESS_MASK) << 2) as u8;
        let (command, kind) = if txn.is_write() && offset == DEBUG_REFRESH {
            let selector = (txn.write_data & 0xFF) as u8;
            (
                DebugCommand {
                    address: selector,
                    write: false,
                    payload: 0,
                },
                CommandKind::ReadTrigger { selector },
            )
        } else {
            (
                DebugCommand {
                    address: offset,
                    write: txn.is_write(),
                    payload: txn.write_data,
                },
                CommandKind::Raw,
            )
        };
        Self {
            txn,
            command,
            kind,
            read_data: 0,
            abandoned: false,
            changed: false,
        }
    }

    /// The decoded command.
    pub const fn command(&self) -> DebugCommand {
        self.command
    }

    /// Whether the requester withdrew.
    pub const fn is_abandoned(&self) -> bool {
        self.abandoned
    }
}

/// Handshake state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BridgeState {
    /// No session.
    #[default]
    Idle,
    /// Command valid on the channel this cycle.
    Dispatching(DebugSession),
    /// Waiting for `ready`.
    AwaitingCompletion(DebugSession),
    /// Ack on the bus this cycle.
    Acknowledging(DebugSession),
}

/// Debug transport bridge, bus-mapped variant with the reset line tied off.
#[derive(Clone, Debug, Default)]
pub struct DebugTransportBridge {
    state: BridgeState,
    release_pending: bool,
    capture: RegisterCapture,
    packet_counter: u32,
    abandoned: u64,
    violations: u64,
}

impl DebugTransportBridge {
    /// Creates an idle bridge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current handshake state.
    pub const fn state(&self) -> &BridgeState {
        &self.state
    }

    /// `transfer_in_progress`: a session is live.
    pub const fn transfer_in_progress(&self) -> bool {
        !matches!(self.state, BridgeState::Idle)
    }

    /// `transfer_complete`: the ack cycle.
    pub const fn transfer_complete(&self) -> bool {
        matches!(self.state, BridgeState::Acknowledging(_))
    }

    /// `transfer_wait_for_ack`: waiting for the requester to drop strobe after an ack.
    pub const fn transfer_wait_for_ack(&self) -> bool {
        self.release_pending
    }

    /// Registers A/B and their write-enables.
    pub const fn capture(&self) -> RegisterCapture {
        self.capture
    }

    /// Completed, non-abandoned handshakes.
    pub const fn packet_counter(&self) -> u32 {
        self.packet_counter
    }

    /// Sessions abandoned by the requester.
    pub const fn abandoned(&self) -> u64 {
        self.abandoned
    }

    /// Requests that changed while a session was live.
    pub const fn violations(&self) -> u64 {
        self.violations
    }

    /// Present command channel outputs.
    pub const fn command(&self) -> DebugCommandOut {
        match &self.state {
            BridgeState::Dispatching(session) => DebugCommandOut {
                valid: true,
                command: session.command,
            },
            _ => DebugCommandOut {
                valid: false,
                command: DebugCommand {
                    address: 0,
                    write: false,
                    payload: 0,
                },
            },
        }
    }

    /// Present bus outputs.
    pub const fn bus_output(&self) -> DebugBusOut {
        match &self.state {
            BridgeState::Acknowledging(session) => DebugBusOut {
                ack: true,
                read_data: session.read_data,
            },
            _ => DebugBusOut {
                ack: false,
                read_data: 0,
            },
        }
    }

    /// Advances one cycle from snapshots of the bus and the response channel.
    pub fn clock(&mut self, bus: &Transaction, response: &DebugResponse) {
        self.capture.a_we = false;
        self.capture.b_we = false;
        self.state = match std::mem::take(&mut self.state) {
            BridgeState::Idle => self.on_idle(bus),
            BridgeState::Dispatching(session) => self.on_dispatching(session, bus),
            BridgeState::AwaitingCompletion(session) => self.on_awaiting(session, bus, response),
            BridgeState::Acknowledging(_) => self.on_acknowledging(),
        };
    }

    fn on_idle(&mut self, bus: &Transaction) -> BridgeState {
        if self.release_pending {
            if bus.is_requesting() {
                return BridgeState::Idle;
            }
            self.release_pending = false;
        }
        if !bus.is_requesting() {
            return BridgeState::Idle;
        }
        let session = DebugSession::decode(*bus);
        debug!(
            address = session.command.address,
            write = session.command.write,
            "debug request latched"
        );
        BridgeState::Dispatching(session)
    }

    fn on_dispatching(&mut self, mut session: DebugSession, bus: &Transaction) -> BridgeState {
        self.observe(&mut session, bus);
        BridgeState::AwaitingCompletion(session)
    }

    fn on_awaiting(
        &mut self,
        mut session: DebugSession,
        bus: &Transaction,
        response: &DebugResponse,
    ) -> BridgeState {
        self.observe(&mut session, bus);
        if !response.valid {
            return BridgeState::AwaitingCompletion(session);
        }
        if session.abandoned {
            debug!("abandoned debug session drained");
            // A replaced request is never latched; strobe has to drop first.
            self.release_pending = session.changed;
            return BridgeState::Idle;
        }

        match session.kind {
            CommandKind::ReadTrigger { selector } => self.capture_result(selector, response.payload),
            CommandKind::Raw if !session.command.write => session.read_data = response.payload,
            CommandKind::Raw => {}
        }
        self.packet_counter = self.packet_counter.wrapping_add(1);
        BridgeState::Acknowledging(session)
    }

    fn on_acknowledging(&mut self) -> BridgeState {
        self.release_pending = true;
        BridgeState::Idle
    }

    fn capture_result(&mut self, selector: u8, payload: u32) {
        match selector {
            DEBUG_CORE => {
                self.capture.a = payload;
                self.capture.a_we = true;
            }
            DEBUG_DATA => {
                self.capture.b = payload;
                self.capture.b_we = true;
            }
            other => {
                self.capture.a = DEBUG_INVALID_SENTINEL;
                self.capture.b = u32::from(other);
                self.capture.a_we = true;
                self.capture.b_we = true;
            }
        }
    }

    /// Checks the requester against the live session.
    fn observe(&mut self, session: &mut DebugSession, bus: &Transaction) {
        if session.abandoned {
            return;
        }
        if !bus.is_requesting() {
            session.abandoned = true;
            self.abandoned += 1;
            debug!("debug request withdrawn mid-handshake");
        } else if !bus.same_request(&session.txn) {
            session.abandoned = true;
            session.changed = true;
            self.violations += 1;
            warn!(
                violation = %ProtocolViolation::RequestChanged,
                "debug request changed mid-handshake, session dropped"
            );
        }
    }
}

impl RegisterSurface for DebugTransportBridge {
    fn csr_registers(&self) -> Vec<CsrRegister> {
        vec![
            CsrRegister::status("core", 32),
            CsrRegister::status("data", 32),
            CsrRegister::status("counter", 32),
        ]
    }

    fn read_csr(&self, name: &str) -> u32 {
        match name {
            "core" => self.capture.a,
            "data" => self.capture.b,
            "counter" => self.packet_counter,
            _ => 0,
        }
    }

    fn write_csr(&mut self, _name: &str, _value: u32) {}
}
