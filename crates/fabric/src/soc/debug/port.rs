//! The processor's internal debug register interface.
//!
//! The real interface lives inside the core. `CoreDebugPort` stands in for it: writes to the
//! core (0x00) and data (0x04) registers are stored immediately, and every command is
//! answered with a one-cycle `ready` pulse after a fixed latency.

use tracing::trace;

use super::{DebugCommand, DebugCommandOut, DebugResponse};
use crate::common::constants::{DEBUG_CORE, DEBUG_DATA};

/// Consumer side of the debug command channel.
///
/// Follows the step model: `response` exposes present outputs, `clock` advances one cycle
/// from a snapshot of the command channel.
pub trait DebugRegisterInterface {
    /// Present `ready`/payload outputs.
    fn response(&self) -> DebugResponse;

    /// Advances one cycle, sampling the command channel.
    fn clock(&mut self, command: &DebugCommandOut);
}

/// Command being served by the port.
#[derive(Clone, Copy, Debug)]
struct InFlight {
    command: DebugCommand,
    remaining: u32,
}

/// Model of the core's debug register file.
#[derive(Clone, Debug, Default)]
pub struct CoreDebugPort {
    core: u32,
    data: u32,
    latency: u32,
    in_flight: Option<InFlight>,
    response: DebugResponse,
}

impl CoreDebugPort {
    /// Creates a port that answers `latency` cycles after accepting a command.
    pub fn new(latency: u32) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Current core register value.
    pub const fn core_register(&self) -> u32 {
        self.core
    }

    /// Current data register value.
    pub const fn data_register(&self) -> u32 {
        self.data
    }

    /// Reads a register by address; unknown addresses read as zero.
    pub const fn read_register(&self, address: u8) -> u32 {
        match address {
            DEBUG_CORE => self.core,
            DEBUG_DATA => self.data,
            _ => 0,
        }
    }

    fn write_register(&mut self, address: u8, value: u32) {
        match address {
            DEBUG_CORE => self.core = value,
            DEBUG_DATA => self.data = value,
            _ => trace!(address, "write to unknown debug register ignored"),
        }
    }
}

impl DebugRegisterInterface for CoreDebugPort {
    fn response(&self) -> DebugResponse {
        self.response
    }

    fn clock(&mut self, command: &DebugCommandOut) {
        self.response = DebugResponse::default();
        match self.in_flight.take() {
            Some(InFlight {
                command: done,
                remaining: 0,
            }) => {
                self.response = DebugResponse {
                    payload: self.read_register(done.address),
                    valid: true,
                };
            }
            Some(mut busy) => {
                busy.remaining -= 1;
                self.in_flight = Some(busy);
            }
            None if command.valid => {
                let accepted = command.command;
                if accepted.write {
                    self.write_register(accepted.address, accepted.payload);
                }
                self.in_flight = Some(InFlight {
                    command: accepted,
                    remaining: self.latency,
                });
            }
            None => {}
        }
    }
}
