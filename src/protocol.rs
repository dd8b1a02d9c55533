//! Host command protocol.
//!
//! | Byte   | Command          | Response          |
//! |--------|------------------|-------------------|
//! | `0x10` | start measurement| none              |
//! | `0x11` | fetch result     | 20-byte packet    |
//! | `0x80` | calibrate        | none              |
//!
//! [`CommandHandler::on_command`] runs in the host-bus interrupt.  It only
//! flips flags or copies the already-computed packet, never blocks and never
//! logs.  Unknown bytes produce no response.

use crate::shared::SharedState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HostCommand {
    StartMeasurement = 0x10,
    Fetch = 0x11,
    Calibrate = 0x80,
}

impl TryFrom<u8> for HostCommand {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        match byte {
            0x10 => Ok(Self::StartMeasurement),
            0x11 => Ok(Self::Fetch),
            0x80 => Ok(Self::Calibrate),
            other => Err(other),
        }
    }
}

/// Dispatches command bytes against the shared state.
#[derive(Clone, Copy)]
pub struct CommandHandler<'a> {
    shared: &'a SharedState,
}

impl<'a> CommandHandler<'a> {
    pub const fn new(shared: &'a SharedState) -> Self {
        Self { shared }
    }

    /// Handle one command byte.  Response bytes go into `out`; the return
    /// value is how many were written.
    pub fn on_command(&self, byte: u8, out: &mut [u8]) -> usize {
        match HostCommand::try_from(byte) {
            Ok(HostCommand::StartMeasurement) => {
                self.shared.request_measurement();
                0
            }
            Ok(HostCommand::Calibrate) => {
                self.shared.request_calibration();
                0
            }
            Ok(HostCommand::Fetch) => self.shared.take_packet().encode(out),
            Err(_) => 0,
        }
    }
}
