//! Sending beam commands to the chip.
//!
//! The bus driver is abstracted behind [`Transport`]; the caller owns it and
//! hands it to a [`Commander`]. No timing or retry policy here: callers
//! decide when to steer and whether to retry a failed write.

use std::fmt;

use tracing::{info, warn};

use crate::beam::BeamDefinition;
use crate::command::{BeamSettings, CommandFormat, Mode};
use crate::error::BeamError;

/// Failure reported by a bus driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No device attached or the driver was never initialized.
    #[error("{operation}: device not connected")]
    NotConnected { operation: &'static str },

    /// The driver returned a non-zero status.
    #[error("{operation} failed with hardware status {code}")]
    HardwareFault { operation: &'static str, code: i32 },
}

/// A synchronous SPI bus plus the chip's two enable lines.
pub trait Transport {
    /// Drive RX_EN / TX_EN (see [`crate::command::LINES_TX_EN`]).
    fn set_enable_lines(&mut self, lines: u8) -> Result<(), TransportError>;

    /// Clock `words` out and return what was clocked in.
    fn transfer(&mut self, words: &[u8]) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn set_enable_lines(&mut self, lines: u8) -> Result<(), TransportError> {
        (**self).set_enable_lines(lines)
    }

    fn transfer(&mut self, words: &[u8]) -> Result<Vec<u8>, TransportError> {
        (**self).transfer(words)
    }
}

/// Errors from [`Commander`] operations.
#[derive(Debug)]
pub enum CommandError {
    /// Settings could not be computed or encoded.
    Beam(BeamError),
    /// The bus driver failed.
    Transport(TransportError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Beam(e) => write!(f, "beam error: {e}"),
            CommandError::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Beam(e) => Some(e),
            CommandError::Transport(e) => Some(e),
        }
    }
}

impl From<BeamError> for CommandError {
    fn from(e: BeamError) -> Self {
        CommandError::Beam(e)
    }
}

impl From<TransportError> for CommandError {
    fn from(e: TransportError) -> Self {
        CommandError::Transport(e)
    }
}

/// Packs beam settings and writes them to a caller-owned transport.
///
/// # Example
///
/// ```
/// use awmf_beam::{BeamDefinition, Commander, CommandFormat, Mode, SimulatedDevice};
///
/// let mut beam = BeamDefinition::new(15.0, 20.0, awmf_beam::angle::SPEED_OF_LIGHT / 28e9)?;
/// let mut cmd = Commander::new(SimulatedDevice::new(), CommandFormat::AWMF_0108);
/// let sent = cmd.steer(Mode::Transmit, &mut beam)?;
/// assert_eq!(sent.len(), 13);
/// # Ok::<(), awmf_beam::CommandError>(())
/// ```
pub struct Commander<T: Transport> {
    transport: T,
    format: CommandFormat,
    /// Called with the mode and packed words before anything touches the bus.
    on_send: Option<Box<dyn FnMut(Mode, &[u8])>>,
    /// Called with the words clocked back after a successful transfer.
    on_recv: Option<Box<dyn FnMut(&[u8])>>,
}

impl<T: Transport> Commander<T> {
    pub fn new(transport: T, format: CommandFormat) -> Self {
        Self { transport, format, on_send: None, on_recv: None }
    }

    /// Register a callback invoked at the top of every write.
    pub fn set_on_send(&mut self, f: impl FnMut(Mode, &[u8]) + 'static) {
        self.on_send = Some(Box::new(f));
    }

    /// Register a callback invoked after every successful transfer.
    pub fn set_on_recv(&mut self, f: impl FnMut(&[u8]) + 'static) {
        self.on_recv = Some(Box::new(f));
    }

    pub fn format(&self) -> CommandFormat {
        self.format
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Select `mode` on the enable lines and write `settings`.
    ///
    /// Returns the words clocked back. Standby only clears the enable lines
    /// and returns an empty reply.
    pub fn set_beam(&mut self, mode: Mode, settings: &BeamSettings) -> Result<Vec<u8>, CommandError> {
        let words = settings.encode(mode, self.format)?;
        if let Some(cb) = self.on_send.as_mut() {
            cb(mode, &words);
        }

        self.transport
            .set_enable_lines(mode.enable_lines())
            .inspect_err(|e| {
                warn!(?mode, operation = "set_enable_lines", error = %e, "beam write failed")
            })?;
        if words.is_empty() {
            info!(?mode, "enable lines set, nothing to program");
            return Ok(Vec::new());
        }

        let reply = self
            .transport
            .transfer(&words)
            .inspect_err(|e| {
                warn!(?mode, operation = "transfer", error = %e, "beam write failed")
            })?;
        info!(?mode, words = words.len(), "beam command sent");
        if let Some(cb) = self.on_recv.as_mut() {
            cb(&reply);
        }
        Ok(reply)
    }

    /// Compute (or reuse) `beam`'s settings and write them.
    ///
    /// A transport failure leaves the beam's cached settings in place, so
    /// calling again retries the same write without recomputing.
    pub fn steer(&mut self, mode: Mode, beam: &mut BeamDefinition) -> Result<Vec<u8>, CommandError> {
        let settings = beam.beam_settings()?;
        self.set_beam(mode, &settings)
    }
}

impl<T: Transport + fmt::Debug> fmt::Debug for Commander<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commander")
            .field("transport", &self.transport)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Simulated device
// ---------------------------------------------------------------------------

/// In-memory stand-in for the chip: records every enable-line write and
/// transfer, and echoes transferred words back.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    connected: bool,
    lines: Vec<u8>,
    transfers: Vec<Vec<u8>>,
    fail_next: Option<TransportError>,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self { connected: true, lines: Vec::new(), transfers: Vec::new(), fail_next: None }
    }

    /// A device that answers every call with [`TransportError::NotConnected`]
    /// naming the call.
    pub fn disconnected() -> Self {
        Self { connected: false, ..Self::new() }
    }

    /// Make the next call (of either kind) fail with `error`.
    pub fn fail_next(&mut self, error: TransportError) {
        self.fail_next = Some(error);
    }

    /// Every enable-line value written, oldest first.
    pub fn line_history(&self) -> &[u8] {
        &self.lines
    }

    /// Current enable-line state; none asserted before the first write.
    pub fn lines(&self) -> u8 {
        self.lines.last().copied().unwrap_or(crate::command::LINES_NONE)
    }

    /// Every transfer that reached the device, oldest first.
    pub fn transfers(&self) -> &[Vec<u8>] {
        &self.transfers
    }

    fn check(&mut self, operation: &'static str) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected { operation });
        }
        match self.fail_next.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SimulatedDevice {
    fn set_enable_lines(&mut self, lines: u8) -> Result<(), TransportError> {
        self.check("set_enable_lines")?;
        self.lines.push(lines);
        Ok(())
    }

    fn transfer(&mut self, words: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.check("transfer")?;
        self.transfers.push(words.to_vec());
        Ok(words.to_vec())
    }
}
