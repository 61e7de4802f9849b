//! Error taxonomy for the serial bridge.
//!
//! Every variant is recovered locally by resetting the link state and is
//! surfaced exactly once, either as a direct reply to the caller or
//! through the event dispatcher. None of them are fatal, and the core
//! never retries on its own.

use crate::domain::models::AdapterState;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerialError {
    /// An operation was attempted while the adapter is not powered on.
    /// The operation is a no-op.
    #[error("bluetooth adapter unavailable (state {0:?})")]
    AdapterUnavailable(AdapterState),

    /// The radio could not establish (or finish setting up) the link.
    /// The attempt is over; the consumer may retry with a new `connect`.
    #[error("connection failed: {0}")]
    ConnectError(String),

    /// The peripheral exposes neither the serial service nor the serial
    /// characteristic. Terminal for the attempt.
    #[error("peripheral does not expose a serial service/characteristic")]
    IncompatibleDevice,

    /// The link dropped without a user-initiated disconnect.
    #[error("link lost: {0}")]
    UnexpectedDisconnect(String),

    /// A send was attempted while no link is ready. Nothing was written.
    #[error("write rejected: serial link is not ready")]
    WriteRejected,

    /// The core task is no longer running.
    #[error("serial core has shut down")]
    CoreStopped,
}
