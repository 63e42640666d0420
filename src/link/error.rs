//! Error definitions for the link module

use thiserror::Error;

/// Error types for the control link
#[derive(Debug, Error)]
pub enum LinkError {
    /// Link parameters rejected before a session was created
    #[error("Invalid link configuration: {0}")]
    InitializationError(String),

    /// Connect attempt exceeded the configured deadline
    #[error("Connection attempt timed out after {0}ms")]
    TimeoutError(u64),

    /// Connect attempt failed outright (refused, unreachable, resolution)
    #[error("Failed to connect: {0}")]
    ConnectionError(String),

    /// A frame write or flush failed; the session is over
    #[error("Failed to transmit frame: {0}")]
    TransmissionError(String),

    /// The background task died instead of returning
    #[error("Link task panicked: {0}")]
    ThreadError(String),
}
