//! Control link subsystem
//!
//! Everything between the shared control state and the receiver's socket:
//!
//! 1. [`frame`] - Wire codec for the fixed 10-byte control frame
//! 2. [`connection`] - Bounded-timeout connect to the receiver
//! 3. [`session`] - Typed session lifecycle and the fixed-rate transmit loop
//! 4. [`error`] - Link error types
//!
//! # Architecture
//!
//! ```text
//! ControlState ──► transmit loop ──► ControlFrame ──► TcpStream ──► receiver
//!                       ▲                                  │
//!                  LinkHandle                      LinkStatus (watch)
//! ```
//!
//! A session is single-use: once it leaves Streaming it is spent, and
//! reconnecting means creating a fresh one.

pub mod connection;
pub mod error;
pub mod frame;
pub mod session;

pub use error::LinkError;
pub use session::LinkHandle;

use std::fmt;

/// Externally visible link status, published on a watch channel.
///
/// Observers only ever care about the latest value; the watch channel gives
/// them exactly that without ever blocking the session.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum LinkStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    TimedOut,
    Failed(String),
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Disconnected => write!(f, "Disconnected"),
            LinkStatus::Connecting => write!(f, "Connecting..."),
            LinkStatus::Connected => write!(f, "Connected"),
            LinkStatus::TimedOut => write!(f, "Timeout: check receiver address and port"),
            LinkStatus::Failed(reason) => write!(f, "Failed: {}", reason),
        }
    }
}
