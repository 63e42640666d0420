//! Streaming control link for a handheld steering device.
//!
//! One side of the link samples orientation and button state, the other is a
//! fixed-address receiver expecting a compact binary frame every 20ms over a
//! persistent TCP connection:
//!
//! ```text
//! producer ──► InputProcessor ──► ControlState ──► ControlLink ──► receiver
//!  (gamepad/     (scale +          (shared          (fixed-rate
//!   sensor)       deadzone)         atomics)         TCP loop)
//! ```
//!
//! [`control`] owns the shared state and input conditioning, [`link`] the
//! connection lifecycle, pacing and wire codec. [`gamepad`] bundles a
//! gilrs-based producer and [`config`] the toml file both sides of the
//! pipeline are tuned from.

pub mod config;
pub mod control;
pub mod gamepad;
pub mod link;

pub use config::{AppConfig, ConfigError, LinkConfig};
pub use control::{ControlSnapshot, ControlState, InputProcessor, InputSettings};
pub use gamepad::GamepadHandle;
pub use link::{LinkError, LinkHandle, LinkStatus};
