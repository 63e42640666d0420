//! Control state subsystem
//!
//! Owns the data that flows from the input side to the wire:
//!
//! 1. [`state`] - Shared latest-value cell read by the transmit loop
//! 2. [`input`] - Scaling, deadzone filtering and button edge handling
//!
//! # Architecture
//!
//! ```text
//! Producer ──► InputProcessor ──► ControlState ──► snapshot ──► frame
//!              (scale/deadzone)   (atomics)
//! ```
//!
//! The producer and the transmit loop run on independent schedules; the
//! shared cell is the only coupling between them.

pub mod input;
pub mod state;

pub use input::{InputProcessor, InputSettings};
pub use state::{ControlSnapshot, ControlState};
