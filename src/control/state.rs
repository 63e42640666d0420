//! Shared control values between the input side and the transmit loop.
//!
//! One [`ControlState`] lives behind an `Arc` for the duration of a session.
//! The input processor writes into it at whatever cadence the producer runs;
//! the transmit loop snapshots it once per tick. Each field is its own
//! atomic, so neither side ever blocks and intermediate values are simply
//! overwritten; the last value wins.
//!
//! Fields are read individually, so a snapshot taken while a write is in
//! flight may pair an axis from the newest sample with one from the previous
//! sample. The wire protocol carries no sample identity, which makes such a
//! pairing indistinguishable from two samples arriving close together; no
//! consumer may assume cross-field consistency.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Latest steering axes and command flags, shared without a lock.
///
/// The float axes are stored as their IEEE-754 bit patterns in [`AtomicU32`];
/// values round-trip bit-exact, NaN included.
#[derive(Debug)]
pub struct ControlState {
    steering_x: AtomicU32,
    steering_y: AtomicU32,
    brake_active: AtomicBool,
    accelerate_pressed: AtomicBool,
}

impl ControlState {
    /// A zeroed state: centred steering, no pedal engaged.
    pub const fn new() -> Self {
        Self {
            // 0u32 is the bit pattern of +0.0f32
            steering_x: AtomicU32::new(0),
            steering_y: AtomicU32::new(0),
            brake_active: AtomicBool::new(false),
            accelerate_pressed: AtomicBool::new(false),
        }
    }

    /// Overwrites both steering axes with an already-conditioned sample.
    pub fn set_steering(&self, x: f32, y: f32) {
        self.steering_x.store(x.to_bits(), Ordering::Release);
        self.steering_y.store(y.to_bits(), Ordering::Release);
    }

    pub fn set_brake(&self, active: bool) {
        self.brake_active.store(active, Ordering::Release);
    }

    pub fn set_accelerate(&self, pressed: bool) {
        self.accelerate_pressed.store(pressed, Ordering::Release);
    }

    /// Reads all four fields into a plain value for encoding.
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            steering_x: f32::from_bits(self.steering_x.load(Ordering::Relaxed)),
            steering_y: f32::from_bits(self.steering_y.load(Ordering::Relaxed)),
            brake_active: self.brake_active.load(Ordering::Relaxed),
            accelerate_pressed: self.accelerate_pressed.load(Ordering::Relaxed),
        }
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}

/// A plain copy of the control state at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlSnapshot {
    pub steering_x: f32,
    pub steering_y: f32,
    pub brake_active: bool,
    pub accelerate_pressed: bool,
}
