//! Conditioning of raw producer input into control state.
//!
//! Two independent paths feed the shared state: continuous orientation
//! samples that get scaled and deadzone-filtered, and discrete button edges
//! that map straight onto the command flags. Neither path queues anything;
//! whatever arrives last is what the next frame carries.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::control::state::ControlState;

/// Tuning for the orientation pipeline.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InputSettings {
    /// Multiplier applied to each raw axis before filtering
    pub sensitivity: f32,
    /// Absolute threshold below which a scaled axis snaps to zero
    pub deadzone: f32,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            sensitivity: 2.5,
            deadzone: 0.3,
        }
    }
}

/// Entry point for everything that produces control input.
///
/// Clones are cheap and all write into the same shared state, so a sensor
/// callback and a button handler can hold their own copy.
#[derive(Clone, Debug)]
pub struct InputProcessor {
    state: Arc<ControlState>,
    settings: InputSettings,
}

impl InputProcessor {
    pub fn new(state: Arc<ControlState>, settings: InputSettings) -> Self {
        debug!("Creating input processor with settings: {:?}", settings);
        Self { state, settings }
    }

    pub fn settings(&self) -> &InputSettings {
        &self.settings
    }

    /// Feeds one raw two-axis orientation sample.
    ///
    /// Both axes are scaled by the sensitivity factor, snapped to zero inside
    /// the deadzone and written out immediately. There is no smoothing and no
    /// rescaling: a value at or past the deadzone reaches the wire exactly as
    /// scaled.
    pub fn submit_orientation(&self, raw_x: f32, raw_y: f32) {
        let x = condition_axis(raw_x, &self.settings);
        let y = condition_axis(raw_y, &self.settings);
        debug!(
            "Orientation sample: raw ({:.4}, {:.4}) -> ({:.4}, {:.4})",
            raw_x, raw_y, x, y
        );
        self.state.set_steering(x, y);
    }

    /// Records the accelerator as currently held or released.
    pub fn set_accelerate(&self, pressed: bool) {
        debug!(
            "Accelerate {}",
            if pressed { "pressed" } else { "released" }
        );
        self.state.set_accelerate(pressed);
    }

    /// Records the brake as currently held or released.
    pub fn set_brake(&self, active: bool) {
        debug!("Brake {}", if active { "engaged" } else { "released" });
        self.state.set_brake(active);
    }
}

// Scale first, then filter: the deadzone is expressed in scaled units.
// Values inside it snap to exactly 0.0, values at or past it pass through
// unmodified.
fn condition_axis(raw: f32, settings: &InputSettings) -> f32 {
    let scaled = raw * settings.sensitivity;
    if scaled.abs() < settings.deadzone {
        0.0
    } else {
        scaled
    }
}
