//! Gamepad input producer.
//!
//! Stands in for the handheld's orientation sensor so the binary is usable
//! end to end: the left stick plays the gyroscope, South accelerates, East
//! brakes. Runs gilrs on the blocking pool since its event pump is a
//! synchronous poll.

use chrono::Local;
use gilrs::{Axis, Button, Event, EventType, Gilrs};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::control::InputProcessor;

// Gamepad errors
#[derive(Debug, thiserror::Error)]
pub enum PadError {
    #[error("Failed to initialize gamepad interface: {0}")]
    InitializationError(String),

    #[error("Gamepad task panicked: {0}")]
    ThreadError(String),
}

// Public interface for spawning and stopping the reader
pub struct GamepadHandle {
    cancel: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl GamepadHandle {
    // Initialize gilrs and start the reader loop on the blocking pool
    pub fn spawn(input: InputProcessor) -> Result<Self, PadError> {
        info!("Initializing gilrs gamepad interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(PadError::InitializationError(e.to_string()));
            }
        };

        let mut found_any = false;
        for (id, gamepad) in gilrs.gamepads() {
            info!("Found gamepad [{}]: {}", id, gamepad.name());
            found_any = true;
        }
        if !found_any {
            warn!("No gamepad connected, controls stay neutral until one appears");
        }

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task_handle = tokio::task::spawn_blocking(move || {
            run_pad_loop(gilrs, input, task_cancel);
        });

        info!("Gamepad reader started");
        Ok(Self {
            cancel,
            task_handle: Some(task_handle),
        })
    }

    // Stop the reader and wait for the loop to wind down
    pub async fn shutdown(&mut self) -> Result<(), PadError> {
        debug!("Requesting gamepad reader shutdown");
        self.cancel.cancel();

        if let Some(handle) = self.task_handle.take() {
            if let Err(e) = handle.await {
                error!("Gamepad task panicked: {}", e);
                return Err(PadError::ThreadError(e.to_string()));
            }
            debug!("Gamepad reader stopped");
        }
        Ok(())
    }
}

// Pump gilrs events into the input processor until cancelled. Stick axes
// arrive one at a time, so the last known pair is kept to always hand over
// a complete two-axis sample.
fn run_pad_loop(mut gilrs: Gilrs, input: InputProcessor, cancel: CancellationToken) {
    info!("Starting gamepad reader loop");

    let mut stick_x = 0.0f32;
    let mut stick_y = 0.0f32;

    // For performance monitoring
    let mut event_count: u64 = 0;
    let mut last_log_time = Local::now();
    let log_interval = chrono::Duration::seconds(10);

    while !cancel.is_cancelled() {
        while let Some(Event { event, .. }) = gilrs.next_event() {
            event_count += 1;
            match event {
                EventType::AxisChanged(Axis::LeftStickX, value, _) => {
                    stick_x = value;
                    input.submit_orientation(stick_x, stick_y);
                }
                EventType::AxisChanged(Axis::LeftStickY, value, _) => {
                    stick_y = value;
                    input.submit_orientation(stick_x, stick_y);
                }
                EventType::ButtonPressed(Button::South, _) => {
                    info!("Accelerate pressed");
                    input.set_accelerate(true);
                }
                EventType::ButtonReleased(Button::South, _) => {
                    info!("Accelerate released");
                    input.set_accelerate(false);
                }
                EventType::ButtonPressed(Button::East, _) => {
                    info!("Brake pressed");
                    input.set_brake(true);
                }
                EventType::ButtonReleased(Button::East, _) => {
                    info!("Brake released");
                    input.set_brake(false);
                }
                EventType::Connected => {
                    info!("Gamepad connected");
                }
                EventType::Disconnected => {
                    // Do not keep driving on a stale brake or throttle
                    warn!("Gamepad disconnected, dropping controls to neutral");
                    stick_x = 0.0;
                    stick_y = 0.0;
                    input.submit_orientation(0.0, 0.0);
                    input.set_accelerate(false);
                    input.set_brake(false);
                }
                _ => {
                    debug!("Ignoring gamepad event: {:?}", event);
                }
            }
        }

        // Log performance stats periodically
        let now = Local::now();
        if now - last_log_time > log_interval {
            info!(
                "Gamepad stats: {} events in last {} seconds",
                event_count,
                log_interval.num_seconds()
            );
            event_count = 0;
            last_log_time = now;
        }

        // Small sleep to prevent 100% CPU usage
        std::thread::sleep(std::time::Duration::from_millis(1));
    }

    info!("Gamepad reader loop stopped");
}
