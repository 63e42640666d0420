//! Link session lifecycle and the fixed-rate transmit loop.
//!
//! Implements the single-use session lifecycle with compile-time state
//! safety. A session connects once, streams until cancelled or the transport
//! fails, and is then spent; reconnection means creating a fresh session.
//! Status changes are pushed on a watch channel for whoever renders them.
//!
//! # State Machine
//!
//! ```text
//! Idle ──► Connecting ──► Streaming ──► Closed
//!              │               │
//!              ▼               ▼
//!       (connect error)  (write error)
//!         session consumed, never resumed
//! ```
//!
//! # Architecture
//!
//! ```text
//! ControlState ──► snapshot ──► ControlFrame ──► write + flush
//!                        (once per tick)              │
//!                                                TcpStream
//!    LinkHandle (cancel + join) ──────────────────────┘
//! ```

use chrono::Local;
use statum::{machine, state, transition};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::LinkConfig;
use crate::control::ControlState;
use crate::link::connection;
use crate::link::frame::{hex_string, ControlFrame};
use crate::link::{LinkError, LinkStatus};

/// States for the session lifecycle using statum
#[state]
#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,       // Created, nothing on the wire yet
    Connecting, // Connect attempt in flight
    Streaming,  // Transport established, loop may run
    Closed,     // Transport released, session is spent
}

/// Control link session with compile-time state safety via statum
///
/// Transmission is only reachable from the Streaming state; a session that
/// failed to connect or whose loop terminated cannot be driven again.
#[machine]
#[derive(Debug)]
pub struct ControlLink<SessionState> {
    config: LinkConfig,
    shared: Arc<ControlState>,
    transport: Option<TcpStream>,
    status_tx: watch::Sender<LinkStatus>,
}

impl<S: SessionStateTrait> ControlLink<S> {
    fn publish_status(&self, status: LinkStatus) {
        debug!("Link status: {}", status);
        if self.status_tx.send(status).is_err() {
            debug!("No status listeners connected");
        }
    }
}

impl ControlLink<Idle> {
    pub fn create(
        config: LinkConfig,
        shared: Arc<ControlState>,
        status_tx: watch::Sender<LinkStatus>,
    ) -> Self {
        info!(
            "Creating link session for {}:{}",
            config.host, config.port
        );

        Self::builder()
            .config(config)
            .shared(shared)
            .maybe_transport(None)
            .status_tx(status_tx)
            .build()
    }

}

#[transition]
impl ControlLink<Idle> {
    /// Starts the connect phase and transitions to Connecting state
    pub fn open(self) -> ControlLink<Connecting> {
        self.publish_status(LinkStatus::Connecting);
        self.transition()
    }
}

#[transition]
impl ControlLink<Connecting> {
    /// Runs the bounded connect attempt.
    ///
    /// On success the session holds the transport and is ready to stream.
    /// On failure the terminal status is published and the session is
    /// consumed along with the error.
    pub async fn establish(mut self) -> Result<ControlLink<Streaming>, LinkError> {
        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);

        match connection::connect(&self.config.host, self.config.port, connect_timeout).await {
            Ok(stream) => {
                self.transport = Some(stream);
                self.publish_status(LinkStatus::Connected);
                info!(
                    "Link established to {}:{}",
                    self.config.host, self.config.port
                );
                Ok(self.transition())
            }
            Err(e) => {
                let status = match &e {
                    LinkError::TimeoutError(_) => LinkStatus::TimedOut,
                    LinkError::ConnectionError(reason) => LinkStatus::Failed(reason.clone()),
                    other => LinkStatus::Failed(other.to_string()),
                };
                self.publish_status(status);
                Err(e)
            }
        }
    }
}

#[transition]
impl ControlLink<Streaming> {
    /// Streams frames until cancelled or the transport fails.
    ///
    /// Either way the transport is released and `Disconnected` is published
    /// before this returns; the loop's verdict decides between the Closed
    /// session and the error. A blocked write is not time-bounded here,
    /// callers that need a hard deadline must wrap the transport themselves.
    pub async fn run_until_closed(
        mut self,
        cancel: CancellationToken,
    ) -> Result<ControlLink<Closed>, LinkError> {
        let tick = Duration::from_millis(self.config.tick_interval_ms);

        let mut transport = match self.transport.take() {
            Some(stream) => stream,
            None => {
                error!("Streaming session has no transport");
                self.publish_status(LinkStatus::Disconnected);
                return Err(LinkError::ConnectionError(
                    "no transport available".to_string(),
                ));
            }
        };

        let result = run_transmit_loop(&mut transport, self.shared.clone(), tick, &cancel).await;

        release_transport(&mut transport).await;
        self.publish_status(LinkStatus::Disconnected);

        match result {
            Ok(()) => {
                info!("Link session closed");
                Ok(self.transition())
            }
            Err(e) => {
                error!("Link session terminated: {}", e);
                Err(e)
            }
        }
    }
}

impl ControlLink<Closed> {}

/// Handle for managing a link session in a tokio task
///
/// Provides lifecycle management for the session running in the background:
/// task spawning, cancellation and deterministic teardown. Nothing here is
/// fire-and-forget; `shutdown` always reports how the session ended.
#[derive(Debug)]
pub struct LinkHandle {
    cancel: CancellationToken,
    task_handle: Option<JoinHandle<Result<(), LinkError>>>,
}

impl LinkHandle {
    /// Connects and starts streaming in a background task.
    ///
    /// Returns once the connection outcome is known: the task is only
    /// spawned for an established session, so connect failures surface here
    /// and never as a half-running session. A zero tick interval is
    /// rejected up front, the interval timer cannot run with it.
    pub async fn connect(
        config: LinkConfig,
        shared: Arc<ControlState>,
        status_tx: watch::Sender<LinkStatus>,
    ) -> Result<Self, LinkError> {
        if config.tick_interval_ms == 0 {
            error!("Rejecting link session: tick interval must be non-zero");
            return Err(LinkError::InitializationError(
                "tick interval must be non-zero".to_string(),
            ));
        }

        let session = ControlLink::create(config, shared, status_tx).open();
        let streaming = session.establish().await?;

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task_handle = tokio::spawn(async move {
            match streaming.run_until_closed(task_cancel).await {
                Ok(_closed) => {
                    debug!("Link session task completed");
                    Ok(())
                }
                Err(e) => {
                    error!("Link session task terminated: {}", e);
                    Err(e)
                }
            }
        });

        Ok(Self {
            cancel,
            task_handle: Some(task_handle),
        })
    }

    /// Cancels the session and waits for the task to finish.
    ///
    /// Also safe to call after the session already died on its own; the
    /// loop's terminal error is returned in that case.
    pub async fn shutdown(&mut self) -> Result<(), LinkError> {
        debug!("Requesting link shutdown");
        self.cancel.cancel();

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => {
                    debug!("Link task completed");
                    result
                }
                Err(e) => {
                    error!("Link task panicked: {}", e);
                    Err(LinkError::ThreadError(format!("Link task panicked: {}", e)))
                }
            }
        } else {
            debug!("Link already shut down");
            Ok(())
        }
    }
}

/// Drives the fixed-rate transmit loop over any writable transport.
///
/// One frame per tick carrying whatever the shared state holds at read time;
/// intermediate values between ticks are never seen. Returns `Ok` when
/// cancelled and `Err` on the first write or flush failure; nothing is
/// retried.
async fn run_transmit_loop<W>(
    writer: &mut W,
    shared: Arc<ControlState>,
    tick: Duration,
    cancel: &CancellationToken,
) -> Result<(), LinkError>
where
    W: AsyncWrite + Unpin,
{
    let mut ticker = interval(tick);
    // Late ticks are sent late rather than in a burst; the receiver only
    // ever wants the freshest frame.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Starting transmit loop ({}ms tick)", tick.as_millis());

    // For performance monitoring
    let mut total_frames: u64 = 0;
    let mut window_frames: u64 = 0;
    let mut last_stats_time = Local::now();
    let stats_interval = chrono::Duration::seconds(10);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Transmit loop cancelled after {} frames", total_frames);
                return Ok(());
            }

            _ = ticker.tick() => {
                let snapshot = shared.snapshot();
                let frame = ControlFrame::from_snapshot(&snapshot);
                let bytes = frame.encode();

                if let Err(e) = writer.write_all(&bytes).await {
                    error!("Failed to write frame: {}", e);
                    return Err(LinkError::TransmissionError(e.to_string()));
                }
                if let Err(e) = writer.flush().await {
                    error!("Failed to flush frame: {}", e);
                    return Err(LinkError::TransmissionError(e.to_string()));
                }

                total_frames += 1;
                window_frames += 1;
                debug!(
                    "Sent bytes: {} ({:?} x={:.4} y={:.4})",
                    hex_string(&bytes),
                    frame.command,
                    frame.steering_x,
                    frame.steering_y
                );

                // Log throughput stats periodically
                let now = Local::now();
                if now - last_stats_time > stats_interval {
                    info!(
                        "Transmit stats: {} frames in last {} seconds (avg {:.2}/sec)",
                        window_frames,
                        stats_interval.num_seconds(),
                        window_frames as f64 / stats_interval.num_seconds() as f64
                    );
                    window_frames = 0;
                    last_stats_time = now;
                }
            }
        }
    }
}

// Graceful close of the transport. A failure here is logged and swallowed,
// the session outcome is already decided by the time this runs.
async fn release_transport(stream: &mut TcpStream) {
    if let Err(e) = stream.shutdown().await {
        warn!("Error while closing control stream: {}", e);
    } else {
        debug!("Control stream closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::frame::{Command, FRAME_LEN};
    use tokio::io::AsyncReadExt;

    #[tokio::test(start_paused = true)]
    async fn transmit_loop_sends_fresh_state_each_tick() {
        let (mut writer, mut reader) = tokio::io::duplex(1024);
        let shared = Arc::new(ControlState::new());
        shared.set_steering(0.5, -1.0);
        shared.set_brake(true);

        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let loop_shared = shared.clone();
        let task = tokio::spawn(async move {
            run_transmit_loop(
                &mut writer,
                loop_shared,
                Duration::from_millis(20),
                &loop_cancel,
            )
            .await
        });

        let mut buf = [0u8; FRAME_LEN];
        reader.read_exact(&mut buf).await.unwrap();
        let first = ControlFrame::decode(&buf).unwrap();
        assert_eq!(first.command, Command::Brake);
        assert_eq!(first.steering_x, 0.5);
        assert_eq!(first.steering_y, -1.0);

        // releasing the brake has to show up in a later frame
        shared.set_brake(false);
        shared.set_accelerate(true);
        let mut saw_accelerate = false;
        for _ in 0..10 {
            reader.read_exact(&mut buf).await.unwrap();
            if ControlFrame::decode(&buf).unwrap().command == Command::Accelerate {
                saw_accelerate = true;
                break;
            }
        }
        assert!(saw_accelerate, "state change never reached the wire");

        cancel.cancel();
        let result = task.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn transmit_loop_fails_on_first_write_after_peer_is_gone() {
        let (mut writer, reader) = tokio::io::duplex(64);
        drop(reader);

        let shared = Arc::new(ControlState::new());
        let cancel = CancellationToken::new();
        let result =
            run_transmit_loop(&mut writer, shared, Duration::from_millis(20), &cancel).await;

        match result {
            Err(LinkError::TransmissionError(_)) => {}
            other => panic!("expected transmission error, got {:?}", other),
        }
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_loop_returns_cleanly() {
        let (mut writer, _reader) = tokio::io::duplex(1024);
        let shared = Arc::new(ControlState::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result =
            run_transmit_loop(&mut writer, shared, Duration::from_millis(20), &cancel).await;
        assert!(result.is_ok());
    }
}
