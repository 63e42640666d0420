use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use steerlink::config::{self, AppConfig};
use steerlink::control::{ControlState, InputProcessor};
use steerlink::gamepad::GamepadHandle;
use steerlink::link::{LinkHandle, LinkStatus};
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    // Config path can be overridden as the first argument
    let config_path = match std::env::args().nth(1) {
        Some(path) => path.into(),
        None => config::default_config_path(),
    };
    let config = AppConfig::load_or_default(&config_path)
        .await
        .map_err(|e| eyre!("Failed to load config: {}", e))?;
    info!(
        "Control link target: {}:{} ({}ms tick)",
        config.link.host, config.link.port, config.link.tick_interval_ms
    );

    let shared = Arc::new(ControlState::new());
    let input = InputProcessor::new(shared.clone(), config.input.clone());

    let mut pad_handle = GamepadHandle::spawn(input)
        .map_err(|e| eyre!("Failed to spawn gamepad reader: {}", e))?;

    let (status_tx, mut status_rx) = watch::channel(LinkStatus::default());

    let mut link_handle = match LinkHandle::connect(config.link, shared, status_tx).await {
        Ok(handle) => handle,
        Err(e) => {
            // The watch channel already carries the terminal status
            error!("Status: {}", *status_rx.borrow());
            if let Err(e) = pad_handle.shutdown().await {
                warn!("Gamepad reader shutdown failed: {}", e);
            }
            return Err(eyre!("Could not establish control link: {}", e));
        }
    };

    info!("Status: {}", *status_rx.borrow_and_update());

    // Render status changes until the session dies or ctrl-c arrives
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }

            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = status_rx.borrow_and_update().clone();
                info!("Status: {}", status);
                if status == LinkStatus::Disconnected {
                    break;
                }
            }
        }
    }

    let link_result = link_handle.shutdown().await;
    if let Err(e) = pad_handle.shutdown().await {
        warn!("Gamepad reader shutdown failed: {}", e);
    }

    link_result.map_err(|e| eyre!("Control link failed: {}", e))?;
    info!("Shutdown complete");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
