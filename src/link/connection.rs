//! Outbound connection establishment.

use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::link::LinkError;

/// Opens the TCP transport to the receiver, bounded by `connect_timeout`.
///
/// Exactly one attempt is made; retry policy belongs to the caller, who gets
/// a [`LinkError::TimeoutError`] when the deadline expires and a
/// [`LinkError::ConnectionError`] for everything else the connect can report.
///
/// The returned stream has Nagle's algorithm disabled: the transmit loop
/// writes one small frame per tick and each of them has to leave now, not
/// once the segment fills up.
pub async fn connect(
    host: &str,
    port: u16,
    connect_timeout: Duration,
) -> Result<TcpStream, LinkError> {
    let address = format!("{}:{}", host, port);
    info!(
        "Connecting to receiver at {} (timeout {}ms)",
        address,
        connect_timeout.as_millis()
    );

    let stream = match timeout(connect_timeout, TcpStream::connect(&address)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            error!("Failed to connect to {}: {}", address, e);
            return Err(LinkError::ConnectionError(e.to_string()));
        }
        Err(_) => {
            error!(
                "Connection attempt to {} timed out after {}ms",
                address,
                connect_timeout.as_millis()
            );
            return Err(LinkError::TimeoutError(connect_timeout.as_millis() as u64));
        }
    };

    if let Err(e) = stream.set_nodelay(true) {
        warn!("Could not disable Nagle on the control stream: {}", e);
    }

    debug!(
        "TCP transport established: {:?} -> {:?}",
        stream.local_addr(),
        stream.peer_addr()
    );
    Ok(stream)
}
