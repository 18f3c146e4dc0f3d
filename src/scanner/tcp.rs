use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{trace, warn};

use crate::scanner::results::PortStatus;

/// Single connect attempt. Refusal, timeout and OS errors are all `Closed`;
/// no retries.
pub async fn connect_scan(addr: SocketAddr, connect_timeout: Duration) -> PortStatus {
    match timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => PortStatus::Open,
        Ok(Err(e)) => {
            if is_descriptor_exhaustion(&e) {
                warn!(port = addr.port(), error = %e, "out of socket descriptors, lower --workers");
            } else {
                trace!(port = addr.port(), error = %e, "connect failed");
            }
            PortStatus::Closed
        }
        Err(_) => {
            trace!(port = addr.port(), "connect timed out");
            PortStatus::Closed
        }
    }
}

fn is_descriptor_exhaustion(e: &io::Error) -> bool {
    #[cfg(unix)]
    {
        matches!(e.raw_os_error(), Some(libc::EMFILE) | Some(libc::ENFILE))
    }
    #[cfg(not(unix))]
    {
        let _ = e;
        false
    }
}
