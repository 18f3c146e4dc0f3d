// Maps a listening port to the process that owns it

use async_trait::async_trait;
use netstat2::{get_sockets_info, AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo, TcpState};
use sysinfo::{Pid, System};
use tracing::{debug, warn};

use crate::scanner::results::OpenPort;

/// Looks up the owner of a listening port. Lookups never fail the scan:
/// anything that cannot be determined is left as `None`.
#[async_trait]
pub trait ProcessResolver: Send + Sync {
    async fn resolve(&self, port: u16) -> OpenPort;
}

/// Reads the live OS socket and process tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessResolver;

#[async_trait]
impl ProcessResolver for SystemProcessResolver {
    async fn resolve(&self, port: u16) -> OpenPort {
        match tokio::task::spawn_blocking(move || lookup_listener(port)).await {
            Ok(Ok(open_port)) => open_port,
            Ok(Err(e)) => {
                warn!(port, error = %e, "socket table lookup failed");
                OpenPort::unresolved(port)
            }
            Err(e) => {
                warn!(port, error = %e, "process lookup task failed");
                OpenPort::unresolved(port)
            }
        }
    }
}

fn lookup_listener(port: u16) -> anyhow::Result<OpenPort> {
    let af_flags = AddressFamilyFlags::IPV4 | AddressFamilyFlags::IPV6;
    let sockets = get_sockets_info(af_flags, ProtocolFlags::TCP)?;

    // Sockets owned by other users come back without pids unless we are root
    let pid = sockets
        .iter()
        .filter(|si| {
            matches!(
                &si.protocol_socket_info,
                ProtocolSocketInfo::Tcp(tcp) if tcp.state == TcpState::Listen && tcp.local_port == port
            )
        })
        .find_map(|si| si.associated_pids.first().copied());

    let Some(pid) = pid else {
        debug!(port, "no visible owner");
        return Ok(OpenPort::unresolved(port));
    };

    let sys_pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_process(sys_pid);

    let (process_name, command) = match system.process(sys_pid) {
        Some(process) => (
            Some(process.name().to_string()),
            command_line(process.cmd()),
        ),
        None => {
            debug!(port, pid, "process exited or is not readable");
            (None, None)
        }
    };

    Ok(OpenPort {
        port,
        pid: Some(pid),
        process_name,
        command,
    })
}

fn command_line(args: &[String]) -> Option<String> {
    if args.is_empty() {
        None
    } else {
        Some(args.join(" "))
    }
}
