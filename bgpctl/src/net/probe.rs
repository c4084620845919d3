//! Host reachability probing.

use std::collections::HashMap;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use futures_util::future::join_all;
use log::debug;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Bounded-time reachability check for one address.
pub trait Prober: Send + Sync + 'static {
    /// `true` if the host answered within the probe's time bound.
    fn probe(&self, addr: IpAddr) -> impl Future<Output = bool> + Send;
}

/// Probes by opening a TCP connection to the management port.
///
/// An accepted or actively refused connection both mean the host is up;
/// only silence until the timeout counts as unreachable.
#[derive(Debug, Clone)]
pub struct TcpProber {
    pub port: u16,
    pub timeout: Duration,
}

impl TcpProber {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::new(22, Duration::from_secs(1))
    }
}

impl Prober for TcpProber {
    async fn probe(&self, addr: IpAddr) -> bool {
        let socket_addr = SocketAddr::new(addr, self.port);
        match timeout(self.timeout, TcpStream::connect(socket_addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("probe {}: {}", socket_addr, e);
                e.kind() == std::io::ErrorKind::ConnectionRefused
            }
            Err(_elapsed) => false,
        }
    }
}

/// Probe every address concurrently.
///
/// Strings that are not IP literals are reported unreachable.
pub async fn check_reachability<P: Prober>(prober: &P, hosts: &[&str]) -> HashMap<String, bool> {
    let probes = hosts.iter().map(|host| async move {
        let reachable = match host.parse::<IpAddr>() {
            Ok(addr) => prober.probe(addr).await,
            Err(_) => false,
        };
        (host.to_string(), reachable)
    });

    join_all(probes).await.into_iter().collect()
}
