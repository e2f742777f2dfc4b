use super::PortRange;
use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

/// Default timeout for a single loopback connect probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Source of truth for which ports are currently taken on this host.
///
/// The allocator only ever asks two questions: "is this port bound right
/// now?" and "give me everything that looks bound". Both answers are
/// best-effort snapshots; nothing here reserves a port.
pub trait PortOracle {
    /// True if a TCP listener currently accepts connections on loopback `port`.
    fn is_bound(&self, port: u16) -> bool;

    /// Collect ports currently in use on the host.
    ///
    /// `range` is only consulted by implementations that cannot enumerate
    /// sockets and have to probe instead.
    fn snapshot_used_ports(&self, range: PortRange) -> HashSet<u16>;
}

/// Port oracle backed by the real network stack.
#[derive(Debug, Clone)]
pub struct SystemPortOracle {
    probe_timeout: Duration,
}

impl SystemPortOracle {
    pub fn new() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_probe_timeout(probe_timeout: Duration) -> Self {
        Self { probe_timeout }
    }

    /// Probe every port in `range` with a connect attempt.
    ///
    /// O(range size) round trips, and blind to anything outside the range.
    fn probe_range(&self, range: PortRange) -> HashSet<u16> {
        tracing::debug!(
            "Socket enumeration unavailable, probing {}-{} by connect",
            range.low(),
            range.high()
        );
        range.iter().filter(|&port| self.is_bound(port)).collect()
    }

    /// Use enumerated ports when there are some, otherwise probe `range`.
    fn used_ports_from(
        &self,
        enumerated: Option<HashSet<u16>>,
        range: PortRange,
    ) -> HashSet<u16> {
        enumerated.unwrap_or_else(|| self.probe_range(range))
    }
}

impl Default for SystemPortOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl PortOracle for SystemPortOracle {
    fn is_bound(&self, port: u16) -> bool {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        // Refused, timed out or unreachable all count as "not bound"
        TcpStream::connect_timeout(&addr, self.probe_timeout).is_ok()
    }

    fn snapshot_used_ports(&self, range: PortRange) -> HashSet<u16> {
        self.used_ports_from(enumerate_local_ports(), range)
    }
}

/// Enumerate local ports of live TCP sockets from `/proc/net/tcp{,6}`.
///
/// Returns `None` when neither table can be read (non-Linux hosts,
/// restricted sandboxes), which sends the caller down the probing path.
#[cfg(target_os = "linux")]
fn enumerate_local_ports() -> Option<HashSet<u16>> {
    let mut ports = HashSet::new();
    let mut readable = false;

    for table in ["/proc/net/tcp", "/proc/net/tcp6"] {
        match std::fs::read_to_string(table) {
            Ok(contents) => {
                readable = true;
                ports.extend(parse_proc_net_tcp(&contents));
            }
            Err(e) => {
                tracing::debug!("Could not read {}: {}", table, e);
            }
        }
    }

    readable.then_some(ports)
}

#[cfg(not(target_os = "linux"))]
fn enumerate_local_ports() -> Option<HashSet<u16>> {
    None
}

/// Parse the `local_address` column of a `/proc/net/tcp` style table.
///
/// Rows look like `  0: 0100007F:1F40 00000000:0000 0A ...`; the port is the
/// hex value after the colon of the second column.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_proc_net_tcp(contents: &str) -> HashSet<u16> {
    contents
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter_map(|local| local.rsplit(':').next())
        .filter_map(|hex| u16::from_str_radix(hex, 16).ok())
        .filter(|&port| port != 0)
        .collect()
}
