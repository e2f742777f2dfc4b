use super::PortOracle;
use serde::Serialize;
use std::process::Command;

/// A port that is bound, with whatever we could learn about its holders.
#[derive(Debug, Clone, Serialize)]
pub struct PortConflict {
    pub port: u16,
    pub processes: Vec<ProcessInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub command: Option<String>,
}

impl PortConflict {
    /// Check whether `port` is bound and, if so, who holds it.
    ///
    /// Holder lookup is best effort: an empty `processes` list means the port
    /// is bound but the owner is not visible to us (other user, no `ss`).
    pub fn check(oracle: &impl PortOracle, port: u16) -> Option<Self> {
        if !oracle.is_bound(port) {
            return None;
        }
        Some(PortConflict {
            port,
            processes: find_processes_on_port(port),
        })
    }

    pub fn describe(&self) -> String {
        if self.processes.is_empty() {
            return format!("port {} is in use (owner unknown)", self.port);
        }
        let holders: Vec<String> = self
            .processes
            .iter()
            .map(|p| format!("'{}' (PID {})", p.name, p.pid))
            .collect();
        format!("port {} is in use by {}", self.port, holders.join(", "))
    }
}

#[cfg(target_os = "linux")]
fn find_processes_on_port(port: u16) -> Vec<ProcessInfo> {
    let output = match Command::new("ss")
        .args(["-tlnpH", &format!("sport = :{}", port)])
        .output()
    {
        Ok(o) => o,
        Err(e) => {
            tracing::debug!("ss unavailable: {}", e);
            return Vec::new();
        }
    };

    if !output.status.success() {
        return Vec::new();
    }

    parse_ss_pids(&String::from_utf8_lossy(&output.stdout))
        .into_iter()
        .map(|pid| {
            let name = std::fs::read_to_string(format!("/proc/{}/comm", pid))
                .ok()
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let command = std::fs::read_to_string(format!("/proc/{}/cmdline", pid))
                .ok()
                .map(|s| s.replace('\0', " ").trim().to_string())
                .filter(|s| !s.is_empty());
            ProcessInfo { pid, name, command }
        })
        .collect()
}

#[cfg(not(target_os = "linux"))]
fn find_processes_on_port(_port: u16) -> Vec<ProcessInfo> {
    Vec::new()
}

/// Pull unique `pid=N` entries out of `ss -p` output, in order of appearance.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_ss_pids(stdout: &str) -> Vec<u32> {
    let mut pids = Vec::new();
    for line in stdout.lines() {
        // users:(("python3",pid=4242,fd=5),("python3",pid=4243,fd=5))
        for part in line.split(',') {
            if let Some(pid) = part
                .strip_prefix("pid=")
                .and_then(|pid| pid.parse::<u32>().ok())
            {
                if !pids.contains(&pid) {
                    pids.push(pid);
                }
            }
        }
    }
    pids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pids_from_ss_users_column() {
        let out = "LISTEN 0 128 127.0.0.1:8000 0.0.0.0:* users:((\"python3\",pid=4242,fd=5),(\"python3\",pid=4243,fd=5))\n\
                   LISTEN 0 128 [::1]:8000 [::]:* users:((\"python3\",pid=4242,fd=6))\n";
        assert_eq!(parse_ss_pids(out), vec![4242, 4243]);
    }

    #[test]
    fn no_users_column_yields_nothing() {
        assert!(parse_ss_pids("LISTEN 0 128 127.0.0.1:8000 0.0.0.0:*\n").is_empty());
    }

    #[test]
    fn describe_lists_holders() {
        let conflict = PortConflict {
            port: 8000,
            processes: vec![ProcessInfo {
                pid: 12,
                name: "bot".into(),
                command: None,
            }],
        };
        assert_eq!(conflict.describe(), "port 8000 is in use by 'bot' (PID 12)");

        let unknown = PortConflict {
            port: 8001,
            processes: Vec::new(),
        };
        assert_eq!(unknown.describe(), "port 8001 is in use (owner unknown)");
    }
}
