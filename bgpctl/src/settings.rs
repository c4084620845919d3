//! Per-run tunables.
//!
//! Read from the optional `settings` object of the policy document. Every
//! field has a default, so an absent object means a stock run.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Polling bounds for the peering check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Give up once this much time has passed without Established.
    pub timeout: Duration,
    /// Fixed pause between polls.
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            interval: Duration::from_secs(2),
        }
    }
}

/// Settings for one fleet run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSettings {
    pub poll_timeout_secs: u64,
    pub poll_interval_secs: u64,
    /// Devices worked on at the same time.
    pub workers: usize,
    /// Where running configurations are written.
    pub output_dir: PathBuf,
    pub probe_timeout_ms: u64,
    /// Connect timeout and per-command prompt timeout.
    pub command_timeout_secs: u64,
    /// Cancel whatever is still running after this long.
    pub run_deadline_secs: Option<u64>,
}

impl RunSettings {
    pub fn poll(&self) -> PollSettings {
        PollSettings {
            timeout: Duration::from_secs(self.poll_timeout_secs),
            interval: Duration::from_secs(self.poll_interval_secs),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn run_deadline(&self) -> Option<Duration> {
        self.run_deadline_secs.map(Duration::from_secs)
    }

    /// Worker count, never zero.
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        let poll = PollSettings::default();
        Self {
            poll_timeout_secs: poll.timeout.as_secs(),
            poll_interval_secs: poll.interval.as_secs(),
            workers: std::thread::available_parallelism().map_or(4, |n| n.get()),
            output_dir: PathBuf::from("."),
            probe_timeout_ms: 1000,
            command_timeout_secs: 30,
            run_deadline_secs: None,
        }
    }
}
