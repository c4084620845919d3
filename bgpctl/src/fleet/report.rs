//! Human-readable run report.

use std::fmt;

use super::runner::RunResult;

/// All device results of one run, in inventory order.
#[derive(Debug)]
pub struct FleetReport {
    pub results: Vec<RunResult>,
}

impl FleetReport {
    pub fn new(results: Vec<RunResult>) -> Self {
        Self { results }
    }

    /// `true` if any device ended in a fatal failure. Warnings don't count.
    pub fn has_fatal_failure(&self) -> bool {
        self.results.iter().any(|result| !result.success())
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|result| result.success()).count()
    }
}

impl fmt::Display for FleetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.results {
            write!(f, "{}", result)?;
        }
        writeln!(
            f,
            "{} of {} device(s) passed",
            self.passed(),
            self.results.len()
        )
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.address_valid {
            writeln!(f, "IP {} is valid", self.address)?;
        } else {
            writeln!(f, "IP {} is not valid", self.address)?;
        }
        match self.reachable {
            Some(true) => writeln!(f, "IP {} is reachable", self.address)?,
            Some(false) => writeln!(f, "IP {} is not reachable", self.address)?,
            None => {}
        }

        let hostname = self.hostname.as_deref().unwrap_or(&self.address);

        if !self.neighbors.is_empty() {
            writeln!(f)?;
            writeln!(f, "{}", hostname)?;
            writeln!(f, "{:<15} {:<10} {:<20}", "Neighbor IP", "Remote AS", "State")?;
            writeln!(f, "{}", "-".repeat(45))?;
            for row in &self.neighbors {
                writeln!(f, "{:<15} {:<10} {:<20}", row.address, row.remote_as, row.state)?;
            }
        }

        if self.success() {
            writeln!(f)?;
            writeln!(f, "BGP routes ({})", hostname)?;
            writeln!(f, "{}", "-".repeat(70))?;
            for route in &self.routes {
                writeln!(f, "{}", route)?;
            }
        }

        if let Some(path) = &self.config_path {
            writeln!(f)?;
            writeln!(f, "Saved running config to {}", path.display())?;
        }

        for ping in &self.pings {
            writeln!(f)?;
            writeln!(f, "Pinging from {} to {}", hostname, ping.target)?;
            writeln!(f, "{}", ping.header)?;
            writeln!(f, "{}", ping.summary)?;
        }

        for warning in &self.warnings {
            writeln!(f, "warning: {}", warning)?;
        }

        writeln!(f)?;
        match &self.failure {
            None => writeln!(f, "{}: PASS ({})", hostname, self.peering)?,
            Some(failure) => writeln!(f, "{}: FAIL [{}] {}", hostname, failure.kind(), failure)?,
        }
        writeln!(f)
    }
}
