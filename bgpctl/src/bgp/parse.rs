//! Extract facts from free-text device output.
//!
//! Device output formats drift between releases. Every parser here returns
//! an explicit "didn't match" value instead of failing, so a format change
//! degrades a report rather than aborting a device.

use std::fmt;

/// Peering state as read from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeeringState {
    Established,
    /// Any other state token the device reported (Idle, Active, ...).
    NotEstablished(String),
    /// Output did not contain a state token.
    Unknown,
}

impl PeeringState {
    pub fn is_established(&self) -> bool {
        matches!(self, PeeringState::Established)
    }
}

impl fmt::Display for PeeringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeeringState::Established => write!(f, "Established"),
            PeeringState::NotEstablished(token) => write!(f, "{}", token),
            PeeringState::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Pull the state token out of a `BGP state = Established, up for 00:01:02` line.
///
/// The token is whatever follows the first `" = "` up to whitespace, with a
/// trailing comma removed.
pub fn state_token(output: &str) -> Option<&str> {
    let (_, rest) = output.split_once(" = ")?;
    let token = rest.split_whitespace().next()?;
    let token = token.strip_suffix(',').unwrap_or(token);
    (!token.is_empty()).then_some(token)
}

/// Classify peering-status output.
pub fn parse_peering_state(output: &str) -> PeeringState {
    match state_token(output) {
        Some(token) if token.eq_ignore_ascii_case("established") => PeeringState::Established,
        Some(token) => PeeringState::NotEstablished(token.to_string()),
        None => PeeringState::Unknown,
    }
}

/// One row of the neighbor table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborRow {
    pub address: String,
    pub remote_as: String,
    pub state: String,
}

/// Parse `BGP neighbor is 10.0.0.2,  remote AS 65002, external link` lines.
///
/// Lines that do not have that shape are skipped. `state` is filled in
/// for every row.
pub fn parse_neighbor_rows(output: &str, state: &str) -> Vec<NeighborRow> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                ["BGP", "neighbor", "is", address, "remote", "AS", remote_as, ..] => {
                    Some(NeighborRow {
                        address: address.trim_end_matches(',').to_string(),
                        remote_as: remote_as.trim_end_matches(',').to_string(),
                        state: state.to_string(),
                    })
                }
                _ => None,
            }
        })
        .collect()
}

/// Non-empty lines of a filtered routing table.
pub fn route_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Facts pulled out of a `ping` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingSummary {
    /// The `Sending 5, 100-byte ICMP Echos to ...` line.
    pub header: String,
    /// The `Success rate is ...` line.
    pub summary: String,
    pub success_percent: Option<u8>,
}

/// Parse IOS-style ping output. Missing lines come back empty.
pub fn parse_ping(output: &str) -> PingSummary {
    let header = output
        .lines()
        .find(|line| line.trim_start().starts_with("Sending"))
        .unwrap_or_default()
        .trim()
        .to_string();

    let summary = output
        .lines()
        .rev()
        .find(|line| line.contains("Success rate is"))
        .unwrap_or_default()
        .trim()
        .to_string();

    let success_percent = summary
        .split_once("Success rate is ")
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .and_then(|percent| percent.parse().ok());

    PingSummary {
        header,
        summary,
        success_percent,
    }
}
