//! Error types for bgpctl.
//!
//! Two layers live here. [`Error`] is what the plumbing (transport, channel,
//! session, store loading) returns. [`WorkflowError`] is the per-device
//! outcome taxonomy that the fleet runner records into each device's result.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for library operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Device session errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Inventory, policy or settings errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host is not present in known_hosts and verification is strict
    #[error("Host key for {host}:{port} is not known")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),
}

/// Device session errors (prompt handling, mode changes).
#[derive(Error, Debug)]
pub enum SessionError {
    /// Session already closed
    #[error("Session is closed")]
    Closed,

    /// Failed to reach the expected CLI mode
    #[error("Failed to enter {mode} mode, prompt is '{prompt}'")]
    ModeChangeFailed { mode: &'static str, prompt: String },
}

/// Inventory, policy store and settings errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Store file does not exist
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Store file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Store file is not a valid document
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Document parsed but its content is unusable
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Result type alias using the library [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal outcome of one device's workflow.
///
/// Every variant ends that device's run and nothing else: the fleet runner
/// records it into the device's result and keeps going.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Address literal rejected before any I/O
    #[error("Invalid IP {address}")]
    InvalidAddress { address: String },

    /// Reachability probe got no answer
    #[error("{address} not reachable")]
    Unreachable { address: String },

    /// Inventory names a device family with no profile
    #[error("Unsupported device family '{hint}'")]
    UnsupportedFamily { hint: String },

    /// Transport failure opening or using the session
    #[error("Session I/O failed: {0}")]
    SessionIo(#[from] Error),

    /// No policy entry for the device hostname
    #[error("No BGP policy for router '{hostname}'")]
    PolicyNotFound { hostname: String },

    /// Device rejected a configuration line
    #[error("Configuration rejected at '{command}': {output}")]
    ConfigRejected { command: String, output: String },

    /// Peering never reached Established
    #[error("BGP not established after {elapsed:?} ({polls} polls)")]
    Timeout { elapsed: Duration, polls: u32 },

    /// Run was cancelled while this device was in flight
    #[error("Cancelled")]
    Cancelled,

    /// The worker running this device died
    #[error("Worker aborted: {0}")]
    Aborted(String),
}

impl WorkflowError {
    /// Short stable label for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::InvalidAddress { .. } => "InvalidAddress",
            WorkflowError::Unreachable { .. } => "Unreachable",
            WorkflowError::UnsupportedFamily { .. } => "UnsupportedFamily",
            WorkflowError::SessionIo(_) => "SessionIO",
            WorkflowError::PolicyNotFound { .. } => "PolicyNotFound",
            WorkflowError::ConfigRejected { .. } => "ConfigRejected",
            WorkflowError::Timeout { .. } => "Timeout",
            WorkflowError::Cancelled => "Cancelled",
            WorkflowError::Aborted(_) => "Aborted",
        }
    }
}

/// Non-fatal problem recorded alongside an otherwise successful result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Running configuration could not be written
    #[error("failed to persist {}: {reason}", path.display())]
    PersistFailure { path: PathBuf, reason: String },

    /// Post-check ping got no replies
    #[error("ping {target} failed: {summary}")]
    PingFailed { target: String, summary: String },

    /// Session did not close cleanly
    #[error("session close failed: {reason}")]
    CloseFailed { reason: String },
}
