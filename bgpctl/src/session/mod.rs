//! Device session contract.
//!
//! The orchestrator never talks to a transport directly. It drives a
//! [`DeviceSession`], which is bound to one device for the lifetime of one
//! workflow and is closed exactly once when the workflow ends.
//!
//! # Example
//!
//! ```rust,no_run
//! use bgpctl::session::{DeviceSession, SessionOpener, SshOpener};
//! use bgpctl::fleet::DeviceTarget;
//! use bgpctl::platform::DeviceFamily;
//!
//! # async fn example(target: &DeviceTarget) -> Result<(), bgpctl::Error> {
//! let opener = SshOpener::default();
//! let platform = DeviceFamily::CiscoIosXe.platform();
//! let mut session = opener.open(target, &platform).await?;
//! println!("{}", session.run_command("show ip bgp summary").await?);
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

mod response;
mod ssh;

pub use response::Response;
pub use ssh::{SshOpener, SshSession};

use std::future::Future;

use regex::bytes::Regex;

use crate::error::Result;
use crate::fleet::DeviceTarget;
use crate::platform::PlatformDefinition;

/// Outcome of pushing a batch of configuration lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Every line went in without the error marker showing up.
    Accepted,
    /// The device flagged `command`; `output` is what it printed.
    Rejected { command: String, output: String },
}

impl PushOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PushOutcome::Accepted)
    }
}

/// A live CLI session on one device.
pub trait DeviceSession: Send {
    /// Hostname derived from the device prompt, lowercased.
    fn hostname(&self) -> &str;

    /// Send one command line and return the device's response text.
    fn run_command(&mut self, command: &str) -> impl Future<Output = Result<String>> + Send;

    /// Send configuration lines as one unit.
    ///
    /// Stops at the first line whose output matches `invalid` and reports
    /// it as [`PushOutcome::Rejected`]. Never retries.
    fn push_config(
        &mut self,
        lines: &[String],
        invalid: &Regex,
    ) -> impl Future<Output = Result<PushOutcome>> + Send;

    /// Close the session. Consumes it, so it cannot be used afterwards.
    fn close(self) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized;
}

/// Opens sessions for inventory entries.
pub trait SessionOpener: Send + Sync + 'static {
    type Session: DeviceSession + 'static;

    /// Connect, authenticate and learn the device hostname.
    fn open(
        &self,
        target: &DeviceTarget,
        platform: &PlatformDefinition,
    ) -> impl Future<Output = Result<Self::Session>> + Send;
}
