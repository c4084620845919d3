//! # bgpctl
//!
//! Push BGP configuration to a fleet of routers over SSH and verify that
//! peering comes up.
//!
//! For every device in the inventory the runner validates the management
//! address, probes it, opens a CLI session, pushes the router's BGP policy,
//! polls the neighbor until it is Established (or a timeout passes), then
//! harvests the neighbor table and BGP routes and saves the running
//! configuration. Devices run concurrently on a bounded worker pool and fail
//! independently of each other.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgpctl::{FleetReport, FleetRunner, Inventory, PolicyDocument};
//! use bgpctl::net::TcpProber;
//! use bgpctl::session::SshOpener;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bgpctl::Error> {
//!     let inventory = Inventory::load("sshInfo.json")?;
//!     let policy = PolicyDocument::load("bgp.conf")?;
//!
//!     let opener = SshOpener::new(policy.settings.command_timeout());
//!     let prober = TcpProber::new(22, policy.settings.probe_timeout());
//!     let runner = FleetRunner::new(opener, prober, policy.store, policy.settings);
//!
//!     let report = FleetReport::new(runner.run(inventory).await);
//!     print!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod bgp;
pub mod channel;
pub mod error;
pub mod fleet;
pub mod net;
pub mod platform;
pub mod session;
pub mod settings;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use bgp::{BgpPolicy, PeeringState, PolicyDocument, PolicyStore};
pub use error::{Error, Result, Warning, WorkflowError};
pub use fleet::{DeviceTarget, FleetReport, FleetRunner, Inventory, RunResult};
pub use platform::{DeviceFamily, PlatformDefinition};
pub use settings::RunSettings;
