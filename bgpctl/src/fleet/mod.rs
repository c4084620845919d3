//! Inventory, fleet runner and run report.

mod inventory;
mod report;
mod runner;

pub use inventory::{DeviceTarget, Inventory};
pub use report::FleetReport;
pub use runner::{FleetRunner, RunResult};
