//! BGP configuration and verification.
//!
//! - [`policy`]: the per-router intent loaded from the policy store
//! - [`commands`]: CLI text for pushing and querying
//! - [`parse`]: fact extraction from free-text output
//! - [`orchestrator`]: the per-device state machine

pub mod commands;
pub mod orchestrator;
pub mod parse;
pub mod policy;

pub use orchestrator::{BgpOrchestrator, BgpReport, PingCheck, WorkflowState};
pub use parse::{NeighborRow, PeeringState, PingSummary};
pub use policy::{BgpPolicy, PolicyDocument, PolicyStore};
