//! Concurrent per-device workflow runner.
//!
//! Every inventory entry gets its own task. A semaphore bounds how many run
//! at once, and each task turns whatever goes wrong into that device's
//! [`RunResult`], so one device can never take another down with it.

use std::future::pending;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{Semaphore, watch};
use tokio::time::{Instant, sleep_until};

use super::inventory::{DeviceTarget, Inventory};
use crate::bgp::{BgpOrchestrator, BgpPolicy, BgpReport, NeighborRow, PeeringState, PingCheck, PolicyStore};
use crate::error::{Warning, WorkflowError};
use crate::net::{Prober, check_reachability, validate_ip};
use crate::session::{DeviceSession, SessionOpener};
use crate::settings::RunSettings;

/// Outcome of one device's workflow.
#[derive(Debug)]
pub struct RunResult {
    /// Inventory address.
    pub address: String,
    pub address_valid: bool,
    /// `None` when the device never got as far as the probe.
    pub reachable: Option<bool>,
    /// Prompt-derived hostname, once a session was open.
    pub hostname: Option<String>,
    pub peering: PeeringState,
    /// Policy entry with the observed neighbor state filled in.
    pub policy: Option<BgpPolicy>,
    pub neighbors: Vec<NeighborRow>,
    pub routes: Vec<String>,
    pub config_path: Option<PathBuf>,
    pub pings: Vec<PingCheck>,
    pub warnings: Vec<Warning>,
    pub failure: Option<WorkflowError>,
}

impl RunResult {
    fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            address_valid: false,
            reachable: None,
            hostname: None,
            peering: PeeringState::Unknown,
            policy: None,
            neighbors: vec![],
            routes: vec![],
            config_path: None,
            pings: vec![],
            warnings: vec![],
            failure: None,
        }
    }

    fn absorb(&mut self, report: BgpReport) {
        self.hostname = Some(report.hostname);
        self.peering = report.peering;
        self.policy = report.policy;
        self.neighbors = report.neighbors;
        self.routes = report.routes;
        self.config_path = report.config_path;
        self.pings = report.pings;
        self.warnings.extend(report.warnings);
    }

    /// `true` if the workflow reached Verified.
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }
}

struct Shared<O, P> {
    opener: O,
    prober: P,
    store: PolicyStore,
    settings: RunSettings,
}

/// Fans the BGP workflow out over an inventory.
///
/// The policy store is loaded once and only ever read; each worker takes its
/// own copy of its router's entry.
pub struct FleetRunner<O, P> {
    shared: Arc<Shared<O, P>>,
}

impl<O: SessionOpener, P: Prober> FleetRunner<O, P> {
    pub fn new(opener: O, prober: P, store: PolicyStore, settings: RunSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                opener,
                prober,
                store,
                settings,
            }),
        }
    }

    /// Run every device. Results come back in inventory order.
    pub async fn run(&self, inventory: Inventory) -> Vec<RunResult> {
        let (_cancel, signal) = watch::channel(false);
        self.run_until(inventory, signal).await
    }

    /// Like [`run`](Self::run), but devices still in flight when `cancel`
    /// turns `true` are stopped and reported as cancelled.
    ///
    /// The run deadline from the settings applies as well.
    pub async fn run_until(
        &self,
        inventory: Inventory,
        cancel: watch::Receiver<bool>,
    ) -> Vec<RunResult> {
        let workers = self.shared.settings.worker_count();
        let deadline = self
            .shared
            .settings
            .run_deadline()
            .map(|limit| Instant::now() + limit);
        let semaphore = Arc::new(Semaphore::new(workers));
        info!(
            "Running {} device(s) on {} worker(s)",
            inventory.len(),
            workers
        );

        let mut handles = Vec::with_capacity(inventory.len());
        for target in inventory.devices {
            let address = target.host.clone();
            let shared = self.shared.clone();
            let semaphore = semaphore.clone();
            let mut cancel = cancel.clone();

            let handle = tokio::spawn(async move {
                let mut result = RunResult::new(&target.host);
                let outcome = tokio::select! {
                    outcome = async {
                        let _permit = semaphore
                            .acquire()
                            .await
                            .map_err(|e| WorkflowError::Aborted(e.to_string()))?;
                        run_device(&shared, &target, &mut result).await
                    } => outcome,
                    _ = cancelled(&mut cancel) => Err(WorkflowError::Cancelled),
                    _ = expired(deadline) => Err(WorkflowError::Cancelled),
                };
                if let Err(e) = outcome {
                    warn!("{}: {}", target.host, e);
                    result.failure = Some(e);
                }
                result
            });
            handles.push((address, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (address, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!("{}: worker died: {}", address, e);
                    let mut result = RunResult::new(&address);
                    result.failure = Some(WorkflowError::Aborted(e.to_string()));
                    result
                }
            };
            results.push(result);
        }
        results
    }
}

/// validate -> probe -> open -> orchestrate -> close.
///
/// Facts are written into `result` as soon as they are known, so a cancelled
/// device still reports how far it got.
async fn run_device<O: SessionOpener, P: Prober>(
    shared: &Shared<O, P>,
    target: &DeviceTarget,
    result: &mut RunResult,
) -> Result<(), WorkflowError> {
    let host = target.host.as_str();

    if !validate_ip(host) {
        return Err(WorkflowError::InvalidAddress {
            address: host.to_string(),
        });
    }
    result.address_valid = true;
    info!("IP {} is valid", host);

    let family = target
        .family()
        .ok_or_else(|| WorkflowError::UnsupportedFamily {
            hint: target.device_type.clone(),
        })?;

    let reachable = check_reachability(&shared.prober, &[host])
        .await
        .get(host)
        .copied()
        .unwrap_or(false);
    result.reachable = Some(reachable);
    if !reachable {
        return Err(WorkflowError::Unreachable {
            address: host.to_string(),
        });
    }
    info!("IP {} is reachable", host);

    let platform = family.platform();
    let mut session = shared.opener.open(target, &platform).await?;
    result.hostname = Some(session.hostname().to_string());
    debug!("{}: session open as {}", host, session.hostname());

    let mut orchestrator = BgpOrchestrator::new(
        &mut session,
        &platform,
        &shared.store,
        shared.settings.poll(),
        &shared.settings.output_dir,
    );
    let outcome = orchestrator.run().await;
    result.absorb(orchestrator.into_report());

    if let Err(e) = session.close().await {
        warn!("{}: failed to close session: {}", host, e);
        result.warnings.push(Warning::CloseFailed {
            reason: e.to_string(),
        });
    }

    outcome
}

/// Resolves once the signal is raised. A dropped sender never cancels.
async fn cancelled(signal: &mut watch::Receiver<bool>) {
    if signal.wait_for(|cancelled| *cancelled).await.is_err() {
        pending::<()>().await;
    }
}

async fn expired(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => pending::<()>().await,
    }
}
