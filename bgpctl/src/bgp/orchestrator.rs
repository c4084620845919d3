//! Per-device BGP workflow.
//!
//! ```text
//! Init ──► Validated ──► Configured ──► Polling ──► Verified
//!   │          │             │          │   ▲
//!   │          │             │          └───┘ not yet, sleep one interval
//!   └──────────┴─────────────┴──────────────────► Failed(reason)
//! ```
//!
//! The orchestrator borrows the session for the whole run, so no other
//! workflow can touch the device while it is in flight.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, trace, warn};
use tokio::time::{Instant, sleep_until, timeout_at};

use super::commands;
use super::parse::{NeighborRow, PeeringState, parse_neighbor_rows, parse_peering_state, parse_ping, route_lines, state_token};
use super::policy::{BgpPolicy, PolicyStore};
use crate::error::{Warning, WorkflowError};
use crate::platform::PlatformDefinition;
use crate::session::{DeviceSession, PushOutcome};
use crate::settings::PollSettings;

/// Where the workflow is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Init,
    Validated,
    Configured,
    Polling,
    Verified,
    Failed(&'static str),
}

/// Result of one post-check ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingCheck {
    pub target: String,
    pub header: String,
    pub summary: String,
    pub success_percent: Option<u8>,
}

impl PingCheck {
    pub fn succeeded(&self) -> bool {
        self.success_percent.is_some_and(|percent| percent > 0)
    }
}

/// Everything the workflow learned about the device, filled in as it goes.
#[derive(Debug, Clone)]
pub struct BgpReport {
    pub hostname: String,
    /// The device's policy entry, with `neighbor_state` set once verified.
    pub policy: Option<BgpPolicy>,
    pub peering: PeeringState,
    pub polls: u32,
    pub neighbors: Vec<NeighborRow>,
    pub routes: Vec<String>,
    pub config_path: Option<PathBuf>,
    pub pings: Vec<PingCheck>,
    pub warnings: Vec<Warning>,
}

impl BgpReport {
    fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            policy: None,
            peering: PeeringState::Unknown,
            polls: 0,
            neighbors: vec![],
            routes: vec![],
            config_path: None,
            pings: vec![],
            warnings: vec![],
        }
    }
}

/// Drives one device from policy lookup to verified peering.
pub struct BgpOrchestrator<'a, S: DeviceSession> {
    session: &'a mut S,
    platform: &'a PlatformDefinition,
    store: &'a PolicyStore,
    poll: PollSettings,
    output_dir: &'a Path,
    state: WorkflowState,
    report: BgpReport,
}

impl<'a, S: DeviceSession> BgpOrchestrator<'a, S> {
    pub fn new(
        session: &'a mut S,
        platform: &'a PlatformDefinition,
        store: &'a PolicyStore,
        poll: PollSettings,
        output_dir: &'a Path,
    ) -> Self {
        let report = BgpReport::new(session.hostname());
        Self {
            session,
            platform,
            store,
            poll,
            output_dir,
            state: WorkflowState::Init,
            report,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn report(&self) -> &BgpReport {
        &self.report
    }

    pub fn into_report(self) -> BgpReport {
        self.report
    }

    fn transition(&mut self, next: WorkflowState) {
        debug!("{}: {:?} -> {:?}", self.report.hostname, self.state, next);
        self.state = next;
    }

    /// Run the workflow to a terminal state.
    pub async fn run(&mut self) -> Result<(), WorkflowError> {
        let result = self.drive().await;
        if let Err(ref e) = result {
            self.transition(WorkflowState::Failed(e.kind()));
        }
        result
    }

    async fn drive(&mut self) -> Result<(), WorkflowError> {
        // Init -> Validated
        let hostname = self.report.hostname.clone();
        let mut policy = self
            .store
            .resolve(&hostname)
            .cloned()
            .ok_or_else(|| WorkflowError::PolicyNotFound {
                hostname: hostname.clone(),
            })?;
        self.transition(WorkflowState::Validated);

        // Validated -> Configured
        let lines = commands::config_lines(&policy);
        match self
            .session
            .push_config(&lines, &self.platform.config_error_pattern)
            .await?
        {
            PushOutcome::Accepted => {}
            PushOutcome::Rejected { command, output } => {
                warn!("Failed to configure bgp on router {}", hostname);
                return Err(WorkflowError::ConfigRejected { command, output });
            }
        }
        self.transition(WorkflowState::Configured);

        // Configured -> Polling -> Verified
        self.transition(WorkflowState::Polling);
        self.wait_for_established(&policy.neighbor_ip).await?;
        self.transition(WorkflowState::Verified);
        info!("{}: BGP established with {}", hostname, policy.neighbor_ip);

        let output = self
            .session
            .run_command(&commands::neighbor_state(&policy.neighbor_ip))
            .await?;
        let observed = state_token(&output)
            .map(str::to_string)
            .unwrap_or_else(|| self.report.peering.to_string());
        policy.neighbor_state = Some(observed.clone());
        self.report.policy = Some(policy);

        let output = self.session.run_command(commands::neighbor_table()).await?;
        self.report.neighbors = parse_neighbor_rows(&output, &observed);

        let output = self
            .session
            .run_command(&commands::bgp_routes(self.platform))
            .await?;
        self.report.routes = route_lines(&output);

        self.save_running_config().await;
        self.check_peer_reachability().await?;

        Ok(())
    }

    /// Poll the neighbor state at a fixed interval until it is Established
    /// or the timeout has elapsed.
    ///
    /// The timeout is a hard deadline: a query still outstanding when it
    /// passes is abandoned, so the loop never runs past `timeout + interval`.
    async fn wait_for_established(&mut self, neighbor_ip: &str) -> Result<(), WorkflowError> {
        let command = commands::neighbor_state(neighbor_ip);
        let start = Instant::now();
        let deadline = start + self.poll.timeout;

        while Instant::now() < deadline {
            let output = match timeout_at(deadline, self.session.run_command(&command)).await {
                Ok(output) => output?,
                Err(_) => {
                    debug!("{}: poll cut off at the deadline", self.report.hostname);
                    break;
                }
            };
            self.report.polls += 1;

            let state = parse_peering_state(&output);
            trace!(
                "{}: poll {} state {}",
                self.report.hostname, self.report.polls, state
            );
            let established = state.is_established();
            self.report.peering = state;
            if established {
                return Ok(());
            }

            sleep_until((Instant::now() + self.poll.interval).min(deadline)).await;
        }

        warn!(
            "{}: BGP was never established with {}",
            self.report.hostname, neighbor_ip
        );
        Err(WorkflowError::Timeout {
            elapsed: round_to_millis(start.elapsed()),
            polls: self.report.polls,
        })
    }

    /// Capture the running configuration into `<hostname>_config.txt`.
    ///
    /// Failures become warnings; the peering outcome stands.
    async fn save_running_config(&mut self) {
        let path = self.output_dir.join(config_file_name(&self.report.hostname));

        let result = match self.session.run_command(commands::running_config()).await {
            Ok(config) => tokio::fs::write(&path, config)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(()) => {
                info!("Saved running config to {}", path.display());
                self.report.config_path = Some(path);
            }
            Err(reason) => {
                warn!("{}: could not save running config: {}", self.report.hostname, reason);
                self.report
                    .warnings
                    .push(Warning::PersistFailure { path, reason });
            }
        }
    }

    /// Ping the peer's advertised addresses from the device.
    async fn check_peer_reachability(&mut self) -> Result<(), WorkflowError> {
        for target in self.store.peer_targets(&self.report.hostname) {
            let output = self.session.run_command(&commands::ping(&target)).await?;
            let ping = parse_ping(&output);
            let check = PingCheck {
                target,
                header: ping.header,
                summary: ping.summary,
                success_percent: ping.success_percent,
            };
            if !check.succeeded() {
                self.report.warnings.push(Warning::PingFailed {
                    target: check.target.clone(),
                    summary: check.summary.clone(),
                });
            }
            self.report.pings.push(check);
        }
        Ok(())
    }
}

/// `<hostname>_config.txt`, with anything that could act as a path
/// separator replaced so the file always lands in the output directory.
fn config_file_name(hostname: &str) -> String {
    let safe: String = hostname
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_config.txt", safe)
}

fn round_to_millis(elapsed: Duration) -> Duration {
    Duration::from_millis(elapsed.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::DeviceFamily;
    use crate::bgp::PolicyDocument;
    use crate::testing::{ScriptedSession, lab_store};

    fn established() -> String {
        "  BGP state = Established, up for 00:00:12".to_string()
    }

    fn active() -> String {
        "  BGP state = Active".to_string()
    }

    async fn run(
        session: &mut ScriptedSession,
        store: &PolicyStore,
        dir: &Path,
    ) -> (Result<(), WorkflowError>, WorkflowState, BgpReport) {
        run_on(DeviceFamily::CiscoIosXe, session, store, dir).await
    }

    async fn run_on(
        family: DeviceFamily,
        session: &mut ScriptedSession,
        store: &PolicyStore,
        dir: &Path,
    ) -> (Result<(), WorkflowError>, WorkflowState, BgpReport) {
        let platform = family.platform();
        let mut orchestrator =
            BgpOrchestrator::new(session, &platform, store, PollSettings::default(), dir);
        let result = orchestrator.run().await;
        let state = orchestrator.state().clone();
        (result, state, orchestrator.into_report())
    }

    #[tokio::test(start_paused = true)]
    async fn test_established_on_first_poll() {
        let dir = tempfile::tempdir().unwrap();
        let store = lab_store();
        let mut session = ScriptedSession::new("r1").with_states(vec![established()]);

        let (result, state, report) = run(&mut session, &store, dir.path()).await;

        tokio_test::assert_ok!(result);
        assert_eq!(state, WorkflowState::Verified);
        assert_eq!(report.peering, PeeringState::Established);
        assert_eq!(report.polls, 1);

        let pushed = session.pushed();
        assert_eq!(pushed.len(), 1);
        let networks: Vec<_> = pushed[0]
            .iter()
            .filter(|line| line.starts_with("network "))
            .collect();
        assert_eq!(networks, vec!["network 10.0.0.0 mask 255.255.255.255"]);

        let policy = report.policy.unwrap();
        assert_eq!(policy.neighbor_state.as_deref(), Some("Established"));
        assert_eq!(report.neighbors.len(), 1);
        assert_eq!(report.neighbors[0].address, "10.0.0.2");
        assert_eq!(report.neighbors[0].remote_as, "65002");
        assert_eq!(report.routes.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_config_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = lab_store();
        let mut session = ScriptedSession::new("r1").with_states(vec![established()]);

        let (_, _, report) = run(&mut session, &store, dir.path()).await;

        let path = report.config_path.unwrap();
        assert_eq!(path, dir.path().join("r1_config.txt"));
        let saved = std::fs::read_to_string(path).unwrap();
        assert_eq!(saved, ScriptedSession::RUNNING_CONFIG);
        assert!(report.warnings.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persist_failure_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let store = lab_store();
        let mut session = ScriptedSession::new("r1").with_states(vec![established()]);

        let (result, state, report) = run(&mut session, &store, &missing).await;

        assert!(result.is_ok());
        assert_eq!(state, WorkflowState::Verified);
        assert!(report.config_path.is_none());
        assert!(matches!(
            report.warnings.as_slice(),
            [Warning::PersistFailure { .. }]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_ten_polls() {
        let dir = tempfile::tempdir().unwrap();
        let store = lab_store();
        let mut session = ScriptedSession::new("r1").with_states(vec![active()]);
        let start = Instant::now();

        let (result, state, report) = run(&mut session, &store, dir.path()).await;

        match result {
            Err(WorkflowError::Timeout { polls, elapsed }) => {
                assert_eq!(polls, 10);
                assert_eq!(elapsed, Duration::from_secs(20));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(state, WorkflowState::Failed("Timeout"));
        assert_eq!(session.state_queries(), 10);
        assert_eq!(report.peering, PeeringState::NotEstablished("Active".to_string()));

        let poll = PollSettings::default();
        assert!(start.elapsed() <= poll.timeout + poll.interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_established_after_a_few_polls() {
        let dir = tempfile::tempdir().unwrap();
        let store = lab_store();
        let mut session =
            ScriptedSession::new("r1").with_states(vec![active(), "garbled".to_string(), established()]);

        let (result, _, report) = run(&mut session, &store, dir.path()).await;

        assert!(result.is_ok());
        assert_eq!(report.polls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_config_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let store = lab_store();
        let mut session = ScriptedSession::new("r1")
            .with_states(vec![established()])
            .rejecting("network 10.0.0.0 mask 255.255.255.255");

        let (result, state, report) = run(&mut session, &store, dir.path()).await;

        assert!(matches!(result, Err(WorkflowError::ConfigRejected { .. })));
        assert_eq!(state, WorkflowState::Failed("ConfigRejected"));
        assert_eq!(session.pushed().len(), 1);
        assert_eq!(session.state_queries(), 0);
        assert_eq!(report.polls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_policy_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = lab_store();
        let mut session = ScriptedSession::new("r9");

        let (result, state, _) = run(&mut session, &store, dir.path()).await;

        match result {
            Err(WorkflowError::PolicyNotFound { hostname }) => assert_eq!(hostname, "r9"),
            other => panic!("expected PolicyNotFound, got {:?}", other),
        }
        assert_eq!(state, WorkflowState::Failed("PolicyNotFound"));
        assert!(session.pushed().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rerun_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let store = lab_store();
        let mut session = ScriptedSession::new("r1").with_states(vec![established()]);

        let (first, first_state, _) = run(&mut session, &store, dir.path()).await;
        let (second, second_state, report) = run(&mut session, &store, dir.path()).await;

        assert!(first.is_ok() && second.is_ok());
        assert_eq!(first_state, WorkflowState::Verified);
        assert_eq!(second_state, WorkflowState::Verified);
        assert_eq!(report.peering, PeeringState::Established);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_io_during_polling() {
        let dir = tempfile::tempdir().unwrap();
        let store = lab_store();
        let mut session = ScriptedSession::new("r1").broken_after(0);

        let (result, state, _) = run(&mut session, &store, dir.path()).await;

        assert!(matches!(result, Err(WorkflowError::SessionIo(_))));
        assert_eq!(state, WorkflowState::Failed("SessionIO"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_post_check() {
        let dir = tempfile::tempdir().unwrap();
        let store = lab_store();
        let mut session = ScriptedSession::new("r1")
            .with_states(vec![established()])
            .with_ping("Success rate is 0 percent (0/5)");

        let (result, _, report) = run(&mut session, &store, dir.path()).await;

        assert!(result.is_ok());
        assert_eq!(report.pings.len(), 1);
        assert_eq!(report.pings[0].target, "20.20.20.1");
        assert!(!report.pings[0].succeeded());
        assert!(matches!(
            report.warnings.as_slice(),
            [Warning::PingFailed { .. }]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_device_still_bounded_by_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let store = lab_store();
        let mut session = ScriptedSession::new("r1")
            .with_states(vec![active()])
            .with_delay(Duration::from_secs(15));
        let start = Instant::now();

        let (result, state, report) = run(&mut session, &store, dir.path()).await;

        match result {
            Err(WorkflowError::Timeout { polls, elapsed }) => {
                assert_eq!(polls, 1);
                assert_eq!(elapsed, Duration::from_secs(20));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(state, WorkflowState::Failed("Timeout"));
        assert_eq!(report.polls, 1);
        assert_eq!(session.state_queries(), 1);

        let poll = PollSettings::default();
        assert!(start.elapsed() <= poll.timeout + poll.interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_harmless_config_output_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = lab_store();
        let mut session = ScriptedSession::new("r1")
            .with_states(vec![established()])
            .answering("neighbor 10.0.0.2 remote-as 65002", "% BGP neighbor already configured");

        let (result, state, _) = run(&mut session, &store, dir.path()).await;

        tokio_test::assert_ok!(result);
        assert_eq!(state, WorkflowState::Verified);
        assert_eq!(session.pushed().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_errors_follow_the_platform_pattern() {
        let line = "network 10.0.0.0 mask 255.255.255.255";

        let dir = tempfile::tempdir().unwrap();
        let store = lab_store();
        let mut cisco = ScriptedSession::new("r1")
            .with_states(vec![established()])
            .answering(line, "% Ambiguous command:");
        let (result, _, _) = run_on(DeviceFamily::CiscoIosXe, &mut cisco, &store, dir.path()).await;
        assert!(result.is_ok());

        let mut arista = ScriptedSession::new("r1")
            .with_states(vec![established()])
            .answering(line, "% Ambiguous command:");
        let (result, state, report) = run_on(DeviceFamily::AristaEos, &mut arista, &store, dir.path()).await;
        match result {
            Err(WorkflowError::ConfigRejected { command, .. }) => assert_eq!(command, line),
            other => panic!("expected ConfigRejected, got {:?}", other),
        }
        assert_eq!(state, WorkflowState::Failed("ConfigRejected"));
        assert_eq!(report.polls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_file_stays_in_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let policy = r#"{"routers": {"core/1": {
            "local_asn": 65001,
            "neighbor_ip": "10.0.0.2",
            "neighbor_remote_as": 65002,
            "network_list_to_advertise": []
        }}}"#;
        let store = PolicyDocument::from_json(Path::new("bgp.conf"), policy).unwrap().store;
        let mut session = ScriptedSession::new("core/1").with_states(vec![established()]);

        let (result, _, report) = run(&mut session, &store, dir.path()).await;

        assert!(result.is_ok());
        assert_eq!(report.config_path, Some(dir.path().join("core_1_config.txt")));
        assert!(dir.path().join("core_1_config.txt").is_file());
    }

    #[test]
    fn test_config_file_name() {
        assert_eq!(config_file_name("r1"), "r1_config.txt");
        assert_eq!(config_file_name("edge-1.lab"), "edge-1.lab_config.txt");
        assert_eq!(config_file_name("a/b"), "a_b_config.txt");
        let name = config_file_name("..\\..\\x");
        assert!(!name.contains('/') && !name.contains('\\'));
    }
}
