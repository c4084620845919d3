//! Scripted stand-ins for devices, used by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use regex::bytes::Regex;

use crate::bgp::{PolicyDocument, PolicyStore};
use crate::error::{ChannelError, Result, TransportError};
use crate::fleet::DeviceTarget;
use crate::net::Prober;
use crate::platform::PlatformDefinition;
use crate::session::{DeviceSession, PushOutcome, SessionOpener};

/// Two-router lab: r1 (AS 65001) peers with r2 (AS 65002).
pub const LAB_POLICY: &str = r#"{
    "routers": {
        "r1": {
            "local_asn": 65001,
            "neighbor_ip": "10.0.0.2",
            "neighbor_remote_as": 65002,
            "network_list_to_advertise": ["10.0.0.0"]
        },
        "r2": {
            "local_asn": 65002,
            "neighbor_ip": "10.0.0.1",
            "neighbor_remote_as": 65001,
            "network_list_to_advertise": ["20.20.20.1"]
        },
        "r3": {
            "local_asn": 65003,
            "neighbor_ip": "10.0.1.1",
            "neighbor_remote_as": 65001,
            "network_list_to_advertise": []
        }
    }
}"#;

pub fn lab_store() -> PolicyStore {
    PolicyDocument::from_json(Path::new("bgp.conf"), LAB_POLICY)
        .unwrap()
        .store
}

/// Counters shared between an opener and the sessions it hands out.
#[derive(Debug, Default)]
pub struct Tally {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub dropped: AtomicUsize,
}

/// A device that answers from a script.
///
/// State queries are answered from a queue; the last entry repeats once the
/// queue is down to one. Every other command gets a canned lab answer.
pub struct ScriptedSession {
    hostname: String,
    states: VecDeque<String>,
    /// Device output per configuration line; unlisted lines print nothing.
    answers: HashMap<String, String>,
    ping: String,
    delay: Option<Duration>,
    broken_after: Option<usize>,
    panic_on_command: bool,
    commands: Vec<String>,
    pushed: Vec<Vec<String>>,
    tally: Option<Arc<Tally>>,
}

impl ScriptedSession {
    pub const RUNNING_CONFIG: &'static str = "hostname R1\n!\nrouter bgp 65001\n end";

    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            states: VecDeque::new(),
            answers: HashMap::new(),
            ping: "Success rate is 100 percent (5/5), round-trip min/avg/max = 1/1/2 ms".to_string(),
            delay: None,
            broken_after: None,
            panic_on_command: false,
            commands: vec![],
            pushed: vec![],
            tally: None,
        }
    }

    pub fn with_states(mut self, states: Vec<String>) -> Self {
        self.states = states.into();
        self
    }

    /// The device prints `output` after this configuration line.
    pub fn answering(mut self, line: &str, output: &str) -> Self {
        self.answers.insert(line.to_string(), output.to_string());
        self
    }

    /// The device flags this configuration line as invalid input.
    pub fn rejecting(self, line: &str) -> Self {
        self.answering(line, "% Invalid input detected at '^' marker.")
    }

    pub fn with_ping(mut self, summary: &str) -> Self {
        self.ping = summary.to_string();
        self
    }

    /// Every command takes this long.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every command after `n` have succeeded.
    pub fn broken_after(mut self, n: usize) -> Self {
        self.broken_after = Some(n);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_command = true;
        self
    }

    pub fn pushed(&self) -> &[Vec<String>] {
        &self.pushed
    }

    pub fn state_queries(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| c.contains("| include BGP state"))
            .count()
    }

    fn next_state(&mut self) -> String {
        if self.states.len() > 1 {
            self.states.pop_front().unwrap_or_default()
        } else {
            self.states.front().cloned().unwrap_or_default()
        }
    }

    fn answer(&mut self, command: &str) -> String {
        if command.contains("| include BGP state") {
            self.next_state()
        } else if command.contains("| include BGP neighbor is") {
            "BGP neighbor is 10.0.0.2,  remote AS 65002, external link".to_string()
        } else if command.starts_with("show ip route bgp") {
            "B        20.20.20.1 [20/0] via 10.0.0.2, 00:00:31".to_string()
        } else if command == "show running-config" {
            Self::RUNNING_CONFIG.to_string()
        } else if let Some(target) = command.strip_prefix("ping ") {
            format!(
                "Type escape sequence to abort.\nSending 5, 100-byte ICMP Echos to {}, timeout is 2 seconds:\n!!!!!\n{}",
                target, self.ping
            )
        } else {
            String::new()
        }
    }
}

impl DeviceSession for ScriptedSession {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    async fn run_command(&mut self, command: &str) -> Result<String> {
        if self.panic_on_command {
            panic!("scripted device blew up on '{}'", command);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.broken_after.is_some_and(|n| self.commands.len() >= n) {
            return Err(ChannelError::Closed.into());
        }
        self.commands.push(command.to_string());
        Ok(self.answer(command))
    }

    async fn push_config(&mut self, lines: &[String], invalid: &Regex) -> Result<PushOutcome> {
        self.pushed.push(lines.to_vec());
        for line in lines {
            let output = self.answers.get(line).cloned().unwrap_or_default();
            if invalid.is_match(output.as_bytes()) {
                return Ok(PushOutcome::Rejected {
                    command: line.clone(),
                    output,
                });
            }
        }
        Ok(PushOutcome::Accepted)
    }

    async fn close(mut self) -> Result<()> {
        if let Some(tally) = self.tally.take() {
            tally.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        if let Some(tally) = &self.tally {
            tally.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Hands out pre-built sessions keyed by device address.
#[derive(Default)]
pub struct ScriptedOpener {
    sessions: Mutex<HashMap<String, ScriptedSession>>,
    refuse: HashSet<String>,
    pub tally: Arc<Tally>,
}

impl ScriptedOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(self, host: &str, mut session: ScriptedSession) -> Self {
        session.tally = Some(self.tally.clone());
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(host.to_string(), session);
        }
        self
    }

    /// Connection attempts to `host` fail.
    pub fn refusing(mut self, host: &str) -> Self {
        self.refuse.insert(host.to_string());
        self
    }
}

impl SessionOpener for ScriptedOpener {
    type Session = ScriptedSession;

    async fn open(&self, target: &DeviceTarget, _platform: &PlatformDefinition) -> Result<ScriptedSession> {
        if self.refuse.contains(&target.host) {
            return Err(TransportError::AuthenticationFailed {
                user: target.username.clone(),
            }
            .into());
        }
        let session = self
            .sessions
            .lock()
            .ok()
            .and_then(|mut sessions| sessions.remove(&target.host))
            .ok_or(ChannelError::Closed)?;
        self.tally.opened.fetch_add(1, Ordering::SeqCst);
        Ok(session)
    }
}

/// Everything answers except the listed addresses.
#[derive(Default)]
pub struct ScriptedProber {
    down: HashSet<IpAddr>,
}

impl ScriptedProber {
    pub fn down(mut self, host: &str) -> Self {
        if let Ok(addr) = host.parse() {
            self.down.insert(addr);
        }
        self
    }
}

impl Prober for ScriptedProber {
    async fn probe(&self, addr: IpAddr) -> bool {
        !self.down.contains(&addr)
    }
}
