//! SSH-backed device session.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};

use super::response::Response;
use super::{DeviceSession, PushOutcome, SessionOpener};
use crate::channel::PtyChannel;
use crate::error::{Result, SessionError};
use crate::fleet::DeviceTarget;
use crate::platform::{PlatformDefinition, PromptMode};
use crate::transport::{SshConfig, SshTransport};

/// Opens [`SshSession`]s.
#[derive(Debug, Clone)]
pub struct SshOpener {
    /// Timeout for connecting and for each prompt read.
    pub timeout: Duration,

    /// known_hosts file override.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshOpener {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            known_hosts_path: None,
        }
    }
}

impl Default for SshOpener {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl SessionOpener for SshOpener {
    type Session = SshSession;

    async fn open(&self, target: &DeviceTarget, platform: &PlatformDefinition) -> Result<SshSession> {
        let mut config = SshConfig::for_device(target, platform, self.timeout);
        if let Some(path) = &self.known_hosts_path {
            config = config.with_known_hosts(path.clone());
        }
        SshSession::open(&config, platform.clone(), target.enable_secret()).await
    }
}

/// Interactive CLI session over SSH.
pub struct SshSession {
    transport: Option<SshTransport>,
    channel: Option<PtyChannel>,
    platform: PlatformDefinition,
    host: String,
    hostname: String,
    prompt: String,
}

impl SshSession {
    /// Connect, log in and get the CLI ready for commands.
    pub async fn open(
        config: &SshConfig,
        platform: PlatformDefinition,
        enable_secret: &SecretString,
    ) -> Result<Self> {
        let transport = SshTransport::connect(config).await?;
        let channel = PtyChannel::new(transport.open_shell().await?, config.timeout);

        let mut session = Self {
            transport: Some(transport),
            channel: Some(channel),
            platform,
            host: config.host.clone(),
            hostname: String::new(),
            prompt: String::new(),
        };

        // A device that logs in but never gets usable is still disconnected
        match session.prepare(enable_secret).await {
            Ok(()) => Ok(session),
            Err(e) => {
                if let Err(close_error) = session.close().await {
                    debug!("{}: close after failed open: {}", config.host, close_error);
                }
                Err(e)
            }
        }
    }

    /// Reach privileged mode, run the on-open commands and learn the
    /// hostname from the prompt.
    async fn prepare(&mut self, enable_secret: &SecretString) -> Result<()> {
        // Nudge the device so the first prompt shows up after any banner
        self.channel_mut()?.send("").await?;
        self.read_prompt().await?;

        if self.platform.mode_of(&self.prompt) == PromptMode::Exec {
            self.enable(enable_secret).await?;
        }

        for command in self.platform.on_open_commands.clone() {
            self.send_command(&command).await?;
        }

        self.hostname = self.platform.hostname_of(&self.prompt);
        debug!("{}: session open, hostname '{}'", self.host, self.hostname);
        Ok(())
    }

    fn channel_mut(&mut self) -> Result<&mut PtyChannel> {
        Ok(self.channel.as_mut().ok_or(SessionError::Closed)?)
    }

    /// Read until the family prompt and remember it.
    async fn read_prompt(&mut self) -> Result<String> {
        let pattern = self.platform.prompt_pattern.clone();
        self.read_until(&pattern).await
    }

    async fn read_until(&mut self, pattern: &Regex) -> Result<String> {
        let channel = self.channel_mut()?;
        let timeout = channel.timeout();
        let data = channel.read_until_pattern(pattern, timeout).await?;

        let line_start = memchr::memrchr(b'\n', &data).map_or(0, |pos| pos + 1);
        self.prompt = String::from_utf8_lossy(&data[line_start..]).trim().to_string();

        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Send a command and wait for the prompt.
    pub async fn send_command(&mut self, command: &str) -> Result<Response> {
        let start = Instant::now();
        self.channel_mut()?.send(command).await?;
        let raw = self.read_prompt().await?;
        let response = Response::from_raw(command, raw, self.prompt.clone(), start.elapsed());
        trace!(
            "{}: '{}' answered in {:?} at '{}'",
            self.host, response.command, response.elapsed, response.prompt
        );
        Ok(response)
    }

    /// Move from EXEC to privileged EXEC.
    async fn enable(&mut self, secret: &SecretString) -> Result<()> {
        let enable_command = self.platform.enable_command.clone();
        let auth_or_prompt = Regex::new(&format!(
            "(?:{})|(?:{})",
            self.platform.enable_auth_pattern.as_str(),
            self.platform.prompt_pattern.as_str()
        ))
        .map_err(|_| SessionError::ModeChangeFailed {
            mode: PromptMode::Privileged.as_str(),
            prompt: self.prompt.clone(),
        })?;

        self.channel_mut()?.send(&enable_command).await?;
        let output = self.read_until(&auth_or_prompt).await?;

        if self
            .platform
            .enable_auth_pattern
            .is_match(output.trim_end().as_bytes())
        {
            self.channel_mut()?.send(secret.expose_secret()).await?;
            self.read_prompt().await?;
        }

        self.expect_mode(PromptMode::Privileged)
    }

    fn expect_mode(&self, mode: PromptMode) -> Result<()> {
        if self.platform.mode_of(&self.prompt) == mode {
            Ok(())
        } else {
            Err(SessionError::ModeChangeFailed {
                mode: mode.as_str(),
                prompt: self.prompt.clone(),
            }
            .into())
        }
    }
}

impl DeviceSession for SshSession {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    async fn run_command(&mut self, command: &str) -> Result<String> {
        Ok(self.send_command(command).await?.result)
    }

    async fn push_config(&mut self, lines: &[String], invalid: &Regex) -> Result<PushOutcome> {
        let config_enter = self.platform.config_enter.clone();
        let config_exit = self.platform.config_exit.clone();

        self.send_command(&config_enter).await?;
        self.expect_mode(PromptMode::Configuration)?;

        let mut outcome = PushOutcome::Accepted;
        for line in lines {
            let response = self.send_command(line).await?;
            if invalid.is_match(response.raw_result.as_bytes()) {
                debug!("{}: '{}' rejected", self.host, line);
                outcome = PushOutcome::Rejected {
                    command: line.clone(),
                    output: response.result,
                };
                break;
            }
        }

        // Always leave configuration mode, even after a rejection
        self.send_command(&config_exit).await?;
        self.expect_mode(PromptMode::Privileged)?;

        Ok(outcome)
    }

    async fn close(mut self) -> Result<()> {
        let channel = self.channel.take();
        let transport = self.transport.take();

        if let Some(channel) = channel {
            if let Err(e) = channel.close().await {
                debug!("{}: channel close: {}", self.host, e);
            }
        }
        if let Some(transport) = transport {
            transport.close().await?;
        }
        debug!("{}: session closed", self.host);
        Ok(())
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if self.transport.is_some() {
            warn!("{}: session dropped without close, connection released", self.host);
        }
    }
}
