//! Login settings for one device.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::fleet::DeviceTarget;
use crate::platform::PlatformDefinition;

/// How an unrecognised or changed host key is treated, in the spirit of
/// OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyVerification {
    /// Only hosts already in known_hosts are accepted.
    Strict,

    /// Unknown hosts are learned on first contact; changed keys are refused.
    #[default]
    AcceptNew,

    /// Any key is accepted. Lab devices only.
    Disabled,
}

/// Host key mode plus the known_hosts file it checks against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostKeyPolicy {
    pub mode: HostKeyVerification,
    /// `None` means the user's default known_hosts.
    pub known_hosts: Option<PathBuf>,
}

/// Pseudo-terminal dimensions requested for the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtySize {
    pub width: u32,
    pub height: u32,
}

/// Everything needed to log in to one device and get a shell.
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Bounds the TCP/SSH handshake and every prompt read.
    pub timeout: Duration,
    pub pty: PtySize,
    pub host_keys: HostKeyPolicy,
}

impl SshConfig {
    /// Settings for an inventory entry, using the family's terminal size.
    pub fn for_device(
        target: &DeviceTarget,
        platform: &PlatformDefinition,
        timeout: Duration,
    ) -> Self {
        Self {
            host: target.host.clone(),
            port: target.port,
            username: target.username.clone(),
            password: SecretString::from(target.password.expose_secret().to_owned()),
            timeout,
            pty: PtySize {
                width: platform.terminal_width,
                height: platform.terminal_height,
            },
            host_keys: HostKeyPolicy {
                mode: target.host_key_verification,
                known_hosts: None,
            },
        }
    }

    /// Check host keys against this file instead of the user's default.
    pub fn with_known_hosts(mut self, path: impl Into<PathBuf>) -> Self {
        self.host_keys.known_hosts = Some(path.into());
        self
    }

    /// `host:port`, for logs.
    pub fn peer(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for SshConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshConfig")
            .field("peer", &self.peer())
            .field("username", &self.username)
            .field("timeout", &self.timeout)
            .field("pty", &self.pty)
            .field("host_keys", &self.host_keys)
            .finish_non_exhaustive()
    }
}
