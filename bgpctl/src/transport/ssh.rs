//! russh client connection to one device.

use std::sync::{Arc, Mutex};

use log::{debug, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::{Channel, Disconnect};
use secrecy::{ExposeSecret, SecretString};

use super::config::{HostKeyPolicy, HostKeyVerification, PtySize, SshConfig};
use crate::error::{Result, TransportError};

/// An authenticated SSH connection.
pub struct SshTransport {
    handle: Handle<KeyCheck>,
    peer: String,
    pty: PtySize,
}

impl SshTransport {
    /// Connect, verify the host key and log in with the password.
    pub async fn connect(config: &SshConfig) -> Result<Self> {
        let client_config = Arc::new(client::Config {
            inactivity_timeout: None,
            keepalive_interval: Some(config.timeout / 2),
            ..Default::default()
        });

        let rejection = Arc::new(Mutex::new(None));
        let check = KeyCheck {
            host: config.host.clone(),
            port: config.port,
            policy: config.host_keys.clone(),
            rejection: rejection.clone(),
        };

        let peer = config.peer();
        debug!("{}: connecting", peer);

        let connecting = client::connect(client_config, (config.host.as_str(), config.port), check);
        let handle = match tokio::time::timeout(config.timeout, connecting).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                // russh only reports UnknownKey; the handler kept the real reason
                let reason = rejection.lock().ok().and_then(|mut slot| slot.take());
                return Err(reason.unwrap_or(TransportError::Ssh(e)).into());
            }
            Err(_) => return Err(TransportError::Timeout(config.timeout).into()),
        };

        let mut transport = Self {
            handle,
            peer,
            pty: config.pty,
        };
        transport.login(&config.username, &config.password).await?;
        Ok(transport)
    }

    async fn login(&mut self, username: &str, password: &SecretString) -> Result<()> {
        let auth = self
            .handle
            .authenticate_password(username, password.expose_secret())
            .await
            .map_err(TransportError::Ssh)?;

        if !auth.success() {
            return Err(TransportError::AuthenticationFailed {
                user: username.to_string(),
            }
            .into());
        }
        debug!("{}: logged in as {}", self.peer, username);
        Ok(())
    }

    /// Open a session channel with a PTY and an interactive shell.
    pub async fn open_shell(&self) -> Result<Channel<Msg>> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_pty(true, "vt100", self.pty.width, self.pty.height, 0, 0, &[])
            .await
            .map_err(TransportError::Ssh)?;
        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        Ok(channel)
    }

    /// Disconnect.
    pub async fn close(self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        debug!("{}: disconnected", self.peer);
        Ok(())
    }
}

/// Applies the host key policy during the handshake.
struct KeyCheck {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
    /// Why the key was refused, picked up by `connect`.
    rejection: Arc<Mutex<Option<TransportError>>>,
}

impl KeyCheck {
    fn verify(&self, key: &PublicKey) -> std::result::Result<(), TransportError> {
        if self.policy.mode == HostKeyVerification::Disabled {
            return Ok(());
        }

        let known = match &self.policy.known_hosts {
            Some(path) => russh::keys::check_known_hosts_path(&self.host, self.port, key, path),
            None => russh::keys::check_known_hosts(&self.host, self.port, key),
        };

        match known {
            Ok(true) => Ok(()),
            Ok(false) if self.policy.mode == HostKeyVerification::AcceptNew => {
                if let Err(e) = self.learn(key) {
                    warn!("{}: could not record host key: {}", self.host, e);
                }
                Ok(())
            }
            Ok(false) => Err(TransportError::HostKeyUnknown {
                host: self.host.clone(),
                port: self.port,
            }),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    fn learn(&self, key: &PublicKey) -> std::result::Result<(), russh::keys::Error> {
        use russh::keys::known_hosts::{learn_known_hosts, learn_known_hosts_path};

        match &self.policy.known_hosts {
            Some(path) => learn_known_hosts_path(&self.host, self.port, key, path),
            None => learn_known_hosts(&self.host, self.port, key),
        }
    }
}

impl client::Handler for KeyCheck {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.verify(server_public_key) {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("{}: host key refused: {}", self.host, e);
                if let Ok(mut slot) = self.rejection.lock() {
                    *slot = Some(e);
                }
                Ok(false)
            }
        }
    }
}
