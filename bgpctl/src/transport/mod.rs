//! SSH transport on russh.
//!
//! Handshake, host key policy, password login and the PTY shell channel.
//! Nothing above [`crate::session`] touches this module.

pub mod config;
mod ssh;

pub use config::{HostKeyPolicy, HostKeyVerification, PtySize, SshConfig};
pub use ssh::SshTransport;
