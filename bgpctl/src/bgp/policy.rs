//! BGP policy store.
//!
//! ```json
//! {
//!   "routers": {
//!     "r1": {
//!       "local_asn": 65001,
//!       "neighbor_ip": "10.0.0.2",
//!       "neighbor_remote_as": 65002,
//!       "network_list_to_advertise": ["10.10.10.1"]
//!     }
//!   },
//!   "settings": { "poll_timeout_secs": 20 }
//! }
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::net::parse_ipv4;
use crate::settings::RunSettings;

/// Protocol intent for one router.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BgpPolicy {
    pub local_asn: u32,
    pub neighbor_ip: String,
    pub neighbor_remote_as: u32,
    #[serde(default)]
    pub network_list_to_advertise: Vec<String>,

    /// Addresses to ping after verification. Derived from the peer's
    /// advertised networks when absent.
    #[serde(default)]
    pub ping_targets: Option<Vec<String>>,

    /// Peering state observed after verification. Only ever set on the
    /// worker's own copy of the entry.
    #[serde(skip)]
    pub neighbor_state: Option<String>,
}

impl BgpPolicy {
    fn check(&self, hostname: &str) -> Result<()> {
        let addresses = std::iter::once(&self.neighbor_ip)
            .chain(&self.network_list_to_advertise)
            .chain(self.ping_targets.iter().flatten());

        for address in addresses {
            if parse_ipv4(address).is_none() {
                return Err(ConfigError::Invalid {
                    message: format!("router '{}': '{}' is not an IPv4 address", hostname, address),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Immutable hostname → policy map with case-insensitive lookup.
#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    routers: IndexMap<String, BgpPolicy>,
}

impl PolicyStore {
    /// Build a store, normalizing hostnames to lowercase.
    pub fn new(routers: IndexMap<String, BgpPolicy>) -> Result<Self> {
        let mut normalized = IndexMap::with_capacity(routers.len());
        for (hostname, policy) in routers {
            policy.check(&hostname)?;
            let key = hostname.to_lowercase();
            if normalized.insert(key, policy).is_some() {
                return Err(ConfigError::Invalid {
                    message: format!("router '{}' is listed twice", hostname),
                }
                .into());
            }
        }
        Ok(Self { routers: normalized })
    }

    /// Look up the policy for a device hostname.
    pub fn resolve(&self, hostname: &str) -> Option<&BgpPolicy> {
        self.routers.get(&hostname.to_lowercase())
    }

    /// Addresses a router should be able to ping once peering is up.
    ///
    /// An explicit `ping_targets` list wins. Otherwise the targets are the
    /// advertised networks of every router whose local AS is this router's
    /// remote AS.
    pub fn peer_targets(&self, hostname: &str) -> Vec<String> {
        let Some(policy) = self.resolve(hostname) else {
            return vec![];
        };
        if let Some(targets) = &policy.ping_targets {
            return targets.clone();
        }

        let own = hostname.to_lowercase();
        self.routers
            .iter()
            .filter(|(name, peer)| **name != own && peer.local_asn == policy.neighbor_remote_as)
            .flat_map(|(_, peer)| peer.network_list_to_advertise.iter().cloned())
            .collect()
    }

    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.routers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routers.is_empty()
    }
}

#[derive(Deserialize)]
struct RawPolicyDocument {
    routers: IndexMap<String, BgpPolicy>,
    #[serde(default)]
    settings: RunSettings,
}

/// The parsed policy document: the store plus run settings.
#[derive(Debug)]
pub struct PolicyDocument {
    pub store: PolicyStore,
    pub settings: RunSettings,
}

impl PolicyDocument {
    /// Parse a policy document.
    pub fn from_json(path: &Path, text: &str) -> Result<Self> {
        let raw: RawPolicyDocument =
            serde_json::from_str(text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            store: PolicyStore::new(raw.routers)?,
            settings: raw.settings,
        })
    }

    /// Load the policy file. A missing file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &text)
    }
}
