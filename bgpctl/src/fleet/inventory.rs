//! Device inventory.

use std::fmt;
use std::fs;
use std::path::Path;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::error::{ConfigError, Result};
use crate::platform::DeviceFamily;
use crate::transport::HostKeyVerification;

/// One managed device: where it is, how to log in, what dialect it speaks.
#[derive(Deserialize)]
pub struct DeviceTarget {
    /// Management address.
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: String,

    #[serde(deserialize_with = "secret")]
    pub password: SecretString,

    /// Enable password, when it differs from the login password.
    #[serde(default, deserialize_with = "optional_secret")]
    pub secret: Option<SecretString>,

    /// Device-family hint, e.g. `cisco_ios`.
    #[serde(default = "default_device_type")]
    pub device_type: String,

    #[serde(default)]
    pub host_key_verification: HostKeyVerification,
}

impl DeviceTarget {
    /// Build a target with password login and default settings.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            username: username.into(),
            password: SecretString::from(password.into()),
            secret: None,
            device_type: default_device_type(),
            host_key_verification: HostKeyVerification::default(),
        }
    }

    /// Set the device-family hint.
    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = device_type.into();
        self
    }

    /// Resolve the family hint.
    pub fn family(&self) -> Option<DeviceFamily> {
        DeviceFamily::from_hint(&self.device_type)
    }

    /// Password used to answer the enable prompt.
    pub fn enable_secret(&self) -> &SecretString {
        self.secret.as_ref().unwrap_or(&self.password)
    }
}

impl fmt::Debug for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("device_type", &self.device_type)
            .finish_non_exhaustive()
    }
}

fn default_port() -> u16 {
    22
}

fn default_device_type() -> String {
    "cisco_ios".to_string()
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

fn optional_secret<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InventoryDocument {
    List(Vec<DeviceTarget>),
    Wrapped { devices: Vec<DeviceTarget> },
}

/// Ordered list of devices to work on.
#[derive(Debug, Default)]
pub struct Inventory {
    pub devices: Vec<DeviceTarget>,
}

impl Inventory {
    pub fn new(devices: Vec<DeviceTarget>) -> Self {
        Self { devices }
    }

    /// Parse an inventory document.
    ///
    /// Accepts a bare array of device descriptors or `{"devices": [...]}`.
    pub fn from_json(path: &Path, text: &str) -> Result<Self> {
        let document: InventoryDocument =
            serde_json::from_str(text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let devices = match document {
            InventoryDocument::List(devices) => devices,
            InventoryDocument::Wrapped { devices } => devices,
        };
        Ok(Self { devices })
    }

    /// Load an inventory file.
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

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
