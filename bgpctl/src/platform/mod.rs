//! Device-family profiles.
//!
//! A profile tells the session how to recognise prompts and enter
//! configuration mode, and tells the orchestrator which error marker and
//! route filter the family uses.

mod definition;
pub mod vendors;

pub use definition::{PlatformDefinition, PromptMode};

/// Device families with a built-in profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFamily {
    CiscoIosXe,
    AristaEos,
}

impl DeviceFamily {
    /// Resolve an inventory hint such as `cisco_ios` or `arista_eos`.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_ascii_lowercase().as_str() {
            "cisco_ios" | "cisco_xe" | "cisco_iosxe" | "cisco_ios_ssh" | "ios" => {
                Some(DeviceFamily::CiscoIosXe)
            }
            "arista_eos" | "eos" => Some(DeviceFamily::AristaEos),
            _ => None,
        }
    }

    pub fn platform(&self) -> PlatformDefinition {
        match self {
            DeviceFamily::CiscoIosXe => vendors::cisco_iosxe::platform(),
            DeviceFamily::AristaEos => vendors::arista_eos::platform(),
        }
    }
}
