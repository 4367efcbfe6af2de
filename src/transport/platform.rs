//! Vendor CLI dialects.
//!
//! A [`Platform`] knows how to wrap an ordered batch of configuration lines
//! so the device receives them in configuration mode: session preparation
//! (pager off), entering config mode, the batch itself, leaving config mode
//! and optionally saving.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a platform tag is not recognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown platform '{0}'. Valid options: cisco_nxos, cisco_ios, cisco_iosxr, arista_eos, juniper_junos, generic")]
pub struct UnknownPlatform(pub String);

/// Supported network operating systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Cisco NX-OS
    CiscoNxos,
    /// Cisco IOS/IOS-XE
    CiscoIos,
    /// Cisco IOS-XR
    CiscoIosXr,
    /// Arista EOS
    AristaEos,
    /// Juniper Junos
    JuniperJunos,
    /// Lines are sent exactly as given, with no framing
    Generic,
}

impl Platform {
    /// Commands that make the session script-friendly.
    pub fn session_preparation(&self) -> &'static [&'static str] {
        match self {
            Platform::CiscoNxos => &["terminal length 0", "terminal width 511"],
            Platform::CiscoIos | Platform::CiscoIosXr => &["terminal length 0", "terminal width 0"],
            Platform::AristaEos => &["terminal length 0", "terminal width 32767"],
            Platform::JuniperJunos => &["set cli screen-length 0", "set cli screen-width 0"],
            Platform::Generic => &[],
        }
    }

    /// Command that enters configuration mode.
    pub fn enter_config(&self) -> Option<&'static str> {
        match self {
            Platform::CiscoNxos
            | Platform::CiscoIos
            | Platform::CiscoIosXr
            | Platform::AristaEos => Some("configure terminal"),
            Platform::JuniperJunos => Some("configure"),
            Platform::Generic => None,
        }
    }

    /// Commands that apply the change and leave configuration mode.
    pub fn exit_config(&self) -> &'static [&'static str] {
        match self {
            Platform::CiscoNxos | Platform::CiscoIos | Platform::AristaEos => &["end"],
            Platform::CiscoIosXr => &["commit", "end"],
            Platform::JuniperJunos => &["commit and-quit"],
            Platform::Generic => &[],
        }
    }

    /// Command that persists the running configuration, if the platform
    /// needs one.
    pub fn save_config(&self) -> Option<&'static str> {
        match self {
            Platform::CiscoNxos => Some("copy running-config startup-config"),
            Platform::CiscoIos | Platform::AristaEos => Some("write memory"),
            Platform::CiscoIosXr | Platform::JuniperJunos | Platform::Generic => None,
        }
    }

    /// Build the exact line sequence sent to the device for `commands`.
    ///
    /// The configuration lines appear verbatim and in their original order.
    pub fn frame<S: AsRef<str>>(&self, commands: &[S], save: bool) -> Vec<String> {
        let mut lines: Vec<String> = self
            .session_preparation()
            .iter()
            .map(|s| s.to_string())
            .collect();

        lines.extend(self.enter_config().map(str::to_string));
        lines.extend(commands.iter().map(|c| c.as_ref().to_string()));
        lines.extend(self.exit_config().iter().map(|s| s.to_string()));

        if save {
            lines.extend(self.save_config().map(str::to_string));
        }

        lines
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::CiscoNxos => write!(f, "cisco_nxos"),
            Platform::CiscoIos => write!(f, "cisco_ios"),
            Platform::CiscoIosXr => write!(f, "cisco_iosxr"),
            Platform::AristaEos => write!(f, "arista_eos"),
            Platform::JuniperJunos => write!(f, "juniper_junos"),
            Platform::Generic => write!(f, "generic"),
        }
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "cisco_nxos" | "nxos" | "nxos_ssh" | "nexus" => Ok(Platform::CiscoNxos),
            "cisco_ios" | "ios" | "ios_xe" | "iosxe" | "cisco_xe" => Ok(Platform::CiscoIos),
            "cisco_iosxr" | "cisco_xr" | "iosxr" | "ios_xr" => Ok(Platform::CiscoIosXr),
            "arista_eos" | "eos" | "arista" => Ok(Platform::AristaEos),
            "juniper_junos" | "junos" | "juniper" => Ok(Platform::JuniperJunos),
            "generic" | "linux" => Ok(Platform::Generic),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}
