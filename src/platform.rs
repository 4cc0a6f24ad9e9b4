//! Platform identifiers and user-agent based platform inference.
//!
//! Browsers report an opaque user-agent string; the portal only needs a best
//! guess at which client build to offer. [`resolve`] never fails, it degrades
//! to `None` when nothing matches.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical OS/architecture identifier used by the version feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformId {
    #[serde(rename = "windows_x86_64")]
    WindowsX86_64,
    #[serde(rename = "windows_intelx86")]
    WindowsIntelX86,
    #[serde(rename = "powerpc-apple-darwin")]
    PowerPcAppleDarwin,
    #[serde(rename = "x86_64-apple-darwin")]
    X86_64AppleDarwin,
    #[serde(rename = "arm-android-linux-gnu")]
    ArmAndroidLinuxGnu,
    #[serde(rename = "x86_64-pc-linux-gnu")]
    X86_64PcLinuxGnu,
    #[serde(rename = "i686-pc-linux-gnu")]
    I686PcLinuxGnu,
}

impl PlatformId {
    /// Every known platform, in feed order.
    pub const ALL: [Self; 7] = [
        Self::WindowsX86_64,
        Self::WindowsIntelX86,
        Self::PowerPcAppleDarwin,
        Self::X86_64AppleDarwin,
        Self::ArmAndroidLinuxGnu,
        Self::X86_64PcLinuxGnu,
        Self::I686PcLinuxGnu,
    ];

    /// Returns the feed string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WindowsX86_64 => "windows_x86_64",
            Self::WindowsIntelX86 => "windows_intelx86",
            Self::PowerPcAppleDarwin => "powerpc-apple-darwin",
            Self::X86_64AppleDarwin => "x86_64-apple-darwin",
            Self::ArmAndroidLinuxGnu => "arm-android-linux-gnu",
            Self::X86_64PcLinuxGnu => "x86_64-pc-linux-gnu",
            Self::I686PcLinuxGnu => "i686-pc-linux-gnu",
        }
    }

    #[must_use]
    pub fn is_windows(self) -> bool {
        matches!(self, Self::WindowsX86_64 | Self::WindowsIntelX86)
    }

    #[must_use]
    pub fn is_mac(self) -> bool {
        matches!(self, Self::PowerPcAppleDarwin | Self::X86_64AppleDarwin)
    }

    /// Platforms that get the simplified (token-based) installer flow.
    #[must_use]
    pub fn supports_simplified_install(self) -> bool {
        self.is_windows() || self.is_mac()
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|platform| platform.as_str() == s)
            .ok_or_else(|| format!("unknown platform identifier: {s}"))
    }
}

/// Infers the platform from a browser user-agent string.
///
/// Checks run in a fixed order and the first match wins. Android is checked
/// before Linux because Android user agents also mention Linux.
#[must_use]
pub fn resolve(user_agent: &str) -> Option<PlatformId> {
    if user_agent.contains("Windows") {
        if user_agent.contains("Win64") || user_agent.contains("WOW64") {
            Some(PlatformId::WindowsX86_64)
        } else {
            Some(PlatformId::WindowsIntelX86)
        }
    } else if user_agent.contains("Mac") {
        if user_agent.contains("PPC Mac OS X") {
            Some(PlatformId::PowerPcAppleDarwin)
        } else {
            Some(PlatformId::X86_64AppleDarwin)
        }
    } else if user_agent.contains("Android") {
        Some(PlatformId::ArmAndroidLinuxGnu)
    } else if user_agent.contains("Linux") {
        if user_agent.contains("x86_64") {
            Some(PlatformId::X86_64PcLinuxGnu)
        } else {
            Some(PlatformId::I686PcLinuxGnu)
        }
    } else {
        None
    }
}
