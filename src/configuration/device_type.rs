//! Platform detection for the `dvtp` beacon field.

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static MOBILE: LazyLock<Regex> =
    LazyLock::new(|| agent_pattern(r"Android( |%20)|iPhone|iPad|iPod|Tizen|Phone"));
static IOS: LazyLock<Regex> = LazyLock::new(|| agent_pattern("iPhone|iPod|iPad"));
static ANDROID: LazyLock<Regex> = LazyLock::new(|| agent_pattern("Android"));
static WINDOWS: LazyLock<Regex> = LazyLock::new(|| agent_pattern("Windows"));
static TIZEN: LazyLock<Regex> = LazyLock::new(|| agent_pattern("Tizen"));

fn agent_pattern(alternatives: &str) -> Regex {
    Regex::new(&format!("(?i){}", alternatives)).expect("user-agent patterns are valid regexes")
}

/// Vendor device category, serialized as its numeric id.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DeviceType {
    Desktop,
    Ios,
    Android,
    WindowsMobile,
    Tizen,
}

impl DeviceType {
    pub fn id(self) -> u8 {
        match self {
            DeviceType::Desktop => 1,
            DeviceType::Ios => 2,
            DeviceType::Android => 3,
            DeviceType::WindowsMobile => 4,
            DeviceType::Tizen => 7,
        }
    }

    /// Classifies a user-agent string.
    ///
    /// Anything that does not look mobile is `Desktop`. A mobile-looking agent
    /// that matches none of the known platforms yields `None`, and the field is
    /// then left out of the beacon.
    pub fn detect(user_agent: &str) -> Option<DeviceType> {
        let detected = if !MOBILE.is_match(user_agent) {
            Some(DeviceType::Desktop)
        } else if IOS.is_match(user_agent) {
            Some(DeviceType::Ios)
        } else if ANDROID.is_match(user_agent) {
            Some(DeviceType::Android)
        } else if WINDOWS.is_match(user_agent) {
            Some(DeviceType::WindowsMobile)
        } else if TIZEN.is_match(user_agent) {
            Some(DeviceType::Tizen)
        } else {
            None
        };
        debug!("Detected device type {:?} for agent {:?}", detected, user_agent);
        detected
    }
}

impl From<DeviceType> for u8 {
    fn from(value: DeviceType) -> Self {
        value.id()
    }
}

impl TryFrom<u8> for DeviceType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DeviceType::Desktop),
            2 => Ok(DeviceType::Ios),
            3 => Ok(DeviceType::Android),
            4 => Ok(DeviceType::WindowsMobile),
            7 => Ok(DeviceType::Tizen),
            other => Err(format!("unknown device type id {}", other)),
        }
    }
}
