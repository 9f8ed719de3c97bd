use serde::{Deserialize, Serialize};
use std::fmt;

/// Vendor identifier passed through untouched. Callers hand these over either
/// as strings or as plain integers, and both render verbatim on the wire.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpaqueId {
    Number(i64),
    Text(String),
}

impl OpaqueId {
    /// Empty strings count as absent when encoding.
    pub fn is_empty(&self) -> bool {
        matches!(self, OpaqueId::Text(s) if s.is_empty())
    }
}

impl fmt::Display for OpaqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpaqueId::Number(n) => write!(f, "{}", n),
            OpaqueId::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for OpaqueId {
    fn from(value: &str) -> Self {
        OpaqueId::Text(value.to_string())
    }
}

impl From<String> for OpaqueId {
    fn from(value: String) -> Self {
        OpaqueId::Text(value)
    }
}

impl From<i64> for OpaqueId {
    fn from(value: i64) -> Self {
        OpaqueId::Number(value)
    }
}

/// What a `pause` does to a running beacon timer.
///
/// - `Cancel`: the timer is stopped and re-armed by the next `play`.
/// - `Freeze`: the timer keeps running, but ticks report the position
///   captured at the moment of the pause.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PausePolicy {
    #[default]
    Cancel,
    Freeze,
}

/// Whether ticks that would repeat the previous playback position are dropped.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    #[default]
    Off,
    SkipUnchanged,
}
