use super::device_type::DeviceType;
use super::types::*;
use crate::error_handling::types::ConfigError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default beacon cadence in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 30_000;

/// Default vendor host that receives beacons.
pub const DEFAULT_ENDPOINT: &str = "www.tns-counter.ru";

/// Session configuration for one heartbeat counter.
///
/// The structure is immutable for the lifetime of a session. It is built once
/// when the counter is attached to a player, by merging the caller's options
/// over the defaults: every field carries `#[serde(default)]`, so an option the
/// caller leaves out keeps its default value.
///
/// # Examples
///
/// ```
/// use tns_heartbeat::configuration::HeartbeatConfig;
///
/// let config = HeartbeatConfig::from_toml_str(r#"
///     catid = "A"
///     TnsAccount = "ACC"
///     tmsec = "sec1"
///     live = true
/// "#).unwrap();
/// assert_eq!(config.interval, 30_000);
/// assert!(config.live);
/// ```
///
/// # Fields Overview
///
/// The option names on the wire are the ones the vendor integration documents:
/// - `catid`, `vcid`, `vcver`: content identifiers
/// - `TnsAccount`: vendor account, rendered in the URL suffix
/// - `tmsec`: vendor section tag, rendered in the URL suffix
/// - `adid`, `advid`, `idfa`, `dvid`, `mac`, `app`: ad-tracking identifiers
/// - `dvtp`: device type, detected from the user agent when omitted (desktop
///   when there is no agent at all)
/// - `interval`: beacon cadence in milliseconds
/// - `live`, `dvr`: playback mode flags
/// - `serverTimestamp`: vendor reference epoch seconds used for skew correction
///
/// The remaining fields choose between the pause and de-duplication policies,
/// and allow pointing beacons at another collector host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub catid: Option<OpaqueId>,
    pub vcid: Option<OpaqueId>,
    pub vcver: Option<OpaqueId>,

    #[serde(rename = "TnsAccount")]
    pub account: Option<OpaqueId>,

    #[serde(rename = "tmsec")]
    pub time_section: Option<OpaqueId>,

    #[serde(rename = "dvtp")]
    pub device_type: Option<DeviceType>,

    pub adid: Option<OpaqueId>,
    pub advid: Option<OpaqueId>,
    pub idfa: Option<OpaqueId>,
    pub dvid: Option<OpaqueId>,
    pub mac: Option<OpaqueId>,
    pub app: Option<OpaqueId>,

    /// Beacon cadence in milliseconds, must be greater than zero.
    pub interval: u64,

    pub live: bool,

    /// Informational only. Live/DVR behavior follows `live` and the sign of the
    /// playback position.
    pub dvr: bool,

    /// Vendor reference time in epoch seconds. Zero counts as absent.
    #[serde(rename = "serverTimestamp")]
    pub server_timestamp: Option<i64>,

    #[serde(rename = "pausePolicy")]
    pub pause_policy: PausePolicy,

    pub dedup: DedupPolicy,

    /// Host name of the beacon collector.
    pub endpoint: String,

    /// Platform string used for `dvtp` detection when the host has none.
    #[serde(rename = "userAgent", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            catid: None,
            vcid: None,
            vcver: Some(OpaqueId::Number(0)),
            account: None,
            time_section: None,
            device_type: None,
            adid: None,
            advid: None,
            idfa: None,
            dvid: None,
            mac: None,
            app: None,
            interval: DEFAULT_INTERVAL_MS,
            live: false,
            dvr: false,
            server_timestamp: None,
            pause_policy: PausePolicy::default(),
            dedup: DedupPolicy::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: None,
        }
    }
}

impl HeartbeatConfig {
    /// Parses caller options from a TOML document and validates the result.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: HeartbeatConfig = toml::from_str(raw)?;
        config.validate()?;
        debug!("Parsed heartbeat configuration: {:?}", config);
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    /// - [`ConfigError::IoError`] if the file cannot be read
    /// - [`ConfigError::TomlError`] if the document is malformed
    /// - [`ConfigError::NotInRange`] if `interval` is zero
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading heartbeat configuration from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Only the cadence is checked. Account and section are opaque and a
    /// misconfigured value simply yields a URL the vendor rejects.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval == 0 {
            return Err(ConfigError::NotInRange(
                "interval must be greater than 0 ms".to_string(),
            ));
        }
        Ok(())
    }

    /// The server reference time, if one was actually supplied.
    pub fn reference_timestamp(&self) -> Option<i64> {
        self.server_timestamp.filter(|ts| *ts != 0)
    }

    /// Explicit `dvtp` wins, otherwise the agent string is classified. Without
    /// any agent string the platform counts as generic desktop.
    pub fn resolve_device_type(&self, host_user_agent: Option<&str>) -> Option<DeviceType> {
        if self.device_type.is_some() {
            return self.device_type;
        }
        match host_user_agent.or(self.user_agent.as_deref()) {
            Some(user_agent) => DeviceType::detect(user_agent),
            None => Some(DeviceType::Desktop),
        }
    }

    /// Event type derived from the playback mode: `1` for live, `2` otherwise.
    pub fn event_type(&self) -> u8 {
        if self.live {
            1
        } else {
            2
        }
    }
}
