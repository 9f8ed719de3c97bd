//! Vendor URL serialization.
//!
//! The layout is fixed by the measurement vendor and must be reproduced byte
//! for byte:
//!
//! ```text
//! {scheme}://{endpoint}/V13a**{key}:{value}:...{key}:{value}**{account}/ru/UTF-8/tmsec={section}/
//! ```
//!
//! Fields appear in a fixed order and any field without a value (absent or an
//! empty string) is left out entirely.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

use crate::configuration::{DeviceType, HeartbeatConfig, OpaqueId};

/// URL scheme, matching the transport of the page hosting the player.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => f.write_str("http"),
            Scheme::Https => f.write_str("https"),
        }
    }
}

/// Per-beacon field values in wire order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BeaconParams {
    pub catid: Option<OpaqueId>,
    pub vcid: Option<OpaqueId>,
    pub vcver: Option<OpaqueId>,
    pub fts: Option<i64>,
    pub vts: Option<i64>,
    pub evtp: Option<u8>,
    pub dvtp: Option<u8>,
    pub adid: Option<OpaqueId>,
    pub advid: Option<OpaqueId>,
    pub idfa: Option<OpaqueId>,
    pub dvid: Option<OpaqueId>,
    pub mac: Option<OpaqueId>,
    pub app: Option<OpaqueId>,
}

impl BeaconParams {
    /// Fills the identifiers from the session configuration and the derived
    /// `evtp`. The per-tick `fts` and `vts` come from the caller.
    pub fn for_tick(
        config: &HeartbeatConfig,
        device_type: Option<DeviceType>,
        fts: i64,
        vts: i64,
    ) -> Self {
        Self {
            catid: config.catid.clone(),
            vcid: config.vcid.clone(),
            vcver: config.vcver.clone(),
            fts: Some(fts),
            vts: Some(vts),
            evtp: Some(config.event_type()),
            dvtp: device_type.map(DeviceType::id),
            adid: config.adid.clone(),
            advid: config.advid.clone(),
            idfa: config.idfa.clone(),
            dvid: config.dvid.clone(),
            mac: config.mac.clone(),
            app: config.app.clone(),
        }
    }

    /// Fields in wire order, `None` where the field is to be skipped.
    fn fields(&self) -> [(&'static str, Option<String>); 13] {
        fn id(value: &Option<OpaqueId>) -> Option<String> {
            value
                .as_ref()
                .filter(|v| !v.is_empty())
                .map(ToString::to_string)
        }

        [
            ("catid", id(&self.catid)),
            ("vcid", id(&self.vcid)),
            ("vcver", id(&self.vcver)),
            ("fts", self.fts.map(|v| v.to_string())),
            ("vts", self.vts.map(|v| v.to_string())),
            ("evtp", self.evtp.map(|v| v.to_string())),
            ("dvtp", self.dvtp.map(|v| v.to_string())),
            ("adid", id(&self.adid)),
            ("advid", id(&self.advid)),
            ("idfa", id(&self.idfa)),
            ("dvid", id(&self.dvid)),
            ("mac", id(&self.mac)),
            ("app", id(&self.app)),
        ]
    }
}

/// Everything in the URL that does not change from tick to tick.
#[derive(Debug, Clone, PartialEq)]
pub struct BeaconTarget {
    pub scheme: Scheme,
    pub endpoint: String,
    pub account: Option<OpaqueId>,
    pub section: Option<OpaqueId>,
}

impl BeaconTarget {
    pub fn from_config(config: &HeartbeatConfig, scheme: Scheme) -> Self {
        Self {
            scheme,
            endpoint: config.endpoint.clone(),
            account: config.account.clone(),
            section: config.time_section.clone(),
        }
    }

    /// Builds the tracking URL for one beacon.
    ///
    /// A missing account or section renders as an empty segment; nothing is
    /// validated here.
    pub fn encode(&self, params: &BeaconParams) -> String {
        let mut url = format!("{}://{}/V13a**", self.scheme, self.endpoint);
        for (key, value) in params.fields() {
            if let Some(value) = value {
                // writing into a String cannot fail
                let _ = write!(url, "{}:{}:", key, value);
            }
        }
        if url.ends_with(':') {
            url.pop();
        }
        let _ = write!(
            url,
            "**{}/ru/UTF-8/tmsec={}/",
            display_or_empty(&self.account),
            display_or_empty(&self.section)
        );
        url
    }
}

fn display_or_empty(value: &Option<OpaqueId>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}
