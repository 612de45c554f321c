//! Panel authentication strategies
//!
//! Each supported panel product carries its own outbound authentication
//! scheme. Dispatch is an explicit enum match to one strategy per panel;
//! adding a panel means implementing `PanelAuth`, not editing a branch in
//! the forwarder.

pub mod baota;
pub mod one_panel;

use std::fmt;
use std::fmt::Write as _;

use md5::{Digest, Md5};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PanelType {
    /// baota / aaPanel family
    #[serde(rename = "bt")]
    Bt,
    /// 1Panel
    #[serde(rename = "1panel")]
    OnePanel,
}

impl PanelType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "bt" => Some(Self::Bt),
            "1panel" => Some(Self::OnePanel),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bt => "bt",
            Self::OnePanel => "1panel",
        }
    }

    /// Signing strategy for this panel
    pub fn strategy(&self) -> &'static dyn PanelAuth {
        match self {
            Self::Bt => &baota::BaotaAuth,
            Self::OnePanel => &one_panel::OnePanelAuth,
        }
    }
}

impl fmt::Display for PanelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound call material produced by a signing strategy: the (possibly
/// extended) request parameters and any authentication headers.
pub struct SignedCall {
    pub params: Map<String, Value>,
    pub headers: HeaderMap,
}

pub trait PanelAuth: Send + Sync {
    /// Produce signed call material for one outbound request. Must not
    /// mutate `params`; deterministic for a fixed `now_secs`.
    fn sign(&self, params: &Map<String, Value>, api_key: &str, now_secs: i64) -> SignedCall;
}

/// Lowercase hex MD5 digest of a string
pub(crate) fn md5_hex(input: &str) -> String {
    let digest = Md5::digest(input.as_bytes());
    digest.iter().fold(String::with_capacity(32), |mut acc, b| {
        let _ = write!(acc, "{:02x}", b);
        acc
    })
}
