//! Configuration structures for the emulated UE and gNB.
//!
//! Configuration is a single JSON object holding one UE and one gNB
//! section. Long-term credentials are hex strings and parsed on demand
//! so a bad value surfaces as a `Config` error, not a panic mid-attach.

use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{parse_hex, PagingDrx, Plmn, SNssai, SupportedTa};

/// Subscriber-side configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UeConfig {
    /// Mobile Country Code.
    #[serde(rename = "MCC")]
    pub mcc: u16,
    /// Mobile Network Code.
    #[serde(rename = "MNC")]
    pub mnc: u16,
    /// Mobile Subscription Identification Number (decimal digits).
    #[serde(rename = "MSIN")]
    pub msin: String,
    /// SUCI routing indicator.
    #[serde(rename = "RoutingIndicator")]
    pub routing_indicator: u16,
    /// SUCI protection scheme; only `null` is supported.
    #[serde(rename = "ProtectionScheme", default = "default_scheme")]
    pub protection_scheme: String,
    /// IMEISV presented when the network requests it (16 digits).
    #[serde(rename = "IMEISV")]
    pub imeisv: String,
    /// Subscriber key K, 32 hex digits.
    #[serde(rename = "K")]
    pub k: String,
    /// Operator key OPc, 32 hex digits.
    #[serde(rename = "OPc")]
    pub opc: String,
    /// Authentication management field, 4 hex digits.
    #[serde(rename = "AMF", default = "default_amf")]
    pub amf: String,
    /// Slice requested at PDU session establishment.
    #[serde(rename = "SNSSAI", default)]
    pub snssai: SNssai,
    /// Data network name for the PDU session.
    #[serde(rename = "DNN", default = "default_dnn")]
    pub dnn: String,
    /// URL probed from the PDU address once the user plane is up.
    #[serde(rename = "URL", default)]
    pub url: String,
    /// Unconditionally retransmit the initial NAS message in Security
    /// Mode Complete, even when the network did not set the RINMR bit.
    /// Some deployed AMFs implicitly require this.
    #[serde(rename = "ForceRINMR", default = "default_true")]
    pub force_rinmr: bool,
}

impl UeConfig {
    /// The PLMN of the subscription.
    pub fn plmn(&self) -> Plmn {
        Plmn::new(self.mcc, self.mnc)
    }

    /// K as raw key material.
    pub fn k_bytes(&self) -> Result<[u8; 16], Error> {
        hex16(&self.k, "K")
    }

    /// OPc as raw key material.
    pub fn opc_bytes(&self) -> Result<[u8; 16], Error> {
        hex16(&self.opc, "OPc")
    }

    /// The configured authentication management field.
    pub fn amf_bytes(&self) -> Result<[u8; 2], Error> {
        let raw = parse_hex(&self.amf)?;
        raw.try_into()
            .map_err(|_| Error::Config("AMF must be 2 octets".into()))
    }
}

fn hex16(s: &str, what: &str) -> Result<[u8; 16], Error> {
    let raw = parse_hex(s)?;
    raw.try_into()
        .map_err(|_| Error::Config(format!("{what} must be 16 octets")))
}

/// gNB-side configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GnbConfig {
    /// Global gNB identity.
    #[serde(rename = "GlobalGNBID")]
    pub global_gnb_id: GlobalGnbId,
    /// Cell index within the gNB; together with the gNB ID this forms
    /// the 36-bit NR Cell Identity.
    #[serde(rename = "NRCellID", default = "default_cell_id")]
    pub nr_cell_id: u64,
    /// Tracking areas announced in NG Setup.
    #[serde(rename = "SupportedTAList")]
    pub supported_ta_list: Vec<SupportedTa>,
    /// Default paging DRX announced in NG Setup.
    #[serde(rename = "PagingDRX", default)]
    pub paging_drx: PagingDrx,
    /// Tracking area the UE camps in (User Location Information).
    #[serde(rename = "TAC", default = "default_tac")]
    pub tac: u32,
    /// AMF endpoint for the N2 connection.
    #[serde(rename = "NGAPPeerAddr")]
    pub ngap_peer_addr: IpAddr,
    /// Local address for the N3 GTP-U socket.
    #[serde(rename = "GTPuLocalAddr", default = "default_gtpu_addr")]
    pub gtpu_local_addr: IpAddr,
    /// Interface name carrying the N3 traffic.
    #[serde(rename = "GTPuIFname", default)]
    pub gtpu_ifname: String,
    /// Local GTP-U TEID; 0 selects a random value at session setup.
    #[serde(rename = "GTPuTEID", default)]
    pub gtpu_teid: u32,
    /// Bound on each N2 read; elapsing is non-fatal.
    #[serde(rename = "TimeoutSecs", default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Global gNB identity: PLMN plus a 22-32 bit gNB ID.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GlobalGnbId {
    /// Mobile Country Code.
    #[serde(rename = "MCC")]
    pub mcc: u16,
    /// Mobile Network Code.
    #[serde(rename = "MNC")]
    pub mnc: u16,
    /// gNB identifier.
    #[serde(rename = "GNBID")]
    pub gnb_id: u32,
}

impl GlobalGnbId {
    /// The PLMN of the gNB.
    pub fn plmn(&self) -> Plmn {
        Plmn::new(self.mcc, self.mnc)
    }
}

/// Complete session configuration: one UE attached via one gNB.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// The emulated subscriber.
    #[serde(rename = "UE")]
    pub ue: UeConfig,
    /// The emulated base station.
    #[serde(rename = "GNB")]
    pub gnb: GnbConfig,
}

impl SessionConfig {
    /// Loads the configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let raw = fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), Error> {
        self.ue.k_bytes()?;
        self.ue.opc_bytes()?;
        self.ue.amf_bytes()?;
        if self.ue.protection_scheme != "null" {
            return Err(Error::Config(format!(
                "unsupported protection scheme: {}",
                self.ue.protection_scheme
            )));
        }
        if !self.ue.msin.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::Config("MSIN must be decimal digits".into()));
        }
        if self.gnb.supported_ta_list.is_empty() {
            return Err(Error::Config("SupportedTAList must not be empty".into()));
        }
        Ok(())
    }
}

fn default_scheme() -> String {
    "null".into()
}

fn default_amf() -> String {
    "8000".into()
}

fn default_dnn() -> String {
    "internet".into()
}

fn default_true() -> bool {
    true
}

fn default_cell_id() -> u64 {
    1
}

fn default_tac() -> u32 {
    1
}

fn default_gtpu_addr() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_timeout() -> u64 {
    10
}
