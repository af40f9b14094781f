//! Shared radio-network identifiers
//!
//! PLMN, S-NSSAI, tracking-area and paging types used by both the NAS
//! and NGAP layers.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Public Land Mobile Network identity.
///
/// On the wire a PLMN is three octets of telephony BCD: MCC digits in
/// octet 0 and the low nibble of octet 1, a filler nibble `F` in the
/// high nibble of octet 1 when the MNC has two digits, and the MNC
/// digits in octet 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Plmn {
    /// Mobile Country Code (up to three digits).
    pub mcc: u16,
    /// Mobile Network Code (two or three digits).
    pub mnc: u16,
}

impl Plmn {
    /// Creates a PLMN from MCC and MNC.
    pub fn new(mcc: u16, mnc: u16) -> Self {
        Self { mcc, mnc }
    }

    /// Encodes to the three-octet telephony BCD form.
    pub fn encode(&self) -> [u8; 3] {
        let mcc = self.mcc % 1000;
        let mnc = self.mnc % 1000;
        let mut v = [0u8; 3];
        v[0] = (mcc / 100) as u8 | (((mcc % 100) / 10) as u8) << 4;
        v[1] = (mcc % 10) as u8;
        if mnc < 100 {
            v[1] |= 0xf0;
        } else {
            v[1] |= ((mnc / 100) as u8) << 4;
        }
        v[2] = ((mnc % 100) / 10) as u8 | ((mnc % 10) as u8) << 4;
        v
    }

    /// Decodes the three-octet telephony BCD form.
    pub fn decode(v: &[u8]) -> Result<Self, Error> {
        if v.len() < 3 {
            return Err(Error::Truncated {
                needed: 3,
                available: v.len(),
            });
        }
        let mcc =
            u16::from(v[0] & 0xf) * 100 + u16::from(v[0] >> 4) * 10 + u16::from(v[1] & 0xf);
        let mut mnc = 0u16;
        if v[1] & 0xf0 != 0xf0 {
            mnc = u16::from(v[1] >> 4) * 100;
        }
        mnc += u16::from(v[2] & 0xf) * 10 + u16::from(v[2] >> 4);
        Ok(Self { mcc, mnc })
    }
}

/// Single Network Slice Selection Assistance Information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SNssai {
    /// Slice/Service Type.
    #[serde(rename = "SST")]
    pub sst: u8,
    /// Slice Differentiator, six hex digits (three octets), if present.
    #[serde(rename = "SD", default, skip_serializing_if = "Option::is_none")]
    pub sd: Option<String>,
}

impl SNssai {
    /// The SD as three raw octets, when configured.
    pub fn sd_bytes(&self) -> Result<Option<[u8; 3]>, Error> {
        let Some(sd) = &self.sd else {
            return Ok(None);
        };
        let raw = parse_hex(sd)?;
        let bytes: [u8; 3] = raw
            .try_into()
            .map_err(|_| Error::Config(format!("SD must be 3 octets: {sd}")))?;
        Ok(Some(bytes))
    }
}

/// Tracking Area Identity: PLMN plus a 24-bit TAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Tai {
    /// PLMN the tracking area belongs to.
    #[serde(rename = "PLMN")]
    pub plmn: Plmn,
    /// Tracking Area Code.
    #[serde(rename = "TAC")]
    pub tac: u32,
}

/// One broadcast PLMN announced in a supported tracking area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BroadcastPlmn {
    /// PLMN identity.
    #[serde(rename = "PLMN")]
    pub plmn: Plmn,
    /// Slices supported in this PLMN.
    #[serde(rename = "SliceSupportList", default)]
    pub slice_support_list: Vec<SNssai>,
}

/// One supported tracking area announced in NG Setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SupportedTa {
    /// Tracking Area Code.
    #[serde(rename = "TAC")]
    pub tac: u32,
    /// Broadcast PLMNs for this TA.
    #[serde(rename = "BroadcastPLMNList", default)]
    pub broadcast_plmn_list: Vec<BroadcastPlmn>,
}

/// Default paging DRX cycle length announced in NG Setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PagingDrx {
    /// 32 radio frames.
    #[default]
    #[serde(rename = "v32")]
    V32,
    /// 64 radio frames.
    #[serde(rename = "v64")]
    V64,
    /// 128 radio frames.
    #[serde(rename = "v128")]
    V128,
    /// 256 radio frames.
    #[serde(rename = "v256")]
    V256,
}

impl PagingDrx {
    /// The PER enumeration index.
    pub fn index(&self) -> u64 {
        match self {
            PagingDrx::V32 => 0,
            PagingDrx::V64 => 1,
            PagingDrx::V128 => 2,
            PagingDrx::V256 => 3,
        }
    }
}

/// Parses an even-length hex string.
pub fn parse_hex(s: &str) -> Result<Vec<u8>, Error> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return Err(Error::Config(format!("odd-length hex string: {s}")));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|_| Error::Config(format!("bad hex string: {s}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plmn_two_digit_mnc() {
        let plmn = Plmn::new(208, 93);
        assert_eq!(plmn.encode(), [0x02, 0xf8, 0x39]);
        assert_eq!(Plmn::decode(&[0x02, 0xf8, 0x39]).unwrap(), plmn);
    }

    #[test]
    fn test_plmn_three_digit_mnc() {
        let plmn = Plmn::new(310, 410);
        let enc = plmn.encode();
        assert_eq!(enc, [0x13, 0x40, 0x01]);
        assert_eq!(Plmn::decode(&enc).unwrap(), plmn);
    }

    #[test]
    fn test_snssai_sd_bytes() {
        let s = SNssai {
            sst: 1,
            sd: Some("010203".into()),
        };
        assert_eq!(s.sd_bytes().unwrap(), Some([0x01, 0x02, 0x03]));
        let none = SNssai { sst: 1, sd: None };
        assert_eq!(none.sd_bytes().unwrap(), None);
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("deadBEEF").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }
}
