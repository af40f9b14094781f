//! NAS security context: derived keys and integrity protection.
//!
//! Null ciphering (5G-EA0) and 128-NIA2 integrity are the supported
//! algorithm pair. Every security-protected frame is
//! `{EPD, SHT, MAC(4), SEQ(1), plain NAS}` with the MAC computed over
//! `SEQ || plain NAS`.
//!
//! The uplink NAS counter is a single monotonic 32-bit value; its low
//! byte is both the wire sequence number and the COUNT input of the
//! MAC. Counter wrap past the low byte is not reflected on the wire.

use ransim_crypto::nia::nia2_compute_mac;

/// Bearer identity used in the NAS MAC computation. Deployed cores
/// expect 1 on the N1 interface.
pub const NAS_BEARER: u8 = 1;

/// Direction bit of the NAS MAC computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NasDirection {
    /// UE to network.
    Uplink = 0,
    /// Network to UE.
    Downlink = 1,
}

/// Key hierarchy derived during 5G-AKA (TS 33.501).
///
/// Populated once the authentication challenge verifies; the volatile
/// authentication vector itself is discarded after derivation.
#[derive(Debug, Clone, Default)]
pub struct SecurityKeys {
    /// KAUSF (256-bit).
    pub kausf: Option<[u8; 32]>,
    /// KSEAF (256-bit).
    pub kseaf: Option<[u8; 32]>,
    /// KAMF (256-bit).
    pub kamf: Option<[u8; 32]>,
    /// KNASenc (128-bit), derived for 5G-EA0.
    pub kenc: Option<[u8; 16]>,
    /// KNASint (128-bit), derived for 128-NIA2.
    pub kint: Option<[u8; 16]>,
    /// RES* answered to the network.
    pub res_star: Option<[u8; 16]>,
    /// ABBA parameter received in the Authentication Request.
    pub abba: Vec<u8>,
}

impl SecurityKeys {
    /// True once the NAS algorithm keys exist.
    pub fn has_nas_keys(&self) -> bool {
        self.kint.is_some() && self.kenc.is_some()
    }

    /// Wipes all key material.
    pub fn clear(&mut self) {
        if let Some(k) = self.kausf.as_mut() {
            k.fill(0);
        }
        if let Some(k) = self.kseaf.as_mut() {
            k.fill(0);
        }
        if let Some(k) = self.kamf.as_mut() {
            k.fill(0);
        }
        if let Some(k) = self.kenc.as_mut() {
            k.fill(0);
        }
        if let Some(k) = self.kint.as_mut() {
            k.fill(0);
        }
        *self = Self::default();
    }
}

/// Volatile authentication vector held only while a challenge is being
/// processed.
#[derive(Debug, Clone, Default)]
pub struct AuthVector {
    /// RAND from the Authentication Request.
    pub rand: [u8; 16],
    /// SQN xor AK, first six octets of AUTN.
    pub sqn_xor_ak: [u8; 6],
    /// Authentication management field, AUTN octets 6-7.
    pub amf: [u8; 2],
    /// MAC-A, AUTN octets 8-15.
    pub mac: [u8; 8],
}

/// Computes the NAS MAC over `SEQ || plain` for the given direction.
///
/// The COUNT input is the sequence number widened to 32 bits, matching
/// what deployed cores compute.
pub fn compute_nas_mac(
    kint: &[u8; 16],
    direction: NasDirection,
    seq_and_plain: &[u8],
) -> [u8; 4] {
    let count = seq_and_plain.first().copied().unwrap_or(0);
    nia2_compute_mac(
        u32::from(count),
        NAS_BEARER,
        direction as u8,
        kint,
        seq_and_plain,
    )
}

/// Constant-time MAC comparison.
pub fn mac_equal(a: &[u8; 4], b: &[u8]) -> bool {
    if b.len() != 4 {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_changes_mac() {
        let kint = [0x31; 16];
        let body = [0x01, 0x7e, 0x00, 0x43];
        let up = compute_nas_mac(&kint, NasDirection::Uplink, &body);
        let down = compute_nas_mac(&kint, NasDirection::Downlink, &body);
        assert_ne!(up, down);
    }

    #[test]
    fn test_mac_equal() {
        let mac = [0x12, 0x34, 0x56, 0x78];
        assert!(mac_equal(&mac, &[0x12, 0x34, 0x56, 0x78]));
        assert!(!mac_equal(&mac, &[0x12, 0x34, 0x56, 0x79]));
        assert!(!mac_equal(&mac, &[0x12, 0x34, 0x56]));
    }

    #[test]
    fn test_clear_wipes_keys() {
        let mut keys = SecurityKeys {
            kint: Some([0xaa; 16]),
            abba: vec![0, 0],
            ..Default::default()
        };
        keys.clear();
        assert!(keys.kint.is_none());
        assert!(keys.abba.is_empty());
        assert!(!keys.has_nas_keys());
    }
}
