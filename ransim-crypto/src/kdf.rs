//! 5G key derivation (3GPP TS 33.501 Annex A)
//!
//! Every derivation is HMAC-SHA-256 over the string
//! `FC || P0 || L0 || P1 || L1 || ...` where each `Li` is the big-endian
//! two-octet length of `Pi`. The chain implemented here is the one the
//! UE walks after a successful MILENAGE run:
//!
//! ```text
//! CK || IK --(0x6A)--> KAUSF --(0x6C)--> KSEAF --(0x6D)--> KAMF
//!                                                      |-(0x69)-> KNASenc
//!                                                      `-(0x69)-> KNASint
//! CK || IK --(0x6B)--> RES*
//! ```

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// 256-bit key size in octets.
pub const KEY_256: usize = 32;

/// 128-bit key size in octets.
pub const KEY_128: usize = 16;

/// FC values of TS 33.501 Annex A.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Fc {
    /// A.2 - KAUSF from CK || IK.
    Kausf = 0x6A,
    /// A.4 - RES* from CK || IK.
    ResStar = 0x6B,
    /// A.6 - KSEAF from KAUSF.
    Kseaf = 0x6C,
    /// A.7 - KAMF from KSEAF.
    Kamf = 0x6D,
    /// A.8 - algorithm keys from KAMF.
    AlgKey = 0x69,
}

/// Algorithm type distinguisher for the A.8 derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlgType {
    /// NAS encryption key.
    NasEnc = 0x01,
    /// NAS integrity key.
    NasInt = 0x02,
}

/// The generic KDF: HMAC-SHA-256 over `FC || (Pi || Li)*`.
pub fn kdf(key: &[u8], fc: Fc, params: &[&[u8]]) -> [u8; KEY_256] {
    let mut s = Vec::with_capacity(1 + params.iter().map(|p| p.len() + 2).sum::<usize>());
    s.push(fc as u8);
    for p in params {
        s.extend_from_slice(p);
        s.extend_from_slice(&(p.len() as u16).to_be_bytes());
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any size"));
    mac.update(&s);
    let mut out = [0u8; KEY_256];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// The serving network name: `5G:mnc<MNC>.mcc<MCC>.3gppnetwork.org`
/// with both codes zero-padded to three digits.
pub fn serving_network_name(mcc: u16, mnc: u16) -> String {
    format!("5G:mnc{mnc:03}.mcc{mcc:03}.3gppnetwork.org")
}

fn ck_ik_key(ck: &[u8; KEY_128], ik: &[u8; KEY_128]) -> [u8; KEY_256] {
    let mut key = [0u8; KEY_256];
    key[..KEY_128].copy_from_slice(ck);
    key[KEY_128..].copy_from_slice(ik);
    key
}

fn low_128(full: &[u8; KEY_256]) -> [u8; KEY_128] {
    let mut out = [0u8; KEY_128];
    out.copy_from_slice(&full[KEY_128..]);
    out
}

/// A.2 - KAUSF = KDF(CK || IK, 0x6A, SN name, SQN xor AK).
pub fn derive_kausf(
    ck: &[u8; KEY_128],
    ik: &[u8; KEY_128],
    sn_name: &str,
    sqn_xor_ak: &[u8; 6],
) -> [u8; KEY_256] {
    kdf(
        &ck_ik_key(ck, ik),
        Fc::Kausf,
        &[sn_name.as_bytes(), sqn_xor_ak],
    )
}

/// A.4 - RES* = KDF(CK || IK, 0x6B, SN name, RAND, RES), truncated to
/// the 128 least significant bits.
pub fn derive_res_star(
    ck: &[u8; KEY_128],
    ik: &[u8; KEY_128],
    sn_name: &str,
    rand: &[u8; KEY_128],
    res: &[u8],
) -> [u8; KEY_128] {
    let full = kdf(
        &ck_ik_key(ck, ik),
        Fc::ResStar,
        &[sn_name.as_bytes(), rand, res],
    );
    low_128(&full)
}

/// A.6 - KSEAF = KDF(KAUSF, 0x6C, SN name).
pub fn derive_kseaf(kausf: &[u8; KEY_256], sn_name: &str) -> [u8; KEY_256] {
    kdf(kausf, Fc::Kseaf, &[sn_name.as_bytes()])
}

/// A.7 - KAMF = KDF(KSEAF, 0x6D, SUPI, ABBA).
pub fn derive_kamf(kseaf: &[u8; KEY_256], supi: &str, abba: &[u8]) -> [u8; KEY_256] {
    kdf(kseaf, Fc::Kamf, &[supi.as_bytes(), abba])
}

fn derive_alg_key(kamf: &[u8; KEY_256], alg_type: AlgType, alg_id: u8) -> [u8; KEY_128] {
    let full = kdf(kamf, Fc::AlgKey, &[&[alg_type as u8], &[alg_id]]);
    low_128(&full)
}

/// A.8 - KNASenc, truncated to 128 bits.
pub fn derive_knas_enc(kamf: &[u8; KEY_256], alg_id: u8) -> [u8; KEY_128] {
    derive_alg_key(kamf, AlgType::NasEnc, alg_id)
}

/// A.8 - KNASint, truncated to 128 bits.
pub fn derive_knas_int(kamf: &[u8; KEY_256], alg_id: u8) -> [u8; KEY_128] {
    derive_alg_key(kamf, AlgType::NasInt, alg_id)
}
