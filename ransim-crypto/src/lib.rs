//! Cryptographic kit for the 5G attach procedure.
//!
//! Three pieces, matching the three places the control plane needs
//! cryptography:
//!
//! - [`milenage`] - the 3GPP authentication algorithm set (TS 35.205/206)
//!   producing RES, CK, IK, AK and MAC-A from K, OPc, RAND, SQN, AMF;
//! - [`kdf`] - the TS 33.501 Annex A key-derivation chain from CK/IK
//!   down to the NAS algorithm keys;
//! - [`nia`] - 128-NIA2 (AES-CMAC) integrity for NAS messages.

pub mod kdf;
pub mod milenage;
pub mod nia;

pub use kdf::{
    derive_kamf, derive_kausf, derive_knas_enc, derive_knas_int, derive_kseaf, derive_res_star,
    serving_network_name,
};
pub use milenage::{compute_opc, Milenage};
pub use nia::nia2_compute_mac;
