//! 128-NIA2: AES-CMAC integrity for NAS messages (TS 33.501).
//!
//! The CMAC input is an 8-octet header followed by the message:
//!
//! ```text
//! | COUNT (32) | BEARER (5) DIRECTION (1) 00 (2) | 0x00 0x00 0x00 | MESSAGE |
//! ```
//!
//! The 128-bit tag is truncated to its first 32 bits.

use aes::Aes128;
use cmac::{Cmac, Mac};

/// Integrity key size in octets.
pub const KEY_SIZE: usize = 16;

/// Truncated MAC size in octets.
pub const MAC_SIZE: usize = 4;

/// Computes the 32-bit 128-NIA2 MAC.
pub fn nia2_compute_mac(
    count: u32,
    bearer: u8,
    direction: u8,
    key: &[u8; KEY_SIZE],
    data: &[u8],
) -> [u8; MAC_SIZE] {
    let mut input = Vec::with_capacity(8 + data.len());
    input.extend_from_slice(&count.to_be_bytes());
    input.push(((bearer & 0x1f) << 3) | ((direction & 0x01) << 2));
    input.extend_from_slice(&[0, 0, 0]);
    input.extend_from_slice(data);

    let mut mac = Cmac::<Aes128>::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("CMAC key is always 16 octets"));
    mac.update(&input);
    let tag = mac.finalize().into_bytes();

    let mut out = [0u8; MAC_SIZE];
    out.copy_from_slice(&tag[..MAC_SIZE]);
    out
}
