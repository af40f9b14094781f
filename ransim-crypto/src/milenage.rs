//! MILENAGE algorithm set (3GPP TS 35.205 / TS 35.206)
//!
//! Produces the authentication outputs the UE needs to validate a
//! network challenge and answer it:
//! - f1 / f1*: MAC-A and MAC-S
//! - f2: RES
//! - f3: CK
//! - f4: IK
//! - f5 / f5*: AK
//!
//! OPc is expected to be precomputed; [`compute_opc`] derives it from
//! OP when an operator only provisions OP.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;

/// Block and key size in octets.
const BLOCK: usize = 16;

/// SQN size in octets (48 bits).
pub const SQN_SIZE: usize = 6;

/// AMF size in octets (16 bits).
pub const AMF_SIZE: usize = 2;

/// MAC-A / MAC-S / RES size in octets (64 bits).
pub const MAC_SIZE: usize = 8;

/// AK size in octets (48 bits).
pub const AK_SIZE: usize = 6;

// Per-function rotation amounts and additive constants of TS 35.206.
// c1 is all zeros; c2..c5 set a single low bit.
const R: [usize; 5] = [64, 0, 32, 64, 96];
const C_LOW: [u8; 5] = [0x00, 0x01, 0x02, 0x04, 0x08];

fn take8(src: &[u8]) -> [u8; MAC_SIZE] {
    let mut out = [0u8; MAC_SIZE];
    out.copy_from_slice(src);
    out
}

fn take6(src: &[u8]) -> [u8; AK_SIZE] {
    let mut out = [0u8; AK_SIZE];
    out.copy_from_slice(src);
    out
}

fn xor_into(dst: &mut [u8; BLOCK], src: &[u8; BLOCK]) {
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d ^= *s;
    }
}

fn rotate_left(block: &[u8; BLOCK], bits: usize) -> [u8; BLOCK] {
    if bits == 0 {
        return *block;
    }
    let byte_shift = bits / 8;
    let bit_shift = bits % 8;
    let mut out = [0u8; BLOCK];
    for i in 0..BLOCK {
        let a = block[(i + byte_shift) % BLOCK];
        if bit_shift == 0 {
            out[i] = a;
        } else {
            let b = block[(i + byte_shift + 1) % BLOCK];
            out[i] = (a << bit_shift) | (b >> (8 - bit_shift));
        }
    }
    out
}

/// Derives OPc = OP XOR E_K(OP).
pub fn compute_opc(k: &[u8; BLOCK], op: &[u8; BLOCK]) -> [u8; BLOCK] {
    let cipher = Aes128::new(GenericArray::from_slice(k));
    let mut block = GenericArray::clone_from_slice(op);
    cipher.encrypt_block(&mut block);
    let mut opc: [u8; BLOCK] = block.into();
    xor_into(&mut opc, op);
    opc
}

/// MILENAGE context over a subscriber key and OPc.
pub struct Milenage {
    cipher: Aes128,
    opc: [u8; BLOCK],
}

impl Milenage {
    /// Creates a context from K and a precomputed OPc.
    pub fn new(k: &[u8; BLOCK], opc: &[u8; BLOCK]) -> Self {
        Self {
            cipher: Aes128::new(GenericArray::from_slice(k)),
            opc: *opc,
        }
    }

    /// Creates a context from K and OP, deriving OPc internally.
    pub fn new_with_op(k: &[u8; BLOCK], op: &[u8; BLOCK]) -> Self {
        let opc = {
            let cipher = Aes128::new(GenericArray::from_slice(k));
            let mut block = GenericArray::clone_from_slice(op);
            cipher.encrypt_block(&mut block);
            let mut opc: [u8; BLOCK] = block.into();
            xor_into(&mut opc, op);
            opc
        };
        Self::new(k, &opc)
    }

    fn encrypt(&self, mut block: [u8; BLOCK]) -> [u8; BLOCK] {
        let ga = GenericArray::from_mut_slice(&mut block);
        self.cipher.encrypt_block(ga);
        block
    }

    /// TEMP = E_K(RAND XOR OPc)
    fn temp(&self, rand: &[u8; BLOCK]) -> [u8; BLOCK] {
        let mut block = *rand;
        xor_into(&mut block, &self.opc);
        self.encrypt(block)
    }

    /// OUT1 = E_K(TEMP XOR rot(IN1 XOR OPc, r1) XOR c1) XOR OPc
    /// with IN1 = SQN || AMF || SQN || AMF.
    fn out1(
        &self,
        rand: &[u8; BLOCK],
        sqn: &[u8; SQN_SIZE],
        amf: &[u8; AMF_SIZE],
    ) -> [u8; BLOCK] {
        let mut in1 = [0u8; BLOCK];
        in1[0..6].copy_from_slice(sqn);
        in1[6..8].copy_from_slice(amf);
        in1[8..14].copy_from_slice(sqn);
        in1[14..16].copy_from_slice(amf);

        xor_into(&mut in1, &self.opc);
        let mut block = rotate_left(&in1, R[0]);
        xor_into(&mut block, &self.temp(rand));
        block[15] ^= C_LOW[0];
        let mut out = self.encrypt(block);
        xor_into(&mut out, &self.opc);
        out
    }

    /// OUTn = E_K(rot(TEMP XOR OPc, rn) XOR cn) XOR OPc for n in 2..=5.
    fn out_n(&self, rand: &[u8; BLOCK], n: usize) -> [u8; BLOCK] {
        let mut block = self.temp(rand);
        xor_into(&mut block, &self.opc);
        let mut block = rotate_left(&block, R[n - 1]);
        block[15] ^= C_LOW[n - 1];
        let mut out = self.encrypt(block);
        xor_into(&mut out, &self.opc);
        out
    }

    /// f1 - network authentication code MAC-A.
    pub fn f1(
        &self,
        rand: &[u8; BLOCK],
        sqn: &[u8; SQN_SIZE],
        amf: &[u8; AMF_SIZE],
    ) -> [u8; MAC_SIZE] {
        take8(&self.out1(rand, sqn, amf)[0..8])
    }

    /// f1* - resynchronisation code MAC-S.
    pub fn f1_star(
        &self,
        rand: &[u8; BLOCK],
        sqn: &[u8; SQN_SIZE],
        amf: &[u8; AMF_SIZE],
    ) -> [u8; MAC_SIZE] {
        take8(&self.out1(rand, sqn, amf)[8..16])
    }

    /// f2 - user response RES.
    pub fn f2(&self, rand: &[u8; BLOCK]) -> [u8; MAC_SIZE] {
        take8(&self.out_n(rand, 2)[8..16])
    }

    /// f3 - cipher key CK.
    pub fn f3(&self, rand: &[u8; BLOCK]) -> [u8; BLOCK] {
        self.out_n(rand, 3)
    }

    /// f4 - integrity key IK.
    pub fn f4(&self, rand: &[u8; BLOCK]) -> [u8; BLOCK] {
        self.out_n(rand, 4)
    }

    /// f5 - anonymity key AK.
    pub fn f5(&self, rand: &[u8; BLOCK]) -> [u8; AK_SIZE] {
        take6(&self.out_n(rand, 2)[0..6])
    }

    /// f5* - resynchronisation anonymity key.
    pub fn f5_star(&self, rand: &[u8; BLOCK]) -> [u8; AK_SIZE] {
        take6(&self.out_n(rand, 5)[0..6])
    }

    /// f2/f3/f4/f5 in one call; all four share the same TEMP.
    pub fn f2345(
        &self,
        rand: &[u8; BLOCK],
    ) -> ([u8; MAC_SIZE], [u8; BLOCK], [u8; BLOCK], [u8; AK_SIZE]) {
        (self.f2(rand), self.f3(rand), self.f4(rand), self.f5(rand))
    }
}
