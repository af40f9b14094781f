//! Partial PER decoding.
//!
//! The NGAP layer only needs to peel length determinants, walk
//! ProtocolIE containers octet by octet, and pull a handful of
//! bit-level fields out of known IE values. `BitReader` covers the
//! bit-level part; everything octet-aligned goes through `OctetView`.

use ransim_common::OctetView;

use crate::encode::{bit_width, min_octets};
use crate::PerError;

/// Decodes a general-form length determinant (X.691 10.9): one octet
/// below 128, two octets with the top bit set below 16384.
pub fn dec_length_determinant(view: &OctetView<'_>) -> Result<usize, PerError> {
    let b0 = view.read().map_err(|_| PerError::Truncated)?;
    if b0 & 0x80 == 0 {
        return Ok(usize::from(b0));
    }
    if b0 & 0xc0 == 0x80 {
        let b1 = view.read().map_err(|_| PerError::Truncated)?;
        return Ok((usize::from(b0 & 0x3f) << 8) | usize::from(b1));
    }
    // Fragmented form; never produced by the peers we target.
    Err(PerError::InvalidLengthDeterminant(b0))
}

/// MSB-first bit reader over a byte slice.
///
/// Used to take apart IE values whose leading fields are not
/// octet-aligned, such as the UP transport layer information.
pub struct BitReader<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a reader positioned at the first bit.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, index: 0 }
    }

    /// Reads one bit.
    pub fn read_bit(&mut self) -> Result<bool, PerError> {
        if self.index >= self.data.len() * 8 {
            return Err(PerError::Truncated);
        }
        let bit = (self.data[self.index / 8] >> (7 - self.index % 8)) & 1 != 0;
        self.index += 1;
        Ok(bit)
    }

    /// Reads `n` bits (up to 64) MSB first.
    pub fn read_bits(&mut self, n: usize) -> Result<u64, PerError> {
        let mut out = 0u64;
        for _ in 0..n {
            out = (out << 1) | u64::from(self.read_bit()?);
        }
        Ok(out)
    }

    /// Skips `n` bits.
    pub fn skip(&mut self, n: usize) -> Result<(), PerError> {
        if self.index + n > self.data.len() * 8 {
            return Err(PerError::Truncated);
        }
        self.index += n;
        Ok(())
    }

    /// Advances to the next octet boundary.
    pub fn align(&mut self) {
        self.index = self.index.div_ceil(8) * 8;
    }

    /// Reads `n` whole octets; the reader must be octet-aligned.
    pub fn read_aligned_bytes(&mut self, n: usize) -> Result<&'a [u8], PerError> {
        debug_assert_eq!(self.index % 8, 0, "reader must be octet-aligned");
        let start = self.index / 8;
        if start + n > self.data.len() {
            return Err(PerError::Truncated);
        }
        self.index += n * 8;
        Ok(&self.data[start..start + n])
    }

    /// Bits left to read.
    pub fn remaining_bits(&self) -> usize {
        self.data.len() * 8 - self.index
    }
}

/// Decodes a constrained whole number, the inverse of
/// [`crate::enc_constrained_whole_number`] over the same four range
/// cases.
pub fn dec_constrained_whole_number(
    bits: &mut BitReader<'_>,
    min: u64,
    max: u64,
) -> Result<u64, PerError> {
    let range = (max - min).saturating_add(1);
    if range == 1 {
        return Ok(min);
    }
    if range < 256 {
        return Ok(min + bits.read_bits(bit_width(range))?);
    }
    if range == 256 {
        return Ok(min + bits.read_bits(8)?);
    }
    if range <= 65536 {
        return Ok(min + bits.read_bits(16)?);
    }

    let max_count = min_octets(range - 1);
    let count = dec_constrained_whole_number(bits, 1, max_count as u64)? as usize;
    bits.align();
    let octets = bits.read_aligned_bytes(count)?;
    let delta = octets.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    Ok(min + delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::enc_length_determinant;

    #[test]
    fn test_length_determinant_round_trip() {
        for n in [0usize, 1, 40, 127, 128, 200, 5000, 16383] {
            let enc = enc_length_determinant(n, 0).unwrap().into_bytes();
            let view = OctetView::new(&enc);
            assert_eq!(dec_length_determinant(&view).unwrap(), n);
            assert!(!view.has_next());
        }
    }

    #[test]
    fn test_fragmented_form_rejected() {
        let data = [0xc1, 0x00];
        let view = OctetView::new(&data);
        assert_eq!(
            dec_length_determinant(&view).unwrap_err(),
            PerError::InvalidLengthDeterminant(0xc1)
        );
    }

    #[test]
    fn test_bit_reader_up_tnl_layout() {
        // choice(1) + seq-ext(1) + option(1) + tla-ext(1) + len(8),
        // then the address at the next octet boundary.
        let value = [0x01, 0xf0, 0xc0, 0xa8, 0x01, 0x12, 0x00, 0x00, 0x00, 0x01];
        let mut bits = BitReader::new(&value);
        bits.skip(3).unwrap();
        assert!(!bits.read_bit().unwrap());
        let bit_len = bits.read_bits(8).unwrap() as usize + 1;
        assert_eq!(bit_len, 32);
        bits.align();
        assert_eq!(
            bits.read_aligned_bytes(bit_len.div_ceil(8)).unwrap(),
            &[192, 168, 1, 18]
        );
        assert_eq!(bits.read_aligned_bytes(4).unwrap(), &[0, 0, 0, 1]);
        assert_eq!(bits.remaining_bits(), 0);
    }

    #[test]
    fn test_bit_reader_truncated() {
        let mut bits = BitReader::new(&[0xff]);
        bits.skip(8).unwrap();
        assert_eq!(bits.read_bit().unwrap_err(), PerError::Truncated);
    }

    #[test]
    fn test_constrained_whole_number_round_trip() {
        let cases: &[(u64, u64, u64)] = &[
            (5, 5, 5),                   // empty bit-field
            (0, 0, 2),                   // small bit-field
            (22, 22, 32),                // offset range
            (63, 1, 64),                 // power-of-two range
            (0x0d, 0, 255),              // one octet
            (999, 0, 65535),             // two octets
            (0, 0, 4_294_967_295),       // indefinite, one value octet
            (0x1234, 0, 4_294_967_295),  // indefinite, two value octets
            (1, 0, (1 << 40) - 1),       // 40-bit range
            ((1 << 40) - 1, 0, (1 << 40) - 1),
        ];
        for &(v, min, max) in cases {
            let enc = crate::enc_constrained_whole_number(v, min, max)
                .unwrap()
                .into_bytes();
            let mut bits = BitReader::new(&enc);
            assert_eq!(
                dec_constrained_whole_number(&mut bits, min, max).unwrap(),
                v,
                "round trip of {v} in {min}..={max}"
            );
        }
    }
}
