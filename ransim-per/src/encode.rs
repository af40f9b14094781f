//! ALIGNED PER encoders.
//!
//! Deployed 5G cores were the interop target for these routines, and a
//! couple of conventions below are pinned by captures from those cores
//! rather than by a strict reading of X.691:
//!
//! * a constrained whole number with range `R < 256` occupies
//!   `bit_width(R)` bits, the number of bits needed to represent `R`
//!   itself (so `R = 64` takes 7 bits, not 6);
//! * an extension marker contributes exactly one leading 0 bit,
//!   whatever the width of the field it prefixes.

use ransim_common::BitField;

use crate::PerError;

/// Bits needed to represent `v` itself (`floor(log2 v) + 1`).
pub(crate) fn bit_width(v: u64) -> usize {
    (64 - v.leading_zeros()) as usize
}

/// Octets needed for the minimum-octet encoding of `v`.
pub(crate) fn min_octets(v: u64) -> usize {
    bit_width(v.max(1)).div_ceil(8)
}

/// Appends `v` as `n` big-endian octets.
fn push_octets(bf: &mut BitField, v: u64, n: usize) {
    for i in (0..n).rev() {
        bf.push_bits((v >> (8 * i)) & 0xff, 8);
    }
}

/// X.691 10.5 - encoding of a constrained whole number.
///
/// Four cases on the range `R = max - min + 1`:
/// empty for `R = 1`; a `bit_width(R)`-bit field for `R < 256`; one
/// octet for `R = 256`; two octets for `R <= 65536`; above that, a
/// minimum-octet value preceded by an octet-count field, both
/// octet-aligned.
pub fn enc_constrained_whole_number(value: u64, min: u64, max: u64) -> Result<BitField, PerError> {
    if value < min || value > max {
        return Err(PerError::ValueOutOfRange { value, min, max });
    }

    let range = (max - min).saturating_add(1);
    let delta = value - min;

    let mut bf = BitField::new();
    if range == 1 {
        return Ok(bf); // empty bit-field
    }
    if range < 256 {
        bf.push_bits(delta, bit_width(range));
        return Ok(bf);
    }
    if range == 256 {
        bf.push_bits(delta, 8);
        return Ok(bf);
    }
    if range <= 65536 {
        bf.push_bits(delta, 16);
        return Ok(bf);
    }

    // Indefinite-range case: octet count, alignment, then the value in
    // the minimum number of octets.
    let count = min_octets(delta);
    let max_count = min_octets(range - 1);
    bf = enc_constrained_whole_number(count as u64, 1, max_count as u64)?;
    bf.pad_to_octet();
    push_octets(&mut bf, delta, count);
    Ok(bf)
}

fn with_extension(bf: BitField, extensible: bool) -> BitField {
    if !extensible {
        return bf;
    }
    let mut out = BitField::from_value(0, 1); // not extended
    out.append(&bf);
    out
}

/// X.691 10.9 - general rules for encoding a length determinant.
///
/// The constrained form applies when `max` is known and below 65536;
/// otherwise the one-octet form covers `n < 128` and the two-octet form
/// (top bit set) covers `n < 16384`. Fragmented encoding is not needed
/// for the targeted messages and is refused.
pub fn enc_length_determinant(n: usize, max: usize) -> Result<BitField, PerError> {
    if max != 0 && max < 65536 {
        return enc_constrained_whole_number(n as u64, 0, max as u64);
    }

    let mut bf = BitField::new();
    if n < 128 {
        bf.push_bits(n as u64, 8);
        return Ok(bf);
    }
    if n < 16384 {
        bf.push_bits(0x8000 | n as u64, 16);
        return Ok(bf);
    }
    Err(PerError::FragmentationRequired(n))
}

/// X.691 12 - encoding of the integer type (single value and
/// constrained whole number only).
pub fn enc_integer(value: u64, min: u64, max: u64, extensible: bool) -> Result<BitField, PerError> {
    if min == max {
        // 12.2.1 single value: nothing but the extension bit.
        return Ok(with_extension(BitField::new(), extensible));
    }
    Ok(with_extension(
        enc_constrained_whole_number(value, min, max)?,
        extensible,
    ))
}

/// X.691 13 - encoding of the enumerated type.
pub fn enc_enumerated(
    value: u64,
    min: u64,
    max: u64,
    extensible: bool,
) -> Result<BitField, PerError> {
    enc_integer(value, min, max, extensible)
}

/// X.691 22 - encoding of the choice index.
pub fn enc_choice(index: u64, min: u64, max: u64, extensible: bool) -> Result<BitField, PerError> {
    enc_integer(index, min, max, extensible)
}

/// X.691 18 - sequence preamble: the extension bit followed by one
/// presence bit per optional field, most significant option first.
///
/// The targeted messages never need more than 7 option bits.
pub fn enc_sequence(
    extensible: bool,
    opt_count: usize,
    opt_flags: u64,
) -> Result<BitField, PerError> {
    if opt_count > 7 {
        return Err(PerError::TooManyOptions(opt_count));
    }
    let mut bf = BitField::new();
    if extensible {
        bf.push_bit(false);
    }
    bf.push_bits(opt_flags, opt_count);
    Ok(bf)
}

/// X.691 19 - sequence-of: the count as a constrained whole number.
pub fn enc_sequence_of(
    count: usize,
    min: u64,
    max: u64,
    extensible: bool,
) -> Result<BitField, PerError> {
    enc_enumerated(count as u64, min, max, extensible)
}

/// X.691 15 - encoding of the bit-string type.
///
/// `value` carries the bits right-aligned (an integer in big-endian
/// octets); the result carries them left-aligned. Returns the preamble
/// (extension bit and length determinant, when the size is constrained)
/// separately from the octet-aligned content that follows it.
pub fn enc_bit_string(
    value: &[u8],
    bit_len: usize,
    min: usize,
    max: usize,
    extensible: bool,
) -> Result<(BitField, Vec<u8>), PerError> {
    if bit_len < min || bit_len > max {
        return Err(PerError::LengthOutOfRange {
            len: bit_len,
            min,
            max,
        });
    }
    if value.len() * 8 < bit_len {
        return Err(PerError::Truncated);
    }

    // Move the low `bit_len` bits of the big-endian value to the top.
    let mut content = BitField::new();
    for i in (0..bit_len).rev() {
        let byte = value[value.len() - 1 - i / 8];
        content.push_bit((byte >> (i % 8)) & 1 != 0);
    }

    let pre = if min == max {
        with_extension(BitField::new(), extensible)
    } else {
        with_extension(
            enc_constrained_whole_number(bit_len as u64, min as u64, max as u64)?,
            extensible,
        )
    };
    Ok((pre, content.into_bytes()))
}

/// X.691 16 - encoding of the octet-string type with a size constraint.
///
/// Fixed sizes of one or two octets travel in the preamble as a plain
/// bit field; fixed sizes up to 65536 are emitted octet-aligned with no
/// length; variable sizes carry a constrained length determinant in the
/// preamble.
pub fn enc_octet_string(
    value: &[u8],
    min: usize,
    max: usize,
    extensible: bool,
) -> Result<(BitField, Vec<u8>), PerError> {
    let len = value.len();
    if len < min || len > max {
        return Err(PerError::LengthOutOfRange { len, min, max });
    }

    if min == max {
        if min <= 2 {
            let mut bits = BitField::new();
            for b in value {
                bits.push_bits(u64::from(*b), 8);
            }
            return Ok((with_extension(bits, extensible), Vec::new()));
        }
        if min <= 65536 {
            return Ok((with_extension(BitField::new(), extensible), value.to_vec()));
        }
    }

    let pre = with_extension(
        enc_constrained_whole_number(len as u64, min as u64, max as u64)?,
        extensible,
    );
    Ok((pre, value.to_vec()))
}

/// Unconstrained octet string: a general length determinant followed by
/// the octets.
pub fn enc_octet_string_unconstrained(value: &[u8]) -> Result<Vec<u8>, PerError> {
    let mut out = enc_length_determinant(value.len(), 0)?.into_bytes();
    out.extend_from_slice(value);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constrained_empty_range() {
        let bf = enc_constrained_whole_number(5, 5, 5).unwrap();
        assert!(bf.is_empty());
    }

    #[test]
    fn test_constrained_bit_field_widths() {
        // Width follows bit_width(R): R = 3 -> 2 bits, R = 11 -> 4 bits,
        // R = 64 -> 7 bits, R = 1024 -> 11 bits.
        assert_eq!(enc_constrained_whole_number(2, 0, 2).unwrap().bit_len(), 2);
        assert_eq!(enc_constrained_whole_number(22, 22, 32).unwrap().bit_len(), 4);
        assert_eq!(enc_constrained_whole_number(1, 1, 64).unwrap().bit_len(), 7);
        assert_eq!(
            enc_constrained_whole_number(1, 1, 1024).unwrap().bit_len(),
            11
        );
    }

    #[test]
    fn test_constrained_octet_cases() {
        let one = enc_constrained_whole_number(0x0d, 0, 255).unwrap();
        assert_eq!(one.bit_len(), 8);
        assert_eq!(one.bytes(), &[0x0d]);

        let two = enc_constrained_whole_number(3, 0, 65535).unwrap();
        assert_eq!(two.bit_len(), 16);
        assert_eq!(two.bytes(), &[0x00, 0x03]);
    }

    #[test]
    fn test_constrained_indefinite_case() {
        // RAN-UE-NGAP-ID value 0 in 0..2^32-1: a 3-bit octet count
        // flushed to one byte, then one value octet.
        let bf = enc_constrained_whole_number(0, 0, 4_294_967_295).unwrap();
        assert_eq!(bf.into_bytes(), vec![0x00, 0x00]);

        // AMF-UE-NGAP-ID value 1 in 0..2^40-1.
        let bf = enc_constrained_whole_number(1, 0, (1 << 40) - 1).unwrap();
        assert_eq!(bf.into_bytes(), vec![0x00, 0x01]);

        // A value needing two octets.
        let bf = enc_constrained_whole_number(0x1234, 0, 4_294_967_295).unwrap();
        assert_eq!(bf.into_bytes(), vec![0x20, 0x12, 0x34]);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!(
            enc_constrained_whole_number(9, 0, 8).unwrap_err(),
            PerError::ValueOutOfRange {
                value: 9,
                min: 0,
                max: 8
            }
        );
    }

    #[test]
    fn test_length_determinant_forms() {
        assert_eq!(enc_length_determinant(40, 0).unwrap().bytes(), &[0x28]);
        assert_eq!(enc_length_determinant(127, 0).unwrap().bytes(), &[0x7f]);
        assert_eq!(
            enc_length_determinant(128, 0).unwrap().bytes(),
            &[0x80, 0x80]
        );
        assert_eq!(
            enc_length_determinant(0x1234, 0).unwrap().bytes(),
            &[0x92, 0x34]
        );
        assert_eq!(
            enc_length_determinant(16384, 0).unwrap_err(),
            PerError::FragmentationRequired(16384)
        );
    }

    #[test]
    fn test_integer_extension_bit() {
        // Extension marker is exactly one leading zero bit.
        let bf = enc_integer(3, 0, 14, true).unwrap();
        assert_eq!(bf.bit_len(), 5);
        assert_eq!(bf.bytes(), &[0x18]);

        // Single-value integer with extension: just the marker.
        let bf = enc_integer(0, 0, 0, true).unwrap();
        assert_eq!(bf.bit_len(), 1);
        assert_eq!(bf.bytes(), &[0x00]);
    }

    #[test]
    fn test_enumerated_paging_drx() {
        assert_eq!(enc_enumerated(0, 0, 3, true).unwrap().bytes(), &[0x00]);
        assert_eq!(enc_enumerated(2, 0, 3, true).unwrap().bytes(), &[0x40]);
    }

    #[test]
    fn test_choice_ngap_pdu() {
        // NGAP-PDU choice: initiating / successful / unsuccessful.
        assert_eq!(enc_choice(0, 0, 2, true).unwrap().bytes(), &[0x00]);
        assert_eq!(enc_choice(1, 0, 2, true).unwrap().bytes(), &[0x20]);
        assert_eq!(enc_choice(2, 0, 2, true).unwrap().bytes(), &[0x40]);
    }

    #[test]
    fn test_sequence_preamble() {
        // S-NSSAI: extensible, two options, SD present.
        let bf = enc_sequence(true, 2, 0x02).unwrap();
        assert_eq!(bf.bit_len(), 3);
        assert_eq!(bf.bytes(), &[0b0100_0000]);

        assert_eq!(
            enc_sequence(true, 8, 0).unwrap_err(),
            PerError::TooManyOptions(8)
        );
    }

    #[test]
    fn test_bit_string_gnb_id() {
        // 22-bit gNB ID of value 1 in SIZE(22..32): 4-bit length field,
        // then the bits left-aligned in three octets.
        let (pre, content) = enc_bit_string(&1u32.to_be_bytes(), 22, 22, 32, false).unwrap();
        assert_eq!(pre.bit_len(), 4);
        assert_eq!(pre.bytes(), &[0x00]);
        assert_eq!(content, vec![0x00, 0x00, 0x04]);
    }

    #[test]
    fn test_bit_string_transport_address() {
        // IPv4 transport layer address in SIZE(1..160, ...): one
        // extension bit plus an 8-bit length field.
        let addr = [192, 168, 1, 3];
        let (pre, content) = enc_bit_string(&addr, 32, 1, 160, true).unwrap();
        assert_eq!(pre.bit_len(), 9);
        assert_eq!(content, addr.to_vec());
    }

    #[test]
    fn test_octet_string_cases() {
        // Fixed size 1: travels as a bit field in the preamble.
        let (pre, content) = enc_octet_string(&[0x01], 1, 1, false).unwrap();
        assert_eq!(pre.bit_len(), 8);
        assert_eq!(pre.bytes(), &[0x01]);
        assert!(content.is_empty());

        // Fixed size 3: octet-aligned, no length.
        let (pre, content) = enc_octet_string(&[0x00, 0x00, 0x01], 3, 3, false).unwrap();
        assert!(pre.is_empty());
        assert_eq!(content, vec![0x00, 0x00, 0x01]);

        // Variable size: constrained length determinant in the preamble.
        let (pre, content) = enc_octet_string(&[0xab, 0xcd], 1, 16, false).unwrap();
        assert_eq!(pre.bit_len(), 5);
        assert_eq!(content, vec![0xab, 0xcd]);
    }

    #[test]
    fn test_octet_string_unconstrained() {
        let out = enc_octet_string_unconstrained(&[0x7e, 0x00, 0x41]).unwrap();
        assert_eq!(out, vec![0x03, 0x7e, 0x00, 0x41]);
    }
}
