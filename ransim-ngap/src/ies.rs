//! Shared NGAP information element builders.
//!
//! Every builder returns whole octets ready to be concatenated into a
//! ProtocolIE container; sub-octet PER fields are composed through
//! `BitField` and flushed at the same boundaries deployed cores expect.

use ransim_common::BitField;
use ransim_per::{
    enc_bit_string, enc_choice, enc_enumerated, enc_integer, enc_length_determinant,
    enc_octet_string, enc_sequence, enc_sequence_of,
};

use crate::gnb::NgapError;
use crate::ids::Criticality;

/// `{id(u16), criticality}` prefix of a ProtocolIE field.
pub fn protocol_ie_header(id: u16, criticality: Criticality) -> Result<Vec<u8>, NgapError> {
    let mut out = enc_integer(u64::from(id), 0, 65535, false)?.into_bytes();
    out.extend(enc_enumerated(criticality as u64, 0, 2, false)?.into_bytes());
    Ok(out)
}

/// A complete ProtocolIE field: id, criticality, length, value.
pub fn wrap_ie(id: u16, criticality: Criticality, value: &[u8]) -> Result<Vec<u8>, NgapError> {
    let mut out = protocol_ie_header(id, criticality)?;
    out.extend(enc_length_determinant(value.len(), 0)?.into_bytes());
    out.extend_from_slice(value);
    Ok(out)
}

/// The three octets opening every NGAP PDU: choice, procedure code,
/// criticality.
pub fn ngap_pdu_header(
    pdu_type: u64,
    procedure_code: u8,
    criticality: Criticality,
) -> Result<Vec<u8>, NgapError> {
    let mut out = enc_choice(pdu_type, 0, 2, true)?.into_bytes();
    out.extend(enc_integer(u64::from(procedure_code), 0, 255, false)?.into_bytes());
    out.extend(enc_enumerated(criticality as u64, 0, 2, false)?.into_bytes());
    Ok(out)
}

/// ProtocolIE container preamble: message sequence preamble plus the
/// IE count.
pub fn protocol_ie_container(count: usize) -> Result<Vec<u8>, NgapError> {
    const MAX_PROTOCOL_IES: u64 = 65535;
    let mut out = enc_sequence(true, 0, 0)?.into_bytes();
    out.extend(enc_sequence_of(count, 0, MAX_PROTOCOL_IES, false)?.into_bytes());
    Ok(out)
}

/// Number of bits a gNB ID occupies on the wire (22 minimum).
pub fn gnb_id_bit_len(gnb_id: u32) -> usize {
    ((32 - gnb_id.leading_zeros()) as usize).max(22)
}

/// GNB-ID choice with its 22-32 bit string (TS 38.413 9.3.1.6).
pub fn enc_gnb_id(gnb_id: u32) -> Result<Vec<u8>, NgapError> {
    let mut b = enc_choice(0, 0, 1, false)?;
    let (pre, content) = enc_bit_string(&gnb_id.to_be_bytes(), gnb_id_bit_len(gnb_id), 22, 32, false)?;
    b.append(&pre);
    let mut out = b.into_bytes();
    out.extend(content);
    Ok(out)
}

/// TAC as a fixed three-octet string (TS 38.413 9.3.3.10).
pub fn enc_tac(tac: u32) -> Result<Vec<u8>, NgapError> {
    let bytes = tac.to_be_bytes();
    let (_, v) = enc_octet_string(&bytes[1..], 3, 3, false)?;
    Ok(v)
}

/// NR Cell Identity: the gNB ID in the leftmost bits, the cell index in
/// the remainder of the 36 (TS 38.413 9.3.1.7).
pub fn nr_cell_identity_bits(gnb_id: u32, cell_id: u64) -> BitField {
    let gnb_bits = gnb_id_bit_len(gnb_id);
    let mut bf = BitField::from_value(u64::from(gnb_id), gnb_bits);
    bf.push_bits(cell_id, 36 - gnb_bits);
    bf
}

/// SliceSupportList with its count field flushed ahead of the items.
pub fn enc_slice_support_list(
    list: &[ransim_common::SNssai],
) -> Result<Vec<u8>, NgapError> {
    const MAX_SLICE_ITEMS: u64 = 1024;
    let mut out = enc_sequence_of(list.len(), 1, MAX_SLICE_ITEMS, false)?.into_bytes();

    for snssai in list {
        let sd = snssai.sd_bytes()?;
        let mut b = enc_sequence(true, 1, 0)?;
        b.append(&enc_sequence(true, 2, if sd.is_some() { 0x02 } else { 0 })?);
        let (sst_bits, _) = enc_octet_string(&[snssai.sst], 1, 1, false)?;
        b.append(&sst_bits);
        out.extend(b.into_bytes());

        if let Some(sd) = sd {
            let (_, v) = enc_octet_string(&sd, 3, 3, false)?;
            out.extend(v);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ransim_common::SNssai;

    #[test]
    fn test_ngap_pdu_header() {
        assert_eq!(
            ngap_pdu_header(crate::ids::PDU_INITIATING_MESSAGE, 21, Criticality::Reject).unwrap(),
            vec![0x00, 0x15, 0x00]
        );
        assert_eq!(
            ngap_pdu_header(crate::ids::PDU_SUCCESSFUL_OUTCOME, 14, Criticality::Reject).unwrap(),
            vec![0x20, 0x0e, 0x00]
        );
    }

    #[test]
    fn test_protocol_ie_container() {
        assert_eq!(
            protocol_ie_container(3).unwrap(),
            vec![0x00, 0x00, 0x03]
        );
    }

    #[test]
    fn test_wrap_ie() {
        let out = wrap_ie(85, Criticality::Reject, &[0x00, 0x00]).unwrap();
        assert_eq!(out, vec![0x00, 0x55, 0x00, 0x02, 0x00, 0x00]);
    }

    #[test]
    fn test_gnb_id_22_bits() {
        // Value 1: choice bit + 4-bit size field, then 22 bits aligned.
        assert_eq!(enc_gnb_id(1).unwrap(), vec![0x00, 0x00, 0x00, 0x04]);
    }

    #[test]
    fn test_nr_cell_identity() {
        let bits = nr_cell_identity_bits(1, 1);
        assert_eq!(bits.bit_len(), 36);
        // (1 << 14) | 1 left-aligned in five octets.
        assert_eq!(bits.bytes(), &[0x00, 0x00, 0x04, 0x00, 0x10]);
    }

    #[test]
    fn test_slice_support_list() {
        let list = [SNssai {
            sst: 1,
            sd: Some("010203".into()),
        }];
        assert_eq!(
            enc_slice_support_list(&list).unwrap(),
            vec![0x00, 0x00, 0x10, 0x08, 0x01, 0x02, 0x03]
        );
    }

    #[test]
    fn test_tac() {
        assert_eq!(enc_tac(1).unwrap(), vec![0x00, 0x00, 0x01]);
        assert_eq!(enc_tac(0x123456).unwrap(), vec![0x12, 0x34, 0x56]);
    }
}
