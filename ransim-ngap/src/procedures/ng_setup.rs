//! NG Setup procedure (TS 38.413 8.7.1).
//!
//! Announces the gNB identity, supported tracking areas and paging DRX
//! to the AMF. The response is informational here; its IEs (AMF name,
//! served GUAMIs, PLMN support) are logged by the generic decoder.

use ransim_per::{enc_choice, enc_enumerated, enc_length_determinant, enc_sequence,
    enc_sequence_of};

use crate::gnb::{Gnb, NgapError};
use crate::ids::{
    Criticality, ID_DEFAULT_PAGING_DRX, ID_GLOBAL_RAN_NODE_ID, ID_SUPPORTED_TA_LIST,
    PDU_INITIATING_MESSAGE, PROC_NG_SETUP,
};
use crate::ies::{
    enc_gnb_id, enc_slice_support_list, enc_tac, ngap_pdu_header, protocol_ie_container, wrap_ie,
};

impl Gnb {
    /// 9.2.6.1 NG SETUP REQUEST.
    pub fn make_ng_setup_request(&self) -> Result<Vec<u8>, NgapError> {
        let mut ies = protocol_ie_container(3)?;
        ies.extend(self.enc_global_ran_node_id()?);
        ies.extend(self.enc_supported_ta_list()?);
        ies.extend(self.enc_default_paging_drx()?);

        let mut pdu = ngap_pdu_header(PDU_INITIATING_MESSAGE, PROC_NG_SETUP, Criticality::Reject)?;
        pdu.extend(enc_length_determinant(ies.len(), 0)?.into_bytes());
        pdu.extend(ies);
        Ok(pdu)
    }

    /// 9.3.1.5 Global RAN Node ID, gNB variant.
    fn enc_global_ran_node_id(&self) -> Result<Vec<u8>, NgapError> {
        let mut b = enc_choice(0, 0, 2, false)?; // globalGNB-ID
        b.append(&enc_sequence(true, 1, 0)?);
        let mut value = b.into_bytes();
        value.extend(self.plmn.encode());
        value.extend(enc_gnb_id(self.gnb_id)?);
        wrap_ie(ID_GLOBAL_RAN_NODE_ID, Criticality::Reject, &value)
    }

    /// Supported TA List of 9.2.6.1.
    fn enc_supported_ta_list(&self) -> Result<Vec<u8>, NgapError> {
        const MAX_TACS: u64 = 256;
        let mut value = enc_sequence_of(self.supported_ta_list.len(), 1, MAX_TACS, false)?
            .into_bytes();

        for ta in &self.supported_ta_list {
            let mut item = enc_sequence(true, 1, 0)?.into_bytes();
            item.extend(enc_tac(ta.tac)?);
            item.extend(enc_broadcast_plmn_list(ta)?);
            value.extend(item);
        }
        wrap_ie(ID_SUPPORTED_TA_LIST, Criticality::Reject, &value)
    }

    /// 9.3.1.90 PagingDRX.
    fn enc_default_paging_drx(&self) -> Result<Vec<u8>, NgapError> {
        let value = enc_enumerated(self.paging_drx.index(), 0, 3, true)?.into_bytes();
        wrap_ie(ID_DEFAULT_PAGING_DRX, Criticality::Ignore, &value)
    }
}

/// Broadcast PLMN List of 9.2.6.1; the first item's sequence preamble
/// merges with the list count field.
fn enc_broadcast_plmn_list(ta: &ransim_common::SupportedTa) -> Result<Vec<u8>, NgapError> {
    const MAX_BPLMNS: u64 = 12;
    let head = enc_sequence_of(ta.broadcast_plmn_list.len(), 1, MAX_BPLMNS, false)?;

    let mut out = Vec::new();
    for (i, bplmn) in ta.broadcast_plmn_list.iter().enumerate() {
        let pre = enc_sequence(true, 1, 0)?;
        if i == 0 {
            let mut merged = head.clone();
            merged.append(&pre);
            out.extend(merged.into_bytes());
        } else {
            out.extend(pre.into_bytes());
        }
        out.extend(bplmn.plmn.encode());
        out.extend(enc_slice_support_list(&bplmn.slice_support_list)?);
    }
    Ok(out)
}
