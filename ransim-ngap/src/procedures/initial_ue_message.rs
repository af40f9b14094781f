//! Initial UE Message (TS 38.413 8.6.1): the first uplink for a camper,
//! carrying its Registration Request.

use ransim_common::BitField;
use ransim_per::{
    enc_choice, enc_enumerated, enc_integer, enc_length_determinant,
    enc_octet_string_unconstrained, enc_sequence,
};

use crate::gnb::{Gnb, NgapError};
use crate::ids::{
    Criticality, ID_NAS_PDU, ID_RAN_UE_NGAP_ID, ID_RRC_ESTABLISHMENT_CAUSE,
    ID_UE_CONTEXT_REQUEST, ID_USER_LOCATION_INFORMATION, PDU_INITIATING_MESSAGE,
    PROC_INITIAL_UE_MESSAGE, RRC_CAUSE_MO_SIGNALLING,
};
use crate::ies::{ngap_pdu_header, nr_cell_identity_bits, enc_tac, protocol_ie_container, wrap_ie};

impl Gnb {
    /// 9.2.5.1 INITIAL UE MESSAGE with the mandatory IEs plus the UE
    /// context request.
    pub fn make_initial_ue_message(&mut self, ue_index: usize) -> Result<Vec<u8>, NgapError> {
        let camper = self
            .camper_mut(ue_index)
            .ok_or(NgapError::UnknownUe(ue_index))?;
        let ran_id = camper.ran_ue_ngap_id;
        let nas = camper
            .pending_nas
            .take()
            .ok_or(NgapError::NoPendingNas(ue_index))?;

        let mut ies = protocol_ie_container(5)?;
        ies.extend(enc_ran_ue_ngap_id(ran_id)?);
        ies.extend(enc_nas_pdu(&nas)?);
        ies.extend(self.enc_user_location_information(Criticality::Reject)?);
        ies.extend(enc_rrc_establishment_cause()?);
        ies.extend(enc_ue_context_request()?);

        let mut pdu = ngap_pdu_header(
            PDU_INITIATING_MESSAGE,
            PROC_INITIAL_UE_MESSAGE,
            Criticality::Ignore,
        )?;
        pdu.extend(enc_length_determinant(ies.len(), 0)?.into_bytes());
        pdu.extend(ies);
        Ok(pdu)
    }

    /// 9.3.1.16 User Location Information, NR variant.
    ///
    /// The criticality differs between the procedures that carry it, so
    /// the caller picks it.
    pub(crate) fn enc_user_location_information(
        &self,
        criticality: Criticality,
    ) -> Result<Vec<u8>, NgapError> {
        let mut b = enc_choice(1, 0, 2, false)?; // userLocationInformationNR
        b.append(&enc_sequence(true, 2, 0)?); // timeStamp, iE-Extensions absent
        b.append(&enc_sequence(true, 1, 0)?); // NR-CGI preamble
        let mut value = b.into_bytes();

        // NR-CGI content and the TAI preamble pack as one bit run.
        let mut cont = BitField::from_bytes(self.plmn.encode().to_vec());
        cont.append(&nr_cell_identity_bits(self.gnb_id, self.nr_cell_id));
        cont.append(&enc_sequence(true, 1, 0)?); // TAI preamble
        value.extend(cont.into_bytes());

        value.extend(self.plmn.encode());
        value.extend(enc_tac(self.tac)?);
        wrap_ie(ID_USER_LOCATION_INFORMATION, criticality, &value)
    }
}

/// 9.3.3.2 RAN UE NGAP ID.
pub(crate) fn enc_ran_ue_ngap_id(ran_id: u32) -> Result<Vec<u8>, NgapError> {
    let value = enc_integer(u64::from(ran_id), 0, 4_294_967_295, false)?.into_bytes();
    wrap_ie(ID_RAN_UE_NGAP_ID, Criticality::Reject, &value)
}

/// 9.3.3.4 NAS-PDU: an unconstrained octet string.
pub(crate) fn enc_nas_pdu(nas: &[u8]) -> Result<Vec<u8>, NgapError> {
    let value = enc_octet_string_unconstrained(nas)?;
    wrap_ie(ID_NAS_PDU, Criticality::Reject, &value)
}

/// 9.3.1.111 RRC Establishment Cause: mo-Signalling.
fn enc_rrc_establishment_cause() -> Result<Vec<u8>, NgapError> {
    let value = enc_enumerated(RRC_CAUSE_MO_SIGNALLING, 0, 14, true)?.into_bytes();
    wrap_ie(ID_RRC_ESTABLISHMENT_CAUSE, Criticality::Ignore, &value)
}

/// UE Context Request of 9.2.5.1: requested.
fn enc_ue_context_request() -> Result<Vec<u8>, NgapError> {
    let value = enc_enumerated(0, 0, 0, true)?.into_bytes();
    wrap_ie(ID_UE_CONTEXT_REQUEST, Criticality::Ignore, &value)
}
