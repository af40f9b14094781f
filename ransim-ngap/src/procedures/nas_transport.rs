//! Uplink NAS Transport (TS 38.413 8.6.3). The downlink counterpart is
//! handled by the generic decoder, which hands the carried NAS PDU to
//! the addressed camper's UE.

use ransim_per::enc_length_determinant;

use crate::gnb::{Gnb, NgapError};
use crate::ids::{
    Criticality, ID_AMF_UE_NGAP_ID, PDU_INITIATING_MESSAGE, PROC_UPLINK_NAS_TRANSPORT,
};
use crate::ies::{ngap_pdu_header, protocol_ie_container, wrap_ie};
use crate::procedures::initial_ue_message::{enc_nas_pdu, enc_ran_ue_ngap_id};

impl Gnb {
    /// 9.2.5.3 UPLINK NAS TRANSPORT carrying the camper's staged NAS
    /// PDU.
    pub fn make_uplink_nas_transport(&mut self, ue_index: usize) -> Result<Vec<u8>, NgapError> {
        let camper = self
            .camper_mut(ue_index)
            .ok_or(NgapError::UnknownUe(ue_index))?;
        let ran_id = camper.ran_ue_ngap_id;
        let amf_id = camper
            .amf_ue_ngap_id
            .clone()
            .ok_or(NgapError::MissingAmfUeNgapId)?;
        let nas = camper
            .pending_nas
            .take()
            .ok_or(NgapError::NoPendingNas(ue_index))?;

        let mut ies = protocol_ie_container(4)?;
        ies.extend(enc_amf_ue_ngap_id(&amf_id)?);
        ies.extend(enc_ran_ue_ngap_id(ran_id)?);
        ies.extend(enc_nas_pdu(&nas)?);
        ies.extend(self.enc_user_location_information(Criticality::Ignore)?);

        let mut pdu = ngap_pdu_header(
            PDU_INITIATING_MESSAGE,
            PROC_UPLINK_NAS_TRANSPORT,
            Criticality::Ignore,
        )?;
        pdu.extend(enc_length_determinant(ies.len(), 0)?.into_bytes());
        pdu.extend(ies);
        Ok(pdu)
    }
}

/// 9.3.3.1 AMF UE NGAP ID: the octets the AMF assigned, echoed back
/// verbatim.
pub(crate) fn enc_amf_ue_ngap_id(raw: &[u8]) -> Result<Vec<u8>, NgapError> {
    wrap_ie(ID_AMF_UE_NGAP_ID, Criticality::Reject, raw)
}
