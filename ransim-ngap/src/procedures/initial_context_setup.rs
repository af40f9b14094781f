//! Initial Context Setup (TS 38.413 8.3.1). The request is decoded by
//! the generic walker (delivering any carried NAS PDU); the response
//! only echoes the NGAP id pair.

use ransim_per::enc_length_determinant;

use crate::gnb::{Gnb, NgapError};
use crate::ids::{Criticality, PDU_SUCCESSFUL_OUTCOME, PROC_INITIAL_CONTEXT_SETUP};
use crate::ies::{ngap_pdu_header, protocol_ie_container};
use crate::procedures::initial_ue_message::enc_ran_ue_ngap_id;
use crate::procedures::nas_transport::enc_amf_ue_ngap_id;

impl Gnb {
    /// 9.2.2.2 INITIAL CONTEXT SETUP RESPONSE.
    pub fn make_initial_context_setup_response(
        &mut self,
        ue_index: usize,
    ) -> Result<Vec<u8>, NgapError> {
        let camper = self
            .camper_mut(ue_index)
            .ok_or(NgapError::UnknownUe(ue_index))?;
        let ran_id = camper.ran_ue_ngap_id;
        let amf_id = camper
            .amf_ue_ngap_id
            .clone()
            .ok_or(NgapError::MissingAmfUeNgapId)?;

        let mut ies = protocol_ie_container(2)?;
        ies.extend(enc_amf_ue_ngap_id(&amf_id)?);
        ies.extend(enc_ran_ue_ngap_id(ran_id)?);

        let mut pdu = ngap_pdu_header(
            PDU_SUCCESSFUL_OUTCOME,
            PROC_INITIAL_CONTEXT_SETUP,
            Criticality::Reject,
        )?;
        pdu.extend(enc_length_determinant(ies.len(), 0)?.into_bytes());
        pdu.extend(ies);
        Ok(pdu)
    }
}
