//! PDU Session Resource Setup (TS 38.413 8.2.1). The request side is
//! decoded by the generic walker; the response announces the gNB's
//! GTP-U tunnel endpoint for the session.

use std::net::IpAddr;

use ransim_per::{
    enc_bit_string, enc_choice, enc_integer, enc_length_determinant, enc_octet_string,
    enc_sequence, enc_sequence_of,
};

use crate::gnb::{Gnb, NgapError};
use crate::ids::{
    Criticality, ID_PDU_SESSION_RESOURCE_SETUP_LIST_SU_RES, PDU_SUCCESSFUL_OUTCOME,
    PROC_PDU_SESSION_RESOURCE_SETUP,
};
use crate::ies::{ngap_pdu_header, protocol_ie_container, wrap_ie};
use crate::procedures::initial_ue_message::enc_ran_ue_ngap_id;
use crate::procedures::nas_transport::enc_amf_ue_ngap_id;

impl Gnb {
    /// 9.2.1.2 PDU SESSION RESOURCE SETUP RESPONSE for the camper's
    /// pending session.
    pub fn make_pdu_session_resource_setup_response(
        &mut self,
        ue_index: usize,
    ) -> Result<Vec<u8>, NgapError> {
        let gtpu_addr = self.gtpu_local_addr();
        let gtpu_teid = self.gtpu_teid;

        let camper = self
            .camper_mut(ue_index)
            .ok_or(NgapError::UnknownUe(ue_index))?;
        let ran_id = camper.ran_ue_ngap_id;
        let amf_id = camper
            .amf_ue_ngap_id
            .clone()
            .ok_or(NgapError::MissingAmfUeNgapId)?;
        let psi = camper.pdu_session_id.ok_or(NgapError::NoPduSession)?;
        let qfi = camper.qos_flow_id;

        let mut ies = protocol_ie_container(3)?;
        ies.extend(enc_amf_ue_ngap_id(&amf_id)?);
        ies.extend(enc_ran_ue_ngap_id(ran_id)?);
        ies.extend(enc_setup_list_su_res(psi, gtpu_addr, gtpu_teid, qfi)?);

        let mut pdu = ngap_pdu_header(
            PDU_SUCCESSFUL_OUTCOME,
            PROC_PDU_SESSION_RESOURCE_SETUP,
            Criticality::Reject,
        )?;
        pdu.extend(enc_length_determinant(ies.len(), 0)?.into_bytes());
        pdu.extend(ies);
        Ok(pdu)
    }
}

/// PDUSessionResourceSetupListSURes with one item.
fn enc_setup_list_su_res(
    psi: u8,
    addr: IpAddr,
    teid: u32,
    qfi: u8,
) -> Result<Vec<u8>, NgapError> {
    const MAX_PDU_SESSIONS: u64 = 256;

    let mut b = enc_sequence_of(1, 1, MAX_PDU_SESSIONS, false)?;
    b.append(&enc_sequence(true, 1, 0)?);
    let mut value = b.into_bytes();

    value.extend(enc_integer(u64::from(psi), 0, 255, false)?.into_bytes());

    let transfer = enc_setup_response_transfer(addr, teid, qfi)?;
    value.extend(enc_length_determinant(transfer.len(), 0)?.into_bytes());
    value.extend(transfer);

    wrap_ie(
        ID_PDU_SESSION_RESOURCE_SETUP_LIST_SU_RES,
        Criticality::Ignore,
        &value,
    )
}

/// 9.3.4.2 PDU Session Resource Setup Response Transfer: the DL QoS
/// flow per TNL information with the gNB's GTP tunnel.
fn enc_setup_response_transfer(addr: IpAddr, teid: u32, qfi: u8) -> Result<Vec<u8>, NgapError> {
    let IpAddr::V4(addr) = addr else {
        return Err(NgapError::UnsupportedAddress(16));
    };

    let mut b = enc_sequence(true, 4, 0)?; // transfer preamble
    b.append(&enc_sequence(true, 1, 0)?); // QosFlowPerTNLInformation
    b.append(&enc_choice(0, 0, 1, false)?); // gTPTunnel
    b.append(&enc_sequence(true, 1, 0)?); // GTPTunnel sequence

    // 9.3.2.4 Transport Layer Address: BIT STRING (SIZE(1..160, ...)).
    let (pre, content) = enc_bit_string(&addr.octets(), 32, 1, 160, true)?;
    b.append(&pre);
    let mut out = b.into_bytes();
    out.extend(content);

    // 9.3.2.5 GTP-TEID: OCTET STRING (SIZE(4)).
    let (_, teid_octets) = enc_octet_string(&teid.to_be_bytes(), 4, 4, false)?;
    out.extend(teid_octets);

    // 9.3.1.99 Associated QoS Flow List with the single flow.
    const MAX_QOS_FLOWS: u64 = 64;
    let mut q = enc_sequence_of(1, 1, MAX_QOS_FLOWS, false)?;
    q.append(&enc_sequence(true, 1, 0)?);
    q.append(&enc_integer(u64::from(qfi), 0, 63, false)?);
    out.extend(q.into_bytes());

    Ok(out)
}
