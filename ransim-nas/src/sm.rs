//! 5GS session management messages (TS 24.501 8.3).

use tracing::{debug, warn};

use ransim_common::OctetView;

use crate::enums::{Epd, MmMessageType, SecurityHeaderType, SmMessageType};
use crate::ies::{IEI_5GSM_CAUSE, IEI_DNN, IEI_PDU_ADDRESS, IEI_PDU_SESSION_ID2,
    IEI_PDU_SESSION_TYPE, IEI_REQUEST_TYPE, IEI_SNSSAI};
use crate::ue::{NasError, Ue};

/// Payload container type: N1 SM information (TS 24.501 9.11.3.40).
pub const PAYLOAD_CONTAINER_N1_SM: u8 = 0x01;

/// Request type: initial request (TS 24.501 9.11.3.47).
const REQUEST_TYPE_INITIAL: u8 = 0x01;

/// PDU session type IPv4v6 (TS 24.501 9.11.4.11).
const PDU_SESSION_IPV4V6: u8 = 0x03;

impl Ue {
    /// 8.3.1 PDU Session Establishment Request, wrapped in an UL NAS
    /// Transport and integrity protected.
    pub fn make_pdu_session_establishment_request(&mut self) -> Result<Vec<u8>, NasError> {
        self.psi = 0x01;
        self.pti = 0x01;

        let mut sm = vec![
            Epd::SessionManagement.into(),
            self.psi,
            self.pti,
            SmMessageType::PduSessionEstablishmentRequest.into(),
        ];
        // Integrity protection maximum data rate: full rate both ways.
        sm.extend_from_slice(&[0xff, 0xff]);
        sm.push((IEI_PDU_SESSION_TYPE << 4) | PDU_SESSION_IPV4V6);

        let transport = self.encode_ul_nas_transport(
            PAYLOAD_CONTAINER_N1_SM,
            SmMessageType::PduSessionEstablishmentRequest,
            &sm,
        )?;
        self.emit_secure(SecurityHeaderType::IntegrityProtectedAndCiphered, transport)
    }

    /// 8.2.10 UL NAS Transport around a 5GSM payload.
    pub(crate) fn encode_ul_nas_transport(
        &self,
        payload_type: u8,
        message_type: SmMessageType,
        payload: &[u8],
    ) -> Result<Vec<u8>, NasError> {
        let mut pdu = Self::plain_mm_header(MmMessageType::UlNasTransport);

        pdu.push(payload_type);
        pdu.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        pdu.extend_from_slice(payload);

        if payload_type == PAYLOAD_CONTAINER_N1_SM {
            pdu.push(IEI_PDU_SESSION_ID2);
            pdu.push(self.psi);
        }

        if message_type == SmMessageType::PduSessionEstablishmentRequest {
            pdu.push((IEI_REQUEST_TYPE << 4) | REQUEST_TYPE_INITIAL);
        }

        if payload_type == PAYLOAD_CONTAINER_N1_SM
            && message_type == SmMessageType::PduSessionEstablishmentRequest
        {
            pdu.push(IEI_SNSSAI);
            match self.snssai.sd_bytes()? {
                Some(sd) => {
                    pdu.push(4);
                    pdu.push(self.snssai.sst);
                    pdu.extend_from_slice(&sd);
                }
                None => {
                    pdu.push(1);
                    pdu.push(self.snssai.sst);
                }
            }

            pdu.push(IEI_DNN);
            let mut dnn = Vec::with_capacity(self.dnn.len() + 1);
            for label in self.dnn.split('.') {
                dnn.push(label.len() as u8);
                dnn.extend_from_slice(label.as_bytes());
            }
            pdu.push(dnn.len() as u8);
            pdu.extend_from_slice(&dnn);
        }

        Ok(pdu)
    }

    /// 8.3.2 PDU Session Establishment Accept.
    pub(crate) fn dec_pdu_session_establishment_accept(
        &mut self,
        view: &OctetView<'_>,
    ) -> Result<(), NasError> {
        let type_and_ssc = view.read()?;
        debug!(
            "selected PDU session type {} ssc mode {}",
            type_and_ssc & 0x0f,
            type_and_ssc >> 4
        );

        let rules_len = view.read_u16()? as usize;
        let rules = view.read_slice(rules_len)?;
        dec_qos_rules(rules)?;

        let ambr_len = view.read()? as usize;
        let ambr = view.read_slice(ambr_len)?;
        dec_session_ambr(ambr)?;

        self.decode_ies(view, &[IEI_PDU_ADDRESS, IEI_5GSM_CAUSE])?;
        Ok(())
    }
}

/// Authorised QoS rules (TS 24.501 9.11.4.13); parsed for the log and
/// to keep the cursor honest.
fn dec_qos_rules(rules: &[u8]) -> Result<(), NasError> {
    let view = OctetView::new(rules);
    let mut index = 0;
    while view.has_next() {
        let rule_id = view.read()?;
        let rule_len = view.read_u16()? as usize;
        let rule = OctetView::new(view.read_slice(rule_len)?);

        let head = rule.read()?;
        let op_code = head >> 5;
        let default_rule = head & 0x10 != 0;
        let filter_count = usize::from(head & 0x0f);
        debug!(
            "qos rule {index}: id {rule_id} op {op_code} default {default_rule} filters {filter_count}"
        );

        for _ in 0..filter_count {
            let filter_head = rule.read()? & 0x3f;
            let content_len = rule.read()? as usize;
            let content = rule.read_slice(content_len)?;
            debug!(
                "packet filter {} direction {}: {} content octets",
                filter_head & 0x0f,
                filter_head >> 4,
                content.len()
            );
        }

        let precedence = rule.read()?;
        let seg_and_qfi = rule.read()?;
        debug!(
            "precedence {precedence} qfi {} segregation {}",
            seg_and_qfi & 0x3f,
            seg_and_qfi & 0x40 != 0
        );
        index += 1;
    }
    Ok(())
}

/// Session-AMBR (TS 24.501 9.11.4.14).
fn dec_session_ambr(ambr: &[u8]) -> Result<(), NasError> {
    let view = OctetView::new(ambr);
    if view.remaining() < 6 {
        warn!("session AMBR shorter than 6 octets, skipped");
        return Ok(());
    }
    let unit_dl = view.read()?;
    let dl = view.read_u16()?;
    let unit_ul = view.read()?;
    let ul = view.read_u16()?;
    debug!("session AMBR: downlink {dl} (unit {unit_dl}), uplink {ul} (unit {unit_ul})");
    Ok(())
}
