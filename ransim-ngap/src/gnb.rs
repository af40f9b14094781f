//! The emulated gNB: camper table, NGAP decode and per-UE dispatch.

use std::net::{IpAddr, Ipv4Addr};

use thiserror::Error;
use tracing::{debug, warn};

use ransim_common::{hex, GnbConfig, OctetView, PagingDrx, Plmn, SupportedTa};
use ransim_nas::Ue;
use ransim_per::{dec_length_determinant, BitReader, PerError};

use crate::ids::{
    self, ID_AMF_UE_NGAP_ID, ID_NAS_PDU, ID_PDU_SESSION_RESOURCE_SETUP_LIST_SU_REQ,
    ID_RAN_UE_NGAP_ID, ID_UL_NGU_UP_TNL_INFORMATION,
};

/// NGAP layer errors.
#[derive(Debug, Error)]
pub enum NgapError {
    /// PER primitive failure.
    #[error("PER codec error: {0}")]
    Per(#[from] PerError),

    /// The PDU ended before its advertised length.
    #[error("malformed NGAP PDU: {0}")]
    Malformed(#[from] ransim_common::Error),

    /// No camper exists for the given UE index.
    #[error("no camper for UE index {0}")]
    UnknownUe(usize),

    /// An uplink encoder was called without a staged NAS PDU.
    #[error("no pending NAS PDU for UE index {0}")]
    NoPendingNas(usize),

    /// The AMF has not assigned its UE id yet.
    #[error("AMF-UE-NGAP-ID not learned yet")]
    MissingAmfUeNgapId,

    /// No PDU session has been requested on the camper.
    #[error("no PDU session pending on the camper")]
    NoPduSession,

    /// Only IPv4 transport layer addresses are handled.
    #[error("unsupported transport layer address length {0}")]
    UnsupportedAddress(usize),
}

/// GTP-U peer endpoint learned from the UP transport layer information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GtpPeer {
    /// Peer (UPF) address.
    pub addr: Ipv4Addr,
    /// Peer TEID.
    pub teid: u32,
}

/// Per-UE state inside the gNB.
///
/// One camper per attached UE, created by [`Gnb::camp_in`] and kept for
/// the lifetime of the run.
#[derive(Debug)]
pub struct Camper {
    /// Index of the UE in the caller's UE table.
    pub ue_index: usize,
    /// gNB-assigned identifier, unique within this gNB.
    pub ran_ue_ngap_id: u32,
    /// AMF-assigned identifier, echoed back verbatim once learned.
    pub amf_ue_ngap_id: Option<Vec<u8>>,
    /// PDU session requested by the core.
    pub pdu_session_id: Option<u8>,
    /// QoS flow for the pending session.
    pub qos_flow_id: u8,
    /// Uplink NAS PDU staged for the next NGAP message.
    pub pending_nas: Option<Vec<u8>>,
    /// GTP-U peer once the session resources are set up.
    pub gtp_peer: Option<GtpPeer>,
}

/// The emulated base station.
pub struct Gnb {
    pub(crate) plmn: Plmn,
    pub(crate) gnb_id: u32,
    pub(crate) nr_cell_id: u64,
    pub(crate) tac: u32,
    pub(crate) supported_ta_list: Vec<SupportedTa>,
    pub(crate) paging_drx: PagingDrx,
    /// AMF endpoint the transport should connect to.
    pub ngap_peer_addr: IpAddr,
    pub(crate) gtpu_local_addr: IpAddr,
    /// Local GTP-U TEID announced in setup responses.
    pub gtpu_teid: u32,
    next_ran_ue_ngap_id: u32,
    campers: Vec<Camper>,
    /// Error from the most recent [`Gnb::decode`], if any.
    pub decode_error: Option<NgapError>,
}

impl Gnb {
    /// Builds a gNB from configuration.
    pub fn from_config(config: &GnbConfig) -> Self {
        Self {
            plmn: config.global_gnb_id.plmn(),
            gnb_id: config.global_gnb_id.gnb_id,
            nr_cell_id: config.nr_cell_id,
            tac: config.tac,
            supported_ta_list: config.supported_ta_list.clone(),
            paging_drx: config.paging_drx,
            ngap_peer_addr: config.ngap_peer_addr,
            gtpu_local_addr: config.gtpu_local_addr,
            gtpu_teid: config.gtpu_teid,
            next_ran_ue_ngap_id: 0,
            campers: Vec::new(),
            decode_error: None,
        }
    }

    /// Local GTP-U address announced in setup responses.
    pub fn gtpu_local_addr(&self) -> IpAddr {
        self.gtpu_local_addr
    }

    /// Attaches a UE, allocating a fresh RAN-UE-NGAP-ID.
    pub fn camp_in(&mut self, ue_index: usize) -> u32 {
        let ran_ue_ngap_id = self.next_ran_ue_ngap_id;
        self.next_ran_ue_ngap_id += 1;
        self.campers.push(Camper {
            ue_index,
            ran_ue_ngap_id,
            amf_ue_ngap_id: None,
            pdu_session_id: None,
            qos_flow_id: 1,
            pending_nas: None,
            gtp_peer: None,
        });
        debug!("camped in UE {ue_index} as RAN-UE-NGAP-ID {ran_ue_ngap_id}");
        ran_ue_ngap_id
    }

    /// The camper of a UE, if it has camped in.
    pub fn camper(&self, ue_index: usize) -> Option<&Camper> {
        self.campers.iter().find(|c| c.ue_index == ue_index)
    }

    pub(crate) fn camper_mut(&mut self, ue_index: usize) -> Option<&mut Camper> {
        self.campers.iter_mut().find(|c| c.ue_index == ue_index)
    }

    pub(crate) fn camper_by_ran_id_mut(&mut self, ran_id: u32) -> Option<&mut Camper> {
        self.campers.iter_mut().find(|c| c.ran_ue_ngap_id == ran_id)
    }

    /// Stages an uplink NAS PDU produced by the UE for the next NGAP
    /// message toward the AMF.
    pub fn recv_from_ue(&mut self, ue_index: usize, pdu: Vec<u8>) -> Result<(), NgapError> {
        let camper = self
            .camper_mut(ue_index)
            .ok_or(NgapError::UnknownUe(ue_index))?;
        camper.pending_nas = Some(pdu);
        Ok(())
    }

    /// Decodes one downlink NGAP PDU, updating campers and forwarding
    /// carried NAS to the addressed UE.
    ///
    /// Problems are recorded in [`Gnb::decode_error`]; the N2
    /// association stays up either way.
    pub fn decode(&mut self, pdu: &[u8], ues: &mut [Ue]) {
        self.decode_error = None;
        if let Err(err) = self.decode_inner(pdu, ues) {
            warn!("NGAP decode failed: {err}");
            self.decode_error = Some(err);
        }
    }

    fn decode_inner(&mut self, pdu: &[u8], ues: &mut [Ue]) -> Result<(), NgapError> {
        let view = OctetView::new(pdu);
        let _pdu_type = view.read()?;
        let procedure_code = view.read()?;
        let _criticality = view.read()?;
        match ids::procedure_name(procedure_code) {
            Some(name) => debug!("procedure: {name} ({procedure_code})"),
            None => warn!("unsupported procedure code {procedure_code}"),
        }

        let length = dec_length_determinant(&view)?;
        debug!("PDU length: {length}");
        let container = view.read_slice(length)?;
        self.dec_protocol_ie_container(container, ues, None)
    }

    /// Walks one ProtocolIE container. `ctx_ran` seeds the addressed
    /// camper for nested containers (setup request transfers).
    fn dec_protocol_ie_container(
        &mut self,
        data: &[u8],
        ues: &mut [Ue],
        ctx_ran: Option<u32>,
    ) -> Result<(), NgapError> {
        let view = OctetView::new(data);
        view.skip(1)?; // sequence preamble
        let count = view.read_u16()?;
        debug!("protocol IEs: {count} items");

        // The AMF/RAN id pair may arrive in either order; the AMF id is
        // parked here until the camper is known.
        let mut current_ran = ctx_ran;
        let mut pending_amf: Option<Vec<u8>> = None;

        for _ in 0..count {
            let id = view.read_u16()?;
            let _criticality = view.read()?;
            let length = dec_length_determinant(&view)?;
            let value = view.read_slice(length)?;

            match parse_ie(id, value)? {
                IeValue::AmfUeNgapId(raw) => {
                    debug!("AMF-UE-NGAP-ID: {}", hex(raw));
                    match current_ran {
                        Some(ran) => self.commit_amf_id(ran, raw.to_vec()),
                        None => pending_amf = Some(raw.to_vec()),
                    }
                }
                IeValue::RanUeNgapId(ran) => {
                    debug!("RAN-UE-NGAP-ID: {ran}");
                    current_ran = Some(ran);
                    if let Some(amf) = pending_amf.take() {
                        self.commit_amf_id(ran, amf);
                    }
                }
                IeValue::NasPdu(nas) => self.deliver_nas(current_ran, nas, ues),
                IeValue::SetupListSuReq(raw) => {
                    self.dec_setup_list_su_req(raw, current_ran, ues)?;
                }
                IeValue::UlNguUpTnl(peer) => {
                    debug!("UL NGU UP TNL: {} teid {:#010x}", peer.addr, peer.teid);
                    self.store_gtp_peer(current_ran, peer);
                }
                IeValue::Unknown { id, raw } => {
                    warn!(
                        "protocol IE {id} ({}) not decoded: {}",
                        ids::ie_name(id).unwrap_or("unknown"),
                        hex(raw)
                    );
                }
            }
        }
        Ok(())
    }

    fn commit_amf_id(&mut self, ran_id: u32, amf_id: Vec<u8>) {
        match self.camper_by_ran_id_mut(ran_id) {
            Some(camper) => camper.amf_ue_ngap_id = Some(amf_id),
            None => warn!("AMF id for unknown RAN-UE-NGAP-ID {ran_id}"),
        }
    }

    fn deliver_nas(&mut self, ran_id: Option<u32>, nas: &[u8], ues: &mut [Ue]) {
        let camper = ran_id.and_then(|ran| self.camper_by_ran_id_mut(ran));
        let Some(camper) = camper else {
            warn!("NAS-PDU with no addressed camper, dropped");
            return;
        };
        let Some(ue) = ues.get_mut(camper.ue_index) else {
            warn!("camper references UE index {} out of range", camper.ue_index);
            return;
        };
        ue.receive(nas);
        if let Some(err) = &ue.decode_error {
            warn!("UE {} rejected NAS PDU: {err}", camper.ue_index);
        }
    }

    fn store_gtp_peer(&mut self, ran_id: Option<u32>, peer: GtpPeer) {
        match ran_id.and_then(|ran| self.camper_by_ran_id_mut(ran)) {
            Some(camper) => camper.gtp_peer = Some(peer),
            None => warn!("UP transport information with no addressed camper"),
        }
    }

    /// PDUSessionResourceSetupListSUReq (TS 38.413 9.2.1.1): PDU
    /// session id, optional NAS, S-NSSAI and the setup request transfer
    /// per item.
    fn dec_setup_list_su_req(
        &mut self,
        raw: &[u8],
        current_ran: Option<u32>,
        ues: &mut [Ue],
    ) -> Result<(), NgapError> {
        let view = OctetView::new(raw);
        let count = view.read()? as usize + 1;
        debug!("setup list: {count} sessions");

        for _ in 0..count {
            let preamble = view.read()?;
            let psi = view.read()?;
            debug!("PDU session id: {psi}");
            if let Some(camper) = current_ran.and_then(|ran| self.camper_by_ran_id_mut(ran)) {
                camper.pdu_session_id = Some(psi);
            }

            // One bit of extension marker, then the NAS-PDU presence bit.
            if (preamble << 1) & 0x80 != 0 {
                let nas_len = dec_length_determinant(&view)?;
                let nas = view.read_slice(nas_len)?;
                self.deliver_nas(current_ran, nas, ues);
            }

            dec_snssai(&view)?;

            let transfer_len = dec_length_determinant(&view)?;
            let transfer = view.read_slice(transfer_len)?;
            self.dec_protocol_ie_container(transfer, ues, current_ran)?;
        }
        Ok(())
    }
}

/// One decoded ProtocolIE value. Identifiers without a decoder land in
/// `Unknown` carrying the raw octets rather than being consumed
/// silently.
enum IeValue<'a> {
    AmfUeNgapId(&'a [u8]),
    RanUeNgapId(u32),
    NasPdu(&'a [u8]),
    SetupListSuReq(&'a [u8]),
    UlNguUpTnl(GtpPeer),
    Unknown { id: u16, raw: &'a [u8] },
}

fn parse_ie<'a>(id: u16, value: &'a [u8]) -> Result<IeValue<'a>, NgapError> {
    match id {
        ID_AMF_UE_NGAP_ID => Ok(IeValue::AmfUeNgapId(value)),
        ID_RAN_UE_NGAP_ID => {
            // Octet-count field, then the value in minimum octets.
            if value.len() < 2 {
                return Err(NgapError::Per(PerError::Truncated));
            }
            let ran = value[1..]
                .iter()
                .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
            Ok(IeValue::RanUeNgapId(ran))
        }
        ID_NAS_PDU => {
            let view = OctetView::new(value);
            let inner_len = dec_length_determinant(&view)?;
            Ok(IeValue::NasPdu(view.read_slice(inner_len)?))
        }
        ID_PDU_SESSION_RESOURCE_SETUP_LIST_SU_REQ => Ok(IeValue::SetupListSuReq(value)),
        ID_UL_NGU_UP_TNL_INFORMATION => Ok(IeValue::UlNguUpTnl(parse_up_tnl(value)?)),
        other => Ok(IeValue::Unknown { id: other, raw: value }),
    }
}

/// UP Transport Layer Information (TS 38.413 9.3.2.2): the gTPTunnel
/// choice with a transport layer address bit string and a TEID.
fn parse_up_tnl(value: &[u8]) -> Result<GtpPeer, NgapError> {
    let mut bits = BitReader::new(value);
    bits.skip(3)?; // choice, sequence extension, option
    let _ext = bits.read_bit()?;
    let bit_len = bits.read_bits(8)? as usize + 1;
    bits.align();

    let addr = bits.read_aligned_bytes(bit_len.div_ceil(8))?;
    if addr.len() != 4 {
        return Err(NgapError::UnsupportedAddress(addr.len()));
    }
    let addr = Ipv4Addr::new(addr[0], addr[1], addr[2], addr[3]);

    let teid_octets = bits.read_aligned_bytes(4)?;
    let teid = teid_octets
        .iter()
        .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));

    Ok(GtpPeer { addr, teid })
}

/// S-NSSAI in NGAP PER form: two octets of preamble and SST, then an
/// optional three-octet SD.
fn dec_snssai(view: &OctetView<'_>) -> Result<(), NgapError> {
    let head = view.read_slice(2)?;
    let mut bits = BitReader::new(head);
    bits.skip(1)?; // extension marker
    let sd_present = bits.read_bit()?;
    bits.skip(1)?; // iE-Extensions option
    let sst = bits.read_bits(8)?;
    debug!("S-NSSAI: sst {sst}");

    if sd_present {
        let sd = view.read_slice(3)?;
        debug!("S-NSSAI: sd {}", hex(sd));
    }
    Ok(())
}
