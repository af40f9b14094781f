//! The emulated UE: identity, credentials, state machine and the NAS
//! decode entry points.

use std::net::Ipv4Addr;

use thiserror::Error;
use tracing::{debug, warn};

use ransim_common::{hex, OctetView, Plmn, SNssai, Tai, UeConfig};

use crate::enums::{Epd, MmMessageType, MmState, RcvdState, SecurityHeaderType, SmMessageType};
use crate::ies::{
    self, gprs_timer2_secs, gprs_timer3_secs, IEI_5GSM_CAUSE, IEI_5GS_MOBILE_IDENTITY,
    IEI_ADDITIONAL_5G_SEC_INFO, IEI_AUTH_PARAM_AUTN, IEI_AUTH_PARAM_RAND, IEI_GPRS_TIMER2,
    IEI_GPRS_TIMER3, IEI_IMEISV_REQUEST, IEI_NSSAI, IEI_PDU_ADDRESS, IEI_PDU_SESSION_ID2,
    IEI_TAI_LIST,
};
use crate::security::{compute_nas_mac, mac_equal, AuthVector, NasDirection, SecurityKeys};

/// NAS codec and procedure errors.
#[derive(Debug, Error)]
pub enum NasError {
    /// The MAC of a security-protected downlink frame did not verify.
    #[error("NAS integrity check failed")]
    IntegrityCheckFailed,

    /// MILENAGE MAC-A recomputation did not match the AUTN.
    #[error("authentication MAC-A mismatch")]
    AuthMacMismatch,

    /// A protected operation was attempted without derived keys.
    #[error("no NAS security context")]
    NoSecurityContext,

    /// Unknown extended protocol discriminator.
    #[error("unknown extended protocol discriminator {0:#04x}")]
    UnknownEpd(u8),

    /// The message body ended early or an IE was inconsistent.
    #[error("malformed NAS message: {0}")]
    Malformed(#[from] ransim_common::Error),
}

/// 5GS mobile identity type values (TS 24.501 9.11.3.4).
pub(crate) const ID_TYPE_SUCI: u8 = 1;
pub(crate) const ID_TYPE_5G_GUTI: u8 = 2;
pub(crate) const ID_TYPE_IMEISV: u8 = 5;

/// ngKSI value meaning no key is available.
pub(crate) const KSI_NO_KEY: u8 = 0x07;

/// An emulated subscriber.
///
/// Created from configuration at load time; lives for the whole
/// session. All state is in memory.
pub struct Ue {
    // Subscription identity.
    pub(crate) mcc: u16,
    pub(crate) mnc: u16,
    pub(crate) msin: String,
    pub(crate) imeisv: String,
    pub(crate) routing_indicator: u16,
    pub(crate) snssai: SNssai,
    pub(crate) dnn: String,
    /// URL probed once the user plane is up.
    pub url: String,

    // Long-term credentials.
    pub(crate) k: [u8; 16],
    pub(crate) opc: [u8; 16],

    // 5GMM machinery.
    /// Current 5GMM sublayer state.
    pub mm_state: MmState,
    pub(crate) rcvd: RcvdState,
    pub(crate) imeisv_requested: bool,
    pub(crate) rinmr_requested: bool,
    pub(crate) force_rinmr: bool,
    security_header_parsed: bool,

    /// Monotonic uplink NAS counter; the low byte is the wire sequence
    /// number.
    pub nas_count: u32,

    pub(crate) auth: AuthVector,
    /// Derived key hierarchy, populated by a successful challenge.
    pub keys: SecurityKeys,

    // 5GSM.
    pub(crate) psi: u8,
    pub(crate) pti: u8,

    // Learned from the network.
    pub(crate) five_g_guti: Vec<u8>,
    /// Registration area delivered in Registration Accept.
    pub tai_list: Vec<Tai>,
    /// Slices the network allowed.
    pub allowed_nssai: Vec<SNssai>,
    /// T3502 in seconds.
    pub t3502_secs: u32,
    /// T3512 in seconds.
    pub t3512_secs: u32,
    /// IPv4 address assigned at PDU session establishment.
    pub pdu_address: Option<Ipv4Addr>,

    /// Error from the most recent [`Ue::receive`], if any.
    pub decode_error: Option<NasError>,
}

impl Ue {
    /// Builds a powered-on UE from configuration.
    pub fn from_config(config: &UeConfig) -> Result<Self, ransim_common::Error> {
        Ok(Self {
            mcc: config.mcc,
            mnc: config.mnc,
            msin: config.msin.clone(),
            imeisv: config.imeisv.clone(),
            routing_indicator: config.routing_indicator,
            snssai: config.snssai.clone(),
            dnn: config.dnn.clone(),
            url: config.url.clone(),
            k: config.k_bytes()?,
            opc: config.opc_bytes()?,
            mm_state: MmState::Deregistered,
            rcvd: RcvdState::Null,
            imeisv_requested: false,
            rinmr_requested: false,
            force_rinmr: config.force_rinmr,
            security_header_parsed: false,
            nas_count: 0,
            auth: AuthVector::default(),
            keys: SecurityKeys::default(),
            psi: 0,
            pti: 0,
            five_g_guti: Vec::new(),
            tai_list: Vec::new(),
            allowed_nssai: Vec::new(),
            t3502_secs: 0,
            t3512_secs: 0,
            pdu_address: None,
            decode_error: None,
        })
    }

    /// The PLMN of the subscription.
    pub fn plmn(&self) -> Plmn {
        Plmn::new(self.mcc, self.mnc)
    }

    /// Resets the UE to its power-on state, wiping keys and counters.
    pub fn power_on(&mut self) {
        self.mm_state = MmState::Deregistered;
        self.rcvd = RcvdState::Null;
        self.imeisv_requested = false;
        self.rinmr_requested = false;
        self.security_header_parsed = false;
        self.nas_count = 0;
        self.auth = AuthVector::default();
        self.keys.clear();
        self.five_g_guti.clear();
        self.tai_list.clear();
        self.allowed_nssai.clear();
        self.pdu_address = None;
        self.decode_error = None;
    }

    /// Feeds one downlink NAS PDU into the state machine.
    ///
    /// Problems are recorded in [`Ue::decode_error`]; the caller
    /// inspects it after each receive.
    pub fn receive(&mut self, pdu: &[u8]) {
        self.decode_error = None;
        if let Err(err) = self.decode(pdu) {
            warn!("NAS decode failed: {err}");
            self.decode_error = Some(err);
        }
    }

    pub(crate) fn decode(&mut self, pdu: &[u8]) -> Result<(), NasError> {
        let view = OctetView::new(pdu);
        let epd_raw = view.read()?;
        match Epd::try_from(epd_raw) {
            Ok(Epd::MobilityManagement) => self.decode_mm(&view),
            Ok(Epd::SessionManagement) => self.decode_sm(&view),
            Err(_) => Err(NasError::UnknownEpd(epd_raw)),
        }
    }

    /// 5GMM messages (TS 24.501 8.2), including the security-protected
    /// outer frame.
    fn decode_mm(&mut self, view: &OctetView<'_>) -> Result<(), NasError> {
        let sht = view.read()?;

        if sht != 0 && !self.security_header_parsed {
            let mac = view.read_slice(4)?;
            let body = view.remaining_slice();
            let kint = self.keys.kint.ok_or(NasError::NoSecurityContext)?;
            let calc = compute_nas_mac(&kint, NasDirection::Downlink, body);
            if !mac_equal(&calc, mac) {
                warn!(
                    "NAS integrity check failed: received {} calculated {}",
                    hex(mac),
                    hex(&calc)
                );
                return Err(NasError::IntegrityCheckFailed);
            }
            let seq = view.read()?;
            debug!("NAS integrity check passed, seq {seq}");

            self.security_header_parsed = true;
            let result = self.decode(view.remaining_slice());
            self.security_header_parsed = false;
            return result;
        }

        if sht != 0 {
            // Some deployed AMFs mark a plain message as protected.
            warn!("security header type {sht:#x} on a plain NAS message, decoding as plain");
        }

        let mt_raw = view.read()?;
        let Ok(message_type) = MmMessageType::try_from(mt_raw) else {
            warn!("unknown 5GMM message type {mt_raw:#04x}, discarded");
            return Ok(());
        };
        debug!("5GMM message: {message_type:?}");

        match message_type {
            MmMessageType::RegistrationAccept => self.dec_registration_accept(view)?,
            MmMessageType::AuthenticationRequest => self.dec_authentication_request(view)?,
            MmMessageType::SecurityModeCommand => self.dec_security_mode_command(view)?,
            MmMessageType::DlNasTransport => self.dec_dl_nas_transport(view)?,
            MmMessageType::DeregistrationAccept => {
                debug!("deregistration accepted");
                self.mm_state = MmState::Deregistered;
            }
            other => {
                warn!("{other:?} not expected on the downlink, discarded");
            }
        }
        Ok(())
    }

    /// 5GSM messages (TS 24.501 8.3).
    fn decode_sm(&mut self, view: &OctetView<'_>) -> Result<(), NasError> {
        let psi = view.read()?;
        let pti = view.read()?;
        debug!("PDU session identity {psi:#04x}, procedure transaction identity {pti:#04x}");

        let mt_raw = view.read()?;
        let Ok(message_type) = SmMessageType::try_from(mt_raw) else {
            warn!("unknown 5GSM message type {mt_raw:#04x}, discarded");
            return Ok(());
        };
        debug!("5GSM message: {message_type:?}");

        match message_type {
            SmMessageType::PduSessionEstablishmentAccept => {
                self.dec_pdu_session_establishment_accept(view)?;
            }
            other => {
                warn!("{other:?} not expected on the downlink, discarded");
            }
        }
        Ok(())
    }

    /// Walks the optional-IE tail of a message.
    ///
    /// `allowed` lists the identifiers the current message may carry;
    /// anything else stops the scan with a warning, leaving the
    /// remainder unconsumed.
    pub(crate) fn decode_ies(
        &mut self,
        view: &OctetView<'_>,
        allowed: &[u8],
    ) -> Result<(), NasError> {
        while view.has_next() {
            let first = view.peek()?;
            let (iei, nibble) = if first & 0x80 != 0 {
                (first >> 4, first & 0x0f)
            } else {
                (first, 0)
            };
            if !allowed.contains(&iei) {
                warn!("IE {iei:#04x} ({}) not expected here, stopping", ies::ie_name(iei));
                break;
            }
            view.read()?;
            debug!("IE: {} ({iei:#04x})", ies::ie_name(iei));

            match iei {
                IEI_IMEISV_REQUEST => {
                    if nibble & 0x01 != 0 {
                        self.imeisv_requested = true;
                    }
                }
                IEI_PDU_SESSION_ID2 => {
                    let id = view.read()?;
                    debug!("PDU session identity 2: {id}");
                }
                IEI_NSSAI => self.dec_nssai(view)?,
                IEI_GPRS_TIMER2 => {
                    let _len = view.read()?;
                    self.t3502_secs = gprs_timer2_secs(view.read()?);
                    debug!("T3502: {} s", self.t3502_secs);
                }
                IEI_GPRS_TIMER3 => {
                    let _len = view.read()?;
                    self.t3512_secs = gprs_timer3_secs(view.read()?);
                    debug!("T3512: {} s", self.t3512_secs);
                }
                IEI_AUTH_PARAM_AUTN => self.dec_auth_param_autn(view)?,
                IEI_AUTH_PARAM_RAND => {
                    self.auth.rand.copy_from_slice(view.read_slice(16)?);
                    debug!("RAND: {}", hex(&self.auth.rand));
                }
                IEI_PDU_ADDRESS => self.dec_pdu_address(view)?,
                IEI_ADDITIONAL_5G_SEC_INFO => self.dec_additional_sec_info(view)?,
                IEI_TAI_LIST => self.dec_tai_list(view)?,
                IEI_5GSM_CAUSE => {
                    let cause = view.read()?;
                    debug!("5GSM cause: {cause:#04x}");
                }
                IEI_5GS_MOBILE_IDENTITY => self.dec_mobile_identity(view)?,
                _ => {
                    warn!("IE {iei:#04x} has no decoder, stopping");
                    break;
                }
            }
        }
        Ok(())
    }

    fn dec_auth_param_autn(&mut self, view: &OctetView<'_>) -> Result<(), NasError> {
        let len = view.read()? as usize;
        let autn = view.read_slice(len)?;
        if autn.len() < 16 {
            return Err(NasError::Malformed(ransim_common::Error::Protocol(
                format!("AUTN too short: {len} octets"),
            )));
        }
        self.auth.sqn_xor_ak.copy_from_slice(&autn[0..6]);
        self.auth.amf.copy_from_slice(&autn[6..8]);
        self.auth.mac.copy_from_slice(&autn[8..16]);
        debug!(
            "AUTN: sqn^ak {} amf {} mac {}",
            hex(&self.auth.sqn_xor_ak),
            hex(&self.auth.amf),
            hex(&self.auth.mac)
        );
        Ok(())
    }

    fn dec_nssai(&mut self, view: &OctetView<'_>) -> Result<(), NasError> {
        let len = view.read()? as usize;
        let value = view.read_slice(len)?;
        let sub = OctetView::new(value);
        while sub.has_next() {
            let snssai = dec_snssai_lv(&sub)?;
            debug!("allowed S-NSSAI: sst {} sd {:?}", snssai.sst, snssai.sd);
            self.allowed_nssai.push(snssai);
        }
        Ok(())
    }

    fn dec_tai_list(&mut self, view: &OctetView<'_>) -> Result<(), NasError> {
        let len = view.read()? as usize;
        let value = view.read_slice(len)?;
        let sub = OctetView::new(value);

        let head = sub.read()?;
        let count = usize::from(head & 0x1f) + 1;
        let list_type = head >> 5;
        if list_type != 0 {
            warn!("TAI list type {list_type:#04x} not supported, skipped");
            return Ok(());
        }
        let plmn = Plmn::decode(sub.read_slice(3)?)?;
        for _ in 0..count {
            let tac = sub.read_u24()?;
            debug!("TAI: plmn {}/{} tac {tac:#08x}", plmn.mcc, plmn.mnc);
            self.tai_list.push(Tai { plmn, tac });
        }
        Ok(())
    }

    fn dec_pdu_address(&mut self, view: &OctetView<'_>) -> Result<(), NasError> {
        let len = view.read()? as usize;
        let value = view.read_slice(len)?;
        let sub = OctetView::new(value);
        let session_type = sub.read()? & 0x07;
        match session_type {
            0x01 => {
                let addr = sub.read_slice(4)?;
                let addr = Ipv4Addr::new(addr[0], addr[1], addr[2], addr[3]);
                debug!("PDU address: {addr}");
                self.pdu_address = Some(addr);
            }
            other => {
                warn!("PDU session type {other} not supported");
            }
        }
        Ok(())
    }

    fn dec_additional_sec_info(&mut self, view: &OctetView<'_>) -> Result<(), NasError> {
        let len = view.read()? as usize;
        if len != 1 {
            warn!("Additional 5G security information with length {len}, skipped");
            view.skip(len)?;
            return Ok(());
        }
        let value = view.read()?;
        self.rinmr_requested = value & 0x02 != 0;
        debug!(
            "KAMF derivation {}required, initial NAS retransmission {}requested",
            if value & 0x01 != 0 { "" } else { "not " },
            if self.rinmr_requested { "" } else { "not " }
        );
        Ok(())
    }

    fn dec_mobile_identity(&mut self, view: &OctetView<'_>) -> Result<(), NasError> {
        let len = view.read_u16()? as usize;
        let value = view.read_slice(len)?;
        let sub = OctetView::new(value);
        let id_type = sub.read()? & 0x07;
        match id_type {
            ID_TYPE_5G_GUTI => {
                self.five_g_guti = sub.remaining_slice().to_vec();
                debug!("5G-GUTI: {}", hex(&self.five_g_guti));
            }
            other => {
                warn!("mobile identity type {other} not handled");
            }
        }
        Ok(())
    }
}

/// Decodes one length-prefixed S-NSSAI value (TS 24.501 9.11.2.8).
pub(crate) fn dec_snssai_lv(view: &OctetView<'_>) -> Result<SNssai, NasError> {
    let len = view.read()? as usize;
    let value = view.read_slice(len)?;
    let sub = OctetView::new(value);

    let sst = sub.read()?;
    let mut snssai = SNssai { sst, sd: None };
    if matches!(len, 4 | 5 | 8) {
        snssai.sd = Some(hex(sub.read_slice(3)?));
    }
    if matches!(len, 2 | 5 | 8) {
        let mapped_sst = sub.read()?;
        debug!("mapped HPLMN SST: {mapped_sst}");
    }
    if len == 8 {
        let mapped_sd = sub.read_slice(3)?;
        debug!("mapped HPLMN SD: {}", hex(mapped_sd));
    }
    Ok(snssai)
}

// Registration type: initial registration with follow-on request
// pending (TS 24.501 9.11.3.7).
pub(crate) const REGISTRATION_TYPE_INITIAL_FOR: u8 = 0x09;

impl Ue {
    /// Produces the next uplink NAS PDU the state machine owes, if any.
    pub fn make_nas_pdu(&mut self) -> Option<Vec<u8>> {
        let result = match self.rcvd {
            RcvdState::Null => return None,
            RcvdState::AuthenticationRequest => self.make_authentication_response(),
            RcvdState::SecurityModeCommand => self.make_security_mode_complete(),
            RcvdState::RegistrationAccept => self.make_registration_complete(),
        };
        match result {
            Ok(pdu) => Some(pdu),
            Err(err) => {
                warn!("cannot build uplink NAS message: {err}");
                None
            }
        }
    }

    /// Wraps a plain NAS message in the security-protected frame and
    /// advances the uplink counter.
    pub(crate) fn emit_secure(
        &mut self,
        sht: SecurityHeaderType,
        inner: Vec<u8>,
    ) -> Result<Vec<u8>, NasError> {
        let kint = self.keys.kint.ok_or(NasError::NoSecurityContext)?;
        let seq = (self.nas_count & 0xff) as u8;

        let mut body = Vec::with_capacity(1 + inner.len());
        body.push(seq);
        body.extend_from_slice(&inner);
        let mac = compute_nas_mac(&kint, NasDirection::Uplink, &body);

        let mut out = Vec::with_capacity(6 + body.len());
        out.push(Epd::MobilityManagement.into());
        out.push(sht.into());
        out.extend_from_slice(&mac);
        out.extend_from_slice(&body);

        self.nas_count = self.nas_count.wrapping_add(1);
        Ok(out)
    }

    pub(crate) fn plain_mm_header(message_type: MmMessageType) -> Vec<u8> {
        vec![
            Epd::MobilityManagement.into(),
            SecurityHeaderType::Plain.into(),
            message_type.into(),
        ]
    }
}
