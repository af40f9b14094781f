//! 5GS mobility management messages (TS 24.501 8.2).

use tracing::{debug, info, warn};

use ransim_common::{hex, OctetView};
use ransim_crypto::kdf::{
    derive_kamf, derive_kausf, derive_knas_enc, derive_knas_int, derive_kseaf, derive_res_star,
    serving_network_name,
};
use ransim_crypto::milenage::Milenage;

use crate::enums::{MmMessageType, MmState, RcvdState, SecurityHeaderType};
use crate::ies::{
    str_to_bcd, IEI_5GMM_CAPABILITY, IEI_5GS_MOBILE_IDENTITY, IEI_ADDITIONAL_5G_SEC_INFO,
    IEI_AUTH_PARAM_AUTN, IEI_AUTH_PARAM_RAND, IEI_AUTH_PARAM_RES, IEI_GPRS_TIMER2,
    IEI_GPRS_TIMER3, IEI_IMEISV_REQUEST, IEI_NAS_MESSAGE_CONTAINER, IEI_NSSAI,
    IEI_PDU_SESSION_ID2, IEI_TAI_LIST, IEI_UE_SECURITY_CAPABILITY,
};
use crate::security::AuthVector;
use crate::ue::{
    NasError, Ue, ID_TYPE_5G_GUTI, ID_TYPE_IMEISV, ID_TYPE_SUCI, KSI_NO_KEY,
    REGISTRATION_TYPE_INITIAL_FOR,
};

// 5GMM capability: N3 data supported (TS 24.501 9.11.3.1).
const CAP_N3_DATA: u8 = 0x20;

// UE security capability: EA0 plus IA0 and IA2 (TS 24.501 9.11.3.54).
const SEC_CAP_EA: u8 = 0x80;
const SEC_CAP_IA: u8 = 0xa0;

// 5G-EA0 and 128-NIA2 algorithm identities for key derivation.
const ALG_ID_EA0: u8 = 0;
const ALG_ID_NIA2: u8 = 2;

// De-registration type: 3GPP access, no switch-off (TS 24.501 9.11.3.20).
const DEREG_TYPE_3GPP: u8 = 0x01;

impl Ue {
    /// 8.2.6 Registration Request (initial registration with SUCI).
    ///
    /// Also transitions to 5GMM-REGISTERED-INITIATED.
    pub fn make_registration_request(&mut self) -> Vec<u8> {
        let pdu = self.encode_registration_request();
        self.mm_state = MmState::RegisteredInitiated;
        pdu
    }

    /// The Registration Request bytes without state side effects, so
    /// the NAS message container can re-emit the original message.
    pub(crate) fn encode_registration_request(&self) -> Vec<u8> {
        let mut pdu = Self::plain_mm_header(MmMessageType::RegistrationRequest);

        // Registration type and ngKSI share one octet.
        pdu.push(REGISTRATION_TYPE_INITIAL_FOR | (KSI_NO_KEY << 4));

        let suci = self.encode_suci();
        pdu.extend_from_slice(&(suci.len() as u16).to_be_bytes());
        pdu.extend_from_slice(&suci);

        pdu.extend_from_slice(&[IEI_5GMM_CAPABILITY, 0x01, CAP_N3_DATA]);
        pdu.extend_from_slice(&[
            IEI_UE_SECURITY_CAPABILITY,
            0x04,
            SEC_CAP_EA,
            SEC_CAP_IA,
            0x00,
            0x00,
        ]);
        pdu
    }

    /// SUCI with the null protection scheme (TS 24.501 9.11.3.4).
    fn encode_suci(&self) -> Vec<u8> {
        let mut suci = Vec::with_capacity(13);
        // SUPI format IMSI, type of identity SUCI.
        suci.push(ID_TYPE_SUCI);
        suci.extend_from_slice(&self.plmn().encode());

        // Routing indicator, unused digits filled with F.
        let mut digits = self.routing_indicator.to_string();
        while digits.len() < 4 {
            digits.push('f');
        }
        suci.extend_from_slice(&str_to_bcd(&digits));

        suci.push(0x00); // protection scheme: null
        suci.push(0x00); // home network public key identifier
        suci.extend_from_slice(&str_to_bcd(&self.msin));
        suci
    }

    /// 8.2.2 Authentication Response carrying RES*.
    pub fn make_authentication_response(&mut self) -> Result<Vec<u8>, NasError> {
        let res_star = self.keys.res_star.ok_or(NasError::NoSecurityContext)?;
        let mut pdu = Self::plain_mm_header(MmMessageType::AuthenticationResponse);
        pdu.push(IEI_AUTH_PARAM_RES);
        pdu.push(res_star.len() as u8);
        pdu.extend_from_slice(&res_star);
        Ok(pdu)
    }

    /// 8.2.26 Security Mode Complete, with IMEISV and the NAS message
    /// container when requested.
    pub fn make_security_mode_complete(&mut self) -> Result<Vec<u8>, NasError> {
        let mut inner = Self::plain_mm_header(MmMessageType::SecurityModeComplete);

        if self.imeisv_requested {
            inner.push(IEI_5GS_MOBILE_IDENTITY);
            let id = self.encode_imeisv();
            inner.extend_from_slice(&(id.len() as u16).to_be_bytes());
            inner.extend_from_slice(&id);
            self.imeisv_requested = false;
        }

        if self.rinmr_requested || self.force_rinmr {
            inner.push(IEI_NAS_MESSAGE_CONTAINER);
            let container = self.encode_registration_request();
            inner.extend_from_slice(&(container.len() as u16).to_be_bytes());
            inner.extend_from_slice(&container);
            self.rinmr_requested = false;
        }

        self.emit_secure(
            SecurityHeaderType::IntegrityProtectedAndCipheredWithNewContext,
            inner,
        )
    }

    /// IMEISV as a mobile identity value (TS 24.501 9.11.3.4).
    fn encode_imeisv(&self) -> Vec<u8> {
        let mut id_type = ID_TYPE_IMEISV;
        if self.imeisv.len() % 2 == 1 {
            id_type |= 0x08; // odd number of digits
        }
        str_to_bcd(&format!("{id_type:x}{}f", self.imeisv))
    }

    /// 8.2.8 Registration Complete.
    pub fn make_registration_complete(&mut self) -> Result<Vec<u8>, NasError> {
        let inner = Self::plain_mm_header(MmMessageType::RegistrationComplete);
        let pdu = self.emit_secure(
            SecurityHeaderType::IntegrityProtectedAndCipheredWithNewContext,
            inner,
        )?;
        info!("registration complete");
        Ok(pdu)
    }

    /// 8.2.12 De-registration Request (UE originating), carrying the
    /// 5G-GUTI learned at registration.
    pub fn make_deregistration_request(&mut self) -> Result<Vec<u8>, NasError> {
        let mut inner = Self::plain_mm_header(MmMessageType::DeregistrationRequest);
        inner.push(DEREG_TYPE_3GPP | (KSI_NO_KEY << 4));

        let mut id = Vec::with_capacity(1 + self.five_g_guti.len());
        id.push(0xf0 | ID_TYPE_5G_GUTI);
        id.extend_from_slice(&self.five_g_guti);
        inner.extend_from_slice(&(id.len() as u16).to_be_bytes());
        inner.extend_from_slice(&id);

        let pdu = self.emit_secure(
            SecurityHeaderType::IntegrityProtectedAndCipheredWithNewContext,
            inner,
        )?;
        self.mm_state = MmState::DeregisteredInitiated;
        Ok(pdu)
    }

    /// 8.2.7 Registration Accept.
    pub(crate) fn dec_registration_accept(&mut self, view: &OctetView<'_>) -> Result<(), NasError> {
        let len = view.read()? as usize;
        let result = view.read_slice(len)?;
        if let Some(&value) = result.first() {
            debug!(
                "registration result: {value:#04x} (sms over nas {}allowed)",
                if value & 0x08 != 0 { "" } else { "not " }
            );
        }

        self.decode_ies(
            view,
            &[
                IEI_NSSAI,
                IEI_GPRS_TIMER2,
                IEI_TAI_LIST,
                IEI_GPRS_TIMER3,
                IEI_5GS_MOBILE_IDENTITY,
            ],
        )?;

        self.rcvd = RcvdState::RegistrationAccept;
        self.mm_state = MmState::Registered;
        Ok(())
    }

    /// 8.2.1 Authentication Request: validate the challenge with
    /// MILENAGE, then derive the full key hierarchy.
    pub(crate) fn dec_authentication_request(
        &mut self,
        view: &OctetView<'_>,
    ) -> Result<(), NasError> {
        let ngksi = view.read()?;
        debug!("ngKSI: {ngksi:#04x}");

        let abba_len = view.read()? as usize;
        self.keys.abba = view.read_vec(abba_len)?;
        debug!("ABBA: {}", hex(&self.keys.abba));

        self.decode_ies(view, &[IEI_AUTH_PARAM_AUTN, IEI_AUTH_PARAM_RAND])?;

        let m = Milenage::new(&self.k, &self.opc);
        let (res, ck, ik, ak) = m.f2345(&self.auth.rand);
        let mut sqn = [0u8; 6];
        for (i, s) in sqn.iter_mut().enumerate() {
            *s = self.auth.sqn_xor_ak[i] ^ ak[i];
        }

        let mac_a = m.f1(&self.auth.rand, &sqn, &self.auth.amf);
        if mac_a != self.auth.mac {
            // TS 24.501 5.4.1.3.7 calls for an Authentication Failure
            // response; none is emitted, the error is only surfaced.
            warn!(
                "MAC-A mismatch: received {} calculated {}",
                hex(&self.auth.mac),
                hex(&mac_a)
            );
            return Err(NasError::AuthMacMismatch);
        }
        debug!("network authenticated, deriving key hierarchy");

        let snn = serving_network_name(self.mcc, self.mnc);
        let kausf = derive_kausf(&ck, &ik, &snn, &self.auth.sqn_xor_ak);
        let kseaf = derive_kseaf(&kausf, &snn);
        let supi = format!("{}{:02}{}", self.mcc, self.mnc, self.msin);
        let kamf = derive_kamf(&kseaf, &supi, &self.keys.abba);

        self.keys.kausf = Some(kausf);
        self.keys.kseaf = Some(kseaf);
        self.keys.kamf = Some(kamf);
        self.keys.kenc = Some(derive_knas_enc(&kamf, ALG_ID_EA0));
        self.keys.kint = Some(derive_knas_int(&kamf, ALG_ID_NIA2));
        self.keys.res_star = Some(derive_res_star(&ck, &ik, &snn, &self.auth.rand, &res));

        // Only the derived keys persist beyond the challenge.
        self.auth = AuthVector::default();
        self.rcvd = RcvdState::AuthenticationRequest;
        Ok(())
    }

    /// 8.2.25 Security Mode Command.
    pub(crate) fn dec_security_mode_command(
        &mut self,
        view: &OctetView<'_>,
    ) -> Result<(), NasError> {
        let alg = view.read()?;
        debug!(
            "selected algorithms: ciphering {:#03x} integrity {:#03x}",
            alg >> 4,
            alg & 0x0f
        );

        let ngksi = view.read()?;
        debug!("ngKSI: {ngksi:#04x}");

        let cap_len = view.read()? as usize;
        let cap = view.read_slice(cap_len)?;
        debug!("replayed UE security capabilities: {}", hex(cap));

        self.decode_ies(view, &[IEI_IMEISV_REQUEST, IEI_ADDITIONAL_5G_SEC_INFO])?;

        self.rcvd = RcvdState::SecurityModeCommand;
        Ok(())
    }

    /// 8.2.11 DL NAS Transport carrying a 5GSM payload.
    pub(crate) fn dec_dl_nas_transport(&mut self, view: &OctetView<'_>) -> Result<(), NasError> {
        let container_type = view.read()?;
        debug!("payload container type: {container_type:#04x}");

        let len = view.read_u16()? as usize;
        let payload = view.read_slice(len)?;
        self.decode(payload)?;

        self.decode_ies(view, &[IEI_PDU_SESSION_ID2])?;
        Ok(())
    }
}
