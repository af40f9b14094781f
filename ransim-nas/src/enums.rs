//! NAS protocol enumerations (3GPP TS 24.501)

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Extended Protocol Discriminator (TS 24.007 11.2.3.1.1A).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Epd {
    /// 5GS Mobility Management.
    MobilityManagement = 0x7e,
    /// 5GS Session Management.
    SessionManagement = 0x2e,
}

/// Security Header Type (TS 24.501 9.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive, Default)]
#[repr(u8)]
pub enum SecurityHeaderType {
    /// Plain NAS message.
    #[default]
    Plain = 0x00,
    /// Integrity protected.
    IntegrityProtected = 0x01,
    /// Integrity protected and ciphered.
    IntegrityProtectedAndCiphered = 0x02,
    /// Integrity protected with a new 5G NAS security context.
    IntegrityProtectedWithNewContext = 0x03,
    /// Integrity protected and ciphered with a new context.
    IntegrityProtectedAndCipheredWithNewContext = 0x04,
}

/// 5GMM message types (TS 24.501 9.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum MmMessageType {
    RegistrationRequest = 0x41,
    RegistrationAccept = 0x42,
    RegistrationComplete = 0x43,
    DeregistrationRequest = 0x45,
    DeregistrationAccept = 0x46,
    AuthenticationRequest = 0x56,
    AuthenticationResponse = 0x57,
    SecurityModeCommand = 0x5d,
    SecurityModeComplete = 0x5e,
    UlNasTransport = 0x67,
    DlNasTransport = 0x68,
}

/// 5GSM message types (TS 24.501 9.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum SmMessageType {
    PduSessionEstablishmentRequest = 0xc1,
    PduSessionEstablishmentAccept = 0xc2,
}

/// 5GMM sublayer state (TS 24.501 5.1.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MmState {
    /// No registration exists.
    #[default]
    Deregistered,
    /// Registration Request sent, waiting for the outcome.
    RegisteredInitiated,
    /// Registration accepted by the network.
    Registered,
    /// Deregistration Request sent, waiting for the accept.
    DeregisteredInitiated,
}

/// What the last downlink delivered; decides the next uplink message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RcvdState {
    /// Nothing pending.
    #[default]
    Null,
    /// Authentication Request received; answer with RES*.
    AuthenticationRequest,
    /// Security Mode Command received; answer with Complete.
    SecurityModeCommand,
    /// Registration Accept received; answer with Complete.
    RegistrationAccept,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        assert_eq!(u8::from(Epd::MobilityManagement), 0x7e);
        assert_eq!(u8::from(Epd::SessionManagement), 0x2e);
        assert_eq!(u8::from(MmMessageType::RegistrationRequest), 0x41);
        assert_eq!(u8::from(MmMessageType::SecurityModeComplete), 0x5e);
        assert_eq!(u8::from(SmMessageType::PduSessionEstablishmentAccept), 0xc2);
    }

    #[test]
    fn test_unknown_message_type_rejected() {
        assert!(MmMessageType::try_from(0x99u8).is_err());
    }
}
