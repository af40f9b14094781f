//! Byte-exact NAS tests against captures from a live free5gc core.

use ransim_common::{parse_hex, SNssai, UeConfig};

use crate::enums::{MmState, RcvdState};
use crate::ue::{NasError, Ue};

// Uplink messages the UE must reproduce bit for bit.
const REGISTRATION_REQUEST: &str = "7e004179000d0102f8392143000010325476981001202e0480a00000";
const AUTHENTICATION_RESPONSE: &str = "7e00572d10803adcacc364fc000bdc0f65e324eaa1";
const SECURITY_MODE_COMPLETE: [&str; 4] = [
    "7e04da52b828007e005e",
    "7e042e7d15af017e005e7700090500000001000001f1",
    "7e042bcd6bc3027e005e7700090500000001000001f171001c7e004179000d0102f8392143000010325476981001202e0480a00000",
    "7e04a314ad62037e005e7700090500000001000001f171001c7e004179000d0102f8392143000010325476981001202e0480a00000",
];
const REGISTRATION_COMPLETE: &str = "7e04006d1298007e0043";
const PDU_SESSION_ESTABLISHMENT_REQUEST: &str =
    "7e0208d593cc007e00670100072e0101c1ffff93120181220401010203250908696e7465726e6574";
const DEREGISTRATION_REQUEST: &str = "7e04d733af71007e004571000bf202f839cafe0000000001";

// Downlink messages captured from the core.
const AUTHENTICATION_REQUEST: &str =
    "7e00560002000021fc64081953bb33c0682edf1690b25821201094bbaf40940a8000c6a72c4efbaf0337";
const SECURITY_MODE_COMMAND: &str = "7e03937711bc007e035d02000480a00000e1360100";
const REGISTRATION_ACCEPT: &str = "7e02930d75cf017e0242010177000b0202f839cafe000000000154070002f839000001150a040101020304011122335e010616012c";
const PDU_SESSION_ESTABLISHMENT_ACCEPT: &str = "7e0222994e9f027e00680100202e0100c21100090100063131010100000601e80301e80359322905013c3c00011201";
const DEREGISTRATION_ACCEPT: &str = "7e0046";

fn test_config() -> UeConfig {
    UeConfig {
        mcc: 208,
        mnc: 93,
        msin: "0123456789".into(),
        routing_indicator: 1234,
        protection_scheme: "null".into(),
        imeisv: "0000000100000101".into(),
        k: "8baf473f2f8fd09487cccbd7097c6862".into(),
        opc: "8e27b6af0e692e750f32667a3b14605d".into(),
        amf: "8000".into(),
        snssai: SNssai {
            sst: 1,
            sd: Some("010203".into()),
        },
        dnn: "internet".into(),
        url: "http://192.168.1.17/".into(),
        force_rinmr: true,
    }
}

fn test_ue() -> Ue {
    Ue::from_config(&test_config()).expect("test config is valid")
}

fn receive(ue: &mut Ue, msg: &str) {
    let pdu = parse_hex(msg).expect("test vector is valid hex");
    ue.receive(&pdu);
}

fn expect(msg: &str) -> Vec<u8> {
    parse_hex(msg).expect("test vector is valid hex")
}

#[test]
fn test_make_registration_request() {
    let mut ue = test_ue();
    assert_eq!(ue.make_registration_request(), expect(REGISTRATION_REQUEST));
    assert_eq!(ue.mm_state, MmState::RegisteredInitiated);
}

#[test]
fn test_make_authentication_response() {
    let mut ue = test_ue();
    receive(&mut ue, AUTHENTICATION_REQUEST);
    assert!(ue.decode_error.is_none());
    assert_eq!(
        ue.make_authentication_response().unwrap(),
        expect(AUTHENTICATION_RESPONSE)
    );
}

#[test]
fn test_make_security_mode_complete_variants() {
    // (IMEISV requested, RINMR requested, forced RINMR); the uplink
    // counter runs across the four frames.
    let patterns = [
        (false, false, false),
        (true, false, false),
        (true, true, false),
        (true, false, true),
    ];

    let mut ue = test_ue();
    receive(&mut ue, AUTHENTICATION_REQUEST);
    receive(&mut ue, SECURITY_MODE_COMMAND);
    assert!(ue.decode_error.is_none());

    for (i, (imeisv, rinmr, force)) in patterns.into_iter().enumerate() {
        ue.imeisv_requested = imeisv;
        ue.rinmr_requested = rinmr;
        ue.force_rinmr = force;
        assert_eq!(
            ue.make_security_mode_complete().unwrap(),
            expect(SECURITY_MODE_COMPLETE[i]),
            "security mode complete variant {i}"
        );
    }
}

#[test]
fn test_make_registration_complete() {
    let mut ue = test_ue();
    receive(&mut ue, AUTHENTICATION_REQUEST);
    receive(&mut ue, SECURITY_MODE_COMMAND);
    receive(&mut ue, REGISTRATION_ACCEPT);
    assert!(ue.decode_error.is_none());
    assert_eq!(ue.mm_state, MmState::Registered);

    assert_eq!(
        ue.make_registration_complete().unwrap(),
        expect(REGISTRATION_COMPLETE)
    );
}

#[test]
fn test_make_pdu_session_establishment_request() {
    let mut ue = test_ue();
    receive(&mut ue, AUTHENTICATION_REQUEST);
    receive(&mut ue, SECURITY_MODE_COMMAND);
    receive(&mut ue, REGISTRATION_ACCEPT);

    assert_eq!(
        ue.make_pdu_session_establishment_request().unwrap(),
        expect(PDU_SESSION_ESTABLISHMENT_REQUEST)
    );
}

#[test]
fn test_make_deregistration_request() {
    let mut ue = test_ue();
    receive(&mut ue, AUTHENTICATION_REQUEST);
    receive(&mut ue, SECURITY_MODE_COMMAND);
    receive(&mut ue, REGISTRATION_ACCEPT);
    receive(&mut ue, PDU_SESSION_ESTABLISHMENT_ACCEPT);
    assert!(ue.decode_error.is_none());

    assert_eq!(
        ue.make_deregistration_request().unwrap(),
        expect(DEREGISTRATION_REQUEST)
    );
    assert_eq!(ue.mm_state, MmState::DeregisteredInitiated);
}

#[test]
fn test_decode_downlink_set() {
    let mut ue = test_ue();
    for (msg, what) in [
        (AUTHENTICATION_REQUEST, "authentication request"),
        (SECURITY_MODE_COMMAND, "security mode command"),
        (REGISTRATION_ACCEPT, "registration accept"),
        (
            PDU_SESSION_ESTABLISHMENT_ACCEPT,
            "pdu session establishment accept",
        ),
        (DEREGISTRATION_ACCEPT, "deregistration accept"),
    ] {
        receive(&mut ue, msg);
        assert!(ue.decode_error.is_none(), "decode failed for {what}");
    }

    // Side effects of the whole downlink run.
    assert_eq!(ue.mm_state, MmState::Deregistered);
    assert_eq!(ue.allowed_nssai.len(), 2);
    assert_eq!(ue.allowed_nssai[0].sd.as_deref(), Some("010203"));
    assert_eq!(ue.tai_list.len(), 1);
    assert_eq!(ue.tai_list[0].tac, 1);
    assert_eq!(ue.t3502_secs, 720);
    assert_eq!(ue.t3512_secs, 3600);
    assert_eq!(ue.pdu_address, Some("60.60.0.1".parse().unwrap()));
}

#[test]
fn test_nas_count_increments_per_protected_message() {
    let mut ue = test_ue();
    receive(&mut ue, AUTHENTICATION_REQUEST);
    receive(&mut ue, SECURITY_MODE_COMMAND);

    assert_eq!(ue.nas_count, 0);
    ue.make_security_mode_complete().unwrap();
    assert_eq!(ue.nas_count, 1);
    ue.make_registration_complete().unwrap();
    assert_eq!(ue.nas_count, 2);
    // Plain messages leave the counter alone.
    ue.make_registration_request();
    assert_eq!(ue.nas_count, 2);
}

#[test]
fn test_secure_frame_round_trip() {
    // An uplink-protected frame verifies under the same keys and yields
    // the original plaintext.
    let mut ue = test_ue();
    receive(&mut ue, AUTHENTICATION_REQUEST);

    let frame = ue.make_registration_complete().unwrap();
    let kint = ue.keys.kint.unwrap();
    let calc = crate::security::compute_nas_mac(
        &kint,
        crate::security::NasDirection::Uplink,
        &frame[6..],
    );
    assert_eq!(&frame[2..6], &calc);
    assert_eq!(&frame[7..], expect("7e0043").as_slice());
}

#[test]
fn test_auth_mac_mismatch_recorded() {
    let mut ue = test_ue();
    let mut pdu = parse_hex(AUTHENTICATION_REQUEST).unwrap();
    // Corrupt one RAND octet so MAC-A no longer matches.
    let len = pdu.len();
    pdu[len - 30] ^= 0xff;
    ue.receive(&pdu);

    assert!(matches!(ue.decode_error, Some(NasError::AuthMacMismatch)));
    assert_eq!(ue.rcvd, RcvdState::Null);
    // No response is produced until a good downlink arrives.
    assert!(ue.make_nas_pdu().is_none());
}

#[test]
fn test_integrity_failure_discards_inner_pdu() {
    let mut ue = test_ue();
    receive(&mut ue, AUTHENTICATION_REQUEST);
    receive(&mut ue, SECURITY_MODE_COMMAND);

    let mut tampered = parse_hex(REGISTRATION_ACCEPT).unwrap();
    tampered[2] ^= 0x01; // break the MAC
    ue.receive(&tampered);

    assert!(matches!(
        ue.decode_error,
        Some(NasError::IntegrityCheckFailed)
    ));
    // The inner Registration Accept must not have taken effect.
    assert_ne!(ue.mm_state, MmState::Registered);
    assert!(ue.five_g_guti.is_empty());
}

#[test]
fn test_make_nas_pdu_follows_rcvd_state() {
    let mut ue = test_ue();
    assert!(ue.make_nas_pdu().is_none());

    receive(&mut ue, AUTHENTICATION_REQUEST);
    assert_eq!(ue.make_nas_pdu().unwrap(), expect(AUTHENTICATION_RESPONSE));

    receive(&mut ue, SECURITY_MODE_COMMAND);
    // The captured command carries no RINMR bit; the forced override
    // still produces the NAS message container variant.
    let smc = ue.make_nas_pdu().unwrap();
    assert_eq!(&smc[..2], &[0x7e, 0x04]);
    let inner = &smc[7..];
    assert_eq!(&inner[..3], &[0x7e, 0x00, 0x5e]);
    let registration_request = expect(REGISTRATION_REQUEST);
    assert!(inner
        .windows(registration_request.len())
        .any(|w| w == registration_request.as_slice()));

    receive(&mut ue, REGISTRATION_ACCEPT);
    let complete = ue.make_nas_pdu().unwrap();
    assert_eq!(&complete[7..], expect("7e0043").as_slice());
}
