//! Byte-exact NGAP tests against captures from live free5gc and
//! open5gs cores.

use std::net::IpAddr;

use ransim_common::{parse_hex, BroadcastPlmn, GlobalGnbId, GnbConfig, PagingDrx, Plmn, SNssai,
    SupportedTa, UeConfig};
use ransim_nas::Ue;

use crate::gnb::Gnb;

// Uplink messages the gNB must reproduce bit for bit.
const NG_SETUP_REQUEST: &str =
    "00150028000003001b00080002f839000000040066001000000000010002f839000010080102030015400100";
const INITIAL_UE_MESSAGE: &str = "000f40470000050055000200000026001d1c7e004179000d0102f8392143000010325476981001202e0480a000000079000f4002f839000004001002f839000001005a4001180070400100";
const UL_AUTHENTICATION_RESPONSE: &str = "002e403c000004000a0002000100550002000000260016157e00572d10803adcacc364fc000bdc0f65e324eaa10079400f4002f839000004001002f839000001";
const UL_SECURITY_MODE_COMPLETE: &str = "002e403d000004000a0002000100550002000000260017167e0452a73e0c007e005e7700090500000001000001f10079400f4002f839000004001002f839000001";
const INITIAL_CONTEXT_SETUP_RESPONSE: &str = "200e000f000002000a00020001005500020000";
const UL_REGISTRATION_COMPLETE: &str = "002e4031000004000a000200010055000200000026000b0a7e042cbd08cf017e00430079400f4002f839000004001002f839000001";
const PDU_SESSION_RESOURCE_SETUP_RESPONSE: &str =
    "201d0024000003000a00020001005500020000004b40110000010d0003e0c0a80103000003e70001";

// Downlink messages captured from free5gc.
const NG_SETUP_RESPONSE: &str = "20150031000004000100050100414d4600600008000002f839cafe0000564001ff005000100002f839000110080102031008112233";
const DL_AUTHENTICATION_REQUEST: &str = "0004403e000003000a000200010055000200000026002b2a7e00560002000021fc64081953bb33c0682edf1690b25821201094bbaf40940a8000c6a72c4efbaf0337";
const DL_SECURITY_MODE_COMMAND: &str =
    "00044029000003000a0002000100550002000000260016157e036c2b24e2007e005d02000480a00000e1360100";
const INITIAL_CONTEXT_SETUP_REQUEST: &str = "000e0080a7000009000a00020001005500020000001c00070002f839cafe000000000a2201010203100811223300770009000004000000000000005e002013663ab7286c9a6af7cba0b1fd9e6ed48045d4356d46ff3944c81c63324fd803002440040002f839002240080000000100ffff0100264036357e02930d75cf017e0242010177000b0202f839cafe000000000154070002f839000001150a040101020304011122335e010616012c";
const INITIAL_CONTEXT_SETUP_REQUEST_2: &str = "000e0080f500000b000a00020001005500020000006e0008080f4240200f4240001c00070002f839cafe000047002a000001402001020321000003008b000a01f07f00000800000001008600010000880007000000000938000000000a2201010203100811223300770009000000100000000000005e0020473007e30d4d0d77a7073e5b43b909562b7a8c461fc7ef0b73ab4026edbb91aa002440040002f839002240080000000100ffff010026404a497e02809e40eb027e006801003a2e0101c211000901000631310101ff00060103e80103e859322905013c3c0001220401010203790006002041010109250908696e7465726e65741201";
const DL_PDU_SESSION_ESTABLISHMENT_ACCEPT: &str = "001d006d000003000a00020001005500020000004a005a0040012f7e0222994e9f027e00680100202e0100c21100090100063131010100000601e80301e80359322905013c3c00011201402001020321000003008b000a01f0c0a80112000000010086000100008800 0700010000093800";

// Downlink messages captured from open5gs, decoded for tolerance.
const O5GS_NG_SETUP_RESPONSE: &str = "201500320000040001000e05806f70656e3567732d616d663000600008000002f83901004000564001ff005000080002f83900000008";
const O5GS_DL_AUTHENTICATION_REQUEST: &str = "0004403e000003000a000200020055000200000026002b2a7e00560002000021d231c4098df35d5ea33e62ffad05d2fa2010aaf6a4fd4c3b800059dc4597900d4b1f";
const O5GS_DL_SECURITY_MODE_COMMAND: &str =
    "00044027000003000a0002000200550002000000260014137e03fd70f3b3007e005d02000280a0e1360102";
const O5GS_INITIAL_CONTEXT_SETUP_REQUEST: &str = "000e00809e000009000a00020002005500020000006e000a0c3e800000303e800000001c00070002f83901004000000002000100770009000004000000000000005e002050437b88f28f5f228eebd3e4517265f99473dbc12b7475a56da62e755d60166e002240080000000100ffff010026402f2e7e0227d3fd9f017e0042010177000bf202f839010040c800cbd954072002f83900000115020101210201005e0129";
const O5GS_CONFIGURATION_UPDATE_COMMAND: &str = "0004403a000003000a0002000200550002000000260027267e024745e85a027e0054430f10004f00700065006e0035004700534702010151114500490100";
const O5GS_DL_PDU_SESSION_ESTABLISHMENT_ACCEPT: &str = "001d00808f000003000a00020002005500020000004a007c004001467e02f1620a15037e00680100372e0101c211000901000631210101ff01060a00030a000359322905010a2e0002220101790006012041010109250908696e7465726e6574120100202f0000040082000a0c3e800000303e800000008b000a01f0c0a8c7ca0000000100860001000088000700010000091c00";

fn test_gnb_config() -> GnbConfig {
    GnbConfig {
        global_gnb_id: GlobalGnbId {
            mcc: 208,
            mnc: 93,
            gnb_id: 1,
        },
        nr_cell_id: 1,
        supported_ta_list: vec![SupportedTa {
            tac: 1,
            broadcast_plmn_list: vec![BroadcastPlmn {
                plmn: Plmn::new(208, 93),
                slice_support_list: vec![SNssai {
                    sst: 1,
                    sd: Some("010203".into()),
                }],
            }],
        }],
        paging_drx: PagingDrx::V32,
        tac: 1,
        ngap_peer_addr: "192.168.1.17".parse::<IpAddr>().unwrap(),
        gtpu_local_addr: "192.168.1.3".parse::<IpAddr>().unwrap(),
        gtpu_ifname: "eth0".into(),
        gtpu_teid: 999,
        timeout_secs: 10,
    }
}

fn test_ue_config() -> UeConfig {
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
        // The captured session sent Security Mode Complete without the
        // NAS message container.
        force_rinmr: false,
    }
}

fn init_env() -> (Gnb, Vec<Ue>) {
    let mut gnb = Gnb::from_config(&test_gnb_config());
    let ue = Ue::from_config(&test_ue_config()).expect("test config is valid");
    gnb.camp_in(0);
    (gnb, vec![ue])
}

fn recv_from_nw(gnb: &mut Gnb, ues: &mut [Ue], msg: &str) {
    let pdu: Vec<u8> = parse_hex(&msg.replace(' ', "")).expect("test vector is valid hex");
    gnb.decode(&pdu, ues);
}

fn expect(msg: &str) -> Vec<u8> {
    parse_hex(&msg.replace(' ', "")).expect("test vector is valid hex")
}

#[test]
fn test_make_ng_setup_request() {
    let (gnb, _) = init_env();
    assert_eq!(gnb.make_ng_setup_request().unwrap(), expect(NG_SETUP_REQUEST));
    assert_eq!(gnb.ngap_peer_addr, "192.168.1.17".parse::<IpAddr>().unwrap());
}

#[test]
fn test_make_initial_ue_message() {
    let (mut gnb, mut ues) = init_env();

    let pdu = ues[0].make_registration_request();
    gnb.recv_from_ue(0, pdu).unwrap();

    assert_eq!(
        gnb.make_initial_ue_message(0).unwrap(),
        expect(INITIAL_UE_MESSAGE)
    );
    // The staged NAS PDU is consumed.
    assert!(gnb.make_initial_ue_message(0).is_err());
}

#[test]
fn test_make_uplink_nas_transport_sequence() {
    let (mut gnb, mut ues) = init_env();

    recv_from_nw(&mut gnb, &mut ues, DL_AUTHENTICATION_REQUEST);
    assert!(gnb.decode_error.is_none());
    let pdu = ues[0].make_authentication_response().unwrap();
    gnb.recv_from_ue(0, pdu).unwrap();
    assert_eq!(
        gnb.make_uplink_nas_transport(0).unwrap(),
        expect(UL_AUTHENTICATION_RESPONSE)
    );

    recv_from_nw(&mut gnb, &mut ues, DL_SECURITY_MODE_COMMAND);
    let pdu = ues[0].make_security_mode_complete().unwrap();
    gnb.recv_from_ue(0, pdu).unwrap();
    assert_eq!(
        gnb.make_uplink_nas_transport(0).unwrap(),
        expect(UL_SECURITY_MODE_COMPLETE)
    );

    recv_from_nw(&mut gnb, &mut ues, INITIAL_CONTEXT_SETUP_REQUEST);
    let pdu = ues[0].make_registration_complete().unwrap();
    gnb.recv_from_ue(0, pdu).unwrap();
    assert_eq!(
        gnb.make_uplink_nas_transport(0).unwrap(),
        expect(UL_REGISTRATION_COMPLETE)
    );
}

#[test]
fn test_make_initial_context_setup_response() {
    let (mut gnb, mut ues) = init_env();

    recv_from_nw(&mut gnb, &mut ues, DL_AUTHENTICATION_REQUEST);
    assert_eq!(
        gnb.make_initial_context_setup_response(0).unwrap(),
        expect(INITIAL_CONTEXT_SETUP_RESPONSE)
    );
}

#[test]
fn test_make_pdu_session_resource_setup_response() {
    let (mut gnb, mut ues) = init_env();

    for msg in [
        NG_SETUP_RESPONSE,
        DL_AUTHENTICATION_REQUEST,
        DL_SECURITY_MODE_COMMAND,
        INITIAL_CONTEXT_SETUP_REQUEST,
        DL_PDU_SESSION_ESTABLISHMENT_ACCEPT,
    ] {
        recv_from_nw(&mut gnb, &mut ues, msg);
        assert!(gnb.decode_error.is_none());
    }

    assert_eq!(
        gnb.make_pdu_session_resource_setup_response(0).unwrap(),
        expect(PDU_SESSION_RESOURCE_SETUP_RESPONSE)
    );

    // The setup request transfer delivered the UPF endpoint.
    let camper = gnb.camper(0).unwrap();
    assert_eq!(camper.pdu_session_id, Some(1));
    let peer = camper.gtp_peer.unwrap();
    assert_eq!(peer.addr, "192.168.1.18".parse::<std::net::Ipv4Addr>().unwrap());
    assert_eq!(peer.teid, 1);
    // And the carried NAS gave the UE its address.
    assert_eq!(ues[0].pdu_address, Some("60.60.0.1".parse().unwrap()));
}

#[test]
fn test_decode_free5gc_set() {
    let (mut gnb, mut ues) = init_env();
    for (msg, what) in [
        (NG_SETUP_RESPONSE, "ng setup response"),
        (DL_AUTHENTICATION_REQUEST, "authentication request"),
        (DL_SECURITY_MODE_COMMAND, "security mode command"),
        (INITIAL_CONTEXT_SETUP_REQUEST, "initial context setup"),
        (INITIAL_CONTEXT_SETUP_REQUEST_2, "initial context setup #2"),
        (
            DL_PDU_SESSION_ESTABLISHMENT_ACCEPT,
            "pdu session establishment accept",
        ),
    ] {
        recv_from_nw(&mut gnb, &mut ues, msg);
        assert!(gnb.decode_error.is_none(), "decode failed for {what}");
    }
}

#[test]
fn test_decode_open5gs_set() {
    let (mut gnb, mut ues) = init_env();
    // open5gs assigns RAN-UE-NGAP-ID 1 in these captures; camp a second
    // UE so the addressed camper exists.
    let second = Ue::from_config(&test_ue_config()).expect("test config is valid");
    ues.push(second);
    let ran_id = gnb.camp_in(1);
    assert_eq!(ran_id, 1);

    for (msg, what) in [
        (O5GS_NG_SETUP_RESPONSE, "ng setup response"),
        (O5GS_DL_AUTHENTICATION_REQUEST, "authentication request"),
        (O5GS_DL_SECURITY_MODE_COMMAND, "security mode command"),
        (O5GS_INITIAL_CONTEXT_SETUP_REQUEST, "initial context setup"),
        (O5GS_CONFIGURATION_UPDATE_COMMAND, "configuration update"),
        (
            O5GS_DL_PDU_SESSION_ESTABLISHMENT_ACCEPT,
            "pdu session establishment accept",
        ),
    ] {
        recv_from_nw(&mut gnb, &mut ues, msg);
        assert!(gnb.decode_error.is_none(), "decode failed for {what}");
    }
}

#[test]
fn test_camp_in_allocates_unique_ids() {
    let mut gnb = Gnb::from_config(&test_gnb_config());
    let mut seen = Vec::new();
    for i in 0..16 {
        let id = gnb.camp_in(i);
        assert!(!seen.contains(&id), "duplicate RAN-UE-NGAP-ID {id}");
        seen.push(id);
    }
}

#[test]
fn test_amf_and_ran_ids_commit_in_either_order() {
    // A synthetic Downlink NAS Transport with the RAN id before the
    // AMF id; the pair must still land on the camper.
    let (mut gnb, mut ues) = init_env();

    let mut ies = Vec::new();
    // RAN-UE-NGAP-ID 0.
    ies.extend(expect("0055000200 00"));
    // AMF-UE-NGAP-ID 7.
    ies.extend(expect("000a00020007"));

    let mut pdu = expect("000440"); // DownlinkNASTransport header
    pdu.push((ies.len() + 3) as u8);
    pdu.extend(expect("000002"));
    pdu.extend(&ies);

    gnb.decode(&pdu, &mut ues);
    assert!(gnb.decode_error.is_none());
    assert_eq!(
        gnb.camper(0).unwrap().amf_ue_ngap_id.as_deref(),
        Some(&[0x00, 0x07][..])
    );
}

#[test]
fn test_unknown_procedure_is_not_fatal() {
    let (mut gnb, mut ues) = init_env();
    // Procedure code 200 with an empty IE container.
    let pdu = expect("00c80003000000");
    gnb.decode(&pdu, &mut ues);
    assert!(gnb.decode_error.is_none());
}
