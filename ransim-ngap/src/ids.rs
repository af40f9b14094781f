//! NGAP identifiers: procedure codes, Protocol IE ids, criticality.

/// NGAP-PDU choice index.
pub const PDU_INITIATING_MESSAGE: u64 = 0;
/// Successful outcome choice index.
pub const PDU_SUCCESSFUL_OUTCOME: u64 = 1;
/// Unsuccessful outcome choice index.
pub const PDU_UNSUCCESSFUL_OUTCOME: u64 = 2;

/// Elementary procedure codes (TS 38.413 9.3.1.1).
pub const PROC_DOWNLINK_NAS_TRANSPORT: u8 = 4;
pub const PROC_INITIAL_CONTEXT_SETUP: u8 = 14;
pub const PROC_INITIAL_UE_MESSAGE: u8 = 15;
pub const PROC_NG_SETUP: u8 = 21;
pub const PROC_PDU_SESSION_RESOURCE_SETUP: u8 = 29;
pub const PROC_UPLINK_NAS_TRANSPORT: u8 = 46;

/// Name of a procedure code for the logs.
pub fn procedure_name(code: u8) -> Option<&'static str> {
    match code {
        PROC_DOWNLINK_NAS_TRANSPORT => Some("DownlinkNASTransport"),
        PROC_INITIAL_CONTEXT_SETUP => Some("InitialContextSetup"),
        PROC_INITIAL_UE_MESSAGE => Some("InitialUEMessage"),
        PROC_NG_SETUP => Some("NGSetup"),
        PROC_PDU_SESSION_RESOURCE_SETUP => Some("PDUSessionResourceSetup"),
        PROC_UPLINK_NAS_TRANSPORT => Some("UplinkNASTransport"),
        _ => None,
    }
}

/// Message-level criticality (TS 38.413 9.3.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Criticality {
    /// reject
    Reject = 0,
    /// ignore
    Ignore = 1,
    /// notify
    Notify = 2,
}

/// Protocol IE ids (TS 38.413 9.3.1).
pub const ID_AMF_NAME: u16 = 1;
pub const ID_AMF_UE_NGAP_ID: u16 = 10;
pub const ID_DEFAULT_PAGING_DRX: u16 = 21;
pub const ID_GLOBAL_RAN_NODE_ID: u16 = 27;
pub const ID_GUAMI: u16 = 28;
pub const ID_NAS_PDU: u16 = 38;
pub const ID_PDU_SESSION_RESOURCE_SETUP_LIST_SU_REQ: u16 = 74;
pub const ID_PDU_SESSION_RESOURCE_SETUP_LIST_SU_RES: u16 = 75;
pub const ID_PLMN_SUPPORT_LIST: u16 = 80;
pub const ID_RAN_UE_NGAP_ID: u16 = 85;
pub const ID_RELATIVE_AMF_CAPACITY: u16 = 86;
pub const ID_RRC_ESTABLISHMENT_CAUSE: u16 = 90;
pub const ID_SECURITY_KEY: u16 = 94;
pub const ID_SERVED_GUAMI_LIST: u16 = 96;
pub const ID_SUPPORTED_TA_LIST: u16 = 102;
pub const ID_UE_CONTEXT_REQUEST: u16 = 112;
pub const ID_UE_SECURITY_CAPABILITIES: u16 = 119;
pub const ID_USER_LOCATION_INFORMATION: u16 = 121;
pub const ID_PDU_SESSION_TYPE: u16 = 134;
pub const ID_QOS_FLOW_SETUP_REQUEST_LIST: u16 = 136;
pub const ID_UL_NGU_UP_TNL_INFORMATION: u16 = 139;

/// Name of a Protocol IE id for the logs.
pub fn ie_name(id: u16) -> Option<&'static str> {
    match id {
        ID_AMF_NAME => Some("AMFName"),
        ID_AMF_UE_NGAP_ID => Some("AMF-UE-NGAP-ID"),
        ID_DEFAULT_PAGING_DRX => Some("DefaultPagingDRX"),
        ID_GLOBAL_RAN_NODE_ID => Some("GlobalRANNodeID"),
        ID_GUAMI => Some("GUAMI"),
        ID_NAS_PDU => Some("NAS-PDU"),
        ID_PDU_SESSION_RESOURCE_SETUP_LIST_SU_REQ => Some("PDUSessionResourceSetupListSUReq"),
        ID_PDU_SESSION_RESOURCE_SETUP_LIST_SU_RES => Some("PDUSessionResourceSetupListSURes"),
        ID_PLMN_SUPPORT_LIST => Some("PLMNSupportList"),
        ID_RAN_UE_NGAP_ID => Some("RAN-UE-NGAP-ID"),
        ID_RELATIVE_AMF_CAPACITY => Some("RelativeAMFCapacity"),
        ID_RRC_ESTABLISHMENT_CAUSE => Some("RRCEstablishmentCause"),
        ID_SECURITY_KEY => Some("SecurityKey"),
        ID_SERVED_GUAMI_LIST => Some("ServedGUAMIList"),
        ID_SUPPORTED_TA_LIST => Some("SupportedTAList"),
        ID_UE_CONTEXT_REQUEST => Some("UEContextRequest"),
        ID_UE_SECURITY_CAPABILITIES => Some("UESecurityCapabilities"),
        ID_USER_LOCATION_INFORMATION => Some("UserLocationInformation"),
        ID_PDU_SESSION_TYPE => Some("PDUSessionType"),
        ID_QOS_FLOW_SETUP_REQUEST_LIST => Some("QosFlowSetupRequestList"),
        ID_UL_NGU_UP_TNL_INFORMATION => Some("UL-NGU-UP-TNLInformation"),
        _ => None,
    }
}

/// RRC establishment cause mo-Signalling (TS 38.413 9.3.1.111).
pub const RRC_CAUSE_MO_SIGNALLING: u64 = 3;
