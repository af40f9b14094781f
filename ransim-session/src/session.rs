//! The attach sequence and user-plane startup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use ransim_common::{Error, N2Stream, SessionConfig, TunDevice, UdpTransport, GTPU_PORT};
use ransim_gtp::{downlink_task, uplink_task, GtpTunnel};
use ransim_nas::{NasError, Ue};
use ransim_ngap::{Gnb, NgapError};

use crate::probe::probe_task;

/// Driver-level errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// NAS layer failure.
    #[error("NAS error: {0}")]
    Nas(#[from] NasError),

    /// NGAP layer failure.
    #[error("NGAP error: {0}")]
    Ngap(#[from] NgapError),

    /// Transport failure; fatal for the session.
    #[error("transport error: {0}")]
    Transport(#[from] Error),

    /// The UE state machine produced nothing where a response was due.
    #[error("no uplink NAS message pending")]
    NothingToSend,

    /// User-plane startup before the session resources exist.
    #[error("PDU session not established: {0}")]
    NoSession(&'static str),
}

/// One UE attached through one gNB over one N2 association.
pub struct Session<T: N2Stream> {
    ues: Vec<Ue>,
    gnb: Gnb,
    n2: T,
    read_timeout: Duration,
}

impl<T: N2Stream> Session<T> {
    /// Builds the session from configuration and an N2 transport.
    pub fn new(config: &SessionConfig, n2: T) -> Result<Self, SessionError> {
        let ue = Ue::from_config(&config.ue)?;
        let mut gnb = Gnb::from_config(&config.gnb);
        if gnb.gtpu_teid == 0 {
            gnb.gtpu_teid = rand::random();
        }
        gnb.camp_in(0);

        Ok(Self {
            ues: vec![ue],
            gnb,
            n2,
            read_timeout: Duration::from_secs(config.gnb.timeout_secs),
        })
    }

    /// The emulated UE.
    pub fn ue(&self) -> &Ue {
        &self.ues[0]
    }

    /// The emulated gNB.
    pub fn gnb(&self) -> &Gnb {
        &self.gnb
    }

    /// Sends one NGAP PDU; a send failure is fatal.
    async fn send(&mut self, pdu: Vec<u8>) -> Result<(), SessionError> {
        debug!("N2 send: {} octets", pdu.len());
        self.n2.send(&pdu).await?;
        Ok(())
    }

    /// Receives and decodes one NGAP PDU, bounded by the configured
    /// timer. An elapsed timer is non-fatal; the procedure continues on
    /// a best-effort basis.
    async fn recv(&mut self) -> Result<(), SessionError> {
        match timeout(self.read_timeout, self.n2.recv()).await {
            Err(_) => {
                warn!("N2 read timed out after {:?}", self.read_timeout);
                Ok(())
            }
            Ok(Err(err)) => Err(err.into()),
            Ok(Ok(pdu)) => {
                debug!("N2 recv: {} octets", pdu.len());
                self.gnb.decode(&pdu, &mut self.ues);
                Ok(())
            }
        }
    }

    /// Stages the UE's pending response and sends it as an Uplink NAS
    /// Transport.
    async fn send_pending_nas(&mut self) -> Result<(), SessionError> {
        let pdu = self.ues[0].make_nas_pdu().ok_or(SessionError::NothingToSend)?;
        self.gnb.recv_from_ue(0, pdu)?;
        let transport = self.gnb.make_uplink_nas_transport(0)?;
        self.send(transport).await
    }

    /// NG Setup: announce the gNB and wait for the AMF's view.
    pub async fn setup(&mut self) -> Result<(), SessionError> {
        let pdu = self.gnb.make_ng_setup_request()?;
        self.send(pdu).await?;
        self.recv().await
    }

    /// The full registration sequence: Registration Request,
    /// authentication, NAS security mode, Initial Context Setup and
    /// Registration Complete.
    pub async fn register_ue(&mut self) -> Result<(), SessionError> {
        let pdu = self.ues[0].make_registration_request();
        self.gnb.recv_from_ue(0, pdu)?;
        let initial = self.gnb.make_initial_ue_message(0)?;
        self.send(initial).await?;
        self.recv().await?; // Authentication Request

        self.send_pending_nas().await?; // Authentication Response
        self.recv().await?; // Security Mode Command

        self.send_pending_nas().await?; // Security Mode Complete
        self.recv().await?; // Initial Context Setup Request

        let response = self.gnb.make_initial_context_setup_response(0)?;
        self.send(response).await?;

        self.send_pending_nas().await?; // Registration Complete
        info!("UE registered");
        Ok(())
    }

    /// PDU session establishment and the setup response announcing the
    /// gNB's tunnel endpoint.
    pub async fn establish_pdu_session(&mut self) -> Result<(), SessionError> {
        let pdu = self.ues[0].make_pdu_session_establishment_request()?;
        self.gnb.recv_from_ue(0, pdu)?;
        let transport = self.gnb.make_uplink_nas_transport(0)?;
        self.send(transport).await?;
        self.recv().await?; // PDU Session Resource Setup Request

        let response = self.gnb.make_pdu_session_resource_setup_response(0)?;
        self.send(response).await?;
        info!("PDU session established");
        Ok(())
    }

    /// UE-initiated deregistration.
    pub async fn deregister_ue(&mut self) -> Result<(), SessionError> {
        let pdu = self.ues[0].make_deregistration_request()?;
        self.gnb.recv_from_ue(0, pdu)?;
        let transport = self.gnb.make_uplink_nas_transport(0)?;
        self.send(transport).await?;
        self.recv().await // Deregistration Accept
    }

    /// The tunnel descriptor for the established session.
    pub fn tunnel(&self) -> Result<GtpTunnel, SessionError> {
        let camper = self
            .gnb
            .camper(0)
            .ok_or(SessionError::NoSession("UE never camped in"))?;
        let peer = camper
            .gtp_peer
            .ok_or(SessionError::NoSession("no UP transport information"))?;
        Ok(GtpTunnel {
            local_teid: self.gnb.gtpu_teid,
            peer_teid: peer.teid,
            peer_addr: peer.addr,
            qos_flow_id: camper.qos_flow_id,
            has_extension_header: true,
        })
    }

    /// Spawns the user-plane tasks: tun-to-UDP uplink, UDP-to-tun
    /// downlink and the HTTP probe, all tied to `shutdown`.
    ///
    /// On cancellation the probe exits on its own; the tun and UDP
    /// reads unblock only when the owner closes the underlying
    /// descriptors.
    pub async fn start_user_plane<D>(
        &self,
        tun: Arc<D>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Vec<JoinHandle<()>>, SessionError>
    where
        D: TunDevice + Send + Sync + 'static,
    {
        let tunnel = self.tunnel()?;
        let pdu_address = self.ues[0]
            .pdu_address
            .ok_or(SessionError::NoSession("no PDU address assigned"))?;

        let local = SocketAddr::new(self.gnb.gtpu_local_addr(), GTPU_PORT);
        let udp = Arc::new(UdpTransport::bind(local).await.map_err(SessionError::from)?);
        info!(
            "user plane up: local {local} peer {} qfi {}",
            tunnel.peer_socket_addr(),
            tunnel.qos_flow_id
        );

        let up = {
            let tun = Arc::clone(&tun);
            let udp = Arc::clone(&udp);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if let Err(err) = uplink_task(tun, udp, tunnel, shutdown).await {
                    warn!("uplink task ended: {err}");
                }
            })
        };
        let down = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if let Err(err) = downlink_task(tun, udp, tunnel, shutdown).await {
                    warn!("downlink task ended: {err}");
                }
            })
        };
        let probe = tokio::spawn(probe_task(
            self.ues[0].url.clone(),
            pdu_address,
            shutdown,
        ));

        Ok(vec![up, down, probe])
    }
}
