//! HTTP probe: periodic GETs from the UE's PDU address, proving that
//! uplink traffic actually leaves through the tunnel.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Empty;
use hyper::header::HOST;
use hyper::{Request, Uri};
use hyper_util::rt::TokioIo;
use tokio::net::TcpSocket;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use ransim_common::Error;

/// Probe period.
const PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Connect and response deadline per probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Probes `url` every few seconds with the TCP source address pinned to
/// the UE's PDU address, until `shutdown` fires.
pub async fn probe_task(url: String, local_addr: Ipv4Addr, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("HTTP probe stopping");
                return;
            }
            _ = sleep(PROBE_INTERVAL) => {}
        }

        match probe_once(&url, local_addr).await {
            Ok(status) if (200..300).contains(&status) => {
                info!("HTTP probe: GET {url} -> {status}");
            }
            Ok(status) => warn!("HTTP probe: GET {url} -> unexpected status {status}"),
            Err(err) => warn!("HTTP probe failed: {err}"),
        }
    }
}

/// One GET over a connection bound to `local_addr`.
async fn probe_once(url: &str, local_addr: Ipv4Addr) -> Result<u16, Error> {
    let uri: Uri = url
        .parse()
        .map_err(|_| Error::Config(format!("bad probe URL: {url}")))?;
    let host = uri
        .host()
        .ok_or_else(|| Error::Config(format!("probe URL has no host: {url}")))?
        .to_string();
    let port = uri.port_u16().unwrap_or(80);

    let remote = resolve(&host, port).await?;
    let socket = TcpSocket::new_v4()?;
    socket.bind(SocketAddr::new(local_addr.into(), 0))?;
    let stream = timeout(PROBE_TIMEOUT, socket.connect(remote))
        .await
        .map_err(|_| Error::Protocol("probe connect timed out".into()))??;

    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|err| Error::Protocol(format!("http handshake: {err}")))?;
    tokio::spawn(conn);

    let path = uri.path_and_query().map_or("/", |p| p.as_str()).to_string();
    let request = Request::builder()
        .uri(path)
        .header(HOST, host)
        .body(Empty::<Bytes>::new())
        .map_err(|err| Error::Protocol(format!("http request: {err}")))?;

    let response = timeout(PROBE_TIMEOUT, sender.send_request(request))
        .await
        .map_err(|_| Error::Protocol("probe response timed out".into()))?
        .map_err(|err| Error::Protocol(format!("http send: {err}")))?;
    Ok(response.status().as_u16())
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, Error> {
    let mut addrs = tokio::net::lookup_host((host, port)).await?;
    addrs
        .next()
        .ok_or_else(|| Error::Config(format!("cannot resolve probe host {host}")))
}
