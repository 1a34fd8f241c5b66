use std::time::Duration;

use http_body_util::{BodyExt, Empty};
use hyper::Request;
use hyper::body::Bytes;
use hyper::header;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tokio_native_tls::TlsConnector as TokioTlsConnector;

use super::result::{ProbeError, TrialOutcome};
use crate::config::model::ProbeConfig;

/// Run one connect-wait-request cycle against the configured target.
///
/// The TCP connection is established first and then held idle for `wait`
/// (with periodic zero-length keepalive writes when configured) before any
/// TLS or HTTP bytes go out. Whatever the outcome, the connection is torn
/// down before this returns.
pub async fn run_trial(
    config: &ProbeConfig,
    connector: &TokioTlsConnector,
    wait: Duration,
) -> TrialOutcome {
    try_trial(config, connector, wait).await.into()
}

async fn try_trial(
    config: &ProbeConfig,
    connector: &TokioTlsConnector,
    wait: Duration,
) -> Result<usize, ProbeError> {
    let mut stream = TcpStream::connect((config.host.as_str(), config.port))
        .await
        .map_err(ProbeError::Connect)?;

    delay(&mut stream, wait, config.keepalive).await?;

    if config.tls {
        let stream = connector
            .connect(&config.host, stream)
            .await
            .map_err(ProbeError::Tls)?;
        exchange(stream, config).await
    } else {
        exchange(stream, config).await
    }
}

/// Hold the freshly opened connection idle. With a keepalive interval `k`
/// this sleeps `k` then writes a zero-length payload, `floor(wait / k)`
/// times (zero times when `wait < k`); without keepalives it is a single
/// uninterrupted sleep and nothing is written.
async fn delay<S>(
    stream: &mut S,
    wait: Duration,
    keepalive: Option<Duration>,
) -> Result<(), ProbeError>
where
    S: AsyncWrite + Unpin,
{
    match keepalive {
        None => sleep(wait).await,
        Some(interval) => {
            for _ in 0..keepalive_writes(wait, interval) {
                sleep(interval).await;
                stream.write(&[]).await.map_err(ProbeError::Keepalive)?;
            }
        }
    }
    Ok(())
}

/// Number of keepalive writes that fit in `wait`.
fn keepalive_writes(wait: Duration, interval: Duration) -> u64 {
    wait.as_secs() / interval.as_secs()
}

/// GET request for the configured target: origin-form URI, explicit Host.
pub fn build_request(config: &ProbeConfig) -> hyper::http::Result<Request<Empty<Bytes>>> {
    Request::get(config.uri.clone())
        .header(header::HOST, config.host_header.clone())
        .body(Empty::new())
}

/// Issue the GET over the delayed connection and read the response body to
/// its end. The connection driver is joined on every path so the socket is
/// gone before the next trial dials.
async fn exchange<S>(stream: S, config: &ProbeConfig) -> Result<usize, ProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let request = build_request(config).map_err(ProbeError::Request)?;

    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(ProbeError::Handshake)?;
    let conn = tokio::spawn(conn);

    let result = match sender.send_request(request).await {
        Ok(response) => match response.into_body().collect().await {
            Ok(body) => Ok(body.to_bytes().len()),
            Err(err) => Err(ProbeError::Read(err)),
        },
        Err(err) => Err(ProbeError::Transport(err)),
    };

    drop(sender);
    let _ = conn.await;

    result
}
