use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    body::{Bytes, HttpBody},
    extract::ConnectInfo,
    http::Request,
    response::Response,
    BoxError, Router,
};
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
    service::TowerToHyperService,
};
use rustls_pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tower::{util::Oneshot, Service, ServiceExt};
use tracing::{debug, warn};

use crate::config::TlsConfig;

pub fn load_server_config(cert_path: &Path, key_path: &Path) -> anyhow::Result<rustls::ServerConfig> {
    let certs = CertificateDer::pem_file_iter(cert_path)
        .with_context(|| format!("open certificate {}", cert_path.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("parse certificate {}", cert_path.display()))?;
    if certs.is_empty() {
        anyhow::bail!("no certificates found in {}", cert_path.display());
    }
    let key = PrivateKeyDer::from_pem_file(key_path)
        .with_context(|| format!("read private key {}", key_path.display()))?;

    let mut config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("build TLS server config")?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(config)
}

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept loop terminating TLS in-process. Each connection gets the peer
/// address as `ConnectInfo`, the same as the plain `axum::serve` path.
pub async fn serve(listener: TcpListener, app: Router, tls: &TlsConfig) -> anyhow::Result<()> {
    let config = load_server_config(&tls.cert_path, &tls.key_path)?;
    let acceptor = TlsAcceptor::from(Arc::new(config));

    loop {
        let (tcp, remote) = accept(&listener).await;
        let acceptor = acceptor.clone();
        let service = TowerToHyperService::new(with_peer_addr::<Incoming>(app.clone(), remote));

        tokio::spawn(async move {
            let stream = match acceptor.accept(tcp).await {
                Ok(s) => s,
                Err(e) => {
                    debug!(%remote, error = %e, "tls handshake failed");
                    return;
                }
            };
            if let Err(e) = Builder::new(TokioExecutor::new())
                .serve_connection_with_upgrades(TokioIo::new(stream), service)
                .await
            {
                debug!(%remote, error = %e, "connection closed with error");
            }
        });
    }
}

/// Waits out accept errors such as fd exhaustion instead of retrying in a tight loop.
async fn accept(listener: &TcpListener) -> (TcpStream, SocketAddr) {
    loop {
        match listener.accept().await {
            Ok(conn) => return conn,
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

/// Stamps `ConnectInfo` on each request and hands it to the shared router.
fn with_peer_addr<B>(
    app: Router,
    remote: SocketAddr,
) -> impl Service<Request<B>, Response = Response, Error = Infallible, Future = Oneshot<Router, Request<B>>>
       + Clone
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    tower::service_fn(move |mut req: Request<B>| {
        req.extensions_mut().insert(ConnectInfo(remote));
        app.clone().oneshot(req)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get};
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn peer_address_reaches_handlers() {
        let app = Router::new().route(
            "/",
            get(|ConnectInfo(addr): ConnectInfo<SocketAddr>| async move { addr.to_string() }),
        );
        let remote: SocketAddr = "203.0.113.9:4711".parse().unwrap();

        let response = with_peer_addr::<Body>(app, remote)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"203.0.113.9:4711");
    }

    #[tokio::test]
    async fn accept_returns_the_connecting_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();

        let (_stream, remote) = accept(&listener).await;
        assert_eq!(remote, client.local_addr().unwrap());
    }

    #[test]
    fn missing_files_are_reported() {
        let err = load_server_config(Path::new("/nonexistent/cert.pem"), Path::new("/nonexistent/key.pem"))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/cert.pem"));
    }
}
