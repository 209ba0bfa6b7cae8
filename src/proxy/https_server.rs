use crate::proxy::request_handler::respond;
use crate::proxy::state::ProxyState;
use crate::tls::CertRegistry;
use anyhow::{Result, anyhow};
use hyper::server::conn::Http;
use hyper::service::service_fn;
use hyper::{Body, Request};
use log::{debug, info, warn};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::TcpListenerStream;

/// Start the TLS listener. Certificates are picked per connection from `registry` by SNI.
///
/// Failing to bind is the one error that takes the whole proxy down.
pub async fn start_https_server(state: Arc<ProxyState>, registry: Arc<CertRegistry>) -> Result<()> {
    let acceptor = TlsAcceptor::from(Arc::new(registry.server_config()?));
    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.https_port));
    let listener = TcpListener::bind(addr).await.map_err(|e| anyhow!("Failed to bind HTTPS server on {}: {}", addr, e))?;
    info!("HTTPS Server running on {}", addr);
    serve_https(listener, acceptor, state).await
}

/// Accept TLS connections on an already bound listener and serve HTTP/1.1 over them.
pub async fn serve_https(listener: TcpListener, acceptor: TlsAcceptor, state: Arc<ProxyState>) -> Result<()> {
    let mut incoming = TcpListenerStream::new(listener);
    while let Some(conn) = incoming.next().await {
        let tcp = match conn {
            Ok(tcp) => tcp,
            Err(e) => {
                warn!("TCP accept error: {}", e);
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                continue;
            }
        };
        let client_ip = tcp.peer_addr().map(|addr| addr.ip()).unwrap_or(IpAddr::from([127, 0, 0, 1]));
        let acceptor = acceptor.clone();
        let state = state.clone();
        tokio::spawn(async move {
            let tls = match acceptor.accept(tcp).await {
                Ok(tls) => tls,
                Err(e) => {
                    debug!("TLS handshake with {} failed: {}", client_ip, e);
                    return;
                }
            };
            let service = service_fn(move |req: Request<Body>| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(respond(&state, "https", client_ip, req).await) }
            });
            let mut http = Http::new();
            http.http1_only(true);
            http.http1_keep_alive(true);
            if let Err(e) = http.serve_connection(tls, service).await {
                debug!("HTTPS connection error from {}: {}", client_ip, e);
            }
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::test_support::{TestBackend, state_for, write_host};
    use crate::tls::load_all;
    use crate::tls::test_support::TestPki;
    use hyper::{StatusCode, header};
    use rustls::pki_types::ServerName;
    use tempfile::TempDir;
    use tokio_rustls::TlsConnector;

    #[tokio::test]
    async fn test_https_request_is_forwarded() {
        let backend = TestBackend::echo().await;
        let sites = TempDir::new().unwrap();
        write_host(sites.path(), "tenant.example", &format!("port: {}\n", backend.port));
        let state = state_for(sites.path());

        let pki = TestPki::new();
        let store = TempDir::new().unwrap();
        pki.write_host(store.path(), "tenant.example");
        let registry = Arc::new(CertRegistry::from_entries(&load_all(store.path()).await.unwrap()));
        let acceptor = TlsAcceptor::from(Arc::new(registry.server_config().unwrap()));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_https(listener, acceptor, state.clone()));

        let tcp = tokio::net::TcpStream::connect(addr).await.unwrap();
        let tls = TlsConnector::from(pki.client_config())
            .connect(ServerName::try_from("tenant.example").unwrap(), tcp)
            .await
            .unwrap();
        let (mut sender, connection) = hyper::client::conn::handshake(tls).await.unwrap();
        tokio::spawn(connection);

        let req = Request::builder().uri("/status?full=1").header(header::HOST, "tenant.example").body(Body::empty()).unwrap();
        let response = sender.send_request(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-backend-path"], "/status?full=1");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "tenant.example");
        assert_eq!(state.stats.peek().requests_per_second, 1);
    }
}
