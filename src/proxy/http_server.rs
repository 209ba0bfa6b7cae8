use crate::proxy::request_handler::respond;
use crate::proxy::state::ProxyState;
use anyhow::Result;
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request};
use log::{error, info};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

/// Start the plaintext listener. Binding failures are retried, this listener is never fatal.
pub async fn start_http_server(state: Arc<ProxyState>) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.http_port));
    loop {
        let listener = match std::net::TcpListener::bind(addr) {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind HTTP server on {}: {}", addr, e);
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                continue;
            }
        };
        info!("HTTP Server running on {}", addr);
        if let Err(e) = serve_http(listener, state.clone()).await {
            error!("HTTP server error: {}", e);
            // Loop will retry bind/start
        }
    }
}

/// Serve plaintext HTTP on an already bound listener.
pub async fn serve_http(listener: std::net::TcpListener, state: Arc<ProxyState>) -> Result<()> {
    let make_svc = make_service_fn(move |conn: &AddrStream| {
        let client_ip = conn.remote_addr().ip();
        let state = state.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(respond(&state, "http", client_ip, req).await) }
            }))
        }
    });
    hyper::Server::from_tcp(listener)?.serve(make_svc).await?;
    Ok(())
}
