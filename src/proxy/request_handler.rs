use crate::proxy::forwarder::{forward, missing_host_response, text_response};
use crate::proxy::redirect::{is_secure, redirect_to_https};
use crate::proxy::state::ProxyState;
use crate::utils::validation::normalize_hostname;
use anyhow::Result;
use hyper::{Body, Request, Response, StatusCode, header};
use log::{debug, error, info};
use std::net::IpAddr;

const FORWARDED_HOST: &str = "x-forwarded-host";

/// Extract the requested hostname, lower-cased and without a port.
///
/// The URI authority (absolute-form requests) wins, then `X-Forwarded-Host` when proxy headers
/// are trusted, then the `Host` header.
pub fn extract_host(req: &Request<Body>, trust_proxy: bool) -> Option<String> {
    if let Some(authority) = req.uri().authority() {
        return normalize_hostname(authority.host());
    }

    if trust_proxy {
        let forwarded = req.headers().get(FORWARDED_HOST).and_then(|hv| hv.to_str().ok()).and_then(|v| v.split(',').next());
        if let Some(host) = forwarded.and_then(|v| normalize_hostname(strip_port(v.trim()))) {
            return Some(host);
        }
    }

    let host = req.headers().get(header::HOST)?.to_str().ok()?;
    normalize_hostname(strip_port(host.trim()))
}

// "example.com:8080" -> "example.com", "[::1]:8080" -> "::1"
fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    host.split(':').next().unwrap_or(host)
}

/// Handle a request from either listener.
///
/// Plaintext traffic is redirected to HTTPS before anything else happens; secure traffic goes
/// through origin extraction, config resolution and forwarding.
pub async fn handle_request_with_scheme(
    state: &ProxyState,
    frontend_scheme: &str,
    client_ip: IpAddr,
    req: Request<Body>,
) -> Result<Response<Body>> {
    let trust_proxy = state.settings.trust_proxy;
    let tls = frontend_scheme.eq_ignore_ascii_case("https");
    if !is_secure(&req, tls, trust_proxy) {
        let Some(host) = extract_host(&req, trust_proxy) else {
            return missing_host_response();
        };
        debug!("Redirecting {} {}://{}{} to https", client_ip, frontend_scheme, host, req.uri().path());
        return redirect_to_https(&req, &host, state.settings.https_port);
    }
    proxy_request(state, frontend_scheme, client_ip, req).await
}

/// `scheme://host/path?query` as logged for a served request.
pub fn served_url(frontend_scheme: &str, origin: Option<&str>, req: &Request<Body>) -> String {
    format!(
        "{}://{}{}",
        frontend_scheme.to_ascii_lowercase(),
        origin.unwrap_or("<no host>"),
        req.uri().path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
    )
}

async fn proxy_request(state: &ProxyState, frontend_scheme: &str, client_ip: IpAddr, req: Request<Body>) -> Result<Response<Body>> {
    let origin = extract_host(&req, state.settings.trust_proxy);
    info!("Served: {} for {}", served_url(frontend_scheme, origin.as_deref(), &req), client_ip);
    state.stats.record_request();

    let Some(origin) = origin else {
        return missing_host_response();
    };
    let config = state.resolver.resolve(&origin).await;
    forward(&state.settings, client_ip, req, &origin, config).await
}

/// [`handle_request_with_scheme`] for a hyper service: errors become a 500.
pub async fn respond(state: &ProxyState, frontend_scheme: &str, client_ip: IpAddr, req: Request<Body>) -> Response<Body> {
    match handle_request_with_scheme(state, frontend_scheme, client_ip, req).await {
        Ok(response) => response,
        Err(e) => {
            error!("handle_request error from {}: {}", client_ip, e);
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").unwrap_or_else(|_| {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            })
        }
    }
}
