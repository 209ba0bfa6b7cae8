use crate::config::{HostConfig, ProxySettings};
use anyhow::Result;
use hyper::header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, HeaderMap, HeaderValue};
use hyper::{Body, Request, Response, StatusCode, header};
use log::{debug, error, warn};
use std::net::IpAddr;

const CORS_ALLOW_HEADERS: &str = "X-Requested-With, Content-Type";

/// Backend base URL for a host, path and query are appended by the proxy call.
pub fn backend_url(backend_host: &str, config: &HostConfig) -> String {
    format!("http://{}:{}", backend_host, config.target_port())
}

/// Add the CORS headers for `origin` unless the backend already chose its own.
pub fn apply_cors(headers: &mut HeaderMap, origin: &str) {
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.entry(ACCESS_CONTROL_ALLOW_ORIGIN).or_insert(value);
    }
    headers.entry(ACCESS_CONTROL_ALLOW_HEADERS).or_insert(HeaderValue::from_static(CORS_ALLOW_HEADERS));
}

pub fn text_response(status: StatusCode, message: impl Into<String>) -> Result<Response<Body>> {
    Ok(Response::builder().status(status).header(header::CONTENT_TYPE, "text/plain").body(Body::from(message.into()))?)
}

pub fn missing_host_response() -> Result<Response<Body>> {
    text_response(
        StatusCode::BAD_REQUEST,
        "400 Bad Request! The 'host' header must be set when making requests to this server.",
    )
}

pub fn unknown_host_response(origin: &str) -> Result<Response<Body>> {
    text_response(StatusCode::BAD_REQUEST, format!("400 Bad Request! The host '{}' was not found on this server.", origin))
}

/// Stream `req` to the backend configured for `origin` and stream its response back.
///
/// An invalid `config` is answered with a 400 and no backend connection. Bodies are piped in
/// both directions as they arrive; when the client goes away hyper drops the response body,
/// which closes the backend connection with it. The optional timeout only bounds the wait for
/// the backend's response head.
pub async fn forward(
    settings: &ProxySettings,
    client_ip: IpAddr,
    req: Request<Body>,
    origin: &str,
    config: HostConfig,
) -> Result<Response<Body>> {
    if !config.is_valid() {
        warn!("Received request from {} for unknown host {}", client_ip, origin);
        let mut response = unknown_host_response(origin)?;
        apply_cors(response.headers_mut(), origin);
        return Ok(response);
    }

    let target = backend_url(&settings.backend_host, &config);
    debug!("Forwarding {} {} for {} -> {}", req.method(), req.uri(), origin, target);

    let call = hyper_reverse_proxy::call(client_ip, target.as_str(), req);
    let result = match settings.backend_timeout {
        Some(timeout) => match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                error!("Backend {} for {} did not respond within {:?}", target, origin, timeout);
                let mut response = text_response(StatusCode::GATEWAY_TIMEOUT, "504 Gateway Timeout")?;
                apply_cors(response.headers_mut(), origin);
                return Ok(response);
            }
        },
        None => call.await,
    };

    match result {
        Ok(mut response) => {
            apply_cors(response.headers_mut(), origin);
            Ok(response)
        }
        Err(error) => {
            error!("HTTP proxy error for {host} -> {target}: {err:?}", host = origin, target = target, err = error);
            let mut response = text_response(StatusCode::BAD_GATEWAY, "502 Bad Gateway")?;
            apply_cors(response.headers_mut(), origin);
            Ok(response)
        }
    }
}
