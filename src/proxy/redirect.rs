use anyhow::Result;
use hyper::{Body, Request, Response, StatusCode, header};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// True when the request arrived over TLS, or a trusted front proxy says it did.
pub fn is_secure(req: &Request<Body>, tls: bool, trust_proxy: bool) -> bool {
    if tls {
        return true;
    }
    if !trust_proxy {
        return false;
    }
    req.headers()
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

/// Build the https URL for `host`, keeping path and query. The port is only spelled out when
/// the secure listener is not on 443.
pub fn secure_location(host: &str, https_port: u16, req: &Request<Body>) -> String {
    let path_and_query = req.uri().path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    // IPv6 literals arrive without their brackets
    let host = if host.contains(':') { format!("[{}]", host) } else { host.to_string() };
    if https_port == 443 {
        format!("https://{}{}", host, path_and_query)
    } else {
        format!("https://{}:{}{}", host, https_port, path_and_query)
    }
}

/// Permanent redirect to the secure equivalent of `req`.
pub fn redirect_to_https(req: &Request<Body>, host: &str, https_port: u16) -> Result<Response<Body>> {
    let location = secure_location(host, https_port, req);
    Ok(Response::builder().status(StatusCode::MOVED_PERMANENTLY).header(header::LOCATION, location).body(Body::empty())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_is_secure_over_tls() {
        assert!(is_secure(&request("/"), true, false));
    }

    #[test]
    fn test_is_secure_plaintext() {
        assert!(!is_secure(&request("/"), false, true));
    }

    #[test]
    fn test_is_secure_forwarded_proto() {
        let req = Request::builder().uri("/").header("X-Forwarded-Proto", "HTTPS, http").body(Body::empty()).unwrap();
        assert!(is_secure(&req, false, true));
        assert!(!is_secure(&req, false, false));

        let req = Request::builder().uri("/").header("X-Forwarded-Proto", "http").body(Body::empty()).unwrap();
        assert!(!is_secure(&req, false, true));
    }

    #[test]
    fn test_redirect_keeps_path_and_query() {
        let req = request("http://example.com/foo?bar=1");
        let response = redirect_to_https(&req, "example.com", 443).unwrap();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "https://example.com/foo?bar=1");
    }

    #[test]
    fn test_redirect_ipv6_literal_host() {
        let req = request("/foo");
        let location = secure_location("::1", 443, &req);
        assert_eq!(location, "https://[::1]/foo");
        assert!(location.parse::<hyper::Uri>().is_ok());
        assert_eq!(secure_location("::1", 8443, &req), "https://[::1]:8443/foo");
    }

    #[test]
    fn test_redirect_non_default_port() {
        let req = request("/foo");
        assert_eq!(secure_location("example.com", 8443, &req), "https://example.com:8443/foo");
    }
}
