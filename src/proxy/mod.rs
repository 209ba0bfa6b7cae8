// Proxy module
//
// - state: settings, host resolver and stats shared by both listeners
// - redirect: plaintext -> HTTPS gate
// - request_handler: per-request control flow (gate, origin, config, forward)
// - forwarder: streaming pass-through to the tenant backend
// - http_server: plaintext listener
// - https_server: TLS listener with SNI certificate selection

pub mod forwarder;
pub mod http_server;
pub mod https_server;
pub mod redirect;
pub mod request_handler;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use http_server::start_http_server;
pub use https_server::start_https_server;
pub use state::ProxyState;
