// TLS module
//
// - registry: certificate discovery and the SNI certificate resolver used by the HTTPS listener
// - watcher: optional hot-reload of the certificate store

pub mod registry;
pub mod watcher;

#[cfg(test)]
pub(crate) mod test_support;

pub use registry::{CertRegistry, CertificateEntry, load_all};
