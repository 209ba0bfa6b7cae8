use rcgen::{BasicConstraints, Certificate, CertificateParams, IsCa, KeyPair};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::{TlsAcceptor, TlsConnector};

/// Throwaway CA that signs per-host leaf certificates.
pub struct TestPki {
    ca_cert: Certificate,
    ca_key: KeyPair,
}

impl TestPki {
    pub fn new() -> Self {
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca_key = KeyPair::generate().unwrap();
        let ca_cert = params.self_signed(&ca_key).unwrap();
        Self { ca_cert, ca_key }
    }

    /// Returns (certificate PEM, private key PEM) for `hostname`.
    pub fn leaf(&self, hostname: &str) -> (String, String) {
        let key = KeyPair::generate().unwrap();
        let cert = CertificateParams::new(vec![hostname.to_string()])
            .unwrap()
            .signed_by(&key, &self.ca_cert, &self.ca_key)
            .unwrap();
        (cert.pem(), key.serialize_pem())
    }

    /// Lay out `<store>/<hostname>/{cert.pem,privkey.pem}`.
    pub fn write_host(&self, store: &Path, hostname: &str) {
        let (cert, key) = self.leaf(hostname);
        let dir = store.join(hostname);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(crate::tls::registry::CERT_FILE), cert).unwrap();
        std::fs::write(dir.join(crate::tls::registry::KEY_FILE), key).unwrap();
    }

    pub fn client_config(&self) -> Arc<ClientConfig> {
        let mut roots = RootCertStore::empty();
        roots.add(self.ca_cert.der().clone()).unwrap();
        let config = ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_root_certificates(roots)
            .with_no_client_auth();
        Arc::new(config)
    }
}

/// Run a full handshake over an in-memory pipe, true when both sides succeed.
pub async fn handshake(server: Arc<ServerConfig>, client: Arc<ClientConfig>, hostname: &'static str) -> bool {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let acceptor = TlsAcceptor::from(server);
    let connector = TlsConnector::from(client);
    let server_task = tokio::spawn(async move { acceptor.accept(server_io).await.is_ok() });
    // Hold the client stream until the server is done so its final writes have somewhere to go
    let client_result = connector.connect(ServerName::try_from(hostname).unwrap(), client_io).await;
    let server_ok = server_task.await.unwrap();
    client_result.is_ok() && server_ok
}
