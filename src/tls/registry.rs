use crate::utils::validation::{normalize_hostname, validate_hostname_chars};
use anyhow::{Result, anyhow, bail};
use arc_swap::ArcSwap;
use log::{debug, info, trace, warn};
use rustls::ServerConfig;
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub const CERT_FILE: &str = "cert.pem";
pub const KEY_FILE: &str = "privkey.pem";

/// Raw PEM material for one hostname, as found in the certificate store.
#[derive(Debug, Clone)]
pub struct CertificateEntry {
    pub hostname: String,
    pub certificate: Vec<u8>,
    pub private_key: Vec<u8>,
}

impl CertificateEntry {
    /// Read `<host_dir>/cert.pem` and `<host_dir>/privkey.pem`.
    pub async fn read(hostname: String, host_dir: &Path) -> Result<Self> {
        let certificate = tokio::fs::read(host_dir.join(CERT_FILE)).await?;
        let private_key = tokio::fs::read(host_dir.join(KEY_FILE)).await?;
        Ok(Self { hostname, certificate, private_key })
    }

    /// Decode the PEM material into a key rustls can serve.
    pub fn certified_key(&self) -> Result<CertifiedKey> {
        let certs = rustls_pemfile::certs(&mut self.certificate.as_slice()).collect::<Result<Vec<_>, _>>()?;
        if certs.is_empty() {
            bail!("No certificate found in {}", CERT_FILE);
        }
        let key = rustls_pemfile::private_key(&mut self.private_key.as_slice())?
            .ok_or_else(|| anyhow!("No private key found in {}", KEY_FILE))?;
        let signing_key =
            rustls::crypto::ring::sign::any_supported_type(&key).map_err(|e| anyhow!("Unsupported private key: {}", e))?;
        Ok(CertifiedKey::new(certs, signing_key))
    }
}

/// Enumerate the certificate store: every subdirectory of `store_root` is a hostname.
///
/// Only an unreadable `store_root` is an error. A host whose files cannot be read is logged and
/// left out so the remaining hosts can still be served.
pub async fn load_all(store_root: &Path) -> Result<HashMap<String, CertificateEntry>> {
    let mut entries = HashMap::new();
    let mut dir = tokio::fs::read_dir(store_root)
        .await
        .map_err(|e| anyhow!("Failed to read certificate store {}: {}", store_root.display(), e))?;

    while let Some(dirent) = dir.next_entry().await? {
        let path = dirent.path();
        // Follow symlinks, the store may link host directories elsewhere
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                trace!("Skipping non-directory {} in certificate store", path.display());
                continue;
            }
            Err(e) => {
                warn!("Failed to stat {}: {}", path.display(), e);
                continue;
            }
        }

        let Some(hostname) = dirent.file_name().to_str().and_then(normalize_hostname) else {
            warn!("Skipping certificate directory with a non UTF-8 or empty name: {}", path.display());
            continue;
        };
        if !validate_hostname_chars(&hostname) {
            warn!("Skipping certificate directory that is not a hostname: {}", path.display());
            continue;
        }

        match CertificateEntry::read(hostname.clone(), &path).await {
            Ok(entry) => {
                debug!("Loaded certificate material for {}", hostname);
                entries.insert(hostname, entry);
            }
            Err(e) => warn!("Failed to load certificate material for {}: {}", hostname, e),
        }
    }
    Ok(entries)
}

/// Hostname -> certificate map consulted during the TLS handshake.
///
/// The map is swapped atomically as a whole, so a handshake sees either the previous or the new
/// complete set of certificates.
#[derive(Debug)]
pub struct CertRegistry {
    keys: ArcSwap<HashMap<String, Arc<CertifiedKey>>>,
}

impl Default for CertRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CertRegistry {
    pub fn new() -> Self {
        Self { keys: ArcSwap::from_pointee(HashMap::new()) }
    }

    pub fn from_entries(entries: &HashMap<String, CertificateEntry>) -> Self {
        let registry = Self::new();
        registry.replace(entries);
        registry
    }

    /// Replace the whole map, returning how many hostnames are now servable.
    pub fn replace(&self, entries: &HashMap<String, CertificateEntry>) -> usize {
        let keys = Self::build_keys(entries);
        let count = keys.len();
        self.keys.store(Arc::new(keys));
        count
    }

    fn build_keys(entries: &HashMap<String, CertificateEntry>) -> HashMap<String, Arc<CertifiedKey>> {
        let mut keys = HashMap::with_capacity(entries.len());
        for (hostname, entry) in entries {
            match entry.certified_key() {
                Ok(key) => {
                    keys.insert(hostname.clone(), Arc::new(key));
                }
                Err(e) => warn!("Skipping certificate for {}: {}", hostname, e),
            }
        }
        keys
    }

    pub fn lookup(&self, hostname: &str) -> Option<Arc<CertifiedKey>> {
        let hostname = normalize_hostname(hostname)?;
        self.keys.load().get(&hostname).cloned()
    }

    pub fn hostnames(&self) -> Vec<String> {
        let mut hostnames: Vec<String> = self.keys.load().keys().cloned().collect();
        hostnames.sort();
        hostnames
    }

    pub fn len(&self) -> usize {
        self.keys.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.load().is_empty()
    }

    /// Build the rustls server config for the secure listener, with this registry as the
    /// certificate resolver.
    pub fn server_config(self: &Arc<Self>) -> Result<ServerConfig> {
        let mut config = ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_cert_resolver(self.clone());
        config.alpn_protocols = vec![b"http/1.1".to_vec()];
        info!("TLS configured for {} host(s): {:?}", self.len(), self.hostnames());
        Ok(config)
    }
}

impl ResolvesServerCert for CertRegistry {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        let Some(server_name) = client_hello.server_name() else {
            debug!("TLS handshake without SNI, no certificate to offer");
            return None;
        };
        let key = self.lookup(server_name);
        if key.is_none() {
            warn!("No certificate for SNI hostname {}", server_name);
        }
        key
    }
}
