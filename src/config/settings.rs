use std::path::PathBuf;
use std::time::Duration;

/// Everything the proxy needs to know at startup, assembled once from the command line.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    pub http_port: u16,
    pub https_port: u16,
    pub sites_root: PathBuf,
    pub config_file: String,
    pub cert_store: PathBuf,
    pub stats_file: PathBuf,
    pub backend_host: String,
    pub backend_timeout: Option<Duration>,
    pub negative_ttl: Option<Duration>,
    pub watch_certs: bool,
    pub trust_proxy: bool,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            http_port: 80,
            https_port: 443,
            sites_root: PathBuf::from(".."),
            config_file: "config.yml".to_string(),
            cert_store: PathBuf::from("/etc/letsencrypt/live"),
            stats_file: PathBuf::from("./stats.json"),
            backend_host: "localhost".to_string(),
            backend_timeout: Some(Duration::from_secs(30)),
            negative_ttl: None,
            watch_certs: false,
            trust_proxy: true,
        }
    }
}
