use clap::Parser;
use hostpx::config::ProxySettings;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "hostpx", about, author, version, long_about = None)]
pub struct HostpxArguments {
    #[arg(short = 'p', long = "port", env = "PORT", default_value_t = 80, help = "Port for the plaintext listener")]
    pub(crate) http_port: u16,
    #[arg(long = "https-port", env = "HTTPS_PORT", default_value_t = 443, help = "Port for the TLS listener")]
    pub(crate) https_port: u16,
    #[arg(
        short = 's',
        long = "sites-root",
        env = "HOSTPX_SITES_ROOT",
        default_value = "..",
        help = "Directory holding one <hostname>/ directory per tenant"
    )]
    pub(crate) sites_root: PathBuf,
    #[arg(long = "config-file", default_value = "config.yml", help = "Name of the per-host configuration document")]
    pub(crate) config_file: String,
    #[arg(
        short = 'c',
        long = "cert-store",
        env = "HOSTPX_CERT_STORE",
        default_value = "/etc/letsencrypt/live",
        help = "Certificate store with one <hostname>/{cert.pem,privkey.pem} directory per tenant"
    )]
    pub(crate) cert_store: PathBuf,
    #[arg(long = "stats-file", env = "HOSTPX_STATS_FILE", default_value = "./stats.json", help = "Where request counters are written every second")]
    pub(crate) stats_file: PathBuf,
    #[arg(long = "backend-host", default_value = "localhost", help = "Host the tenant backends listen on")]
    pub(crate) backend_host: String,
    #[arg(long = "backend-timeout", default_value_t = 30, help = "Seconds to wait for a backend's response headers, 0 waits forever")]
    pub(crate) backend_timeout: u64,
    #[arg(long = "negative-ttl", help = "Seconds before an unknown host is looked up again (default: never)")]
    pub(crate) negative_ttl: Option<u64>,
    #[arg(short = 'w', long = "watch-certs", help = "Reload certificates when the certificate store changes")]
    pub(crate) watch_certs: bool,
    #[arg(long = "no-trust-proxy", help = "Ignore X-Forwarded-Proto and X-Forwarded-Host")]
    pub(crate) no_trust_proxy: bool,
    #[arg(short = 'v', long = "verbose", help = "Enable verbose logging")]
    pub(crate) verbose: bool,
}

impl From<HostpxArguments> for ProxySettings {
    fn from(args: HostpxArguments) -> Self {
        ProxySettings {
            http_port: args.http_port,
            https_port: args.https_port,
            sites_root: args.sites_root,
            config_file: args.config_file,
            cert_store: args.cert_store,
            stats_file: args.stats_file,
            backend_host: args.backend_host,
            backend_timeout: (args.backend_timeout > 0).then(|| Duration::from_secs(args.backend_timeout)),
            negative_ttl: args.negative_ttl.map(Duration::from_secs),
            watch_certs: args.watch_certs,
            trust_proxy: !args.no_trust_proxy,
        }
    }
}
