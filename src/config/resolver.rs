use crate::config::cache::HostCache;
use crate::config::types::HostConfig;
use crate::utils::validation::{normalize_hostname, validate_hostname_chars};
use anyhow::Result;
use log::{debug, trace, warn};
use std::path::{Path, PathBuf};

/// Resolves a hostname to its [`HostConfig`], reading `<sites_root>/<hostname>/<config_file>`
/// the first time a hostname is seen and answering from the cache afterwards.
#[derive(Debug)]
pub struct HostResolver {
    sites_root: PathBuf,
    config_file: String,
    cache: HostCache,
}

impl HostResolver {
    pub fn new(sites_root: impl Into<PathBuf>, config_file: impl Into<String>, cache: HostCache) -> Self {
        Self { sites_root: sites_root.into(), config_file: config_file.into(), cache }
    }

    pub fn cache(&self) -> &HostCache {
        &self.cache
    }

    pub fn config_path(&self, hostname: &str) -> PathBuf {
        self.sites_root.join(hostname).join(&self.config_file)
    }

    /// Never fails: a host without a readable, parseable document resolves to
    /// [`HostConfig::invalid`], and that answer is cached too.
    pub async fn resolve(&self, hostname: &str) -> HostConfig {
        let Some(hostname) = normalize_hostname(hostname) else {
            return HostConfig::invalid();
        };
        if let Some(config) = self.cache.get(&hostname).await {
            trace!("Host config cache hit for {}", hostname);
            return config;
        }

        // Not cached: these never touch the filesystem, and caching them would let arbitrary
        // Host headers grow the cache.
        if !validate_hostname_chars(&hostname) {
            warn!("Rejecting malformed hostname '{}'", hostname);
            return HostConfig::invalid();
        }

        let path = self.config_path(&hostname);
        let config = match Self::read_config(&path).await {
            Ok(config) => {
                debug!("Loaded host config for {} from {}: {:?}", hostname, path.display(), config);
                config
            }
            Err(e) => {
                warn!("No usable host config for '{}' at {}: {:#}", hostname, path.display(), e);
                HostConfig::invalid()
            }
        };
        self.cache.insert(hostname, config).await
    }

    async fn read_config(path: &Path) -> Result<HostConfig> {
        let content = tokio::fs::read_to_string(path).await?;
        HostConfig::parse(&content)
    }
}
