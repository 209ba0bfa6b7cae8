use crate::config::{HostCache, HostResolver, ProxySettings};
use crate::stats::StatsAggregator;
use std::sync::Arc;

/// State shared by every request on both listeners.
#[derive(Debug)]
pub struct ProxyState {
    pub settings: ProxySettings,
    pub resolver: HostResolver,
    pub stats: Arc<StatsAggregator>,
}

impl ProxyState {
    pub fn new(settings: ProxySettings, stats: Arc<StatsAggregator>) -> Self {
        let cache = HostCache::new(settings.negative_ttl);
        let resolver = HostResolver::new(settings.sites_root.clone(), settings.config_file.clone(), cache);
        Self { settings, resolver, stats }
    }
}
