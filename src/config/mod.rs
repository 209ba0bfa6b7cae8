// Configuration module
//
// - types: the per-host routing document and its parsed form
// - cache: the hostname -> HostConfig cache shared by every request
// - resolver: cache-or-parse lookup of a host's configuration
// - settings: process level settings assembled from the command line

pub mod cache;
pub mod resolver;
pub mod settings;
pub mod types;

pub use cache::HostCache;
pub use resolver::HostResolver;
pub use settings::ProxySettings;
pub use types::HostConfig;
