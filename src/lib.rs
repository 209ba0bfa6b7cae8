pub mod config;
pub mod proxy;
pub mod stats;
pub mod tls;
pub mod utils;
