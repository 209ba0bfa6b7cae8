mod cli;

use crate::cli::HostpxArguments;
use anyhow::Result;
use clap::Parser;
use hostpx::config::ProxySettings;
use hostpx::proxy::{self, ProxyState};
use hostpx::stats::{self, StatsAggregator, StatsStore};
use hostpx::tls::{self, CertRegistry};
use log::{LevelFilter, info, trace, warn};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = HostpxArguments::parse();
    pretty_env_logger::env_logger::builder()
        .format_timestamp(None)
        .filter_level(if args.verbose { LevelFilter::Trace } else { LevelFilter::Info })
        .init();

    info!("Starting hostpx");
    trace!("Arguments: {:#?}", args);
    let settings = ProxySettings::from(args);

    let store = StatsStore::new(settings.stats_file.clone());
    let stats = Arc::new(StatsAggregator::from_snapshot(store.load().await));
    tokio::spawn(stats::run_stats_loop(stats.clone(), store.clone()));

    let registry = match tls::load_all(&settings.cert_store).await {
        Ok(entries) => CertRegistry::from_entries(&entries),
        Err(e) => {
            warn!("{}; no host can complete a TLS handshake until certificates are available", e);
            CertRegistry::new()
        }
    };
    let registry = Arc::new(registry);
    if settings.watch_certs {
        if let Err(e) = tls::watcher::watch_cert_store(registry.clone(), settings.cert_store.clone()) {
            warn!("Failed to watch certificate store {}: {}", settings.cert_store.display(), e);
        }
    }

    let state = Arc::new(ProxyState::new(settings, stats.clone()));

    // Run HTTP and HTTPS servers concurrently until one fails or we are interrupted
    let outcome = tokio::select! {
        result = async {
            tokio::try_join!(proxy::start_http_server(state.clone()), proxy::start_https_server(state.clone(), registry.clone()))
        } => result.map(|_| ()),
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    };

    stats::persist_tick(&stats, &store).await;
    outcome
}
