use crate::tls::registry::{CertRegistry, load_all};
use anyhow::Result;
use log::{debug, info, trace, warn};
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

// Renewals touch several files at once; wait for the burst to settle before reloading.
const RELOAD_SETTLE: Duration = Duration::from_millis(500);

/// Watch the certificate store and swap renewed material into `registry`.
///
/// File system events are forwarded over a channel to a reload task, which rebuilds the full
/// map and stores it in one atomic swap.
pub fn watch_cert_store(registry: Arc<CertRegistry>, store_root: PathBuf) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        },
        NotifyConfig::default(),
    )?;
    watcher.watch(&store_root, RecursiveMode::Recursive)?;
    info!("Watching certificate store {} for changes", store_root.display());

    tokio::spawn(async move {
        // Dropping the watcher stops the events
        let _watcher = watcher;
        while let Some(res) = rx.recv().await {
            match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() => {
                    trace!("Certificate store changed: {:?}", event);
                    tokio::time::sleep(RELOAD_SETTLE).await;
                    while rx.try_recv().is_ok() {}
                    reload(&registry, &store_root).await;
                }
                Ok(event) => trace!("Certificate store event: {:?}", event),
                Err(e) => warn!("Failed to receive certificate store event: {:?}", e),
            }
        }
        debug!("Certificate store watcher stopped");
    });
    Ok(())
}

/// Re-read the store and replace the registry contents. On failure the current map stays.
pub async fn reload(registry: &CertRegistry, store_root: &Path) -> usize {
    match load_all(store_root).await {
        Ok(entries) => {
            let count = registry.replace(&entries);
            info!("Reloaded certificates, {} host(s) available: {:?}", count, registry.hostnames());
            count
        }
        Err(e) => {
            warn!("Certificate reload failed, keeping current certificates: {}", e);
            registry.len()
        }
    }
}
