//! Background purge of expired cache entries

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::semantic_cache::SimilarityCacheStore;

/// Handle of the periodic purge task
#[derive(Debug)]
pub struct CachePurgeTask {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl CachePurgeTask {
    /// Spawn a task calling `purge_expired` on `store` every `interval`
    pub fn spawn(store: Arc<dyn SimilarityCacheStore>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs_f64(), "Starting cache purge task");
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match store.purge_expired().await {
                            Ok(0) => {}
                            Ok(removed) => debug!(removed, "Purged expired cache entries"),
                            Err(e) => warn!(error = %e, "Cache purge failed"),
                        }
                    }
                    _ = &mut shutdown_rx => {
                        info!("Cache purge task shutting down");
                        break;
                    }
                }
            }
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// Stop the task and wait for it to finish
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Err(e) = self.handle.await {
            warn!(error = %e, "Cache purge task ended abnormally");
        }
    }
}
