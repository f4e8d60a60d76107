//! Namespaces created while the watcher runs.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use nslog_common::{NamespaceId, NslogError, NslogResult, WatcherConfig};
use tokio::sync::mpsc;

use super::Sinks;

type NotifyEvents = mpsc::UnboundedReceiver<notify::Result<Event>>;

/// Watch on the registry directory.
///
/// The watch is established by [`LiveNamespaces::subscribe`], before any
/// scan of existing namespaces, so a namespace created during the scan is
/// reported by at least one of the two sources.
pub struct LiveNamespaces {
    registry: PathBuf,
    watcher: RecommendedWatcher,
    events: NotifyEvents,
}

impl LiveNamespaces {
    /// Start watching the configured registry directory.
    ///
    /// # Errors
    ///
    /// Returns [`NslogError::Watch`] if the watcher cannot be created or the
    /// directory cannot be watched.
    pub fn subscribe(config: &WatcherConfig) -> NslogResult<Self> {
        let registry = config.registry_path.clone();
        let watch_error = |e: notify::Error| NslogError::Watch {
            path: registry.clone(),
            message: e.to_string(),
        };

        let (tx, events) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // Receiver gone means the source stopped; nothing left to tell.
            let _ = tx.send(res);
        })
        .map_err(watch_error)?;
        watcher
            .watch(&registry, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;

        tracing::info!(registry = %registry.display(), "Watching namespace registry");
        Ok(Self {
            registry,
            watcher,
            events,
        })
    }

    /// Publish every created namespace until the watch fails.
    ///
    /// Creation events are forwarded in notification order whatever the
    /// entry name; prefix filtering happens in the coordinator. The terminal
    /// error is reported on the error stream.
    pub async fn run(self, sinks: Sinks) {
        let Self {
            registry,
            watcher,
            mut events,
        } = self;

        let error = forward(&registry, &mut events, &sinks).await;
        drop(watcher);
        sinks.fail(error);
    }
}

impl std::fmt::Debug for LiveNamespaces {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveNamespaces")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Forward creation events until the stream ends, returning why it ended.
async fn forward(registry: &Path, events: &mut NotifyEvents, sinks: &Sinks) -> NslogError {
    let closed = |reason: &str| NslogError::WatchClosed {
        path: registry.to_path_buf(),
        reason: reason.to_string(),
    };

    while let Some(res) = events.recv().await {
        let event = match res {
            Ok(event) => event,
            Err(e) if matches!(e.kind, notify::ErrorKind::WatchNotFound) => {
                return closed(&e.to_string());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Namespace watch error");
                continue;
            }
        };

        match event.kind {
            EventKind::Create(_) => {
                for path in &event.paths {
                    let namespace = match NamespaceId::from_path(path) {
                        Ok(namespace) => namespace,
                        Err(e) => {
                            tracing::warn!(error = %e, "Ignoring created registry entry");
                            continue;
                        }
                    };
                    tracing::debug!(namespace = %namespace, "Namespace created");
                    if !sinks.namespace(namespace) {
                        return NslogError::Internal {
                            message: "namespace stream closed".to_string(),
                        };
                    }
                }
            }
            EventKind::Remove(_) if event.paths.iter().any(|p| p == registry) => {
                return closed("registry directory removed");
            }
            _ => {}
        }
    }

    closed("event stream ended")
}
