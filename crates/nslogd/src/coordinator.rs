//! Pipeline supervision.

use nslog_common::{ApplyErrorPolicy, NamespaceId, NslogError, NslogResult, WatcherConfig};
use nslog_netfilter::RuleBackend;
use tokio::sync::mpsc;

use crate::applier::RuleApplier;
use crate::source::{ExistingNamespaces, LiveNamespaces, Sinks, Streams, pipeline};

/// Runs both namespace sources and applies rules to what they report.
///
/// Namespaces are handled one at a time in arrival order. The first error
/// seen on the error stream stops the pipeline; with the default
/// [`ApplyErrorPolicy::Fatal`] that includes a failed rule application, so
/// one broken namespace terminates the watcher.
#[derive(Debug)]
pub struct Coordinator<B> {
    config: WatcherConfig,
    applier: RuleApplier<B>,
}

impl<B: RuleBackend + 'static> Coordinator<B> {
    /// Create a coordinator applying rules through `backend`.
    pub fn new(config: WatcherConfig, backend: B) -> Self {
        let applier = RuleApplier::new(&config, backend);
        Self { config, applier }
    }

    /// The rule applier namespaces are dispatched to.
    pub const fn applier(&self) -> &RuleApplier<B> {
        &self.applier
    }

    /// Run until the first fatal error, which is returned.
    ///
    /// The registry watch is established before the existing namespaces are
    /// listed, so no namespace created during startup is missed. A namespace
    /// may therefore be reported by both sources.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the pipeline: an invalid
    /// configuration, a registry that cannot be watched or listed, a closed
    /// watch, or (under [`ApplyErrorPolicy::Fatal`]) a failed namespace.
    pub async fn run(self) -> NslogResult<()> {
        self.config.validate()?;
        let registry = &self.config.registry_path;

        if self.config.create_registry {
            tokio::fs::create_dir_all(registry)
                .await
                .map_err(|e| NslogError::Watch {
                    path: registry.clone(),
                    message: format!("cannot create registry: {e}"),
                })?;
        }

        let live = LiveNamespaces::subscribe(&self.config)?;
        let existing = ExistingNamespaces::new(&self.config);

        let (sinks, streams) = pipeline();
        let live_task = tokio::spawn(live.run(sinks.clone()));
        let existing_task = tokio::spawn(existing.run(sinks.clone()));

        tracing::info!(
            registry = %registry.display(),
            prefix = %self.config.namespace_prefix,
            table = %self.config.table,
            chains = ?self.config.chains,
            on_apply_error = %self.config.on_apply_error,
            "Namespace watcher started"
        );

        let Sinks { namespaces, errors } = sinks;
        drop(namespaces);
        let error = self.supervise(streams, errors).await;

        live_task.abort();
        existing_task.abort();
        Err(error)
    }

    /// Drain the streams, applying rules serially, until an error arrives.
    ///
    /// Pending errors always win over pending namespaces, so nothing is
    /// applied once an error is queued. `errors` is where failed
    /// applications are reported; it should feed `streams.errors`.
    pub async fn supervise(
        &self,
        mut streams: Streams,
        errors: mpsc::UnboundedSender<NslogError>,
    ) -> NslogError {
        loop {
            tokio::select! {
                biased;

                Some(error) = streams.errors.recv() => return error,
                next = streams.namespaces.recv() => {
                    let Some(namespace) = next else {
                        return NslogError::Internal {
                            message: "all namespace sources stopped".to_string(),
                        };
                    };
                    self.dispatch(&namespace, &errors).await;
                }
            }
        }
    }

    async fn dispatch(&self, namespace: &NamespaceId, errors: &mpsc::UnboundedSender<NslogError>) {
        if !self.config.matches(namespace) {
            tracing::debug!(namespace = %namespace, "Ignoring namespace outside prefix");
            return;
        }

        match self.applier.ensure(namespace).await {
            Ok(report) => tracing::info!(
                namespace = %namespace,
                inserted = ?report.inserted,
                absent = ?report.absent,
                present = ?report.present,
                "Namespace processed"
            ),
            Err(e) => match self.config.on_apply_error {
                ApplyErrorPolicy::Fatal => {
                    let _ = errors.send(e);
                }
                ApplyErrorPolicy::Skip => {
                    tracing::warn!(namespace = %namespace, error = %e, "Failed to apply rules, skipping");
                }
            },
        }
    }
}
