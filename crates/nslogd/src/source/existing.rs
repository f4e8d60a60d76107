//! Namespaces already present when the watcher starts.

use std::path::PathBuf;

use nslog_common::{NamespaceId, NslogResult, WatcherConfig};
use nslog_netfilter::list_netns;

use super::Sinks;

/// One-shot scan of the registry directory.
#[derive(Debug, Clone)]
pub struct ExistingNamespaces {
    registry: PathBuf,
    prefix: String,
}

impl ExistingNamespaces {
    /// Create a scanner for the configured registry and prefix.
    #[must_use]
    pub fn new(config: &WatcherConfig) -> Self {
        Self {
            registry: config.registry_path.clone(),
            prefix: config.namespace_prefix.clone(),
        }
    }

    /// List matching namespaces in directory order.
    ///
    /// # Errors
    ///
    /// Returns [`nslog_common::NslogError::RegistryList`] if the registry
    /// cannot be listed.
    pub async fn scan(&self) -> NslogResult<Vec<NamespaceId>> {
        let mut namespaces = list_netns(&self.registry).await?;
        namespaces.retain(|id| id.has_prefix(&self.prefix));
        Ok(namespaces)
    }

    /// Publish every matching namespace once, then return.
    ///
    /// A listing failure is reported as a single error and nothing is
    /// published.
    pub async fn run(self, sinks: Sinks) {
        match self.scan().await {
            Ok(namespaces) => {
                tracing::info!(
                    registry = %self.registry.display(),
                    count = namespaces.len(),
                    "Found existing namespaces"
                );
                for namespace in namespaces {
                    if !sinks.namespace(namespace) {
                        return;
                    }
                }
            }
            Err(e) => sinks.fail(e),
        }
    }
}
