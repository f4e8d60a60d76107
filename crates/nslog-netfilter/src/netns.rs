//! Network namespace registry operations.

use std::path::Path;

use nslog_common::paths::namespace_handle;
use nslog_common::{NamespaceId, NslogError, NslogResult};

/// List the namespaces in a registry directory, in directory order.
///
/// Entries whose names are not valid identifiers are logged and skipped.
///
/// # Errors
///
/// Returns [`NslogError::RegistryList`] if the directory cannot be read.
pub async fn list_netns(registry: &Path) -> NslogResult<Vec<NamespaceId>> {
    let list_error = |source| NslogError::RegistryList {
        path: registry.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(registry).await.map_err(list_error)?;
    let mut namespaces = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(list_error)? {
        match NamespaceId::from_path(&entry.path()) {
            Ok(id) => namespaces.push(id),
            Err(e) => tracing::warn!(error = %e, "Skipping registry entry"),
        }
    }

    tracing::debug!(registry = %registry.display(), count = namespaces.len(), "Listed namespaces");
    Ok(namespaces)
}

/// Check whether a namespace handle is present in the registry.
pub async fn netns_exists(registry: &Path, namespace: &NamespaceId) -> bool {
    tokio::fs::try_exists(namespace_handle(registry, namespace.as_str()))
        .await
        .unwrap_or(false)
}
