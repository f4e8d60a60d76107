//! Standard filesystem paths and defaults for nslog.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;

/// Directory where `ip netns` exposes named network namespaces.
pub const NETNS_RUN_DIR: &str = "/var/run/netns";

/// Default namespace registry directory.
///
/// Honours `NSLOG_NETNS_DIR` so the watcher can follow a relocated registry.
pub static DEFAULT_REGISTRY: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("NSLOG_NETNS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(NETNS_RUN_DIR))
});

/// Path of a namespace handle inside a registry directory.
#[must_use]
pub fn namespace_handle(registry: &Path, namespace: &str) -> PathBuf {
    registry.join(namespace)
}
