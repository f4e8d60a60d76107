//! Namespace sources and the channels they publish into.
//!
//! Both sources push identifiers into one unbounded namespace stream and
//! report failures on one unbounded error stream. The streams are the only
//! thing the sources share with the coordinator.

mod existing;
mod live;

pub use existing::ExistingNamespaces;
pub use live::LiveNamespaces;

use nslog_common::{NamespaceId, NslogError};
use tokio::sync::mpsc;

/// Sending half of the pipeline, cloned into every source.
#[derive(Debug, Clone)]
pub struct Sinks {
    /// Namespace identifiers to apply rules to.
    pub namespaces: mpsc::UnboundedSender<NamespaceId>,
    /// Fatal errors.
    pub errors: mpsc::UnboundedSender<NslogError>,
}

impl Sinks {
    /// Publish a namespace. Returns `false` once the pipeline is gone.
    pub fn namespace(&self, namespace: NamespaceId) -> bool {
        self.namespaces.send(namespace).is_ok()
    }

    /// Report a fatal error.
    pub fn fail(&self, error: NslogError) {
        if let Err(mpsc::error::SendError(error)) = self.errors.send(error) {
            tracing::warn!(error = %error, "Error reported after the pipeline stopped");
        }
    }
}

/// Receiving half of the pipeline, owned by the coordinator.
#[derive(Debug)]
pub struct Streams {
    /// Namespace identifiers in arrival order.
    pub namespaces: mpsc::UnboundedReceiver<NamespaceId>,
    /// Fatal errors in arrival order.
    pub errors: mpsc::UnboundedReceiver<NslogError>,
}

/// Create the two pipeline channels.
#[must_use]
pub fn pipeline() -> (Sinks, Streams) {
    let (namespace_tx, namespace_rx) = mpsc::unbounded_channel();
    let (error_tx, error_rx) = mpsc::unbounded_channel();
    (
        Sinks {
            namespaces: namespace_tx,
            errors: error_tx,
        },
        Streams {
            namespaces: namespace_rx,
            errors: error_rx,
        },
    )
}
