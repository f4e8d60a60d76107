//! Namespace-scoped rule manipulation traits.

use async_trait::async_trait;
use nslog_common::{NamespaceId, NslogResult};

use crate::rule::RuleSpec;

/// Opens rule manipulation contexts for namespaces.
#[async_trait]
pub trait RuleBackend: Send + Sync {
    /// Open a context scoped to `namespace`.
    ///
    /// Fails with [`nslog_common::NslogError::NamespaceOpen`] when the
    /// namespace does not exist or cannot be entered.
    async fn open(&self, namespace: &NamespaceId) -> NslogResult<Box<dyn RuleContext>>;
}

/// Rule manipulation inside one namespace.
#[async_trait]
pub trait RuleContext: Send + Sync {
    /// Whether `chain` exists in `table`.
    async fn chain_exists(&self, table: &str, chain: &str) -> NslogResult<bool>;

    /// Whether `rule` is present in `chain`, matched exactly.
    async fn rule_exists(&self, table: &str, chain: &str, rule: &RuleSpec) -> NslogResult<bool>;

    /// Insert `rule` into `chain` at the 1-based `position`.
    async fn insert(
        &self,
        table: &str,
        chain: &str,
        position: u32,
        rule: &RuleSpec,
    ) -> NslogResult<()>;
}
