//! Rule application inside a single namespace.

use nslog_common::{NamespaceId, NslogError, NslogResult, WatcherConfig};
use nslog_netfilter::{RuleBackend, RuleSpec};

/// Position the diagnostic rule is inserted at (head of the chain).
pub const RULE_POSITION: u32 = 1;

/// What one [`RuleApplier::ensure`] call did, per chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnsureReport {
    /// Chains that received the rule.
    pub inserted: Vec<String>,
    /// Chains that do not exist (yet) in the namespace.
    pub absent: Vec<String>,
    /// Chains that already carried the rule and were left alone.
    pub present: Vec<String>,
}

/// Ensures the LOG rule on every configured chain of one namespace.
///
/// There is no memory of namespaces already handled. By default each call
/// inserts the rule again on every existing chain, so calling `ensure`
/// twice for a namespace leaves two copies. With `skip_present_rules` the
/// exact rule is looked up first and insertion is skipped when found.
#[derive(Debug)]
pub struct RuleApplier<B> {
    backend: B,
    table: String,
    chains: Vec<String>,
    skip_present: bool,
}

impl<B: RuleBackend> RuleApplier<B> {
    /// Create an applier for the configured table and chains.
    pub fn new(config: &WatcherConfig, backend: B) -> Self {
        Self {
            backend,
            table: config.table.clone(),
            chains: config.chains.clone(),
            skip_present: config.skip_present_rules,
        }
    }

    /// The backend rules are applied through.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Ensure the rule in `namespace`.
    ///
    /// Chains that do not exist are skipped. The first failed insertion
    /// aborts the call; remaining chains are not touched.
    ///
    /// # Errors
    ///
    /// Returns [`NslogError::NamespaceOpen`] if the namespace cannot be
    /// entered and [`NslogError::RuleInsert`] if an insertion fails.
    pub async fn ensure(&self, namespace: &NamespaceId) -> NslogResult<EnsureReport> {
        let context = self.backend.open(namespace).await?;
        let mut report = EnsureReport::default();

        for chain in &self.chains {
            tracing::info!(namespace = %namespace, chain = %chain, "Adding logging rule");

            let exists = context
                .chain_exists(&self.table, chain)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(namespace = %namespace, chain = %chain, error = %e, "Chain lookup failed");
                    false
                });
            if !exists {
                tracing::debug!(namespace = %namespace, chain = %chain, "Chain absent, skipping");
                report.absent.push(chain.clone());
                continue;
            }

            let rule = RuleSpec::log(chain);
            let insert_error = |source: NslogError| NslogError::RuleInsert {
                namespace: namespace.to_string(),
                chain: chain.clone(),
                source: Box::new(source),
            };

            if self.skip_present
                && context
                    .rule_exists(&self.table, chain, &rule)
                    .await
                    .map_err(insert_error)?
            {
                tracing::debug!(namespace = %namespace, chain = %chain, "Rule already present");
                report.present.push(chain.clone());
                continue;
            }

            context
                .insert(&self.table, chain, RULE_POSITION, &rule)
                .await
                .map_err(insert_error)?;
            report.inserted.push(chain.clone());
        }

        Ok(report)
    }
}
