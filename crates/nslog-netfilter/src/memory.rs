//! In-memory rule tables.
//!
//! [`MemoryBackend`] behaves like a set of namespaces whose filter tables
//! live in memory. Namespaces and chains are created explicitly, inserts
//! can be made to fail per namespace, and every `open` is recorded in
//! call order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use nslog_common::{NamespaceId, NslogError, NslogResult};
use parking_lot::Mutex;

use crate::context::{RuleBackend, RuleContext};
use crate::rule::RuleSpec;

type ChainKey = (String, String);

#[derive(Debug, Default)]
struct Namespace {
    chains: HashMap<ChainKey, Vec<RuleSpec>>,
    fail_inserts: bool,
}

#[derive(Debug, Default)]
struct State {
    namespaces: HashMap<NamespaceId, Namespace>,
    opened: Vec<NamespaceId>,
}

/// Backend keeping rule tables in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    /// Create an empty backend with no namespaces.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a namespace with empty tables.
    pub fn add_namespace(&self, namespace: &NamespaceId) {
        self.state
            .lock()
            .namespaces
            .entry(namespace.clone())
            .or_default();
    }

    /// Create an empty chain, creating the namespace if needed.
    pub fn add_chain(&self, namespace: &NamespaceId, table: &str, chain: &str) {
        self.state
            .lock()
            .namespaces
            .entry(namespace.clone())
            .or_default()
            .chains
            .entry((table.to_string(), chain.to_string()))
            .or_default();
    }

    /// Remove a namespace, as if it was deleted underneath the watcher.
    pub fn remove_namespace(&self, namespace: &NamespaceId) {
        self.state.lock().namespaces.remove(namespace);
    }

    /// Make every insert into `namespace` fail.
    pub fn fail_inserts(&self, namespace: &NamespaceId) {
        if let Some(ns) = self.state.lock().namespaces.get_mut(namespace) {
            ns.fail_inserts = true;
        }
    }

    /// Rules of a chain in order, or `None` if the chain does not exist.
    #[must_use]
    pub fn rules(&self, namespace: &NamespaceId, table: &str, chain: &str) -> Option<Vec<RuleSpec>> {
        self.state
            .lock()
            .namespaces
            .get(namespace)?
            .chains
            .get(&(table.to_string(), chain.to_string()))
            .cloned()
    }

    /// Namespaces passed to `open`, in call order, including failed opens.
    #[must_use]
    pub fn opened(&self) -> Vec<NamespaceId> {
        self.state.lock().opened.clone()
    }
}

#[async_trait]
impl RuleBackend for MemoryBackend {
    async fn open(&self, namespace: &NamespaceId) -> NslogResult<Box<dyn RuleContext>> {
        let mut state = self.state.lock();
        state.opened.push(namespace.clone());
        if !state.namespaces.contains_key(namespace) {
            return Err(vanished(namespace));
        }
        drop(state);

        Ok(Box::new(MemoryContext {
            namespace: namespace.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct MemoryContext {
    namespace: NamespaceId,
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl RuleContext for MemoryContext {
    async fn chain_exists(&self, table: &str, chain: &str) -> NslogResult<bool> {
        let state = self.state.lock();
        let ns = state
            .namespaces
            .get(&self.namespace)
            .ok_or_else(|| vanished(&self.namespace))?;
        Ok(ns.chains.contains_key(&(table.to_string(), chain.to_string())))
    }

    async fn rule_exists(&self, table: &str, chain: &str, rule: &RuleSpec) -> NslogResult<bool> {
        let state = self.state.lock();
        let ns = state
            .namespaces
            .get(&self.namespace)
            .ok_or_else(|| vanished(&self.namespace))?;
        Ok(ns
            .chains
            .get(&(table.to_string(), chain.to_string()))
            .is_some_and(|rules| rules.contains(rule)))
    }

    async fn insert(
        &self,
        table: &str,
        chain: &str,
        position: u32,
        rule: &RuleSpec,
    ) -> NslogResult<()> {
        let mut state = self.state.lock();
        let ns = state
            .namespaces
            .get_mut(&self.namespace)
            .ok_or_else(|| vanished(&self.namespace))?;

        let rejected = |stderr: &str| NslogError::Command {
            command: format!("-t {table} -I {chain} {position} {rule}"),
            status: "exit status: 1".to_string(),
            stderr: stderr.to_string(),
        };

        if ns.fail_inserts {
            return Err(rejected("insert rejected"));
        }
        let rules = ns
            .chains
            .get_mut(&(table.to_string(), chain.to_string()))
            .ok_or_else(|| rejected("No chain/target/match by that name."))?;

        let index = usize::try_from(position).unwrap_or(usize::MAX);
        if index == 0 || index > rules.len() + 1 {
            return Err(rejected("Index of insertion too big."));
        }
        rules.insert(index - 1, rule.clone());
        Ok(())
    }
}

fn vanished(namespace: &NamespaceId) -> NslogError {
    NslogError::NamespaceOpen {
        namespace: namespace.to_string(),
        message: "no such namespace".to_string(),
    }
}
