//! Watcher configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{NslogError, NslogResult};
use crate::id::NamespaceId;
use crate::paths::DEFAULT_REGISTRY;

/// Longest `--log-prefix` iptables accepts.
pub const LOG_PREFIX_MAX_LEN: usize = 29;

/// What the coordinator does when applying rules to a namespace fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyErrorPolicy {
    /// Terminate the process with the error.
    #[default]
    Fatal,
    /// Log the error and continue with the next namespace.
    Skip,
}

impl std::str::FromStr for ApplyErrorPolicy {
    type Err = NslogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fatal" => Ok(Self::Fatal),
            "skip" => Ok(Self::Skip),
            other => Err(NslogError::Config {
                message: format!("unknown apply error policy {other:?} (expected fatal or skip)"),
            }),
        }
    }
}

impl std::fmt::Display for ApplyErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fatal => write!(f, "fatal"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Configuration for the namespace watcher.
///
/// Every component receives this value (or the parts it needs) at
/// construction time; nothing reads process-wide state afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatcherConfig {
    /// Directory to scan and watch for namespace handles.
    pub registry_path: PathBuf,
    /// Only namespaces whose name starts with this prefix get rules.
    pub namespace_prefix: String,
    /// Filter table holding the chains.
    pub table: String,
    /// Chains to ensure the log rule on, in order.
    pub chains: Vec<String>,
    /// Check for the exact rule before inserting it.
    pub skip_present_rules: bool,
    /// Behaviour when applying rules to a namespace fails.
    pub on_apply_error: ApplyErrorPolicy,
    /// Create the registry directory if it is missing at startup.
    pub create_registry: bool,
    /// Binary used to enter a namespace.
    pub nsenter_binary: PathBuf,
    /// iptables binary run inside the namespace.
    pub iptables_binary: PathBuf,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            registry_path: DEFAULT_REGISTRY.clone(),
            namespace_prefix: "qrouter".to_string(),
            table: "nat".to_string(),
            chains: vec!["neutron-l3-agent-POSTROUTING".to_string()],
            skip_present_rules: false,
            on_apply_error: ApplyErrorPolicy::Fatal,
            create_registry: false,
            nsenter_binary: PathBuf::from("nsenter"),
            iptables_binary: PathBuf::from("iptables"),
        }
    }
}

impl WatcherConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_toml(source: &str) -> NslogResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> NslogResult<Self> {
        tracing::debug!(path = %path.display(), "Loading configuration");
        let source = std::fs::read_to_string(path).map_err(|e| NslogError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_toml(&source)
    }

    /// Set the registry directory.
    #[must_use]
    pub fn with_registry(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = path.into();
        self
    }

    /// Set the namespace prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.namespace_prefix = prefix.into();
        self
    }

    /// Replace the chain list.
    #[must_use]
    pub fn with_chains<I, S>(mut self, chains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chains = chains.into_iter().map(Into::into).collect();
        self
    }

    /// Set the apply error policy.
    #[must_use]
    pub fn with_apply_error_policy(mut self, policy: ApplyErrorPolicy) -> Self {
        self.on_apply_error = policy;
        self
    }

    /// Whether a namespace is subject to rule application.
    #[must_use]
    pub fn matches(&self, namespace: &NamespaceId) -> bool {
        namespace.has_prefix(&self.namespace_prefix)
    }

    /// Check the configuration for values that can never work.
    ///
    /// # Errors
    ///
    /// Returns [`NslogError::Config`] describing the first problem found.
    pub fn validate(&self) -> NslogResult<()> {
        if self.table.trim().is_empty() {
            return Err(config_error("table must not be empty"));
        }
        if self.chains.is_empty() {
            return Err(config_error("at least one chain is required"));
        }
        for chain in &self.chains {
            if chain.trim().is_empty() {
                return Err(config_error("chain names must not be blank"));
            }
            // The chain name doubles as the log prefix.
            if chain.len() > LOG_PREFIX_MAX_LEN {
                return Err(config_error(format!(
                    "chain {chain:?} is longer than the {LOG_PREFIX_MAX_LEN} byte log prefix limit"
                )));
            }
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> NslogError {
    NslogError::Config {
        message: message.into(),
    }
}
