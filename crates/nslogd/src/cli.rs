//! Command line definitions.

use std::path::PathBuf;

use clap::Parser;
use nslog_common::{ApplyErrorPolicy, NslogResult, WatcherConfig};

/// nslogd - ensure LOG rules inside network namespaces as they appear
#[derive(Parser, Debug)]
#[command(name = "nslogd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "NSLOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Namespace registry directory to scan and watch
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Only handle namespaces whose name starts with this prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Filter table holding the chains
    #[arg(long)]
    pub table: Option<String>,

    /// Chain to ensure the LOG rule on (repeatable, replaces the configured list)
    #[arg(long = "chain")]
    pub chains: Vec<String>,

    /// Do not insert the rule when an identical one is already present
    #[arg(long)]
    pub skip_present: bool,

    /// What to do when a namespace cannot be processed
    #[arg(long, value_parser = ["fatal", "skip"])]
    pub on_error: Option<String>,

    /// Create the registry directory if it does not exist
    #[arg(long)]
    pub create_registry: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Build the watcher configuration: file (or defaults), then flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the result is invalid.
    pub fn watcher_config(&self) -> NslogResult<WatcherConfig> {
        let mut config = match &self.config {
            Some(path) => WatcherConfig::load(path)?,
            None => WatcherConfig::default(),
        };

        if let Some(registry) = &self.registry {
            config.registry_path.clone_from(registry);
        }
        if let Some(prefix) = &self.prefix {
            config.namespace_prefix.clone_from(prefix);
        }
        if let Some(table) = &self.table {
            config.table.clone_from(table);
        }
        if !self.chains.is_empty() {
            config.chains.clone_from(&self.chains);
        }
        if let Some(policy) = &self.on_error {
            config.on_apply_error = policy.parse::<ApplyErrorPolicy>()?;
        }
        config.skip_present_rules |= self.skip_present;
        config.create_registry |= self.create_registry;

        config.validate()?;
        Ok(config)
    }
}
