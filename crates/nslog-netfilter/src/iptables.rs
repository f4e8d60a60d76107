//! iptables executed inside a network namespace.
//!
//! Every invocation goes through `nsenter --net=<registry>/<namespace>` so
//! the registry directory does not have to be `/var/run/netns`. Commands
//! pass `-w` to wait for the xtables lock instead of failing while another
//! agent in the namespace holds it.

use std::path::PathBuf;
use std::process::{ExitStatus, Output};

use async_trait::async_trait;
use nslog_common::paths::namespace_handle;
use nslog_common::{NamespaceId, NslogError, NslogResult, WatcherConfig};
use tokio::process::Command;

use crate::context::{RuleBackend, RuleContext};
use crate::netns::netns_exists;
use crate::rule::RuleSpec;

/// iptables exits with this status when a chain or rule does not exist.
const EXIT_NOT_FOUND: i32 = 1;

/// Backend running the system iptables inside each namespace.
#[derive(Debug, Clone)]
pub struct IptablesBackend {
    registry: PathBuf,
    nsenter: PathBuf,
    iptables: PathBuf,
}

impl IptablesBackend {
    /// Create a backend from the watcher configuration.
    #[must_use]
    pub fn new(config: &WatcherConfig) -> Self {
        Self {
            registry: config.registry_path.clone(),
            nsenter: config.nsenter_binary.clone(),
            iptables: config.iptables_binary.clone(),
        }
    }
}

#[async_trait]
impl RuleBackend for IptablesBackend {
    async fn open(&self, namespace: &NamespaceId) -> NslogResult<Box<dyn RuleContext>> {
        let open_error = |message: String| NslogError::NamespaceOpen {
            namespace: namespace.to_string(),
            message,
        };

        if !netns_exists(&self.registry, namespace).await {
            return Err(open_error(format!(
                "no namespace handle in {}",
                self.registry.display()
            )));
        }

        let context = NetnsIptables {
            handle: namespace_handle(&self.registry, namespace.as_str()),
            nsenter: self.nsenter.clone(),
            iptables: self.iptables.clone(),
        };

        // Entering the namespace and running iptables at all is what "open" means here.
        let output = context
            .run(&["--version".to_string()])
            .await
            .map_err(|e| open_error(e.to_string()))?;
        if !output.status.success() {
            return Err(open_error(stderr_of(&output)));
        }

        tracing::debug!(
            namespace = %namespace,
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "Opened iptables context"
        );
        Ok(Box::new(context))
    }
}

/// iptables bound to one namespace handle.
#[derive(Debug)]
struct NetnsIptables {
    handle: PathBuf,
    nsenter: PathBuf,
    iptables: PathBuf,
}

impl NetnsIptables {
    /// Full argument list passed to nsenter for an iptables invocation.
    fn command_line(&self, args: &[String]) -> Vec<String> {
        let mut line = vec![
            format!("--net={}", self.handle.display()),
            "--".to_string(),
            self.iptables.display().to_string(),
        ];
        line.extend(args.iter().cloned());
        line
    }

    fn describe(&self, args: &[String]) -> String {
        format!("{} {}", self.nsenter.display(), self.command_line(args).join(" "))
    }

    async fn run(&self, args: &[String]) -> NslogResult<Output> {
        tracing::trace!(command = %self.describe(args), "Running iptables");
        Command::new(&self.nsenter)
            .args(self.command_line(args))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| NslogError::Command {
                command: self.describe(args),
                status: "not started".to_string(),
                stderr: e.to_string(),
            })
    }

    /// Run a query whose "not found" exit status means `false`.
    async fn query(&self, args: Vec<String>) -> NslogResult<bool> {
        let output = self.run(&args).await?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(EXIT_NOT_FOUND) => Ok(false),
            _ => Err(self.failure(&args, output.status, &output)),
        }
    }

    fn failure(&self, args: &[String], status: ExitStatus, output: &Output) -> NslogError {
        NslogError::Command {
            command: self.describe(args),
            status: status.to_string(),
            stderr: stderr_of(output),
        }
    }
}

#[async_trait]
impl RuleContext for NetnsIptables {
    async fn chain_exists(&self, table: &str, chain: &str) -> NslogResult<bool> {
        self.query(chain_query_args(table, chain)).await
    }

    async fn rule_exists(&self, table: &str, chain: &str, rule: &RuleSpec) -> NslogResult<bool> {
        self.query(rule_check_args(table, chain, rule)).await
    }

    async fn insert(
        &self,
        table: &str,
        chain: &str,
        position: u32,
        rule: &RuleSpec,
    ) -> NslogResult<()> {
        let args = insert_args(table, chain, position, rule);
        let output = self.run(&args).await?;
        if !output.status.success() {
            return Err(self.failure(&args, output.status, &output));
        }
        Ok(())
    }
}

fn chain_query_args(table: &str, chain: &str) -> Vec<String> {
    ["-w", "-t", table, "-S", chain]
        .into_iter()
        .map(String::from)
        .collect()
}

fn rule_check_args(table: &str, chain: &str, rule: &RuleSpec) -> Vec<String> {
    let mut args: Vec<String> = ["-w", "-t", table, "-C", chain]
        .into_iter()
        .map(String::from)
        .collect();
    args.extend(rule.args().iter().cloned());
    args
}

fn insert_args(table: &str, chain: &str, position: u32, rule: &RuleSpec) -> Vec<String> {
    let mut args: Vec<String> = ["-w", "-t", table, "-I", chain]
        .into_iter()
        .map(String::from)
        .collect();
    args.push(position.to_string());
    args.extend(rule.args().iter().cloned());
    args
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
