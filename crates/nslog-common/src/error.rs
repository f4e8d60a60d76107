//! Common error types for nslog.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`NslogError`].
pub type NslogResult<T> = Result<T, NslogError>;

/// Errors raised anywhere in the namespace pipeline.
#[derive(Error, Diagnostic, Debug)]
pub enum NslogError {
    /// The namespace registry directory could not be listed.
    #[error("Cannot list namespace registry {}: {source}", .path.display())]
    #[diagnostic(
        code(nslog::registry::list),
        help("Check that the directory exists and is readable (ip netns creates it lazily)")
    )]
    RegistryList {
        /// The registry directory.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A watch could not be established on the registry directory.
    #[error("Cannot watch namespace registry {}: {message}", .path.display())]
    #[diagnostic(code(nslog::watch::setup))]
    Watch {
        /// The registry directory.
        path: PathBuf,
        /// The error message.
        message: String,
    },

    /// The live notification stream closed or became unreadable.
    #[error("Cannot get watcher events for {}: {reason}", .path.display())]
    #[diagnostic(code(nslog::watch::closed))]
    WatchClosed {
        /// The registry directory.
        path: PathBuf,
        /// Why the stream ended.
        reason: String,
    },

    /// A rule manipulation context could not be opened for a namespace.
    #[error("Cannot open namespace {namespace}: {message}")]
    #[diagnostic(code(nslog::namespace::open))]
    NamespaceOpen {
        /// The namespace identifier.
        namespace: String,
        /// The error message.
        message: String,
    },

    /// An external command exited unsuccessfully.
    #[error("Command `{command}` failed ({status}): {stderr}")]
    #[diagnostic(code(nslog::command))]
    Command {
        /// The command line that was run.
        command: String,
        /// The exit status.
        status: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The diagnostic rule could not be inserted into a chain.
    #[error("Cannot insert log rule in namespace {namespace} on chain {chain}: {source}")]
    #[diagnostic(code(nslog::rule::insert))]
    RuleInsert {
        /// The namespace identifier.
        namespace: String,
        /// The chain the rule was destined for.
        chain: String,
        /// The underlying failure.
        source: Box<NslogError>,
    },

    /// Invalid namespace identifier.
    #[error("Invalid namespace identifier: {id:?}")]
    #[diagnostic(
        code(nslog::namespace::invalid_id),
        help("Namespace identifiers are non-empty registry basenames without '/' or NUL")
    )]
    InvalidNamespaceId {
        /// The rejected identifier.
        id: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(nslog::config))]
    Config {
        /// The error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(nslog::io))]
    Io(#[from] std::io::Error),

    /// Internal error (should not happen).
    #[error("Internal error: {message}")]
    #[diagnostic(code(nslog::internal))]
    Internal {
        /// The error message.
        message: String,
    },
}

impl From<toml::de::Error> for NslogError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

impl NslogError {
    /// The namespace this error concerns, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Self::NamespaceOpen { namespace, .. } | Self::RuleInsert { namespace, .. } => {
                Some(namespace)
            }
            _ => None,
        }
    }
}
