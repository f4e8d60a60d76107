//! # nslogd
//!
//! Watches the network namespace registry and makes sure every matching
//! namespace carries a LOG rule at the head of each configured chain.
//!
//! ## Pipeline
//!
//! - [`source::ExistingNamespaces`] lists the namespaces present at startup.
//! - [`source::LiveNamespaces`] reports namespaces created afterwards.
//! - [`RuleApplier`] inserts the rule inside one namespace.
//! - [`Coordinator`] wires the sources to the applier and stops on the first
//!   fatal error.
//!
//! ```no_run
//! use nslog_common::WatcherConfig;
//! use nslog_netfilter::IptablesBackend;
//! use nslogd::Coordinator;
//!
//! # async fn example() -> nslog_common::NslogResult<()> {
//! let config = WatcherConfig::default();
//! let backend = IptablesBackend::new(&config);
//!
//! // Runs until a fatal error.
//! Coordinator::new(config, backend).run().await
//! # }
//! ```

#![warn(missing_docs)]

pub mod applier;
pub mod cli;
pub mod coordinator;
pub mod source;

pub use applier::{EnsureReport, RuleApplier};
pub use coordinator::Coordinator;
