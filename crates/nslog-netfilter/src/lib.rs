//! # nslog-netfilter
//!
//! Packet filter rule manipulation scoped to a network namespace.
//!
//! The pipeline only ever needs two questions answered inside a namespace:
//! does a chain exist, and can a rule be inserted into it. [`RuleBackend`]
//! opens a [`RuleContext`] for one namespace through which both are asked.
//! [`IptablesBackend`] runs iptables inside the namespace; [`MemoryBackend`]
//! keeps rule tables in memory.

#![warn(missing_docs)]

pub mod context;
pub mod iptables;
pub mod memory;
pub mod netns;
pub mod rule;

pub use context::{RuleBackend, RuleContext};
pub use iptables::IptablesBackend;
pub use memory::MemoryBackend;
pub use netns::{list_netns, netns_exists};
pub use rule::RuleSpec;
