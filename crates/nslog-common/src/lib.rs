//! # nslog-common
//!
//! Shared types for the nslog namespace watcher.
//!
//! This crate provides the pieces every other nslog crate builds on:
//! - Network namespace identifiers
//! - Watcher configuration and its defaults
//! - Common error types

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod id;
pub mod paths;

pub use config::{ApplyErrorPolicy, WatcherConfig};
pub use error::{NslogError, NslogResult};
pub use id::NamespaceId;
