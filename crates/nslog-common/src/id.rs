//! Network namespace identifiers.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{NslogError, NslogResult};

/// A validated network namespace identifier.
///
/// This is the basename of the namespace handle inside the registry
/// directory (for `/var/run/netns/qrouter-abc` it is `qrouter-abc`).
/// Identifiers must:
/// - Be non-empty
/// - Not be `.` or `..`
/// - Contain neither `/` nor NUL
///
/// Two identifiers compare equal when they name the same registry entry;
/// nothing in the pipeline assumes an identifier is seen only once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceId(String);

impl NamespaceId {
    /// Create a new namespace identifier, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is not a valid basename.
    pub fn new(id: impl Into<String>) -> NslogResult<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Derive an identifier from a path inside the registry directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the path has no UTF-8 basename.
    pub fn from_path(path: &Path) -> NslogResult<Self> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| NslogError::InvalidNamespaceId {
                id: path.display().to_string(),
            })?;
        Self::new(name)
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier starts with `prefix`. An empty prefix matches everything.
    #[must_use]
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    fn validate(id: &str) -> NslogResult<()> {
        if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\0']) {
            return Err(NslogError::InvalidNamespaceId { id: id.to_string() });
        }
        Ok(())
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NamespaceId {
    type Err = NslogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for NamespaceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn valid_namespace_ids() {
        assert!(NamespaceId::new("qrouter-abc").is_ok());
        assert!(NamespaceId::new("qdhcp-0b6e4c1a-33f2-4c9e-9d0b-5b2f3c9e1a7d").is_ok());
        assert!(NamespaceId::new(".hidden").is_ok());
    }

    #[test]
    fn invalid_namespace_ids() {
        assert!(NamespaceId::new("").is_err());
        assert!(NamespaceId::new(".").is_err());
        assert!(NamespaceId::new("..").is_err());
        assert!(NamespaceId::new("a/b").is_err());
        assert!(NamespaceId::new("a\0b").is_err());
    }

    #[test]
    fn from_registry_path() {
        let id = NamespaceId::from_path(Path::new("/var/run/netns/qrouter-abc")).unwrap();
        assert_eq!(id.as_str(), "qrouter-abc");
        assert!(NamespaceId::from_path(Path::new("/")).is_err());
    }

    #[test]
    fn prefix_matching() {
        let id: NamespaceId = "qrouter-abc".parse().unwrap();
        assert!(id.has_prefix("qrouter"));
        assert!(id.has_prefix(""));
        assert!(!id.has_prefix("qdhcp"));
    }

    proptest! {
        #[test]
        fn basename_round_trips_through_path(name in "[a-zA-Z0-9_-][a-zA-Z0-9._-]{0,40}") {
            let path = PathBuf::from("/var/run/netns").join(&name);
            let id = NamespaceId::from_path(&path).unwrap();
            prop_assert_eq!(id.as_str(), name.as_str());
        }

        #[test]
        fn slashes_are_rejected(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
            let joined = format!("{a}/{b}");
            prop_assert!(NamespaceId::new(joined).is_err());
        }
    }
}
