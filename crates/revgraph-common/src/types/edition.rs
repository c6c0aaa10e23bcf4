//! Edition names.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Name of the edition a vertex is written to when the caller gives none.
pub const DEFAULT_EDITION: &str = "default";

/// A named parallel variant of a vertex, such as a language or a branch.
///
/// Interned with `ArcStr` so cloning into keys and filters stays cheap.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditionName(ArcStr);

impl EditionName {
    /// Creates an edition name.
    #[must_use]
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self(name.into())
    }

    /// The `"default"` edition.
    #[must_use]
    pub fn default_edition() -> Self {
        Self(arcstr::literal!("default"))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EditionName {
    fn default() -> Self {
        Self::default_edition()
    }
}

impl fmt::Debug for EditionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EditionName({:?})", self.0.as_str())
    }
}

impl fmt::Display for EditionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EditionName {
    fn from(s: &str) -> Self {
        Self(ArcStr::from(s))
    }
}

impl From<String> for EditionName {
    fn from(s: String) -> Self {
        Self(ArcStr::from(s))
    }
}

impl AsRef<str> for EditionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for EditionName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for EditionName {
    fn eq(&self, other: &str) -> bool {
        self.0.as_str() == other
    }
}

impl PartialEq<&str> for EditionName {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_str() == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_edition_name() {
        assert_eq!(EditionName::default(), DEFAULT_EDITION);
        assert_eq!(EditionName::default_edition().as_str(), "default");
    }

    #[test]
    fn test_edition_borrow_lookup() {
        let mut set = std::collections::BTreeSet::new();
        set.insert(EditionName::from("de"));
        assert!(set.contains("de"));
        assert!(!set.contains("en"));
    }
}
