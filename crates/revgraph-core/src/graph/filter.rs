//! Edition and revision selection for store scans.

use revgraph_common::types::{EditionName, RevisionId, VertexId, VertexTypeId};
use std::fmt;
use std::sync::Arc;

/// A predicate over edition names.
pub type EditionPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A predicate over revision ids.
pub type RevisionPredicate = Arc<dyn Fn(RevisionId) -> bool + Send + Sync>;

/// Which editions of a vertex a scan yields.
#[derive(Clone, Default)]
pub enum EditionFilter {
    /// The vertex's default edition.
    #[default]
    Default,
    /// Every edition.
    All,
    /// Editions with one of these names.
    Named(Vec<EditionName>),
    /// Editions accepted by the predicate. Invoked once per candidate.
    Predicate(EditionPredicate),
}

impl EditionFilter {
    /// Selects the named editions.
    #[must_use]
    pub fn named<I, E>(names: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EditionName>,
    {
        Self::Named(names.into_iter().map(Into::into).collect())
    }

    /// Selects editions accepted by `f`.
    #[must_use]
    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    /// Returns `true` if `edition` is selected, given the vertex's default edition.
    #[must_use]
    pub fn selects(&self, edition: &EditionName, default: &EditionName) -> bool {
        match self {
            Self::Default => edition == default,
            Self::All => true,
            Self::Named(names) => names.contains(edition),
            Self::Predicate(f) => f(edition.as_str()),
        }
    }
}

impl fmt::Debug for EditionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "Default"),
            Self::All => write!(f, "All"),
            Self::Named(names) => f.debug_tuple("Named").field(names).finish(),
            Self::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

impl PartialEq for EditionFilter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Default, Self::Default) | (Self::All, Self::All) => true,
            (Self::Named(a), Self::Named(b)) => a == b,
            (Self::Predicate(a), Self::Predicate(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Which revisions of a selected edition a scan yields.
#[derive(Clone, Default)]
pub enum RevisionFilter {
    /// The latest revision of each selected edition.
    #[default]
    Latest,
    /// Every revision.
    All,
    /// Revisions with one of these ids.
    Set(Vec<RevisionId>),
    /// Revisions accepted by the predicate. Invoked once per candidate.
    Predicate(RevisionPredicate),
}

impl RevisionFilter {
    /// Selects revisions accepted by `f`.
    #[must_use]
    pub fn predicate(f: impl Fn(RevisionId) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    /// Returns `true` if `revision` is selected, given the latest revision of its edition.
    #[must_use]
    pub fn selects(&self, revision: RevisionId, latest: RevisionId) -> bool {
        match self {
            Self::Latest => revision == latest,
            Self::All => true,
            Self::Set(ids) => ids.contains(&revision),
            Self::Predicate(f) => f(revision),
        }
    }

    /// Returns `true` if only the latest revision can be selected.
    #[must_use]
    pub fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }
}

impl fmt::Debug for RevisionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "Latest"),
            Self::All => write!(f, "All"),
            Self::Set(ids) => f.debug_tuple("Set").field(ids).finish(),
            Self::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

impl PartialEq for RevisionFilter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Latest, Self::Latest) | (Self::All, Self::All) => true,
            (Self::Set(a), Self::Set(b)) => a == b,
            (Self::Predicate(a), Self::Predicate(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Filter for `get_all_vertices`.
///
/// Every field that is set narrows the result; fields compose by
/// conjunction. Unset edition and revision fields mean every edition and
/// every revision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexFilter {
    /// Restrict to these vertex types.
    pub type_ids: Option<Vec<VertexTypeId>>,
    /// Restrict to these vertex ids.
    pub vertex_ids: Option<Vec<VertexId>>,
    /// Restrict to these editions.
    pub editions: Option<Vec<EditionName>>,
    /// Restrict to these revisions.
    pub revisions: Option<Vec<RevisionId>>,
}

impl VertexFilter {
    /// A filter that selects everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to the given vertex types.
    #[must_use]
    pub fn with_types(mut self, types: impl IntoIterator<Item = VertexTypeId>) -> Self {
        self.type_ids = Some(types.into_iter().collect());
        self
    }

    /// Restricts to the given vertex ids.
    #[must_use]
    pub fn with_vertex_ids(mut self, ids: impl IntoIterator<Item = VertexId>) -> Self {
        self.vertex_ids = Some(ids.into_iter().collect());
        self
    }

    /// Restricts to the given editions.
    #[must_use]
    pub fn with_editions<E: Into<EditionName>>(
        mut self,
        editions: impl IntoIterator<Item = E>,
    ) -> Self {
        self.editions = Some(editions.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts to the given revisions.
    #[must_use]
    pub fn with_revisions(mut self, revisions: impl IntoIterator<Item = RevisionId>) -> Self {
        self.revisions = Some(revisions.into_iter().collect());
        self
    }

    /// The edition selection this filter implies.
    #[must_use]
    pub fn edition_filter(&self) -> EditionFilter {
        match &self.editions {
            Some(names) => EditionFilter::Named(names.clone()),
            None => EditionFilter::All,
        }
    }

    /// The revision selection this filter implies.
    #[must_use]
    pub fn revision_filter(&self) -> RevisionFilter {
        match &self.revisions {
            Some(ids) => RevisionFilter::Set(ids.clone()),
            None => RevisionFilter::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edition_filter_selects() {
        let default = EditionName::from("en");
        let de = EditionName::from("de");
        assert!(EditionFilter::Default.selects(&default, &default));
        assert!(!EditionFilter::Default.selects(&de, &default));
        assert!(EditionFilter::All.selects(&de, &default));
        assert!(EditionFilter::named(["de"]).selects(&de, &default));
        assert!(EditionFilter::predicate(|e| e.starts_with('d')).selects(&de, &default));
    }

    #[test]
    fn test_revision_filter_selects() {
        let latest = RevisionId::new(20);
        assert!(RevisionFilter::Latest.selects(latest, latest));
        assert!(!RevisionFilter::Latest.selects(RevisionId::new(10), latest));
        let ten = RevisionId::new(10);
        assert!(RevisionFilter::Set(vec![ten]).selects(ten, latest));
        assert!(RevisionFilter::predicate(|r| r.as_micros() < 15).selects(ten, latest));
    }

    #[test]
    fn test_vertex_filter_defaults_to_everything() {
        let filter = VertexFilter::new();
        assert_eq!(filter.edition_filter(), EditionFilter::All);
        assert_eq!(filter.revision_filter(), RevisionFilter::All);
    }
}
