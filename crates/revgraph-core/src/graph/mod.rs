//! Versioned vertex model and storage.
//!
//! A vertex is addressed by `(type, id, edition, revision)`. Editions are
//! named parallel variants of one vertex; revisions are time-ordered
//! snapshots within an edition.
//!
//! - [`Vertex`] / [`VertexUpdate`] - immutable snapshots and diffs
//! - [`VertexStore`] - the storage contract
//! - [`InMemoryVertexStore`] - the bundled implementation

mod filter;
mod memory;
mod store;
mod vertex;

pub use filter::{EditionFilter, EditionPredicate, RevisionFilter, RevisionPredicate, VertexFilter};
pub use memory::{InMemoryVertexStore, VertexStoreConfig};
pub use store::{VertexIter, VertexStore};
pub use vertex::{EdgeTargets, Vertex, VertexKey, VertexUpdate};
