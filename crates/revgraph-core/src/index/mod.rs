//! Attribute indices.
//!
//! - [`HashValueIndex`] answers equality lookups.
//! - [`BTreeValueIndex`] answers equality and range lookups.
//! - [`IndexManager`] owns them, keeps them in step with the store, and
//!   hands them to the query plan.

mod manager;
mod value_index;

pub use manager::{IndexManager, IndexManagerConfig};
pub use value_index::{BTreeValueIndex, HashValueIndex, IndexDefinition, IndexKind, VertexIndex};
