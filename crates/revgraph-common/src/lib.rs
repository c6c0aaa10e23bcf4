//! # revgraph-common
//!
//! Foundation layer for revgraph: identifiers, values, and utilities.
//!
//! This crate provides the fundamental building blocks used by all other
//! revgraph crates. It has no internal dependencies and should be kept minimal.
//!
//! ## Modules
//!
//! - [`types`] - Core type definitions (VertexId, RevisionId, Value, etc.)
//! - [`utils`] - Utility functions and helpers (hashing, errors)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod types;
pub mod utils;

// Re-export commonly used types at crate root
pub use types::{
    AccessContext, AttributeId, EditionName, LogicalType, RevisionId, SecurityToken,
    TransactionToken, Value, VertexId, VertexInformation, VertexTypeId,
};
pub use utils::error::{Error, Result};
