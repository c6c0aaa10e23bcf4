//! # revgraph-core
//!
//! Core layer for revgraph: the versioned vertex store, value indices,
//! query plans, and the lifecycle shared by stateful components.
//!
//! This crate depends only on `revgraph-common`.
//!
//! ## Modules
//!
//! - [`graph`] - Vertex snapshots, scan filters, and the [`VertexStore`] contract
//! - [`index`] - Hash and ordered value indices and their manager
//! - [`execution`] - Lazy query plans over the store and the indices
//! - [`schema`] - Read-only vertex type lookups
//! - [`lifecycle`] - Two-phase initialize/load protocol
//! - [`storage`] - Snapshot files for persistent components

pub mod execution;
pub mod graph;
pub mod index;
pub mod lifecycle;
pub mod schema;
pub mod storage;

// Re-export commonly used types
pub use execution::{PlanContext, QueryPlan, QueryPlanProperty, VertexStream};
pub use graph::{InMemoryVertexStore, Vertex, VertexStore, VertexUpdate};
pub use index::IndexManager;
pub use lifecycle::{Lifecycle, Phase};
pub use schema::{TypeCatalog, TypeLookup};
