//! Persistence helpers.
//!
//! Stores and index managers write their state as whole-file snapshots;
//! see [`snapshot`] for the format.

pub mod snapshot;

pub use snapshot::SnapshotKind;
