//! Core type definitions for revgraph.
//!
//! This module contains the fundamental types used throughout the store:
//! - Identifier types ([`VertexTypeId`], [`VertexId`], [`AttributeId`])
//! - Versioning types ([`EditionName`], [`RevisionId`], [`RevisionClock`])
//! - Property types ([`Value`], [`LogicalType`])
//! - Opaque caller tokens ([`SecurityToken`], [`TransactionToken`], [`AccessContext`])

mod edition;
mod id;
mod logical_type;
mod revision;
mod token;
mod value;

pub use edition::{DEFAULT_EDITION, EditionName};
pub use id::{AttributeId, VertexId, VertexInformation, VertexTypeId};
pub use logical_type::LogicalType;
pub use revision::{RevisionClock, RevisionId};
pub use token::{AccessContext, SecurityToken, TransactionToken};
pub use value::{HashableValue, OrderableValue, OrderedFloat64, Value};
