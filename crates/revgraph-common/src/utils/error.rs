//! Error types shared by every revgraph crate.
//!
//! "Not found" and "already exists" are not errors here: store reads return
//! `Option`, store writes return `bool`. Errors are reserved for misuse
//! (bad plans, wrong lifecycle order, unknown tokens) and for I/O.

use thiserror::Error;

/// Result type alias for revgraph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type.
#[derive(Error, Debug)]
pub enum Error {
    /// A constant does not fit the declared type of the attribute it is compared with.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Declared attribute type.
        expected: String,
        /// Type of the offending value.
        found: String,
    },

    /// Query-plan construction failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Index management failed.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Transaction bookkeeping failed.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// The security token was rejected.
    #[error("security error: {0}")]
    Security(String),

    /// A component was used out of lifecycle order.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// A persisted snapshot could not be decoded.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal invariant violated.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors raised while building a query plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The attribute is not defined on the vertex type or its ancestors.
    #[error("unknown attribute {attribute} on vertex type {vertex_type}")]
    UnknownAttribute {
        /// Vertex type the attribute was looked up on.
        vertex_type: u64,
        /// Attribute id that was requested.
        attribute: u64,
    },

    /// An ordered comparison was requested on a type without an order.
    #[error("attribute of type {0} cannot be used in an ordered comparison")]
    NotOrderable(String),

    /// Comparisons against NULL never match and are rejected.
    #[error("cannot compare against a null constant")]
    NullConstant,

    /// A negation has no single extent to take the complement in.
    #[error("negation needs a single bounded extent: {0}")]
    UnboundedNegation(String),

    /// `And`/`Or` without operands.
    #[error("{0} needs at least one operand")]
    EmptyComposite(&'static str),
}

/// Errors raised by the index manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// An index with this name already exists.
    #[error("index already exists: {0}")]
    AlreadyExists(String),

    /// No index with this name exists.
    #[error("index not found: {0}")]
    NotFound(String),
}

/// Errors raised by transaction bookkeeping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// The transaction is unknown or in the wrong state.
    #[error("invalid transaction state: {0}")]
    InvalidState(String),

    /// The transaction is not active.
    #[error("transaction {0} is not active")]
    NotActive(u64),
}

/// Errors raised on lifecycle misuse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// A phase transition was attempted from the wrong phase.
    #[error("{component}: cannot {action} while {phase}")]
    InvalidTransition {
        /// Component name.
        component: &'static str,
        /// Attempted action.
        action: &'static str,
        /// Phase the component was in.
        phase: &'static str,
    },

    /// The component is not ready to serve requests.
    #[error("{0} is not ready")]
    NotReady(&'static str),
}

/// Errors raised while decoding a snapshot file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The file does not start with the snapshot magic.
    #[error("bad snapshot magic")]
    BadMagic,

    /// The snapshot was written by an unknown format version.
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u16),

    /// The snapshot holds a different payload than requested.
    #[error("snapshot kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        /// Requested payload kind.
        expected: u8,
        /// Payload kind found in the header.
        found: u8,
    },

    /// The file is shorter than its header claims.
    #[error("truncated snapshot")]
    Truncated,

    /// The payload checksum does not match.
    #[error("snapshot checksum mismatch: expected {expected:#010x}, found {found:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the header.
        expected: u32,
        /// Checksum of the payload read.
        found: u32,
    },
}
