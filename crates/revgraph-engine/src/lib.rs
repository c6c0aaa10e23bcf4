//! # revgraph-engine
//!
//! The entry point for revgraph: wires the vertex store, the index manager,
//! id allocation, transactions and security tokens together and runs the
//! two-phase startup in the right order.
//!
//! ## Modules
//!
//! - [`config`] - Configuration options
//! - [`ids`] - Per-type vertex id allocation
//! - [`manager`] - [`MetaManager`], startup and the write path
//! - [`security`] - Security token issuing and validation
//! - [`transaction`] - Transaction bookkeeping

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod ids;
pub mod manager;
pub mod security;
pub mod transaction;

pub use config::{Config, ConfigError, IndexConsistency};
pub use ids::{IdManager, UniqueId};
pub use manager::MetaManager;
pub use security::SecurityManager;
pub use transaction::{TransactionManager, TxState};
