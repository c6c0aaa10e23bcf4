//! Opaque caller tokens threaded through every store and query call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the security principal of a call. Opaque to the store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SecurityToken(pub u64);

impl SecurityToken {
    /// The token of internal callers such as startup and maintenance.
    pub const SYSTEM: Self = Self(0);

    /// Creates a token from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SecurityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecurityToken({})", self.0)
    }
}

/// Identifies the transaction a call runs in. Opaque to the store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TransactionToken(pub u64);

impl TransactionToken {
    /// Creates a token from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TransactionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionToken({})", self.0)
    }
}

impl fmt::Display for TransactionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx{}", self.0)
    }
}

/// The pair of tokens every store and operator call carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessContext {
    /// Who is calling.
    pub security: SecurityToken,
    /// Which transaction the call belongs to.
    pub transaction: TransactionToken,
}

impl AccessContext {
    /// Bundles a security and a transaction token.
    #[inline]
    #[must_use]
    pub const fn new(security: SecurityToken, transaction: TransactionToken) -> Self {
        Self {
            security,
            transaction,
        }
    }
}
