//! Security tokens.
//!
//! Tokens are opaque to the store; the engine only checks that a caller
//! presents one it issued and has not revoked.

use parking_lot::RwLock;
use revgraph_common::types::SecurityToken;
use revgraph_common::utils::error::{Error, Result};
use revgraph_common::utils::hash::FxHashSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Issues and validates security tokens.
pub struct SecurityManager {
    next: AtomicU64,
    issued: RwLock<FxHashSet<SecurityToken>>,
}

impl SecurityManager {
    /// Creates a manager that only knows the system token.
    #[must_use]
    pub fn new() -> Self {
        let mut issued = FxHashSet::default();
        issued.insert(SecurityToken::SYSTEM);
        Self {
            next: AtomicU64::new(SecurityToken::SYSTEM.as_u64() + 1),
            issued: RwLock::new(issued),
        }
    }

    /// Returns the token of internal callers.
    #[must_use]
    pub fn system_token(&self) -> SecurityToken {
        SecurityToken::SYSTEM
    }

    /// Issues a fresh token.
    pub fn issue(&self) -> SecurityToken {
        let token = SecurityToken::new(self.next.fetch_add(1, Ordering::Relaxed));
        self.issued.write().insert(token);
        token
    }

    /// Revokes a token. The system token cannot be revoked.
    pub fn revoke(&self, token: SecurityToken) -> bool {
        token != SecurityToken::SYSTEM && self.issued.write().remove(&token)
    }

    /// Returns `true` if the token was issued and not revoked.
    #[must_use]
    pub fn is_valid(&self, token: SecurityToken) -> bool {
        self.issued.read().contains(&token)
    }

    /// Fails unless the token is valid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Security`] for unknown or revoked tokens.
    pub fn validate(&self, token: SecurityToken) -> Result<()> {
        if self.is_valid(token) {
            Ok(())
        } else {
            Err(Error::Security(format!("unknown security token {}", token.as_u64())))
        }
    }
}

impl Default for SecurityManager {
    fn default() -> Self {
        Self::new()
    }
}
