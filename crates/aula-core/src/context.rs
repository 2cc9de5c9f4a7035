//! # Request Context
//!
//! Who is calling and what they may do. Every mutating operation takes a
//! `&RequestContext` explicitly; nothing reads the actor from global state.
//!
//! ```text
//! Bearer token ──► apps/api auth middleware ──► RequestContext ──► repository
//!                  (claims: sub, perms)          ctx.require(..)
//! ```
//!
//! Policy evaluation lives outside this system. The context only answers
//! "was this permission granted?".

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Permission names granted through the token's `perms` claim.
pub mod perms {
    pub const CASH_SESSIONS_OPEN: &str = "cash.sessions.open";
    pub const CASH_SESSIONS_CLOSE: &str = "cash.sessions.close";
    pub const CASH_MOVEMENTS_CREATE: &str = "cash.movements.create";
    pub const RECEIPTS_ISSUE: &str = "receipts.issue";
    pub const RECEIPTS_PAY: &str = "receipts.pay";
    pub const RECEIPTS_CANCEL: &str = "receipts.cancel";
    /// Administrative; not granted to cashiers by default.
    pub const RECEIPTS_REFUND: &str = "receipts.refund";
    pub const INVENTORY_ITEMS_CREATE: &str = "inventory.items.create";
    pub const INVENTORY_MOVEMENTS_CREATE: &str = "inventory.movements.create";
}

/// The authenticated actor and the permissions granted to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    actor_id: String,
    permissions: BTreeSet<String>,
}

impl RequestContext {
    pub fn new<I, S>(actor_id: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RequestContext {
            actor_id: actor_id.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    pub fn permissions(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(String::as_str)
    }

    pub fn has_perm(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    pub fn has_any(&self, permissions: &[&str]) -> bool {
        permissions.iter().any(|p| self.has_perm(p))
    }

    /// Fails with `Forbidden` unless `permission` was granted.
    pub fn require(&self, permission: &str) -> CoreResult<()> {
        if self.has_perm(permission) {
            Ok(())
        } else {
            Err(CoreError::Forbidden {
                permission: permission.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_checks() {
        let ctx = RequestContext::new(
            "cashier-1",
            [perms::CASH_SESSIONS_OPEN, perms::RECEIPTS_PAY],
        );

        assert_eq!(ctx.actor_id(), "cashier-1");
        assert!(ctx.has_perm(perms::RECEIPTS_PAY));
        assert!(!ctx.has_perm(perms::RECEIPTS_REFUND));
        assert!(ctx.has_any(&[perms::RECEIPTS_REFUND, perms::CASH_SESSIONS_OPEN]));
        assert!(!ctx.has_any(&[]));

        assert!(ctx.require(perms::RECEIPTS_PAY).is_ok());
        assert_eq!(
            ctx.require(perms::RECEIPTS_REFUND),
            Err(CoreError::Forbidden {
                permission: "receipts.refund".to_string()
            })
        );
    }
}
