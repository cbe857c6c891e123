//! # Authorization Seam
//!
//! The engine never resolves roles or sessions. It asks the host, through
//! [`AuthorizationContext`], whether an actor holds a capability and refuses
//! the transition when the answer is no.
//!
//! ```text
//! void(tx, reason, actor)
//!      │
//!      ├── tx.status == in_service → needs Capability::VoidTransaction
//!      └── tx.status == paid       → needs Capability::VoidPaidTransaction
//!                                        │
//!                                        ▼
//!                          host.can(actor, capability)?
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Privileged actions the engine checks before performing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Void an invoice that has not been paid yet.
    VoidTransaction,
    /// Void an invoice after payment was taken (refund territory).
    VoidPaidTransaction,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::VoidTransaction => "void transactions",
            Capability::VoidPaidTransaction => "void paid transactions",
        })
    }
}

/// Host-supplied permission check.
pub trait AuthorizationContext: Send + Sync {
    fn can(&self, actor_id: &str, capability: Capability) -> bool;
}

/// Grants every capability to every actor.
///
/// For hosts that enforce permissions before calling the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AuthorizationContext for AllowAll {
    fn can(&self, _actor_id: &str, _capability: Capability) -> bool {
        true
    }
}

/// A fixed actor → capabilities table.
#[derive(Debug, Clone, Default)]
pub struct StaticGrants {
    grants: HashMap<String, HashSet<Capability>>,
}

impl StaticGrants {
    pub fn new() -> Self {
        StaticGrants::default()
    }

    /// Grants `capability` to `actor_id`.
    pub fn grant(mut self, actor_id: impl Into<String>, capability: Capability) -> Self {
        self.grants
            .entry(actor_id.into())
            .or_default()
            .insert(capability);
        self
    }
}

impl AuthorizationContext for StaticGrants {
    fn can(&self, actor_id: &str, capability: Capability) -> bool {
        self.grants
            .get(actor_id)
            .is_some_and(|caps| caps.contains(&capability))
    }
}
