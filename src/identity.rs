// Identities consumed by the evaluator. Users are owned by the account
// subsystem; the engine only reads them.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::{AccessError, AccessResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Identity carried by every anonymous visitor.
    pub const ANONYMOUS: UserId = UserId(Uuid::nil());

    pub fn new() -> Self {
        UserId(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        UserId(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub is_authenticated: bool,
    pub is_superuser: bool,
    pub is_active: bool,
}

impl User {
    pub fn anonymous() -> Self {
        Self {
            id: UserId::ANONYMOUS,
            is_authenticated: false,
            is_superuser: false,
            is_active: false,
        }
    }

    /// A regular logged-in account.
    pub fn authenticated(id: UserId) -> Self {
        Self {
            id,
            is_authenticated: true,
            is_superuser: false,
            is_active: true,
        }
    }

    pub fn superuser(id: UserId) -> Self {
        Self {
            is_superuser: true,
            ..Self::authenticated(id)
        }
    }

    /// Ownership test used by the self-ownership clauses. Anonymous visitors
    /// own nothing.
    pub fn owns(&self, creator: &UserId) -> bool {
        self.is_authenticated && !self.id.is_anonymous() && self.id == *creator
    }

    /// Reject identities that cannot have come out of the account subsystem.
    pub fn check(&self) -> AccessResult<()> {
        if self.is_authenticated {
            if self.id.is_anonymous() {
                return Err(AccessError::precondition(
                    "authenticated user carries the anonymous id",
                ));
            }
        } else {
            if self.is_superuser {
                return Err(AccessError::precondition(
                    "unauthenticated user is flagged superuser",
                ));
            }
            if !self.id.is_anonymous() {
                return Err(AccessError::precondition(format!(
                    "unauthenticated user carries account id {}",
                    self.id
                )));
            }
        }
        Ok(())
    }
}
