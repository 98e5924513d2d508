//! User groups.

use serde::{Deserialize, Serialize};
use warden_core::id::{GroupId, MandatorId};
use warden_core::types::UserTicket;

/// A user group as far as ACL administration needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// The unique ID of this group.
    pub id: GroupId,

    /// The owning mandator.
    pub mandator: MandatorId,

    /// Display name.
    pub name: String,

    /// System groups (EVERYONE, OWNER) are shared by all mandators.
    pub system: bool,
}

impl Group {
    /// Create a mandator group.
    pub fn new(id: GroupId, mandator: MandatorId, name: impl Into<String>) -> Self {
        Self {
            id,
            mandator,
            name: name.into(),
            system: false,
        }
    }

    /// The built-in EVERYONE group.
    pub fn everyone() -> Self {
        Self {
            id: GroupId::EVERYONE,
            mandator: MandatorId::GLOBAL,
            name: "Everyone".to_string(),
            system: true,
        }
    }

    /// The built-in OWNER pseudo group.
    pub fn owner() -> Self {
        Self {
            id: GroupId::OWNER,
            mandator: MandatorId::GLOBAL,
            name: "Owner".to_string(),
            system: true,
        }
    }

    /// Whether `ticket` may administer assignments of this group.
    pub fn may_access(&self, ticket: &UserTicket) -> bool {
        ticket.is_global_supervisor() || self.system || self.mandator == ticket.mandator_id()
    }
}
