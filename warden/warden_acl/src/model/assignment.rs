//! ACL assignments.

use serde::{Deserialize, Serialize};
use warden_core::id::{AclId, GroupId, UserId};
use warden_core::types::{AclCategory, Permission, PermissionSet};

use super::LifecycleInfo;

/// The permissions one group holds on one ACL.
///
/// There is at most one row per (ACL, group) pair, and a stored row never
/// has an empty permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclAssignment {
    /// The ACL.
    pub acl: AclId,

    /// The group.
    pub group: GroupId,

    /// Category of the ACL, denormalized for listing.
    pub category: AclCategory,

    /// Granted permissions.
    pub permissions: PermissionSet,

    /// Creation and modification info.
    pub lifecycle: LifecycleInfo,
}

impl AclAssignment {
    /// Create a new assignment row.
    pub fn new(
        acl: AclId,
        group: GroupId,
        category: AclCategory,
        permissions: PermissionSet,
        creator: UserId,
    ) -> Self {
        Self {
            acl,
            group,
            category,
            permissions,
            lifecycle: LifecycleInfo::created_now(creator),
        }
    }

    /// Whether this row grants `permission`.
    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions.contains_permission(permission)
    }

    /// Whether this row belongs to the owner pseudo group.
    pub fn is_owner_row(&self) -> bool {
        self.group == GroupId::OWNER
    }
}
