//! Immutable views of the assignment graph.
//!
//! Evaluation never reads the live store. It reads an [`AclSnapshot`]
//! taken at the start of the request, so a concurrent administrative write
//! is either fully visible or not visible at all.

use std::collections::HashMap;
use warden_core::id::{AclId, GroupId, MandatorId};
use warden_core::types::{AclCategory, PermissionSet};

/// Lookup of assignment bits, as consumed by the permission evaluator.
pub trait AssignmentLookup {
    /// The permissions `group` holds on `acl`, if a row exists.
    fn lookup(&self, acl: AclId, group: GroupId) -> Option<PermissionSet>;

    /// The owning mandator of `acl`, or `None` if the ACL is unknown.
    fn acl_mandator(&self, acl: AclId) -> Option<MandatorId>;
}

/// The security relevant part of an ACL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AclHeader {
    /// Owning mandator.
    pub mandator: MandatorId,

    /// Category.
    pub category: AclCategory,
}

/// A point-in-time copy of ACL headers and assignment bits.
#[derive(Debug, Clone, Default)]
pub struct AclSnapshot {
    acls: HashMap<AclId, AclHeader>,
    grants: HashMap<(AclId, GroupId), PermissionSet>,
}

impl AclSnapshot {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an ACL header.
    pub fn with_acl(mut self, acl: AclId, mandator: MandatorId, category: AclCategory) -> Self {
        self.acls.insert(acl, AclHeader { mandator, category });
        self
    }

    /// Add an assignment. Empty sets are ignored.
    pub fn with_grant(mut self, acl: AclId, group: GroupId, permissions: PermissionSet) -> Self {
        if !permissions.is_empty() {
            self.grants.insert((acl, group), permissions);
        }
        self
    }

    /// Header of an ACL.
    pub fn header(&self, acl: AclId) -> Option<AclHeader> {
        self.acls.get(&acl).copied()
    }

    /// Number of ACLs in the snapshot.
    pub fn acl_count(&self) -> usize {
        self.acls.len()
    }

    /// Number of assignment rows in the snapshot.
    pub fn grant_count(&self) -> usize {
        self.grants.len()
    }
}

impl AssignmentLookup for AclSnapshot {
    fn lookup(&self, acl: AclId, group: GroupId) -> Option<PermissionSet> {
        self.grants.get(&(acl, group)).copied()
    }

    fn acl_mandator(&self, acl: AclId) -> Option<MandatorId> {
        self.acls.get(&acl).map(|h| h.mandator)
    }
}

impl<T: AssignmentLookup + ?Sized> AssignmentLookup for &T {
    fn lookup(&self, acl: AclId, group: GroupId) -> Option<PermissionSet> {
        (**self).lookup(acl, group)
    }

    fn acl_mandator(&self, acl: AclId) -> Option<MandatorId> {
        (**self).acl_mandator(acl)
    }
}

impl<T: AssignmentLookup + ?Sized> AssignmentLookup for std::sync::Arc<T> {
    fn lookup(&self, acl: AclId, group: GroupId) -> Option<PermissionSet> {
        (**self).lookup(acl, group)
    }

    fn acl_mandator(&self, acl: AclId) -> Option<MandatorId> {
        (**self).acl_mandator(acl)
    }
}
