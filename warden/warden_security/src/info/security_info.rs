//! Security snapshots of secured objects.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use warden_core::error::ObjectRef;
use warden_core::id::{AclId, ContentTypeId, MandatorId, UserId};
use warden_core::types::TypePermissions;

/// Security relevant part of a content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSecurity {
    /// The type.
    pub id: ContentTypeId,

    /// The type's own (STRUCTURE) ACL.
    pub acl: AclId,

    /// Which dimensions the type enforces.
    pub permissions: TypePermissions,

    /// Owning mandator.
    pub mandator: MandatorId,
}

/// Which ACLs govern one object, computed at load time.
///
/// A `SecurityInfo` is never persisted. It is rebuilt from the type, step
/// and content records whenever one of them changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityInfo {
    /// The object this snapshot belongs to.
    pub object: ObjectRef,

    /// Mandator owning the object, if known.
    pub mandator: Option<MandatorId>,

    /// Dimensions enforced by the object's type.
    pub type_permissions: TypePermissions,

    /// The type ACL.
    pub type_acl: Option<AclId>,

    /// Instance ACLs. Several ACLs grant the union of their permissions.
    pub instance_acls: BTreeSet<AclId>,

    /// ACL of the current workflow step.
    pub step_acl: Option<AclId>,

    /// Creator of the object; `None` for objects without an owner.
    pub creator: Option<UserId>,

    /// Whether the object is already persisted. Ownership only applies to
    /// existing objects.
    pub existing: bool,

    /// Explicit property ACLs by property path.
    pub property_acls: BTreeMap<String, AclId>,
}

impl SecurityInfo {
    /// A snapshot governed by a set of instance ACLs only.
    ///
    /// The default type toggles apply; no type or step ACL is set.
    pub fn new<I>(object: ObjectRef, governing_acls: I) -> Self
    where
        I: IntoIterator<Item = AclId>,
    {
        Self {
            object,
            mandator: None,
            type_permissions: TypePermissions::default(),
            type_acl: None,
            instance_acls: governing_acls.into_iter().collect(),
            step_acl: None,
            creator: None,
            existing: true,
            property_acls: BTreeMap::new(),
        }
    }

    /// A snapshot of a content instance of the given type.
    pub fn for_content<I>(object: ObjectRef, content_type: &TypeSecurity, instance_acls: I) -> Self
    where
        I: IntoIterator<Item = AclId>,
    {
        Self {
            object,
            mandator: None,
            type_permissions: content_type.permissions,
            type_acl: Some(content_type.acl),
            instance_acls: instance_acls.into_iter().collect(),
            step_acl: None,
            creator: None,
            existing: true,
            property_acls: BTreeMap::new(),
        }
    }

    /// Set the owning mandator.
    pub fn with_mandator(mut self, mandator: MandatorId) -> Self {
        self.mandator = Some(mandator);
        self
    }

    /// Set the creator.
    pub fn with_creator(mut self, creator: UserId) -> Self {
        self.creator = Some(creator);
        self
    }

    /// Set the workflow step ACL.
    pub fn with_step_acl(mut self, acl: AclId) -> Self {
        self.step_acl = Some(acl);
        self
    }

    /// Set the type toggles.
    pub fn with_type_permissions(mut self, permissions: TypePermissions) -> Self {
        self.type_permissions = permissions;
        self
    }

    /// Assign an explicit ACL to a property path.
    pub fn with_property_acl(mut self, path: impl Into<String>, acl: AclId) -> Self {
        self.property_acls.insert(path.into(), acl);
        self
    }

    /// Mark the snapshot as describing an object that does not exist yet.
    pub fn not_persisted(mut self) -> Self {
        self.existing = false;
        self
    }

    /// Whether `user` owns the object.
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.existing && self.is_creator(user)
    }

    /// Whether `user` created (or is creating) the object. Decides whether
    /// rows of the owner pseudo group apply.
    pub fn is_creator(&self, user: UserId) -> bool {
        self.creator == Some(user)
    }

    /// The distinct explicit property ACLs.
    pub fn used_property_acls(&self) -> BTreeSet<AclId> {
        self.property_acls.values().copied().collect()
    }

    /// Every ACL the snapshot references, whether or not its dimension is
    /// enforced.
    pub fn referenced_acls(&self) -> BTreeSet<AclId> {
        let mut acls = self.instance_acls.clone();
        acls.extend(self.type_acl);
        acls.extend(self.step_acl);
        acls.extend(self.property_acls.values().copied());
        acls
    }
}
