//! Strongly-typed identifiers for the Warden access-control engine.
//!
//! Every persisted entity of the content repository (ACLs, groups, users,
//! mandators, contents, types, workflow steps, briefcases) is addressed by a
//! numeric identifier. Each identifier type is a thin wrapper around a `u64`
//! with a phantom marker, so that an ACL id can never be passed where a group
//! id is expected.
//!
//! # Examples
//!
//! ```
//! use warden_core::id::{AclId, GroupId};
//! use std::str::FromStr;
//!
//! let acl = AclId::from_raw(42);
//! let group = GroupId::from_raw(42);
//!
//! // Same raw value, different types
//! assert_eq!(acl.raw(), group.raw());
//!
//! // Parse from a string
//! let parsed = AclId::from_str("42").unwrap();
//! assert_eq!(parsed, acl);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::num::ParseIntError;
use std::str::FromStr;

/// A type-safe numeric identifier.
///
/// The marker type `T` only exists at compile time; the serialized form is
/// the bare number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T> {
    value: u64,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    /// Create an identifier from its raw value.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_core::id::UserId;
    ///
    /// let id = UserId::from_raw(7);
    /// assert_eq!(id.raw(), 7);
    /// ```
    pub const fn from_raw(value: u64) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    /// Get the raw numeric value.
    pub const fn raw(&self) -> u64 {
        self.value
    }

    /// The null identifier (raw value `0`).
    pub const fn null() -> Self {
        Self::from_raw(0)
    }

    /// Check if this is the null identifier.
    pub const fn is_null(&self) -> bool {
        self.value == 0
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> FromStr for Id<T> {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_raw(s.trim().parse()?))
    }
}

impl<T> From<u64> for Id<T> {
    fn from(value: u64) -> Self {
        Self::from_raw(value)
    }
}

/// Marker type for access control lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AclMarker;
/// Identifier for an ACL.
pub type AclId = Id<AclMarker>;

/// Marker type for user groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupMarker;
/// Identifier for a user group.
pub type GroupId = Id<GroupMarker>;

/// Marker type for user accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserMarker;
/// Identifier for a user account.
pub type UserId = Id<UserMarker>;

/// Marker type for mandators (tenants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MandatorMarker;
/// Identifier for a mandator.
pub type MandatorId = Id<MandatorMarker>;

/// Marker type for content instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentMarker;
/// Identifier for a content instance.
pub type ContentId = Id<ContentMarker>;

/// Marker type for content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentTypeMarker;
/// Identifier for a content type.
pub type ContentTypeId = Id<ContentTypeMarker>;

/// Marker type for workflow steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepMarker;
/// Identifier for a workflow step.
pub type StepId = Id<StepMarker>;

/// Marker type for briefcases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BriefcaseMarker;
/// Identifier for a briefcase.
pub type BriefcaseId = Id<BriefcaseMarker>;

impl Id<GroupMarker> {
    /// Every ticket is a member of this group.
    pub const EVERYONE: GroupId = GroupId::from_raw(1);

    /// Pseudo group whose assignments only apply to an object's creator.
    pub const OWNER: GroupId = GroupId::from_raw(2);
}

impl Id<UserMarker> {
    /// The anonymous guest account.
    pub const GUEST: UserId = UserId::from_raw(1);

    /// The built-in global supervisor account.
    pub const GLOBAL_SUPERVISOR: UserId = UserId::from_raw(2);
}

impl Id<MandatorMarker> {
    /// Sentinel mandator owning global ACLs; visible to every mandator.
    pub const GLOBAL: MandatorId = MandatorId::from_raw(0);

    /// Check if this is the global sentinel mandator.
    pub const fn is_global(&self) -> bool {
        self.raw() == 0
    }
}
