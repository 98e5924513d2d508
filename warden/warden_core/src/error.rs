//! Error types for the Warden access-control engine.
//!
//! Errors are organized by kind rather than by subsystem: a denied
//! permission, a missing entity, a malformed parameter and a conflicting
//! write each have their own enum. The root error type, `Error`, wraps all
//! of them so callers can use a single `Result` alias.
//!
//! None of these errors is ever retried automatically; they are
//! deterministic functions of the current state.

use crate::id::{AclId, BriefcaseId, ContentId, ContentTypeId, GroupId, MandatorId, StepId, UserId};
use crate::types::{AclCategory, Permission, Role};
use std::fmt;
use thiserror::Error;

/// Root error type for Warden.
#[derive(Debug, Error)]
pub enum Error {
    /// Permission denied
    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    /// A referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// Malformed input to an administrative operation
    #[error("Invalid parameter: {0}")]
    InvalidParameter(#[from] InvalidParameterError),

    /// A write conflicts with existing data
    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error denies access.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::Access(_))
    }

    /// Whether this error reports a missing entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Reference to the object a permission check was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    /// A persisted content instance
    Content(ContentId),
    /// A content that has not been persisted yet
    NewContent(ContentTypeId),
    /// A content type
    Type(ContentTypeId),
    /// A workflow step
    Step(StepId),
    /// A briefcase
    Briefcase(BriefcaseId),
    /// An ACL itself
    Acl(AclId),
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content(id) => write!(f, "content {}", id),
            Self::NewContent(ty) => write!(f, "new content of type {}", ty),
            Self::Type(id) => write!(f, "type {}", id),
            Self::Step(id) => write!(f, "step {}", id),
            Self::Briefcase(id) => write!(f, "briefcase {}", id),
            Self::Acl(id) => write!(f, "acl {}", id),
        }
    }
}

fn join_acls(acls: &[AclId]) -> String {
    acls.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Errors raised when a caller lacks the right to do something.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The caller lacks a permission on an object
    #[error("No {permission} permission on {object} (lacking ACLs: [{}])", join_acls(.lacking))]
    NoAccess {
        /// The object that was checked
        object: ObjectRef,
        /// The permission that was missing
        permission: Permission,
        /// ACLs that did not grant the permission, deduplicated
        lacking: Vec<AclId>,
    },

    /// The caller lacks a permission on a single property
    #[error("No {permission} permission on property '{path}' of {object}")]
    NoPropertyAccess {
        /// The owning object
        object: ObjectRef,
        /// Property path
        path: String,
        /// The permission that was missing
        permission: Permission,
    },

    /// The caller lacks a required role
    #[error("Role '{0}' is required")]
    NotInRole(Role),

    /// The target belongs to a mandator the caller may not touch
    #[error("Mandator {target} is not accessible from mandator {caller}")]
    ForeignMandator {
        /// The caller's mandator
        caller: MandatorId,
        /// The mandator owning the target
        target: MandatorId,
    },

    /// Internal ACLs can never be removed or reassigned
    #[error("ACL {0} is an internal ACL and cannot be removed")]
    InternalAcl(AclId),

    /// Write to a property the caller only sees as read-only
    #[error("Property '{0}' is read-only")]
    ReadOnlyProperty(String),

    /// Write to a property whose value is masked for the caller
    #[error("Property '{0}' is not accessible")]
    MaskedProperty(String),
}

/// Errors raised when a referenced entity does not exist.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    /// ACL with the given id does not exist
    #[error("ACL {0} not found")]
    Acl(AclId),

    /// Group with the given id does not exist
    #[error("Group {0} not found")]
    Group(GroupId),

    /// No assignment row for the pair
    #[error("No assignment of ACL {acl} to group {group}")]
    Assignment {
        /// The ACL
        acl: AclId,
        /// The group
        group: GroupId,
    },

    /// Content with the given id does not exist
    #[error("Content {0} not found")]
    Content(ContentId),

    /// Content type with the given id does not exist
    #[error("Type {0} not found")]
    Type(ContentTypeId),

    /// Workflow step with the given id does not exist
    #[error("Step {0} not found")]
    Step(StepId),

    /// User account with the given id does not exist
    #[error("User {0} not found")]
    User(UserId),

    /// Briefcase with the given id does not exist
    #[error("Briefcase {0} not found")]
    Briefcase(BriefcaseId),

    /// No governing-ACL provider is registered for the category
    #[error("No security provider registered for category {0}")]
    Provider(AclCategory),
}

/// Errors raised for malformed administrative input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{parameter}: {reason}")]
pub struct InvalidParameterError {
    /// Name of the offending parameter
    pub parameter: String,
    /// Why it was rejected
    pub reason: String,
}

impl InvalidParameterError {
    /// Create a new invalid parameter error.
    pub fn new(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised when a write conflicts with existing data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConflictError {
    /// An entry with the same unique key exists
    #[error("Entry already exists: {0}")]
    EntryExists(String),

    /// The same group was listed twice in an assignment list
    #[error("Group {0} is assigned more than once")]
    DuplicateGroup(GroupId),

    /// The ACL is still referenced
    #[error("ACL {acl} is still in use by {usage}")]
    AclInUse {
        /// The ACL
        acl: AclId,
        /// Description of the referencing object
        usage: String,
    },

    /// The category of an ACL cannot change
    #[error("Category of ACL {0} cannot be changed")]
    ImmutableCategory(AclId),
}

/// Result type used throughout Warden.
pub type Result<T> = std::result::Result<T, Error>;
