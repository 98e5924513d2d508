//! # Warden Core
//!
//! `warden_core` provides the building blocks of the Warden access-control
//! engine: identifiers, permission primitives, the caller's ticket and the
//! error hierarchy shared by every other Warden crate.
//!
//! ## Model
//!
//! Access to a secured object is decided by combining several dimensions:
//!
//! 1. **Supervisor roles**: a global supervisor bypasses every check; a
//!    mandator supervisor bypasses ACL checks inside its own mandator.
//! 2. **Mandator isolation**: objects governed by an ACL of a foreign
//!    mandator are never accessible to a regular ticket.
//! 3. **Ownership**: the creator of an existing object keeps read, edit,
//!    delete and export rights on it.
//! 4. **Group assignments**: the union of the permission bits every group
//!    of the ticket holds on every ACL governing the object.
//! 5. **Type toggles**: a content type decides which of the instance,
//!    property, step and type dimensions are enforced at all.
//!
//! ```text
//! allow(ticket, p, object) := supervisor ∨ (same_mandator ∧ (owner(p) ∨ ⋃ grants(p)))
//! ```
//!
//! ## Crate Structure
//!
//! - **error**: Error types for all Warden components
//! - **id**: Strongly-typed identifier types
//! - **types**: Permissions, categories, roles and tickets
//! - **utils**: Logging levels
//! - **macros**: Logging and access-check macros

pub mod error;
pub mod id;
pub mod macros;
pub mod types;
pub mod utils;

pub use error::{Error, Result};
pub use id::{
    AclId, BriefcaseId, ContentId, ContentTypeId, GroupId, MandatorId, StepId, UserId,
};
pub use types::{AclCategory, Permission, PermissionSet, Role, TypePermissions, UserTicket};
pub use utils::LogLevel;
