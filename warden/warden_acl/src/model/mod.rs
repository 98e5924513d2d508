//! ACL data model.

pub mod acl;
pub mod assignment;
pub mod group;
pub mod lifecycle;

pub use acl::{Acl, AclUpdate, AssignmentRow, NewAcl};
pub use assignment::AclAssignment;
pub use group::Group;
pub use lifecycle::LifecycleInfo;
