//! Core data types for Warden.
//!
//! Permission primitives, ACL categories, roles and the caller's ticket.

pub mod category;
pub mod permission;
pub mod role;
pub mod ticket;

pub use category::{AclCategory, TypePermissions};
pub use permission::{Permission, PermissionSet};
pub use role::Role;
pub use ticket::{check_any_role, check_role, UserTicket, UserTicketBuilder};
