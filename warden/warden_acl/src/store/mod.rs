//! ACL storage.
//!
//! The store is the persistence collaborator of the ACL engine: it accepts
//! and returns ACL, group and assignment records and enforces only the
//! structural invariants (unique ids, unique names per mandator, one row
//! per ACL and group). Authorization and input validation belong to the
//! engine.

mod in_memory;
mod snapshot;

pub use in_memory::InMemoryAclStore;
pub use snapshot::{AclHeader, AclSnapshot, AssignmentLookup};

use crate::model::{Acl, AclAssignment, Group};
use warden_core::error::Result;
use warden_core::id::{AclId, GroupId};
use warden_core::types::AclCategory;

/// Trait for ACL storage.
pub trait AclStore: Send + Sync {
    /// Reserve the next free ACL id.
    fn next_acl_id(&self) -> AclId;

    /// Add an ACL to the store.
    ///
    /// # Arguments
    ///
    /// * `acl` - The ACL to add.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the ACL was added.
    /// * `Err` - If the id or the name within the mandator is already taken.
    fn insert_acl(&self, acl: Acl) -> Result<()>;

    /// Get an ACL.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of the ACL.
    ///
    /// # Returns
    ///
    /// * `Ok(Acl)` - The ACL.
    /// * `Err` - If no ACL with this id exists.
    fn get_acl(&self, id: AclId) -> Result<Acl>;

    /// Replace a stored ACL.
    ///
    /// # Arguments
    ///
    /// * `acl` - The updated ACL.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the ACL was updated.
    /// * `Err` - If the ACL does not exist, the new name is taken or the
    ///   category would change.
    fn update_acl(&self, acl: Acl) -> Result<()>;

    /// Remove an ACL together with all of its assignments.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<AclAssignment>)` - The removed assignment rows.
    /// * `Err` - If the ACL does not exist.
    fn remove_acl(&self, id: AclId) -> Result<Vec<AclAssignment>>;

    /// List ACLs, optionally restricted to one category.
    fn list_acls(&self, category: Option<AclCategory>) -> Result<Vec<Acl>>;

    /// Add a group to the store.
    fn insert_group(&self, group: Group) -> Result<()>;

    /// Get a group.
    fn get_group(&self, id: GroupId) -> Result<Group>;

    /// Insert or replace the assignment row of its (ACL, group) pair.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(previous))` - If a row was replaced.
    /// * `Ok(None)` - If the row is new.
    /// * `Err` - If the ACL or group does not exist, or the row is empty.
    fn put_assignment(&self, assignment: AclAssignment) -> Result<Option<AclAssignment>>;

    /// Remove the assignment row of an (ACL, group) pair.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(row))` - The removed row.
    /// * `Ok(None)` - If there was no row.
    fn remove_assignment(&self, acl: AclId, group: GroupId) -> Result<Option<AclAssignment>>;

    /// Atomically replace every assignment of an ACL.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<AclAssignment>)` - The rows that were replaced.
    /// * `Err` - If a row is empty, references another ACL or an unknown
    ///   group, or a group appears twice. Nothing is changed on error.
    fn replace_assignments(
        &self,
        acl: AclId,
        assignments: Vec<AclAssignment>,
    ) -> Result<Vec<AclAssignment>>;

    /// List assignments, filtered by ACL and/or group.
    fn assignments(&self, acl: Option<AclId>, group: Option<GroupId>)
        -> Result<Vec<AclAssignment>>;

    /// A consistent, immutable view of ACL headers and assignment bits.
    fn snapshot(&self) -> AclSnapshot;
}
