//! In-memory ACL store.
//!
//! Rows live in `DashMap`s; a `parking_lot` gate serializes writes against
//! snapshots so a snapshot never observes half of a multi-row write.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use warden_core::error::{ConflictError, InvalidParameterError, NotFoundError, Result};
use warden_core::id::{AclId, GroupId, MandatorId, UserId};
use warden_core::types::AclCategory;

use super::{AclSnapshot, AclStore};
use crate::model::{Acl, AclAssignment, Group, NewAcl};

/// Id of the built-in contact data ACL.
pub const CONTACT_DATA_ACL: AclId = AclId::from_raw(8);

/// An in-memory ACL store.
#[derive(Clone)]
pub struct InMemoryAclStore {
    /// The ACLs, indexed by ID.
    acls: Arc<DashMap<AclId, Acl>>,

    /// The groups, indexed by ID.
    groups: Arc<DashMap<GroupId, Group>>,

    /// Assignment rows, indexed by (ACL, group).
    assignments: Arc<DashMap<(AclId, GroupId), AclAssignment>>,

    /// Next id handed out by `next_acl_id`.
    next_id: Arc<AtomicU64>,

    /// Held for writing by every mutation and for reading by snapshots.
    gate: Arc<RwLock<()>>,
}

impl InMemoryAclStore {
    /// Create an empty store whose custom ACL ids start at `first_custom_id`.
    pub fn empty(first_custom_id: u64) -> Self {
        Self {
            acls: Arc::new(DashMap::new()),
            groups: Arc::new(DashMap::new()),
            assignments: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(first_custom_id)),
            gate: Arc::new(RwLock::new(())),
        }
    }

    /// Create a store seeded with the system groups and built-in ACLs.
    ///
    /// Every category gets its default ACL (ids 1 to 6) and id 8 holds the
    /// contact data ACL. All of them belong to the global mandator.
    pub fn with_builtins(first_custom_id: u64) -> Self {
        let store = Self::empty(first_custom_id);
        for group in [Group::everyone(), Group::owner()] {
            store.groups.insert(group.id, group);
        }
        for category in AclCategory::ALL {
            let acl = NewAcl::new(
                format!("Default {} ACL", category),
                format!("Default {}", category),
                MandatorId::GLOBAL,
                category,
            )
            .into_acl(category.default_acl(), UserId::GLOBAL_SUPERVISOR);
            store.acls.insert(acl.id, acl);
        }
        let contact = NewAcl::new("Contact Data", "Contact Data", MandatorId::GLOBAL, AclCategory::Instance)
            .into_acl(CONTACT_DATA_ACL, UserId::GLOBAL_SUPERVISOR);
        store.acls.insert(contact.id, contact);
        store
    }

    /// Create a seeded store with custom ids starting at 1000.
    pub fn new() -> Self {
        Self::with_builtins(1000)
    }

    fn name_taken(&self, mandator: MandatorId, name: &str, except: Option<AclId>) -> bool {
        self.acls.iter().any(|entry| {
            let acl = entry.value();
            Some(acl.id) != except && acl.mandator == mandator && acl.name.eq_ignore_ascii_case(name)
        })
    }

    fn check_row(&self, row: &AclAssignment) -> Result<()> {
        if !self.acls.contains_key(&row.acl) {
            return Err(NotFoundError::Acl(row.acl).into());
        }
        if !self.groups.contains_key(&row.group) {
            return Err(NotFoundError::Group(row.group).into());
        }
        if row.permissions.is_empty() {
            return Err(InvalidParameterError::new(
                "permissions",
                format!("assignment of ACL {} to group {} grants nothing", row.acl, row.group),
            )
            .into());
        }
        Ok(())
    }
}

impl Default for InMemoryAclStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AclStore for InMemoryAclStore {
    fn next_acl_id(&self) -> AclId {
        AclId::from_raw(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn insert_acl(&self, acl: Acl) -> Result<()> {
        let _gate = self.gate.write();

        // Check if the id or the name is taken
        if self.acls.contains_key(&acl.id) {
            return Err(ConflictError::EntryExists(format!("ACL {}", acl.id)).into());
        }
        if self.name_taken(acl.mandator, &acl.name, None) {
            return Err(ConflictError::EntryExists(format!("ACL named '{}'", acl.name)).into());
        }

        self.acls.insert(acl.id, acl);
        Ok(())
    }

    fn get_acl(&self, id: AclId) -> Result<Acl> {
        let acl = self
            .acls
            .get(&id)
            .ok_or(NotFoundError::Acl(id))?
            .clone();
        Ok(acl)
    }

    fn update_acl(&self, acl: Acl) -> Result<()> {
        let _gate = self.gate.write();

        let current = self.get_acl(acl.id)?;
        if current.category != acl.category {
            return Err(ConflictError::ImmutableCategory(acl.id).into());
        }
        if self.name_taken(acl.mandator, &acl.name, Some(acl.id)) {
            return Err(ConflictError::EntryExists(format!("ACL named '{}'", acl.name)).into());
        }

        self.acls.insert(acl.id, acl);
        Ok(())
    }

    fn remove_acl(&self, id: AclId) -> Result<Vec<AclAssignment>> {
        let _gate = self.gate.write();

        if self.acls.remove(&id).is_none() {
            return Err(NotFoundError::Acl(id).into());
        }

        // Drop all assignments of the ACL
        let keys: Vec<(AclId, GroupId)> = self
            .assignments
            .iter()
            .filter(|e| e.key().0 == id)
            .map(|e| *e.key())
            .collect();
        let removed = keys
            .into_iter()
            .filter_map(|key| self.assignments.remove(&key).map(|(_, row)| row))
            .collect();

        Ok(removed)
    }

    fn list_acls(&self, category: Option<AclCategory>) -> Result<Vec<Acl>> {
        let mut acls: Vec<Acl> = self
            .acls
            .iter()
            .map(|a| a.value().clone())
            .filter(|a| category.map_or(true, |c| a.category == c))
            .collect();
        acls.sort_by_key(|a| a.id);
        Ok(acls)
    }

    fn insert_group(&self, group: Group) -> Result<()> {
        let _gate = self.gate.write();

        if self.groups.contains_key(&group.id) {
            return Err(ConflictError::EntryExists(format!("group {}", group.id)).into());
        }
        self.groups.insert(group.id, group);
        Ok(())
    }

    fn get_group(&self, id: GroupId) -> Result<Group> {
        let group = self
            .groups
            .get(&id)
            .ok_or(NotFoundError::Group(id))?
            .clone();
        Ok(group)
    }

    fn put_assignment(&self, assignment: AclAssignment) -> Result<Option<AclAssignment>> {
        let _gate = self.gate.write();

        self.check_row(&assignment)?;
        Ok(self
            .assignments
            .insert((assignment.acl, assignment.group), assignment))
    }

    fn remove_assignment(&self, acl: AclId, group: GroupId) -> Result<Option<AclAssignment>> {
        let _gate = self.gate.write();

        Ok(self.assignments.remove(&(acl, group)).map(|(_, row)| row))
    }

    fn replace_assignments(
        &self,
        acl: AclId,
        assignments: Vec<AclAssignment>,
    ) -> Result<Vec<AclAssignment>> {
        let _gate = self.gate.write();

        // Validate everything before touching the table
        if !self.acls.contains_key(&acl) {
            return Err(NotFoundError::Acl(acl).into());
        }
        let mut seen = HashSet::with_capacity(assignments.len());
        for row in &assignments {
            if row.acl != acl {
                return Err(InvalidParameterError::new(
                    "assignments",
                    format!("row for ACL {} in assignment list of ACL {}", row.acl, acl),
                )
                .into());
            }
            if !seen.insert(row.group) {
                return Err(ConflictError::DuplicateGroup(row.group).into());
            }
            self.check_row(row)?;
        }

        let keys: Vec<(AclId, GroupId)> = self
            .assignments
            .iter()
            .filter(|e| e.key().0 == acl)
            .map(|e| *e.key())
            .collect();
        let replaced = keys
            .into_iter()
            .filter_map(|key| self.assignments.remove(&key).map(|(_, row)| row))
            .collect();

        for row in assignments {
            self.assignments.insert((row.acl, row.group), row);
        }

        Ok(replaced)
    }

    fn assignments(
        &self,
        acl: Option<AclId>,
        group: Option<GroupId>,
    ) -> Result<Vec<AclAssignment>> {
        let mut rows: Vec<AclAssignment> = self
            .assignments
            .iter()
            .filter(|e| {
                let (a, g) = *e.key();
                acl.map_or(true, |x| x == a) && group.map_or(true, |x| x == g)
            })
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by_key(|r| (r.acl, r.group));
        Ok(rows)
    }

    fn snapshot(&self) -> AclSnapshot {
        let _gate = self.gate.read();

        let snapshot = self.acls.iter().fold(AclSnapshot::new(), |s, e| {
            let acl = e.value();
            s.with_acl(acl.id, acl.mandator, acl.category)
        });
        self.assignments.iter().fold(snapshot, |s, e| {
            let row = e.value();
            s.with_grant(row.acl, row.group, row.permissions)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AssignmentLookup;
    use warden_core::types::PermissionSet;

    fn store_with_group() -> InMemoryAclStore {
        let store = InMemoryAclStore::new();
        store
            .insert_group(Group::new(GroupId::from_raw(7), MandatorId::from_raw(1), "Editors"))
            .unwrap();
        store
    }

    fn custom_acl(store: &InMemoryAclStore, name: &str) -> Acl {
        NewAcl::new(name, name, MandatorId::from_raw(1), AclCategory::Instance)
            .into_acl(store.next_acl_id(), UserId::from_raw(100))
    }

    fn row(acl: AclId, group: GroupId, permissions: PermissionSet) -> AclAssignment {
        AclAssignment::new(acl, group, AclCategory::Instance, permissions, UserId::from_raw(100))
    }

    #[test]
    fn test_builtins_seeded() {
        let store = InMemoryAclStore::new();
        let acls = store.list_acls(None).unwrap();
        let ids: Vec<u64> = acls.iter().map(|a| a.id.raw()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 8]);
        assert!(acls.iter().all(|a| a.is_global()));
        assert!(store.get_group(GroupId::EVERYONE).is_ok());
        assert!(store.get_group(GroupId::OWNER).is_ok());
    }

    #[test]
    fn test_custom_ids_start_after_reserved_range() {
        let store = InMemoryAclStore::new();
        assert_eq!(store.next_acl_id().raw(), 1000);
        assert_eq!(store.next_acl_id().raw(), 1001);
    }

    #[test]
    fn test_insert_duplicate_name() {
        let store = store_with_group();
        store.insert_acl(custom_acl(&store, "Press")).unwrap();

        // Same name, same mandator
        let result = store.insert_acl(custom_acl(&store, "press"));
        assert!(matches!(
            result,
            Err(warden_core::Error::Conflict(ConflictError::EntryExists(_)))
        ));

        // Same name, other mandator
        let mut other = custom_acl(&store, "Press");
        other.mandator = MandatorId::from_raw(2);
        assert!(store.insert_acl(other).is_ok());
    }

    #[test]
    fn test_update_rejects_category_change() {
        let store = store_with_group();
        let acl = custom_acl(&store, "Press");
        store.insert_acl(acl.clone()).unwrap();

        let mut changed = acl;
        changed.category = AclCategory::Workflow;
        assert!(matches!(
            store.update_acl(changed),
            Err(warden_core::Error::Conflict(ConflictError::ImmutableCategory(_)))
        ));
    }

    #[test]
    fn test_put_assignment_replaces_row() {
        let store = store_with_group();
        let acl = custom_acl(&store, "Press");
        let id = acl.id;
        store.insert_acl(acl).unwrap();

        let group = GroupId::from_raw(7);
        assert!(store.put_assignment(row(id, group, PermissionSet::READ)).unwrap().is_none());
        let previous = store
            .put_assignment(row(id, group, PermissionSet::READ | PermissionSet::EDIT))
            .unwrap();
        assert_eq!(previous.unwrap().permissions, PermissionSet::READ);

        let rows = store.assignments(Some(id), Some(group)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].permissions, PermissionSet::READ | PermissionSet::EDIT);
    }

    #[test]
    fn test_put_assignment_rejects_empty_and_unknown() {
        let store = store_with_group();
        let acl = custom_acl(&store, "Press");
        let id = acl.id;
        store.insert_acl(acl).unwrap();

        assert!(store
            .put_assignment(row(id, GroupId::from_raw(7), PermissionSet::empty()))
            .is_err());
        assert!(store
            .put_assignment(row(id, GroupId::from_raw(99), PermissionSet::READ))
            .is_err());
        assert!(store
            .put_assignment(row(AclId::from_raw(4242), GroupId::from_raw(7), PermissionSet::READ))
            .is_err());
    }

    #[test]
    fn test_replace_assignments_is_atomic() {
        let store = store_with_group();
        let acl = custom_acl(&store, "Press");
        let id = acl.id;
        store.insert_acl(acl).unwrap();
        store
            .put_assignment(row(id, GroupId::from_raw(7), PermissionSet::READ))
            .unwrap();

        // Duplicate group: nothing changes
        let result = store.replace_assignments(
            id,
            vec![
                row(id, GroupId::EVERYONE, PermissionSet::READ),
                row(id, GroupId::EVERYONE, PermissionSet::EDIT),
            ],
        );
        assert!(matches!(
            result,
            Err(warden_core::Error::Conflict(ConflictError::DuplicateGroup(_)))
        ));
        assert_eq!(store.assignments(Some(id), None).unwrap().len(), 1);

        // Valid list replaces everything
        let replaced = store
            .replace_assignments(id, vec![row(id, GroupId::EVERYONE, PermissionSet::READ)])
            .unwrap();
        assert_eq!(replaced.len(), 1);
        let rows = store.assignments(Some(id), None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].group, GroupId::EVERYONE);
    }

    #[test]
    fn test_remove_acl_drops_assignments() {
        let store = store_with_group();
        let acl = custom_acl(&store, "Press");
        let id = acl.id;
        store.insert_acl(acl).unwrap();
        store
            .put_assignment(row(id, GroupId::from_raw(7), PermissionSet::READ))
            .unwrap();

        let removed = store.remove_acl(id).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(store.get_acl(id).is_err());
        assert!(store.assignments(Some(id), None).unwrap().is_empty());
        assert!(store.remove_acl(id).is_err());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = store_with_group();
        let acl = custom_acl(&store, "Press");
        let id = acl.id;
        store.insert_acl(acl).unwrap();
        store
            .put_assignment(row(id, GroupId::from_raw(7), PermissionSet::READ))
            .unwrap();

        let snapshot = store.snapshot();
        store.remove_assignment(id, GroupId::from_raw(7)).unwrap();

        // The snapshot still sees the state it was taken from
        assert_eq!(snapshot.lookup(id, GroupId::from_raw(7)), Some(PermissionSet::READ));
        assert_eq!(snapshot.acl_mandator(id), Some(MandatorId::from_raw(1)));
        assert_eq!(store.snapshot().lookup(id, GroupId::from_raw(7)), None);
    }
}
