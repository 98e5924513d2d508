//! ACL administration.
//!
//! [`AclEngine`] is the validated CRUD layer over an [`AclStore`]: it
//! enforces the administrative roles, mandator ownership, internal ACL
//! protection and input validation, and it emits an [`Invalidation`] for
//! every write that can change effective permissions.

mod config;
pub mod validation;

pub use config::AclEngineConfig;

use std::collections::BTreeSet;
use std::sync::Arc;

use warden_core::error::{AccessError, ConflictError, NotFoundError, Result};
use warden_core::id::{AclId, GroupId};
use warden_core::log_event;
use warden_core::types::{check_any_role, AclCategory, PermissionSet, Role, UserTicket};
use warden_core::utils::LogLevel;

use crate::invalidation::{Invalidation, InvalidationSink, NoopSink};
use crate::model::{Acl, AclAssignment, AclUpdate, Group, NewAcl};
use crate::store::AclStore;

/// Something that may reference ACLs, such as a type registry or a
/// workflow.
pub trait AclUsage: Send + Sync {
    /// Describe an object referencing `acl`, if there is one.
    fn usage_of(&self, acl: AclId) -> Option<String>;
}

/// Roles allowed to administer ACLs.
const ADMIN_ROLES: [Role; 2] = [Role::MandatorSupervisor, Role::AclManagement];

/// Administrative engine for ACLs and assignments.
pub struct AclEngine<S> {
    /// The backing store.
    store: S,

    /// Limits and reserved ranges.
    config: AclEngineConfig,

    /// Receiver of invalidation events.
    sink: Arc<dyn InvalidationSink>,

    /// Objects that may keep an ACL alive.
    usages: Vec<Arc<dyn AclUsage>>,
}

impl<S> AclEngine<S>
where
    S: AclStore,
{
    /// Create a new engine without an invalidation sink.
    ///
    /// # Arguments
    ///
    /// * `store` - The ACL store.
    /// * `config` - Limits and reserved ranges.
    pub fn new(store: S, config: AclEngineConfig) -> Self {
        Self {
            store,
            config,
            sink: Arc::new(NoopSink),
            usages: Vec::new(),
        }
    }

    /// Send invalidations to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn InvalidationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Refuse to remove ACLs that `usage` still references.
    pub fn register_usage(&mut self, usage: Arc<dyn AclUsage>) {
        self.usages.push(usage);
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The engine configuration.
    pub fn config(&self) -> &AclEngineConfig {
        &self.config
    }

    /// Create a new ACL.
    ///
    /// # Arguments
    ///
    /// * `ticket` - The calling user.
    /// * `new_acl` - Name, label, mandator, color, description and category.
    ///
    /// # Returns
    ///
    /// * `Ok(AclId)` - The id of the new ACL.
    /// * `Err` - If the caller lacks the role, targets a foreign mandator,
    ///   passes invalid input or the name is taken.
    pub fn create(&self, ticket: &UserTicket, new_acl: NewAcl) -> Result<AclId> {
        check_any_role(ticket, &ADMIN_ROLES)?;
        if !ticket.is_global_supervisor() && new_acl.mandator != ticket.mandator_id() {
            return Err(AccessError::ForeignMandator {
                caller: ticket.mandator_id(),
                target: new_acl.mandator,
            }
            .into());
        }

        let new_acl = NewAcl {
            name: validation::check_name(&new_acl.name, &self.config)?,
            label: validation::check_label(&new_acl.label)?,
            color: validation::process_color(&new_acl.color)?,
            description: validation::check_description(&new_acl.description, &self.config)?,
            ..new_acl
        };

        let id = self.store.next_acl_id();
        let acl = new_acl.into_acl(id, ticket.user_id());
        let (name, mandator) = (acl.name.clone(), acl.mandator);
        self.store.insert_acl(acl)?;

        log_event!(LogLevel::Info, "ACL created",
            acl => id,
            name => name,
            mandator => mandator,
            user => ticket.user_id(),
        );
        Ok(id)
    }

    /// Update an ACL.
    ///
    /// Fields left `None` in `update` are unchanged. A given assignment
    /// list replaces all assignments of the ACL; rows without any
    /// permission are skipped and a group listed twice is a conflict.
    ///
    /// # Returns
    ///
    /// * `Ok(Acl)` - The updated ACL.
    /// * `Err` - If the ACL is unknown or foreign, the caller lacks the
    ///   role, or the input is invalid.
    pub fn update(&self, ticket: &UserTicket, id: AclId, update: AclUpdate) -> Result<Acl> {
        let mut acl = self.store.get_acl(id)?;

        // Every group may only be listed once
        if let Some(rows) = &update.assignments {
            let mut seen = BTreeSet::new();
            for row in rows {
                if !seen.insert(row.group) {
                    return Err(ConflictError::DuplicateGroup(row.group).into());
                }
            }
        }

        check_any_role(ticket, &ADMIN_ROLES)?;
        self.check_acl_mandator(ticket, &acl)?;

        if let Some(color) = &update.color {
            acl.color = validation::process_color(color)?;
        }
        if let Some(name) = &update.name {
            acl.name = validation::check_name(name, &self.config)?;
        }
        if let Some(label) = &update.label {
            acl.label = validation::check_label(label)?;
        }
        if let Some(description) = &update.description {
            acl.description = validation::check_description(description, &self.config)?;
        }

        let rows = match &update.assignments {
            Some(rows) => {
                let mut assignments = Vec::with_capacity(rows.len());
                for row in rows.iter().filter(|r| !r.permissions.is_empty()) {
                    self.accessible_group(ticket, row.group)?;
                    assignments.push(AclAssignment::new(
                        id,
                        row.group,
                        acl.category,
                        row.permissions,
                        ticket.user_id(),
                    ));
                }
                Some(assignments)
            }
            None => None,
        };

        acl.lifecycle.touch(ticket.user_id());
        self.store.update_acl(acl.clone())?;

        let mut affected: BTreeSet<GroupId> = BTreeSet::new();
        if let Some(rows) = rows {
            affected.extend(rows.iter().map(|r| r.group));
            let replaced = self.store.replace_assignments(id, rows)?;
            affected.extend(replaced.iter().map(|r| r.group));
        } else {
            affected.extend(self.store.assignments(Some(id), None)?.iter().map(|r| r.group));
        }

        log_event!(LogLevel::Info, "ACL updated",
            acl => id,
            user => ticket.user_id(),
        );
        self.sink.invalidate(&Invalidation::Acl {
            acl: id,
            groups: affected.into_iter().collect(),
        });
        Ok(acl)
    }

    /// Remove an ACL and all of its assignments.
    ///
    /// Internal ACLs can never be removed, not even by a global supervisor.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the ACL was removed.
    /// * `Err` - If the ACL is unknown, internal, foreign, still in use, or
    ///   the caller lacks the role.
    pub fn remove(&self, ticket: &UserTicket, id: AclId) -> Result<()> {
        let acl = self.store.get_acl(id)?;

        if acl.is_internal(self.config.max_internal_acl_id) {
            log_event!(LogLevel::Warning, "Refusing to remove internal ACL",
                acl => id,
                user => ticket.user_id(),
            );
            return Err(AccessError::InternalAcl(id).into());
        }

        check_any_role(ticket, &ADMIN_ROLES)?;
        self.check_acl_mandator(ticket, &acl)?;

        if let Some(usage) = self.usages.iter().find_map(|u| u.usage_of(id)) {
            return Err(ConflictError::AclInUse { acl: id, usage }.into());
        }

        let removed = self.store.remove_acl(id)?;

        log_event!(LogLevel::Info, "ACL removed",
            acl => id,
            assignments => removed.len(),
            user => ticket.user_id(),
        );
        let groups: BTreeSet<GroupId> = removed.iter().map(|r| r.group).collect();
        self.sink.invalidate(&Invalidation::Acl {
            acl: id,
            groups: groups.into_iter().collect(),
        });
        Ok(())
    }

    /// Load an ACL.
    ///
    /// Global ACLs are visible to everyone; ACLs of another mandator only
    /// to a global supervisor.
    pub fn load(&self, ticket: &UserTicket, id: AclId) -> Result<Acl> {
        let acl = self.store.get_acl(id)?;
        if !self.may_see(ticket, &acl) {
            return Err(AccessError::ForeignMandator {
                caller: ticket.mandator_id(),
                target: acl.mandator,
            }
            .into());
        }
        Ok(acl)
    }

    /// Load every ACL visible to the caller, optionally of one category.
    pub fn load_all(&self, ticket: &UserTicket, category: Option<AclCategory>) -> Result<Vec<Acl>> {
        Ok(self
            .store
            .list_acls(category)?
            .into_iter()
            .filter(|acl| self.may_see(ticket, acl))
            .collect())
    }

    /// Grant `permissions` on `acl` to `group`.
    ///
    /// Replaces an existing row of the pair. An empty permission set removes
    /// the row instead, and a missing row is then not an error.
    pub fn assign(
        &self,
        ticket: &UserTicket,
        acl: AclId,
        group: GroupId,
        permissions: PermissionSet,
    ) -> Result<()> {
        let target = self.check_assignment_access(ticket, acl, Some(group), true)?;

        if permissions.is_empty() {
            return match self.unassign(ticket, acl, group) {
                Err(warden_core::Error::NotFound(NotFoundError::Assignment { .. })) => Ok(()),
                other => other,
            };
        }

        let row = AclAssignment::new(acl, group, target.category, permissions, ticket.user_id());
        self.store.put_assignment(row)?;

        log_event!(LogLevel::Info, "ACL assigned",
            acl => acl,
            group => group,
            permissions => permissions,
            user => ticket.user_id(),
        );
        self.sink.invalidate(&Invalidation::Group(group));
        Ok(())
    }

    /// Remove the assignment of `acl` to `group`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If a row was removed.
    /// * `Err` - If there was no row, or the caller may not administer the
    ///   ACL or group.
    pub fn unassign(&self, ticket: &UserTicket, acl: AclId, group: GroupId) -> Result<()> {
        self.check_assignment_access(ticket, acl, Some(group), true)?;

        if self.store.remove_assignment(acl, group)?.is_none() {
            return Err(NotFoundError::Assignment { acl, group }.into());
        }

        log_event!(LogLevel::Info, "ACL unassigned",
            acl => acl,
            group => group,
            user => ticket.user_id(),
        );
        self.sink.invalidate(&Invalidation::Group(group));
        Ok(())
    }

    /// Load assignments, filtered by ACL and/or group.
    ///
    /// No role is required, but both the ACL and the group must be
    /// accessible to the caller.
    pub fn load_assignments(
        &self,
        ticket: &UserTicket,
        acl: Option<AclId>,
        group: Option<GroupId>,
    ) -> Result<Vec<AclAssignment>> {
        if let Some(acl) = acl {
            self.check_assignment_access(ticket, acl, group, false)?;
        } else if let Some(group) = group {
            self.accessible_group(ticket, group)?;
        }
        self.store.assignments(acl, group)
    }

    fn may_see(&self, ticket: &UserTicket, acl: &Acl) -> bool {
        ticket.is_global_supervisor() || acl.is_global() || acl.mandator == ticket.mandator_id()
    }

    fn check_acl_mandator(&self, ticket: &UserTicket, acl: &Acl) -> Result<()> {
        if !ticket.is_global_supervisor() && acl.mandator != ticket.mandator_id() {
            return Err(AccessError::ForeignMandator {
                caller: ticket.mandator_id(),
                target: acl.mandator,
            }
            .into());
        }
        Ok(())
    }

    fn accessible_group(&self, ticket: &UserTicket, group: GroupId) -> Result<Group> {
        let group = self.store.get_group(group)?;
        if !group.may_access(ticket) {
            return Err(AccessError::ForeignMandator {
                caller: ticket.mandator_id(),
                target: group.mandator,
            }
            .into());
        }
        Ok(group)
    }

    fn check_assignment_access(
        &self,
        ticket: &UserTicket,
        acl: AclId,
        group: Option<GroupId>,
        check_role: bool,
    ) -> Result<Acl> {
        if check_role {
            check_any_role(ticket, &ADMIN_ROLES)?;
        }
        if let Some(group) = group {
            self.accessible_group(ticket, group)?;
        }
        let acl = self.store.get_acl(acl)?;

        // Writes need ownership; global ACLs are shared by every mandator
        if check_role {
            self.check_acl_mandator(ticket, &acl)?;
            return Ok(acl);
        }
        if !self.may_see(ticket, &acl) {
            return Err(AccessError::ForeignMandator {
                caller: ticket.mandator_id(),
                target: acl.mandator,
            }
            .into());
        }
        Ok(acl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invalidation::testing::RecordingSink;
    use crate::model::AssignmentRow;
    use crate::store::InMemoryAclStore;
    use warden_core::id::{MandatorId, UserId};
    use warden_core::Error;

    const MANDATOR: MandatorId = MandatorId::from_raw(10);
    const EDITORS: GroupId = GroupId::from_raw(70);

    fn admin() -> UserTicket {
        UserTicket::builder(UserId::from_raw(100), MANDATOR, GroupId::from_raw(50))
            .role(Role::AclManagement)
            .build()
    }

    fn engine() -> (AclEngine<InMemoryAclStore>, Arc<RecordingSink>) {
        let store = InMemoryAclStore::new();
        store.insert_group(Group::new(EDITORS, MANDATOR, "Editors")).unwrap();
        store
            .insert_group(Group::new(GroupId::from_raw(90), MandatorId::from_raw(11), "Foreign"))
            .unwrap();
        let sink = Arc::new(RecordingSink::default());
        let engine = AclEngine::new(store, AclEngineConfig::default()).with_sink(sink.clone());
        (engine, sink)
    }

    fn press(engine: &AclEngine<InMemoryAclStore>) -> AclId {
        engine
            .create(
                &admin(),
                NewAcl::new("Press", "Press releases", MANDATOR, AclCategory::Instance)
                    .with_color("#aabbcc"),
            )
            .unwrap()
    }

    #[test]
    fn test_create_and_load() {
        let (engine, _) = engine();
        let id = press(&engine);
        assert!(id.raw() >= 1000);

        let acl = engine.load(&admin(), id).unwrap();
        assert_eq!(acl.name, "Press");
        assert_eq!(acl.color, "#AABBCC");
        assert_eq!(acl.lifecycle.created_by, UserId::from_raw(100));
    }

    #[test]
    fn test_create_requires_role() {
        let (engine, _) = engine();
        let plain = UserTicket::builder(UserId::from_raw(101), MANDATOR, GroupId::from_raw(50)).build();
        let result = engine.create(
            &plain,
            NewAcl::new("Press", "Press", MANDATOR, AclCategory::Instance),
        );
        assert!(matches!(result, Err(Error::Access(AccessError::NotInRole(_)))));
    }

    #[test]
    fn test_create_for_foreign_mandator() {
        let (engine, _) = engine();
        let result = engine.create(
            &admin(),
            NewAcl::new("Press", "Press", MandatorId::from_raw(11), AclCategory::Instance),
        );
        assert!(matches!(result, Err(Error::Access(AccessError::ForeignMandator { .. }))));
    }

    #[test]
    fn test_create_validates_input() {
        let (engine, _) = engine();
        let result = engine.create(&admin(), NewAcl::new("", "Press", MANDATOR, AclCategory::Instance));
        assert!(matches!(result, Err(Error::InvalidParameter(_))));

        let result = engine.create(
            &admin(),
            NewAcl::new("Press", "Press", MANDATOR, AclCategory::Instance).with_color("#12"),
        );
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_create_duplicate_name() {
        let (engine, _) = engine();
        press(&engine);
        let result = engine.create(
            &admin(),
            NewAcl::new("Press", "Again", MANDATOR, AclCategory::Instance),
        );
        assert!(matches!(result, Err(Error::Conflict(ConflictError::EntryExists(_)))));
    }

    #[test]
    fn test_assign_all_false_removes_row() {
        let (engine, sink) = engine();
        let id = press(&engine);

        engine.assign(&admin(), id, EDITORS, PermissionSet::READ).unwrap();
        assert_eq!(engine.load_assignments(&admin(), Some(id), Some(EDITORS)).unwrap().len(), 1);

        engine.assign(&admin(), id, EDITORS, PermissionSet::empty()).unwrap();
        assert!(engine.load_assignments(&admin(), Some(id), Some(EDITORS)).unwrap().is_empty());

        // Missing row is ignored for an empty grant
        engine.assign(&admin(), id, EDITORS, PermissionSet::empty()).unwrap();

        let events = sink.events.lock();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| *e == Invalidation::Group(EDITORS)));
    }

    #[test]
    fn test_unassign_missing_row() {
        let (engine, _) = engine();
        let id = press(&engine);
        let result = engine.unassign(&admin(), id, EDITORS);
        assert!(matches!(
            result,
            Err(Error::NotFound(NotFoundError::Assignment { .. }))
        ));
    }

    #[test]
    fn test_assign_foreign_group() {
        let (engine, _) = engine();
        let id = press(&engine);
        let result = engine.assign(&admin(), id, GroupId::from_raw(90), PermissionSet::READ);
        assert!(matches!(result, Err(Error::Access(AccessError::ForeignMandator { .. }))));
    }

    #[test]
    fn test_update_replaces_assignments() {
        let (engine, sink) = engine();
        let id = press(&engine);
        engine.assign(&admin(), id, EDITORS, PermissionSet::READ).unwrap();

        let update = AclUpdate::new().label("Press (public)").assignments(vec![
            AssignmentRow::new(GroupId::EVERYONE, PermissionSet::READ),
            AssignmentRow::new(EDITORS, PermissionSet::empty()),
        ]);
        let acl = engine.update(&admin(), id, update).unwrap();
        assert_eq!(acl.label, "Press (public)");

        let rows = engine.load_assignments(&admin(), Some(id), None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].group, GroupId::EVERYONE);

        let events = sink.events.lock();
        assert_eq!(
            events.last(),
            Some(&Invalidation::Acl {
                acl: id,
                groups: vec![GroupId::EVERYONE, EDITORS],
            })
        );
    }

    #[test]
    fn test_update_duplicate_group() {
        let (engine, _) = engine();
        let id = press(&engine);
        let update = AclUpdate::new().assignments(vec![
            AssignmentRow::new(EDITORS, PermissionSet::READ),
            AssignmentRow::new(EDITORS, PermissionSet::EDIT),
        ]);
        assert!(matches!(
            engine.update(&admin(), id, update),
            Err(Error::Conflict(ConflictError::DuplicateGroup(_)))
        ));
    }

    #[test]
    fn test_remove_internal_acl_always_fails() {
        let (engine, _) = engine();
        let supervisor = admin().clone_as_global_supervisor();
        for raw in 1..=8 {
            let result = engine.remove(&supervisor, AclId::from_raw(raw));
            if raw == 7 {
                // reserved id without an ACL
                assert!(matches!(result, Err(Error::NotFound(_))));
            } else {
                assert!(matches!(result, Err(Error::Access(AccessError::InternalAcl(_)))));
            }
        }
    }

    #[test]
    fn test_remove_acl_in_use() {
        struct Pinned(AclId);
        impl AclUsage for Pinned {
            fn usage_of(&self, acl: AclId) -> Option<String> {
                (acl == self.0).then(|| "type Article".to_string())
            }
        }

        let (mut engine, _) = engine();
        let id = press(&engine);
        engine.register_usage(Arc::new(Pinned(id)));
        assert!(matches!(
            engine.remove(&admin(), id),
            Err(Error::Conflict(ConflictError::AclInUse { .. }))
        ));
    }

    #[test]
    fn test_remove_emits_affected_groups() {
        let (engine, sink) = engine();
        let id = press(&engine);
        engine.assign(&admin(), id, EDITORS, PermissionSet::READ).unwrap();
        engine.remove(&admin(), id).unwrap();

        assert!(engine.load(&admin(), id).is_err());
        assert_eq!(
            sink.events.lock().last(),
            Some(&Invalidation::Acl {
                acl: id,
                groups: vec![EDITORS],
            })
        );
    }

    #[test]
    fn test_load_all_hides_foreign_acls() {
        let (engine, _) = engine();
        press(&engine);
        let foreign_admin =
            UserTicket::builder(UserId::from_raw(200), MandatorId::from_raw(11), GroupId::from_raw(51))
                .role(Role::MandatorSupervisor)
                .build();
        engine
            .create(
                &foreign_admin,
                NewAcl::new("Foreign", "Foreign", MandatorId::from_raw(11), AclCategory::Instance),
            )
            .unwrap();

        let visible = engine.load_all(&admin(), Some(AclCategory::Instance)).unwrap();
        assert!(visible.iter().any(|a| a.name == "Press"));
        assert!(visible.iter().any(|a| a.is_global()));
        assert!(!visible.iter().any(|a| a.name == "Foreign"));
    }
}
