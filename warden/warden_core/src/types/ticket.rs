//! Caller identity.
//!
//! A [`UserTicket`] is the immutable snapshot of an authenticated caller:
//! who they are, which mandator they belong to, which groups and roles they
//! hold. Tickets are rebuilt, never mutated, when the underlying account
//! changes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{AccessError, Result};
use crate::id::{GroupId, MandatorId, UserId};
use crate::types::Role;

/// The authenticated caller's identity and memberships.
///
/// Tickets serialize for logs and audits but only
/// [`UserTicket::builder`] creates them, so the built-in groups and the
/// supervisor flags always match the roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserTicket {
    user_id: UserId,
    mandator_id: MandatorId,
    mandator_group: GroupId,
    groups: BTreeSet<GroupId>,
    roles: BTreeSet<Role>,
    global_supervisor: bool,
    mandator_supervisor: bool,
    created_at: DateTime<Utc>,
}

impl UserTicket {
    /// Start building a ticket.
    ///
    /// `mandator_group` is the auto-group every account of the mandator is a
    /// member of.
    pub fn builder(
        user_id: UserId,
        mandator_id: MandatorId,
        mandator_group: GroupId,
    ) -> UserTicketBuilder {
        UserTicketBuilder {
            user_id,
            mandator_id,
            mandator_group,
            groups: BTreeSet::new(),
            roles: BTreeSet::new(),
        }
    }

    /// The caller's account id.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// The caller's mandator.
    pub fn mandator_id(&self) -> MandatorId {
        self.mandator_id
    }

    /// The auto-group of the caller's mandator.
    pub fn mandator_group(&self) -> GroupId {
        self.mandator_group
    }

    /// All groups the caller is a member of, including the built-in ones.
    pub fn groups(&self) -> &BTreeSet<GroupId> {
        &self.groups
    }

    /// The caller's roles.
    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    /// When this ticket was built.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the caller bypasses every mandator and ACL check.
    pub fn is_global_supervisor(&self) -> bool {
        self.global_supervisor
    }

    /// Whether the caller bypasses ACL checks within their own mandator.
    pub fn is_mandator_supervisor(&self) -> bool {
        self.mandator_supervisor || self.global_supervisor
    }

    /// Check group membership.
    pub fn is_in_group(&self, group: GroupId) -> bool {
        self.groups.contains(&group)
    }

    /// Check role membership. A global supervisor holds every role.
    pub fn is_in_role(&self, role: Role) -> bool {
        self.global_supervisor || self.roles.contains(&role)
    }

    /// Whether this is the anonymous guest.
    pub fn is_guest(&self) -> bool {
        self.user_id == UserId::GUEST
    }

    /// A copy of this ticket with the global supervisor flag set.
    ///
    /// Used to run internal steps (such as restoring masked values before a
    /// save) under an elevated context.
    pub fn clone_as_global_supervisor(&self) -> Self {
        let mut clone = self.clone();
        clone.global_supervisor = true;
        clone
    }
}

impl fmt::Display for UserTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<String> = self.groups.iter().map(|g| g.to_string()).collect();
        let roles: Vec<String> = self.roles.iter().map(|r| r.id().to_string()).collect();
        write!(
            f,
            "UserTicket[id={}; mandator={}; groups={}; roles={}; globalSupervisor={}]",
            self.user_id,
            self.mandator_id,
            groups.join(","),
            roles.join(","),
            self.global_supervisor
        )
    }
}

/// Builder for [`UserTicket`].
#[derive(Debug, Clone)]
pub struct UserTicketBuilder {
    user_id: UserId,
    mandator_id: MandatorId,
    mandator_group: GroupId,
    groups: BTreeSet<GroupId>,
    roles: BTreeSet<Role>,
}

impl UserTicketBuilder {
    /// Add a group membership.
    pub fn group(mut self, group: GroupId) -> Self {
        self.groups.insert(group);
        self
    }

    /// Add several group memberships.
    pub fn groups<I>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = GroupId>,
    {
        self.groups.extend(groups);
        self
    }

    /// Add a role.
    pub fn role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    /// Add several roles.
    pub fn roles<I>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = Role>,
    {
        self.roles.extend(roles);
        self
    }

    /// Build the ticket.
    ///
    /// EVERYONE and the mandator auto-group are always added. The built-in
    /// supervisor account and the GlobalSupervisor role set the global
    /// supervisor flag; the MandatorSupervisor role sets the mandator
    /// supervisor flag.
    pub fn build(self) -> UserTicket {
        let mut groups = self.groups;
        groups.insert(GroupId::EVERYONE);
        groups.insert(self.mandator_group);
        // the owner pseudo group is never a real membership
        groups.remove(&GroupId::OWNER);

        let global_supervisor = self.user_id == UserId::GLOBAL_SUPERVISOR
            || self.roles.contains(&Role::GlobalSupervisor);
        let mandator_supervisor = self.roles.contains(&Role::MandatorSupervisor);

        UserTicket {
            user_id: self.user_id,
            mandator_id: self.mandator_id,
            mandator_group: self.mandator_group,
            groups,
            roles: self.roles,
            global_supervisor,
            mandator_supervisor,
            created_at: Utc::now(),
        }
    }
}

/// Fail unless the caller holds every given role.
///
/// Global supervisors pass unconditionally.
pub fn check_role(ticket: &UserTicket, roles: &[Role]) -> Result<()> {
    if ticket.is_global_supervisor() {
        return Ok(());
    }
    for role in roles {
        if !ticket.is_in_role(*role) {
            return Err(AccessError::NotInRole(*role).into());
        }
    }
    Ok(())
}

/// Fail unless the caller holds at least one of the given roles.
pub fn check_any_role(ticket: &UserTicket, roles: &[Role]) -> Result<()> {
    if ticket.is_global_supervisor() || roles.iter().any(|r| ticket.is_in_role(*r)) {
        return Ok(());
    }
    match roles.last() {
        Some(role) => Err(AccessError::NotInRole(*role).into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket() -> UserTicketBuilder {
        UserTicket::builder(
            UserId::from_raw(100),
            MandatorId::from_raw(10),
            GroupId::from_raw(50),
        )
    }

    #[test]
    fn test_builtin_groups_always_present() {
        let t = ticket().build();
        assert!(t.is_in_group(GroupId::EVERYONE));
        assert!(t.is_in_group(GroupId::from_raw(50)));
        assert_eq!(t.groups().len(), 2);
    }

    #[test]
    fn test_owner_group_is_not_a_membership() {
        let t = ticket().group(GroupId::OWNER).build();
        assert!(!t.is_in_group(GroupId::OWNER));
    }

    #[test]
    fn test_supervisor_flags() {
        let t = ticket().role(Role::MandatorSupervisor).build();
        assert!(t.is_mandator_supervisor());
        assert!(!t.is_global_supervisor());

        let t = ticket().role(Role::GlobalSupervisor).build();
        assert!(t.is_global_supervisor());
        assert!(t.is_mandator_supervisor());
        assert!(t.is_in_role(Role::ScriptExecution));

        let t = UserTicket::builder(UserId::GLOBAL_SUPERVISOR, MandatorId::GLOBAL, GroupId::from_raw(3))
            .build();
        assert!(t.is_global_supervisor());
    }

    #[test]
    fn test_clone_as_global_supervisor() {
        let t = ticket().build();
        let elevated = t.clone_as_global_supervisor();
        assert!(elevated.is_global_supervisor());
        assert_eq!(elevated.user_id(), t.user_id());
        assert!(!t.is_global_supervisor());
    }

    #[test]
    fn test_serialized_ticket_carries_derived_memberships() {
        let t = ticket().role(Role::GlobalSupervisor).build();
        let value = serde_json::to_value(&t).unwrap();
        assert_eq!(value["global_supervisor"], serde_json::json!(true));
        assert_eq!(value["mandator_supervisor"], serde_json::json!(true));
        assert_eq!(value["groups"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_check_role() {
        let t = ticket().role(Role::AclManagement).build();
        assert!(check_role(&t, &[Role::AclManagement]).is_ok());
        assert!(check_role(&t, &[Role::AclManagement, Role::AccountManagement]).is_err());
        assert!(check_any_role(&t, &[Role::MandatorSupervisor, Role::AclManagement]).is_ok());
        assert!(check_any_role(&t, &[Role::MandatorSupervisor]).is_err());
    }
}
