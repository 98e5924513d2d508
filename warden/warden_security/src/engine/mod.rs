//! Permission evaluation.
//!
//! The evaluator combines a caller's ticket, a requested permission and a
//! [`SecurityInfo`] into an allow/deny [`Decision`]. Rules are tried in
//! order and the first one that matches decides:
//!
//! 1. a global supervisor is always allowed;
//! 2. every ACL the object references must belong to the global mandator
//!    or the caller's own, otherwise access is denied;
//! 3. a type that enforces no dimension allows everything;
//! 4. a mandator supervisor is allowed inside its own mandator;
//! 5. the owner of an existing object holds the configured owner
//!    permissions;
//! 6. every enforced dimension (type ACL, instance ACLs, step ACL and, for
//!    delete, property ACLs) must grant the permission to one of the
//!    caller's groups.
//!
//! The evaluator never mutates state and performs no I/O.

mod config;

pub use config::{EvaluationConfig, PropertyAclFallback, StepAclScope};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

use warden_acl::AssignmentLookup;
use warden_core::error::{AccessError, ObjectRef, Result};
use warden_core::ensure_access;
use warden_core::id::{AclId, GroupId, UserId};
use warden_core::types::{Permission, PermissionSet, UserTicket};

use crate::info::{SecurityInfo, TypeSecurity};

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// The caller is a global supervisor.
    GlobalSupervisor,
    /// A referenced ACL does not exist.
    UnknownAcl(AclId),
    /// A referenced ACL belongs to a foreign mandator.
    ForeignMandator(AclId),
    /// The object's type enforces no permission dimension.
    PermissionsDisabled,
    /// The caller supervises the object's mandator.
    MandatorSupervisor,
    /// The caller owns the object.
    Owner,
    /// Every enforced dimension granted the permission.
    Granted,
    /// At least one enforced dimension did not grant the permission.
    NotGranted,
    /// A property without ACL was decided by the configured fallback.
    PropertyFallback,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GlobalSupervisor => write!(f, "global supervisor"),
            Self::UnknownAcl(acl) => write!(f, "unknown ACL {}", acl),
            Self::ForeignMandator(acl) => write!(f, "ACL {} of foreign mandator", acl),
            Self::PermissionsDisabled => write!(f, "permissions disabled"),
            Self::MandatorSupervisor => write!(f, "mandator supervisor"),
            Self::Owner => write!(f, "owner"),
            Self::Granted => write!(f, "granted"),
            Self::NotGranted => write!(f, "not granted"),
            Self::PropertyFallback => write!(f, "property fallback"),
        }
    }
}

/// The outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether access is allowed.
    pub allowed: bool,

    /// The rule that decided.
    pub reason: DecisionReason,

    /// ACLs that did not grant the permission, deduplicated and sorted.
    pub lacking: Vec<AclId>,
}

impl Decision {
    fn allow(reason: DecisionReason) -> Self {
        Self {
            allowed: true,
            reason,
            lacking: Vec::new(),
        }
    }

    fn deny(reason: DecisionReason, lacking: impl IntoIterator<Item = AclId>) -> Self {
        Self {
            allowed: false,
            reason,
            lacking: lacking.into_iter().collect(),
        }
    }

    /// Turn a denial into [`AccessError::NoAccess`].
    pub fn into_result(self, object: ObjectRef, permission: Permission) -> Result<()> {
        ensure_access!(self.allowed, object, permission, self.lacking);
        Ok(())
    }
}

/// Decides access of tickets to secured objects.
pub struct PermissionEvaluator<L> {
    /// Assignment bits and ACL mandators.
    lookup: L,

    /// Evaluation policy.
    config: EvaluationConfig,
}

impl<L> PermissionEvaluator<L>
where
    L: AssignmentLookup,
{
    /// Create a new evaluator.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Source of assignment bits, usually an [`warden_acl::AclSnapshot`].
    /// * `config` - The evaluation policy.
    pub fn new(lookup: L, config: EvaluationConfig) -> Self {
        Self { lookup, config }
    }

    /// The evaluation policy.
    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// The assignment lookup.
    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Decide whether `ticket` may perform `permission` on the object
    /// described by `info`.
    pub fn decide(&self, ticket: &UserTicket, permission: Permission, info: &SecurityInfo) -> Decision {
        if ticket.is_global_supervisor() {
            return Decision::allow(DecisionReason::GlobalSupervisor);
        }
        if let Some(denied) = self.check_isolation(ticket, info) {
            return denied;
        }
        if !info.type_permissions.use_permissions() {
            return Decision::allow(DecisionReason::PermissionsDisabled);
        }
        if self.supervises(ticket, info) {
            return Decision::allow(DecisionReason::MandatorSupervisor);
        }
        if self.owner_allowed(ticket, permission, info) {
            return Decision::allow(DecisionReason::Owner);
        }

        let toggles = info.type_permissions;
        let mut lacking = BTreeSet::new();
        let mut denied = false;

        if toggles.use_type() {
            if let Some(acl) = info.type_acl {
                if !self.grants(ticket, info, acl, permission) {
                    lacking.insert(acl);
                }
            }
        }

        if toggles.use_instance() && !self.any_grants(ticket, info, &info.instance_acls, permission) {
            // An object without instance ACLs is accessible to nobody
            denied = true;
            lacking.extend(info.instance_acls.iter().copied());
        }

        if toggles.use_step() && self.config.step_acl_scope.applies_to(permission) {
            if let Some(acl) = info.step_acl {
                if !self.grants(ticket, info, acl, permission) {
                    lacking.insert(acl);
                }
            }
        }

        if toggles.use_property() && permission == Permission::Delete {
            for acl in info.used_property_acls() {
                if !self.grants(ticket, info, acl, permission) {
                    lacking.insert(acl);
                }
            }
        }

        if denied || !lacking.is_empty() {
            Decision::deny(DecisionReason::NotGranted, lacking)
        } else {
            Decision::allow(DecisionReason::Granted)
        }
    }

    /// Whether `ticket` may perform `permission` on the object.
    pub fn may_perform(&self, ticket: &UserTicket, permission: Permission, info: &SecurityInfo) -> bool {
        self.decide(ticket, permission, info).allowed
    }

    /// Like [`may_perform`](Self::may_perform), but fails with
    /// [`AccessError::NoAccess`] naming the lacking ACLs.
    pub fn check_permission(
        &self,
        ticket: &UserTicket,
        permission: Permission,
        info: &SecurityInfo,
    ) -> Result<()> {
        let decision = self.decide(ticket, permission, info);
        if decision.allowed {
            return Ok(());
        }
        debug!(
            user = %ticket.user_id(),
            object = %info.object,
            permission = %permission,
            reason = %decision.reason,
            "Access denied"
        );
        decision.into_result(info.object, permission)
    }

    /// Decide access to a single property of the object.
    ///
    /// Properties are only checked when the type enforces property
    /// permissions. A property without an explicit ACL is decided by the
    /// configured [`PropertyAclFallback`].
    pub fn decide_property(
        &self,
        ticket: &UserTicket,
        permission: Permission,
        info: &SecurityInfo,
        path: &str,
    ) -> Decision {
        if ticket.is_global_supervisor() {
            return Decision::allow(DecisionReason::GlobalSupervisor);
        }
        if let Some(denied) = self.check_isolation(ticket, info) {
            return denied;
        }
        if !info.type_permissions.use_permissions() || !info.type_permissions.use_property() {
            return Decision::allow(DecisionReason::PermissionsDisabled);
        }
        if self.supervises(ticket, info) {
            return Decision::allow(DecisionReason::MandatorSupervisor);
        }
        if self.owner_allowed(ticket, permission, info) {
            return Decision::allow(DecisionReason::Owner);
        }

        match info.property_acls.get(path) {
            Some(&acl) if self.grants(ticket, info, acl, permission) => {
                Decision::allow(DecisionReason::Granted)
            }
            Some(&acl) => Decision::deny(DecisionReason::NotGranted, [acl]),
            None => match self.config.property_acl_fallback {
                PropertyAclFallback::InstanceAcl => {
                    if self.any_grants(ticket, info, &info.instance_acls, permission) {
                        Decision::allow(DecisionReason::Granted)
                    } else {
                        Decision::deny(
                            DecisionReason::NotGranted,
                            info.instance_acls.iter().copied(),
                        )
                    }
                }
                PropertyAclFallback::Deny => {
                    Decision::deny(DecisionReason::PropertyFallback, Vec::new())
                }
                PropertyAclFallback::Allow => Decision::allow(DecisionReason::PropertyFallback),
            },
        }
    }

    /// Whether `ticket` may perform `permission` on the property at `path`.
    pub fn may_perform_property(
        &self,
        ticket: &UserTicket,
        permission: Permission,
        info: &SecurityInfo,
        path: &str,
    ) -> bool {
        self.decide_property(ticket, permission, info, path).allowed
    }

    /// Like [`may_perform_property`](Self::may_perform_property), but fails
    /// with [`AccessError::NoPropertyAccess`].
    pub fn check_property(
        &self,
        ticket: &UserTicket,
        permission: Permission,
        info: &SecurityInfo,
        path: &str,
    ) -> Result<()> {
        if self.may_perform_property(ticket, permission, info, path) {
            return Ok(());
        }
        debug!(
            user = %ticket.user_id(),
            object = %info.object,
            path = path,
            permission = %permission,
            "Property access denied"
        );
        Err(AccessError::NoPropertyAccess {
            object: info.object,
            path: path.to_string(),
            permission,
        }
        .into())
    }

    /// Every permission `ticket` holds on the object.
    ///
    /// # Returns
    ///
    /// * `Ok(PermissionSet)` - The held permissions.
    /// * `Err` - If the ticket may not even read the object.
    pub fn get_permissions(&self, ticket: &UserTicket, info: &SecurityInfo) -> Result<PermissionSet> {
        self.check_permission(ticket, Permission::Read, info)?;
        Ok(PermissionSet::from_permissions(
            Permission::ALL
                .into_iter()
                .filter(|p| self.may_perform(ticket, *p, info)),
        ))
    }

    /// Check a permission on content that is not persisted yet.
    ///
    /// # Arguments
    ///
    /// * `ticket` - The caller.
    /// * `permission` - Usually [`Permission::Create`].
    /// * `content_type` - Security settings of the new content's type.
    /// * `step_acl` - ACL of the initial workflow step, if any.
    /// * `content_acl` - The instance ACL the content will get.
    /// * `owner` - The future creator.
    pub fn check_new_content(
        &self,
        ticket: &UserTicket,
        permission: Permission,
        content_type: &TypeSecurity,
        step_acl: Option<AclId>,
        content_acl: AclId,
        owner: UserId,
    ) -> Result<()> {
        let mut info = SecurityInfo::for_content(
            ObjectRef::NewContent(content_type.id),
            content_type,
            [content_acl],
        )
        .with_mandator(ticket.mandator_id())
        .with_creator(owner)
        .not_persisted();
        if let Some(acl) = step_acl {
            info = info.with_step_acl(acl);
        }
        self.check_permission(ticket, permission, &info)
    }

    /// Deny if any referenced ACL is unknown or belongs to a foreign
    /// mandator.
    fn check_isolation(&self, ticket: &UserTicket, info: &SecurityInfo) -> Option<Decision> {
        for acl in info.referenced_acls() {
            match self.lookup.acl_mandator(acl) {
                None => return Some(Decision::deny(DecisionReason::UnknownAcl(acl), [acl])),
                Some(mandator) if mandator.is_global() || mandator == ticket.mandator_id() => {}
                Some(_) => {
                    return Some(Decision::deny(DecisionReason::ForeignMandator(acl), [acl]))
                }
            }
        }
        None
    }

    fn supervises(&self, ticket: &UserTicket, info: &SecurityInfo) -> bool {
        if !ticket.is_mandator_supervisor() {
            return false;
        }
        match info.mandator {
            Some(mandator) => mandator == ticket.mandator_id(),
            None => {
                let acls = info.referenced_acls();
                !acls.is_empty()
                    && acls
                        .iter()
                        .all(|acl| self.lookup.acl_mandator(*acl) == Some(ticket.mandator_id()))
                    && !ticket.mandator_id().is_global()
            }
        }
    }

    fn owner_allowed(&self, ticket: &UserTicket, permission: Permission, info: &SecurityInfo) -> bool {
        info.is_owned_by(ticket.user_id()) && self.config.owner_permissions.contains_permission(permission)
    }

    fn any_grants(
        &self,
        ticket: &UserTicket,
        info: &SecurityInfo,
        acls: &BTreeSet<AclId>,
        permission: Permission,
    ) -> bool {
        acls.iter()
            .any(|acl| self.grants(ticket, info, *acl, permission))
    }

    /// Whether one ACL grants `permission` to the ticket, either through one
    /// of its groups or through the owner pseudo group.
    fn grants(&self, ticket: &UserTicket, info: &SecurityInfo, acl: AclId, permission: Permission) -> bool {
        let held = |group: GroupId| {
            self.lookup
                .lookup(acl, group)
                .is_some_and(|set| set.contains_permission(permission))
        };
        if ticket.groups().iter().any(|group| held(*group)) {
            return true;
        }
        // Owner rows never grant create
        permission != Permission::Create && info.is_creator(ticket.user_id()) && held(GroupId::OWNER)
    }
}
