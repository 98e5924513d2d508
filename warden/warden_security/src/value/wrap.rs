//! Masking of unreadable property values.

use warden_acl::AssignmentLookup;
use warden_core::error::{AccessError, Result};
use warden_core::types::{Permission, Role, UserTicket};

use super::{ContentTree, FieldValue, Masked};
use crate::engine::PermissionEvaluator;
use crate::info::SecurityInfo;

/// Apply property permissions to a loaded tree.
///
/// Unreadable values become [`FieldValue::Masked`], readable values the
/// caller may not edit become [`FieldValue::ReadOnly`]. Global supervisors
/// and types without property permissions get the tree back untouched.
pub fn wrap_no_access_values<L>(
    evaluator: &PermissionEvaluator<L>,
    ticket: &UserTicket,
    info: &SecurityInfo,
    tree: ContentTree,
) -> ContentTree
where
    L: AssignmentLookup,
{
    if ticket.is_global_supervisor() || !info.type_permissions.use_property() {
        return tree;
    }
    tree.map_values(|path, value| match value {
        FieldValue::Visible(inner) | FieldValue::ReadOnly(inner) => {
            if !evaluator.may_perform_property(ticket, Permission::Read, info, path) {
                FieldValue::Masked(Masked::new(inner))
            } else if !evaluator.may_perform_property(ticket, Permission::Edit, info, path) {
                FieldValue::ReadOnly(inner)
            } else {
                FieldValue::Visible(inner)
            }
        }
        masked => masked,
    })
}

/// Restore every masked and read-only value to a plain visible value.
///
/// Only an elevated ticket may see the originals, see
/// [`UserTicket::clone_as_global_supervisor`].
pub fn unwrap_no_access_values(ticket: &UserTicket, tree: ContentTree) -> Result<ContentTree> {
    if !ticket.is_global_supervisor() {
        return Err(AccessError::NotInRole(Role::GlobalSupervisor).into());
    }
    Ok(tree.map_values(|_, value| FieldValue::Visible(value.reveal())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EvaluationConfig;
    use serde_json::json;
    use warden_acl::AclSnapshot;
    use warden_core::error::ObjectRef;
    use warden_core::id::{AclId, ContentId, ContentTypeId, GroupId, MandatorId, UserId};
    use warden_core::types::{AclCategory, PermissionSet, TypePermissions};

    const MANDATOR: MandatorId = MandatorId::from_raw(1);
    const GROUP_7: GroupId = GroupId::from_raw(7);
    const CONTENT_ACL: AclId = AclId::from_raw(1001);
    const SALARY_ACL: AclId = AclId::from_raw(1002);
    const TITLE_ACL: AclId = AclId::from_raw(1003);

    fn evaluator() -> PermissionEvaluator<AclSnapshot> {
        let snapshot = AclSnapshot::new()
            .with_acl(CONTENT_ACL, MANDATOR, AclCategory::Instance)
            .with_acl(SALARY_ACL, MANDATOR, AclCategory::Instance)
            .with_acl(TITLE_ACL, MANDATOR, AclCategory::Instance)
            .with_grant(CONTENT_ACL, GROUP_7, PermissionSet::READ | PermissionSet::EDIT)
            .with_grant(TITLE_ACL, GROUP_7, PermissionSet::READ);
        PermissionEvaluator::new(snapshot, EvaluationConfig::default())
    }

    fn info() -> SecurityInfo {
        SecurityInfo::new(ObjectRef::Content(ContentId::from_raw(1)), [CONTENT_ACL])
            .with_type_permissions(TypePermissions::INSTANCE | TypePermissions::PROPERTY)
            .with_property_acl("/SALARY", SALARY_ACL)
            .with_property_acl("/TITLE", TITLE_ACL)
    }

    fn tree() -> ContentTree {
        ContentTree::new(ContentTypeId::from_raw(5))
            .with("/SALARY", json!(4200))
            .with("/TITLE", json!("Report"))
            .with("/BODY", json!("text"))
    }

    fn ticket() -> UserTicket {
        UserTicket::builder(UserId::from_raw(10), MANDATOR, GroupId::from_raw(30))
            .group(GROUP_7)
            .build()
    }

    #[test]
    fn test_wrap_marks_values() {
        let wrapped = wrap_no_access_values(&evaluator(), &ticket(), &info(), tree());

        assert!(wrapped.get("/SALARY").unwrap().is_masked());
        assert!(wrapped.get("/TITLE").unwrap().is_read_only());
        assert!(wrapped.get("/BODY").unwrap().is_writable());
        assert_eq!(wrapped.value("/SALARY"), None);
    }

    #[test]
    fn test_round_trip_restores_tree() {
        let original = tree();
        let wrapped = wrap_no_access_values(&evaluator(), &ticket(), &info(), original.clone());
        let restored = unwrap_no_access_values(&ticket().clone_as_global_supervisor(), wrapped).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_round_trip_without_readable_properties() {
        // A stranger sees nothing at all
        let stranger = UserTicket::builder(UserId::from_raw(99), MANDATOR, GroupId::from_raw(31)).build();
        let original = tree();
        let wrapped = wrap_no_access_values(&evaluator(), &stranger, &info(), original.clone());
        assert!(wrapped.properties().all(|(_, value)| value.is_masked()));

        let restored = unwrap_no_access_values(&stranger.clone_as_global_supervisor(), wrapped).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_wrap_is_noop_for_supervisor_and_plain_types() {
        let original = tree();
        let supervisor = ticket().clone_as_global_supervisor();
        assert_eq!(
            wrap_no_access_values(&evaluator(), &supervisor, &info(), original.clone()),
            original
        );

        let plain = info().with_type_permissions(TypePermissions::INSTANCE);
        assert_eq!(wrap_no_access_values(&evaluator(), &ticket(), &plain, original.clone()), original);
    }

    #[test]
    fn test_unwrap_requires_elevated_ticket() {
        let wrapped = wrap_no_access_values(&evaluator(), &ticket(), &info(), tree());
        assert!(matches!(
            unwrap_no_access_values(&ticket(), wrapped),
            Err(warden_core::Error::Access(AccessError::NotInRole(Role::GlobalSupervisor)))
        ));
    }
}
