//! Write-side enforcement of property permissions.

use std::collections::BTreeSet;
use tracing::debug;

use warden_acl::AssignmentLookup;
use warden_core::error::Result;
use warden_core::types::{Permission, UserTicket};

use super::{is_empty_value, unwrap_no_access_values, ContentTree, FieldValue};
use crate::engine::PermissionEvaluator;
use crate::info::SecurityInfo;

/// Checks an edited tree before it is persisted.
pub struct SaveGuard<'a, L> {
    evaluator: &'a PermissionEvaluator<L>,
}

impl<'a, L> SaveGuard<'a, L>
where
    L: AssignmentLookup,
{
    /// Create a guard using `evaluator`.
    pub fn new(evaluator: &'a PermissionEvaluator<L>) -> Self {
        Self { evaluator }
    }

    /// Paths whose value differs between `edited` and `persisted`.
    ///
    /// Masked and read-only values in `edited` are never reported, neither
    /// are properties whose old and new value are both empty.
    pub fn changed_properties(edited: &ContentTree, persisted: Option<&ContentTree>) -> Vec<String> {
        let mut changed = BTreeSet::new();

        for (path, value) in edited.properties() {
            let FieldValue::Visible(new) = value else {
                continue;
            };
            let old = persisted.and_then(|tree| tree.get(path)).map(FieldValue::revealed);
            let unchanged = match old {
                Some(old) => old == new || (is_empty_value(old) && is_empty_value(new)),
                None => is_empty_value(new),
            };
            if !unchanged {
                changed.insert(path.to_string());
            }
        }

        if let Some(persisted) = persisted {
            for (path, value) in persisted.properties() {
                if edited.get(path).is_none() && !is_empty_value(value.revealed()) {
                    changed.insert(path.to_string());
                }
            }
        }

        changed.into_iter().collect()
    }

    /// Check an edit and produce the tree to persist.
    ///
    /// Existing content needs EDIT, new content CREATE, on the object and
    /// on every changed property. On success every masked and read-only
    /// value is restored, so properties the caller never saw are written
    /// back unchanged.
    ///
    /// # Arguments
    ///
    /// * `ticket` - The caller.
    /// * `info` - Security snapshot of the content.
    /// * `edited` - The tree as returned by the caller.
    /// * `persisted` - The currently stored tree, `None` for new content.
    pub fn prepare_save(
        &self,
        ticket: &UserTicket,
        info: &SecurityInfo,
        edited: ContentTree,
        persisted: Option<&ContentTree>,
    ) -> Result<ContentTree> {
        let permission = if persisted.is_some() {
            Permission::Edit
        } else {
            Permission::Create
        };
        self.evaluator.check_permission(ticket, permission, info)?;

        if info.type_permissions.use_property() {
            for path in Self::changed_properties(&edited, persisted) {
                self.evaluator.check_property(ticket, permission, info, &path)?;
            }
        }

        debug!(user = %ticket.user_id(), object = %info.object, "Save checked");
        unwrap_no_access_values(&ticket.clone_as_global_supervisor(), edited)
    }
}
