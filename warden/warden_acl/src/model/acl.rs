//! The ACL record and its administrative inputs.

use serde::{Deserialize, Serialize};
use warden_core::id::{AclId, GroupId, MandatorId, UserId};
use warden_core::types::{AclCategory, PermissionSet};

use super::LifecycleInfo;

/// An access control list.
///
/// An ACL is a named, mandator-owned permission template. The permissions
/// themselves live in [`super::AclAssignment`] rows, one per group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    /// The unique ID of this ACL.
    pub id: AclId,

    /// The owning mandator; [`MandatorId::GLOBAL`] for global ACLs.
    pub mandator: MandatorId,

    /// The kind of object this ACL governs. Fixed at creation.
    pub category: AclCategory,

    /// Unique name within the mandator.
    pub name: String,

    /// Display label.
    pub label: String,

    /// Free text description.
    pub description: String,

    /// UI color hint, `#RRGGBB` or a CSS color keyword.
    pub color: String,

    /// Creation and modification info.
    pub lifecycle: LifecycleInfo,
}

impl Acl {
    /// Whether this ACL is visible to every mandator.
    pub fn is_global(&self) -> bool {
        self.mandator.is_global()
    }

    /// Whether this is one of the built-in ACLs.
    pub fn is_internal(&self, max_internal_id: u64) -> bool {
        self.id.raw() <= max_internal_id
    }
}

/// Input for creating an ACL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAcl {
    /// Unique name within the mandator.
    pub name: String,

    /// Display label.
    pub label: String,

    /// The owning mandator.
    pub mandator: MandatorId,

    /// UI color hint.
    pub color: String,

    /// Free text description.
    #[serde(default)]
    pub description: String,

    /// The kind of object the ACL governs.
    pub category: AclCategory,
}

impl NewAcl {
    /// Create an input with an empty description and the default color.
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        mandator: MandatorId,
        category: AclCategory,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            mandator,
            color: "#000000".to_string(),
            description: String::new(),
            category,
        }
    }

    /// Set the color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Build the stored record.
    pub(crate) fn into_acl(self, id: AclId, creator: UserId) -> Acl {
        Acl {
            id,
            mandator: self.mandator,
            category: self.category,
            name: self.name,
            label: self.label,
            description: self.description,
            color: self.color,
            lifecycle: LifecycleInfo::created_now(creator),
        }
    }
}

/// One row of a full assignment list passed to an ACL update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRow {
    /// The group.
    pub group: GroupId,

    /// Granted permissions; an empty set is skipped.
    pub permissions: PermissionSet,
}

impl AssignmentRow {
    /// Create a row.
    pub fn new(group: GroupId, permissions: PermissionSet) -> Self {
        Self { group, permissions }
    }
}

/// Changes applied by an ACL update.
///
/// `None` fields are left untouched. A `Some` assignment list replaces every
/// existing assignment of the ACL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclUpdate {
    /// New name.
    pub name: Option<String>,

    /// New label.
    pub label: Option<String>,

    /// New color.
    pub color: Option<String>,

    /// New description.
    pub description: Option<String>,

    /// Full replacement of the assignments.
    pub assignments: Option<Vec<AssignmentRow>>,
}

impl AclUpdate {
    /// An update that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Change the label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Change the color.
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Change the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace all assignments.
    pub fn assignments(mut self, rows: Vec<AssignmentRow>) -> Self {
        self.assignments = Some(rows);
        self
    }
}
