//! ACL categories and per-type permission toggles.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::id::AclId;

/// The closed set of object domains an ACL can govern.
///
/// The category of an ACL is fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AclCategory {
    /// Content instances.
    Instance,
    /// Structure elements: types and property assignments.
    Structure,
    /// Workflow steps.
    Workflow,
    /// Briefcases.
    Briefcase,
    /// Select lists.
    SelectList,
    /// Items of a select list.
    SelectListItem,
}

impl AclCategory {
    /// All categories, in id order.
    pub const ALL: [AclCategory; 6] = [
        AclCategory::Instance,
        AclCategory::Structure,
        AclCategory::Workflow,
        AclCategory::Briefcase,
        AclCategory::SelectList,
        AclCategory::SelectListItem,
    ];

    /// Stable numeric id of this category.
    pub fn id(&self) -> u8 {
        match self {
            Self::Instance => 1,
            Self::Structure => 2,
            Self::Workflow => 3,
            Self::Briefcase => 4,
            Self::SelectList => 5,
            Self::SelectListItem => 6,
        }
    }

    /// Look a category up by its numeric id.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }

    /// The built-in ACL used for this category when nothing else is assigned.
    pub fn default_acl(&self) -> AclId {
        AclId::from_raw(u64::from(self.id()))
    }

    /// Human readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Structure => "structure",
            Self::Workflow => "workflow",
            Self::Briefcase => "briefcase",
            Self::SelectList => "selectlist",
            Self::SelectListItem => "selectlistitem",
        }
    }
}

impl fmt::Display for AclCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AclCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['_', '-'], "");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown ACL category '{}'", s))
    }
}

bitflags! {
    /// Which permission dimensions a content type enforces.
    ///
    /// A type without any flag set does not use permissions at all.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TypePermissions: u8 {
        const INSTANCE = 0x01;
        const PROPERTY = 0x02;
        const STEP = 0x04;
        const TYPE = 0x08;
    }
}

impl TypePermissions {
    /// Encode the four toggles into a flag set.
    pub fn encode(instance: bool, property: bool, step: bool, type_level: bool) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::INSTANCE, instance);
        flags.set(Self::PROPERTY, property);
        flags.set(Self::STEP, step);
        flags.set(Self::TYPE, type_level);
        flags
    }

    /// Whether the type uses permissions at all.
    pub fn use_permissions(&self) -> bool {
        !self.is_empty()
    }

    /// Whether instance ACLs are enforced.
    pub fn use_instance(&self) -> bool {
        self.contains(Self::INSTANCE)
    }

    /// Whether property ACLs are enforced.
    pub fn use_property(&self) -> bool {
        self.contains(Self::PROPERTY)
    }

    /// Whether workflow step ACLs are enforced.
    pub fn use_step(&self) -> bool {
        self.contains(Self::STEP)
    }

    /// Whether the type's own ACL is enforced.
    pub fn use_type(&self) -> bool {
        self.contains(Self::TYPE)
    }
}

impl Default for TypePermissions {
    fn default() -> Self {
        Self::INSTANCE | Self::STEP | Self::TYPE
    }
}

impl fmt::Display for TypePermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(4);
        if self.use_type() {
            parts.push("Type");
        }
        if self.use_step() {
            parts.push("Step");
        }
        if self.use_property() {
            parts.push("Property");
        }
        if self.use_instance() {
            parts.push("Instance");
        }
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_ids_roundtrip() {
        for category in AclCategory::ALL {
            assert_eq!(AclCategory::from_id(category.id()), Some(category));
        }
        assert_eq!(AclCategory::from_id(0), None);
        assert_eq!(AclCategory::from_id(7), None);
    }

    #[test]
    fn test_category_default_acl() {
        assert_eq!(AclCategory::Instance.default_acl().raw(), 1);
        assert_eq!(AclCategory::SelectListItem.default_acl().raw(), 6);
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!(
            AclCategory::from_str("SELECT_LIST").unwrap(),
            AclCategory::SelectList
        );
        assert_eq!(
            AclCategory::from_str("workflow").unwrap(),
            AclCategory::Workflow
        );
        assert!(AclCategory::from_str("folder").is_err());
    }

    #[test]
    fn test_type_permissions_encode() {
        let flags = TypePermissions::encode(true, false, true, false);
        assert!(flags.use_instance());
        assert!(!flags.use_property());
        assert!(flags.use_step());
        assert!(!flags.use_type());
        assert_eq!(flags.bits(), 0x05);
    }

    #[test]
    fn test_type_permissions_display() {
        assert_eq!(TypePermissions::all().to_string(), "Type,Step,Property,Instance");
        assert_eq!(TypePermissions::PROPERTY.to_string(), "Property");
        assert_eq!(TypePermissions::empty().to_string(), "");
        assert!(!TypePermissions::empty().use_permissions());
    }
}
