//! Permission primitives.
//!
//! A [`Permission`] names a single operation on a secured object. A
//! [`PermissionSet`] is the bitset granted by one ACL assignment, or the
//! union of several of them.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single operation that can be permitted on a secured object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// Read the object.
    Read,
    /// Edit an existing object.
    Edit,
    /// Delete an existing object.
    Delete,
    /// Relate the object to other objects.
    Relate,
    /// Export the object.
    Export,
    /// Create a new object under an ACL.
    Create,
}

impl Permission {
    /// All permissions, in canonical order.
    pub const ALL: [Permission; 6] = [
        Permission::Read,
        Permission::Edit,
        Permission::Delete,
        Permission::Relate,
        Permission::Export,
        Permission::Create,
    ];

    /// Lower-case name of this permission.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Relate => "relate",
            Self::Export => "export",
            Self::Create => "create",
        }
    }

    /// Whether this permission modifies data.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Edit | Self::Create)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "read" => Ok(Self::Read),
            "edit" => Ok(Self::Edit),
            "delete" | "remove" => Ok(Self::Delete),
            "relate" => Ok(Self::Relate),
            "export" => Ok(Self::Export),
            "create" => Ok(Self::Create),
            other => Err(format!("unknown permission '{}'", other)),
        }
    }
}

bitflags! {
    /// Permission bits granted by an ACL assignment.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PermissionSet: u8 {
        const READ = 0b0000_0001;
        const EDIT = 0b0000_0010;
        const DELETE = 0b0000_0100;
        const RELATE = 0b0000_1000;
        const EXPORT = 0b0001_0000;
        const CREATE = 0b0010_0000;
    }
}

impl PermissionSet {
    /// Build a set from individual permissions.
    pub fn from_permissions<I>(permissions: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        permissions
            .into_iter()
            .fold(Self::empty(), |set, p| set | Self::from(p))
    }

    /// Build a set from the six boolean flags used by assignment rows.
    pub fn from_flags(
        read: bool,
        edit: bool,
        delete: bool,
        relate: bool,
        export: bool,
        create: bool,
    ) -> Self {
        let mut set = Self::empty();
        set.set(Self::READ, read);
        set.set(Self::EDIT, edit);
        set.set(Self::DELETE, delete);
        set.set(Self::RELATE, relate);
        set.set(Self::EXPORT, export);
        set.set(Self::CREATE, create);
        set
    }

    /// Check if the bit for a single permission is set.
    pub fn contains_permission(&self, permission: Permission) -> bool {
        self.contains(Self::from(permission))
    }

    /// Iterate over the permissions contained in this set.
    pub fn permissions(&self) -> impl Iterator<Item = Permission> + '_ {
        Permission::ALL
            .into_iter()
            .filter(move |p| self.contains_permission(*p))
    }
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Permission> for PermissionSet {
    fn from(permission: Permission) -> Self {
        match permission {
            Permission::Read => Self::READ,
            Permission::Edit => Self::EDIT,
            Permission::Delete => Self::DELETE,
            Permission::Relate => Self::RELATE,
            Permission::Export => Self::EXPORT,
            Permission::Create => Self::CREATE,
        }
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.permissions().map(|p| p.as_str()).collect();
        write!(f, "{}", names.join(","))
    }
}
