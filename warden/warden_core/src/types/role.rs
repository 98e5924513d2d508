//! Administrative roles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A role assigned to a user account.
///
/// Roles guard administrative operations; they are not part of the ACL
/// evaluation itself except for the two supervisor roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    GlobalSupervisor,
    MandatorSupervisor,
    #[serde(rename = "ACLManagement")]
    AclManagement,
    AccountManagement,
    SelectListEditor,
    WorkflowManagement,
    StructureManagement,
    ScriptManagement,
    ScriptExecution,
    BackendAccess,
}

impl Role {
    /// All roles, in id order.
    pub const ALL: [Role; 10] = [
        Role::GlobalSupervisor,
        Role::MandatorSupervisor,
        Role::AclManagement,
        Role::AccountManagement,
        Role::SelectListEditor,
        Role::WorkflowManagement,
        Role::StructureManagement,
        Role::ScriptManagement,
        Role::ScriptExecution,
        Role::BackendAccess,
    ];

    /// Stable numeric id.
    pub fn id(&self) -> u8 {
        match self {
            Self::GlobalSupervisor => 1,
            Self::MandatorSupervisor => 2,
            Self::AclManagement => 3,
            Self::AccountManagement => 4,
            Self::SelectListEditor => 5,
            Self::WorkflowManagement => 6,
            Self::StructureManagement => 7,
            Self::ScriptManagement => 8,
            Self::ScriptExecution => 9,
            Self::BackendAccess => 10,
        }
    }

    /// Look a role up by id.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.id() == id)
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GlobalSupervisor => "Global Supervisor",
            Self::MandatorSupervisor => "Mandator Supervisor",
            Self::AclManagement => "ACL Management",
            Self::AccountManagement => "Account Management",
            Self::SelectListEditor => "SelectList Editor",
            Self::WorkflowManagement => "Workflow Management",
            Self::StructureManagement => "Structure Management",
            Self::ScriptManagement => "Script Management",
            Self::ScriptExecution => "Script Execution",
            Self::BackendAccess => "Backend Access",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
