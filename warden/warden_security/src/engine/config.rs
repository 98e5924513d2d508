//! Evaluation policy knobs.

use serde::{Deserialize, Serialize};
use warden_core::types::{Permission, PermissionSet};

/// Which permissions are also checked against the workflow step ACL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAclScope {
    /// Only write permissions (edit, create).
    #[default]
    WriteOperations,
    /// Every permission.
    AllOperations,
}

impl StepAclScope {
    /// Whether the step ACL takes part in checking `permission`.
    pub fn applies_to(&self, permission: Permission) -> bool {
        match self {
            Self::WriteOperations => permission.is_write(),
            Self::AllOperations => true,
        }
    }
}

/// What governs a property that has no ACL of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyAclFallback {
    /// The instance ACLs of the owning content.
    #[default]
    InstanceAcl,
    /// Nobody but supervisors and owners.
    Deny,
    /// Everybody who passed mandator isolation.
    Allow,
}

/// Configuration of the permission evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Scope of the workflow step ACL check.
    #[serde(default)]
    pub step_acl_scope: StepAclScope,

    /// Fallback for properties without an explicit ACL.
    #[serde(default)]
    pub property_acl_fallback: PropertyAclFallback,

    /// Permissions the owner of an existing object always holds.
    #[serde(default = "default_owner_permissions")]
    pub owner_permissions: PermissionSet,
}

fn default_owner_permissions() -> PermissionSet {
    PermissionSet::READ | PermissionSet::EDIT | PermissionSet::DELETE | PermissionSet::EXPORT
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            step_acl_scope: StepAclScope::default(),
            property_acl_fallback: PropertyAclFallback::default(),
            owner_permissions: default_owner_permissions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EvaluationConfig::default();
        assert_eq!(config.step_acl_scope, StepAclScope::WriteOperations);
        assert_eq!(config.property_acl_fallback, PropertyAclFallback::InstanceAcl);
        assert!(config.owner_permissions.contains_permission(Permission::Export));
        assert!(!config.owner_permissions.contains_permission(Permission::Create));
    }

    #[test]
    fn test_step_scope() {
        assert!(StepAclScope::WriteOperations.applies_to(Permission::Edit));
        assert!(StepAclScope::WriteOperations.applies_to(Permission::Create));
        assert!(!StepAclScope::WriteOperations.applies_to(Permission::Read));
        assert!(StepAclScope::AllOperations.applies_to(Permission::Read));
    }

    #[test]
    fn test_partial_deserialize() {
        let config: EvaluationConfig =
            serde_json::from_str(r#"{"property_acl_fallback": "deny"}"#).unwrap();
        assert_eq!(config.property_acl_fallback, PropertyAclFallback::Deny);
        assert_eq!(config.step_acl_scope, StepAclScope::WriteOperations);
        assert_eq!(config.owner_permissions, default_owner_permissions());
    }
}
