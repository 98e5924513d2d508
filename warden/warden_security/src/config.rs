//! Configuration for Warden security
//!
//! Handles loading, validating and merging the security configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

use warden_acl::AclEngineConfig;
use warden_core::types::Permission;
use warden_core::utils::LogLevel;

use crate::engine::EvaluationConfig;

/// Errors that can occur in configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Ticket cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketCacheConfig {
    /// Maximum number of cached tickets
    #[serde(default = "default_ticket_cache_entries")]
    pub max_entries: usize,
}

fn default_ticket_cache_entries() -> usize {
    10_000
}

impl Default for TicketCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_ticket_cache_entries(),
        }
    }
}

/// Security info cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityInfoCacheConfig {
    /// Whether snapshots are cached at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of cached snapshots
    #[serde(default = "default_info_cache_entries")]
    pub max_entries: usize,
}

fn default_true() -> bool {
    true
}

fn default_info_cache_entries() -> usize {
    50_000
}

impl Default for SecurityInfoCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            max_entries: default_info_cache_entries(),
        }
    }
}

/// Decision audit configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether decisions are recorded
    #[serde(default)]
    pub enabled: bool,

    /// Entries kept per user
    #[serde(default = "default_audit_entries")]
    pub max_entries_per_user: usize,

    /// Users with entries; the least recently audited user is dropped first
    #[serde(default = "default_audit_users")]
    pub max_users: usize,
}

fn default_audit_entries() -> usize {
    1000
}

fn default_audit_users() -> usize {
    10_000
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries_per_user: default_audit_entries(),
            max_users: default_audit_users(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level
    #[serde(default)]
    pub level: LogLevel,

    /// Emit JSON lines instead of plain text
    #[serde(default)]
    pub json: bool,

    /// Filter directive replacing `level`, e.g. `warden_security=debug,info`
    #[serde(default)]
    pub filter: Option<String>,
}

/// Security configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// ACL administration
    #[serde(default)]
    pub acl: AclEngineConfig,

    /// Permission evaluation policy
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Ticket cache
    #[serde(default)]
    pub ticket_cache: TicketCacheConfig,

    /// Security info cache
    #[serde(default)]
    pub security_info_cache: SecurityInfoCacheConfig,

    /// Decision audit
    #[serde(default)]
    pub audit: AuditConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SecurityConfig {
    /// Load configuration from a JSON file
    pub async fn load(path: Option<&str>) -> Result<Self> {
        // Start with default configuration
        let mut config = SecurityConfig::default();

        if let Some(path) = path {
            info!("Loading configuration from {}", path);

            if !Path::new(path).exists() {
                warn!("Configuration file not found: {}", path);
                return Ok(config);
            }

            let content = fs::read_to_string(path)
                .await
                .map_err(|e| ConfigError::LoadFailed(e.to_string()))
                .context(format!("Failed to read configuration file: {}", path))?;

            config = Self::parse(path, &content)
                .context(format!("Failed to parse configuration file: {}", path))?;
        } else {
            info!("No configuration file specified, using defaults");
        }

        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration document: TOML for `.toml` files, JSON otherwise.
    fn parse(path: &str, content: &str) -> std::result::Result<Self, ConfigError> {
        let is_toml = Path::new(path).extension().is_some_and(|ext| ext == "toml");
        if is_toml {
            toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
        } else {
            serde_json::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.acl.name_max_length == 0 {
            return Err(ConfigError::Invalid("ACL name length cannot be zero".to_string()).into());
        }

        if self.acl.first_custom_acl_id <= self.acl.max_internal_acl_id {
            return Err(ConfigError::Invalid(format!(
                "First custom ACL id {} lies in the internal range (<= {})",
                self.acl.first_custom_acl_id, self.acl.max_internal_acl_id
            ))
            .into());
        }

        // Owners never gain the right to create or relate
        for permission in [Permission::Create, Permission::Relate] {
            if self
                .evaluation
                .owner_permissions
                .contains_permission(permission)
            {
                return Err(ConfigError::Invalid(format!(
                    "Owner permissions cannot include {}",
                    permission
                ))
                .into());
            }
        }

        if self.ticket_cache.max_entries == 0 {
            return Err(
                ConfigError::Invalid("Ticket cache size cannot be zero".to_string()).into(),
            );
        }

        if self.security_info_cache.enabled && self.security_info_cache.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "Security info cache size cannot be zero".to_string(),
            )
            .into());
        }

        if self.audit.enabled && self.audit.max_entries_per_user == 0 {
            return Err(
                ConfigError::Invalid("Audit size cannot be zero".to_string()).into(),
            );
        }

        if self.audit.enabled && self.audit.max_users == 0 {
            return Err(
                ConfigError::Invalid("Audit user limit cannot be zero".to_string()).into(),
            );
        }

        Ok(())
    }

    /// Merge with another configuration
    ///
    /// Values of `other` that differ from the defaults win.
    pub fn merge(&mut self, other: SecurityConfig) {
        let defaults = SecurityConfig::default();

        if other.acl != defaults.acl {
            self.acl = other.acl;
        }

        if other.evaluation.step_acl_scope != defaults.evaluation.step_acl_scope {
            self.evaluation.step_acl_scope = other.evaluation.step_acl_scope;
        }
        if other.evaluation.property_acl_fallback != defaults.evaluation.property_acl_fallback {
            self.evaluation.property_acl_fallback = other.evaluation.property_acl_fallback;
        }
        if other.evaluation.owner_permissions != defaults.evaluation.owner_permissions {
            self.evaluation.owner_permissions = other.evaluation.owner_permissions;
        }

        if other.ticket_cache.max_entries != defaults.ticket_cache.max_entries {
            self.ticket_cache.max_entries = other.ticket_cache.max_entries;
        }

        if other.security_info_cache != defaults.security_info_cache {
            self.security_info_cache = other.security_info_cache;
        }

        if other.audit.enabled {
            self.audit.enabled = true;
        }
        if other.audit.max_entries_per_user != defaults.audit.max_entries_per_user {
            self.audit.max_entries_per_user = other.audit.max_entries_per_user;
        }
        if other.audit.max_users != defaults.audit.max_users {
            self.audit.max_users = other.audit.max_users;
        }

        if other.logging.level != defaults.logging.level {
            self.logging.level = other.logging.level;
        }
        if other.logging.json {
            self.logging.json = true;
        }
        if other.logging.filter.is_some() {
            self.logging.filter = other.logging.filter;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{PropertyAclFallback, StepAclScope};
    use tempfile::NamedTempFile;
    use warden_core::types::PermissionSet;

    #[tokio::test]
    async fn test_load_config() {
        // Create a temporary config file
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();

        // Write a test configuration
        let config_json = r#"
        {
            "acl": { "name_max_length": 64 },
            "evaluation": {
                "step_acl_scope": "all_operations",
                "property_acl_fallback": "deny"
            },
            "audit": { "enabled": true, "max_entries_per_user": 50 },
            "logging": { "level": "debug", "json": true }
        }
        "#;

        fs::write(path, config_json).await.unwrap();

        // Load the configuration
        let config = SecurityConfig::load(Some(path)).await.unwrap();

        // Verify loaded values
        assert_eq!(config.acl.name_max_length, 64);
        assert_eq!(config.acl.max_internal_acl_id, 8);
        assert_eq!(config.evaluation.step_acl_scope, StepAclScope::AllOperations);
        assert_eq!(config.evaluation.property_acl_fallback, PropertyAclFallback::Deny);
        assert!(config.audit.enabled);
        assert_eq!(config.audit.max_entries_per_user, 50);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(config.logging.json);
        assert_eq!(config.ticket_cache.max_entries, 10_000);
    }

    #[tokio::test]
    async fn test_load_toml_config() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let path = file.path().to_str().unwrap();

        let config_toml = r#"
[evaluation]
property_acl_fallback = "allow"

[ticket_cache]
max_entries = 25

[logging]
level = "warning"
"#;
        fs::write(path, config_toml).await.unwrap();

        let config = SecurityConfig::load(Some(path)).await.unwrap();
        assert_eq!(config.evaluation.property_acl_fallback, PropertyAclFallback::Allow);
        assert_eq!(config.ticket_cache.max_entries, 25);
        assert_eq!(config.logging.level, LogLevel::Warning);
        assert_eq!(config.acl, AclEngineConfig::default());
    }

    #[tokio::test]
    async fn test_default_config() {
        let config = SecurityConfig::load(None).await.unwrap();
        assert_eq!(config, SecurityConfig::default());

        // A missing file falls back to the defaults
        let config = SecurityConfig::load(Some("/nonexistent/warden.json"))
            .await
            .unwrap();
        assert_eq!(config, SecurityConfig::default());
    }

    #[tokio::test]
    async fn test_parse_error_names_file() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        fs::write(path, "{ not json").await.unwrap();

        let err = SecurityConfig::load(Some(path)).await.unwrap_err();
        assert!(err.to_string().contains(path));
    }

    #[test]
    fn test_validate() {
        let mut config = SecurityConfig::default();
        assert!(config.validate().is_ok());

        config.evaluation.owner_permissions = PermissionSet::READ | PermissionSet::CREATE;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("create"));

        let mut config = SecurityConfig::default();
        config.ticket_cache.max_entries = 0;
        assert!(config.validate().is_err());

        let mut config = SecurityConfig::default();
        config.acl.first_custom_acl_id = 5;
        assert!(config.validate().is_err());

        // A disabled audit may have any size
        let mut config = SecurityConfig::default();
        config.audit.max_entries_per_user = 0;
        assert!(config.validate().is_ok());

        let mut config = SecurityConfig::default();
        config.audit.enabled = true;
        config.audit.max_users = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_config() {
        // Create a base configuration
        let mut base = SecurityConfig::default();
        base.ticket_cache.max_entries = 500;

        // Create an override configuration
        let mut override_config = SecurityConfig::default();
        override_config.evaluation.property_acl_fallback = PropertyAclFallback::Allow;
        override_config.audit.enabled = true;
        override_config.logging.filter = Some("warden_security=trace".to_string());

        // Merge the configurations
        base.merge(override_config);

        // Verify merged values
        assert_eq!(base.evaluation.property_acl_fallback, PropertyAclFallback::Allow);
        assert!(base.audit.enabled);
        assert_eq!(base.ticket_cache.max_entries, 500);
        assert_eq!(base.logging.filter.as_deref(), Some("warden_security=trace"));
    }
}
