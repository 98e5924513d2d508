//! ACL engine configuration.

use serde::{Deserialize, Serialize};

/// Limits and reserved ranges of the ACL engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEngineConfig {
    /// ACL ids up to and including this value are internal.
    #[serde(default = "default_max_internal_acl_id")]
    pub max_internal_acl_id: u64,

    /// Maximum length of an ACL name.
    #[serde(default = "default_name_max_length")]
    pub name_max_length: usize,

    /// Maximum length of an ACL description.
    #[serde(default = "default_description_max_length")]
    pub description_max_length: usize,

    /// First id handed out to custom ACLs.
    #[serde(default = "default_first_custom_acl_id")]
    pub first_custom_acl_id: u64,
}

impl Default for AclEngineConfig {
    fn default() -> Self {
        Self {
            max_internal_acl_id: default_max_internal_acl_id(),
            name_max_length: default_name_max_length(),
            description_max_length: default_description_max_length(),
            first_custom_acl_id: default_first_custom_acl_id(),
        }
    }
}

fn default_max_internal_acl_id() -> u64 {
    8
}

fn default_name_max_length() -> usize {
    250
}

fn default_description_max_length() -> usize {
    255
}

fn default_first_custom_acl_id() -> u64 {
    1000
}
