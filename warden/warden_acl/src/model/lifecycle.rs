//! Lifecycle information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::id::UserId;

/// Who created and last modified a record, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleInfo {
    /// The creating account.
    pub created_by: UserId,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// The account that last modified the record.
    pub modified_by: UserId,

    /// When the record was last modified.
    pub modified_at: DateTime<Utc>,
}

impl LifecycleInfo {
    /// Lifecycle info for a record created now by `user`.
    pub fn created_now(user: UserId) -> Self {
        let now = Utc::now();
        Self {
            created_by: user,
            created_at: now,
            modified_by: user,
            modified_at: now,
        }
    }

    /// Record a modification by `user`.
    pub fn touch(&mut self, user: UserId) {
        self.modified_by = user;
        self.modified_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_keeps_creation() {
        let mut info = LifecycleInfo::created_now(UserId::from_raw(10));
        let created_at = info.created_at;
        info.touch(UserId::from_raw(11));
        assert_eq!(info.created_by, UserId::from_raw(10));
        assert_eq!(info.created_at, created_at);
        assert_eq!(info.modified_by, UserId::from_raw(11));
        assert!(info.modified_at >= created_at);
    }
}
