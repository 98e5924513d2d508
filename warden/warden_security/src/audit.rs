//! Decision auditing.
//!
//! Keeps the most recent permission decisions per user.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use warden_core::error::ObjectRef;
use warden_core::id::{AclId, UserId};
use warden_core::types::Permission;

use crate::engine::{Decision, DecisionReason};

/// One recorded decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry id, for correlating a denial with its log line.
    pub id: Uuid,

    /// The caller.
    pub user: UserId,

    /// The object that was checked, as display text.
    pub object: String,

    /// The requested permission.
    pub permission: Permission,

    /// Whether access was allowed.
    pub allowed: bool,

    /// The deciding rule.
    pub reason: DecisionReason,

    /// ACLs that did not grant the permission.
    pub lacking: Vec<AclId>,

    /// When the decision was made.
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Create an entry from a decision.
    pub fn new(user: UserId, object: &ObjectRef, permission: Permission, decision: &Decision) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            object: object.to_string(),
            permission,
            allowed: decision.allowed,
            reason: decision.reason,
            lacking: decision.lacking.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// A decision audit.
#[derive(Clone)]
pub struct DecisionAudit {
    /// The audit entries.
    entries: Arc<DashMap<UserId, Vec<AuditEntry>>>,

    /// The maximum number of entries to keep per user.
    max_entries_per_user: usize,

    /// The maximum number of users with entries.
    max_users: usize,
}

impl DecisionAudit {
    /// Create a new decision audit.
    ///
    /// # Arguments
    ///
    /// * `max_entries_per_user` - The maximum number of entries to keep per user.
    /// * `max_users` - The maximum number of users with entries.
    pub fn new(max_entries_per_user: usize, max_users: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_entries_per_user,
            max_users,
        }
    }

    /// Record a decision, dropping the oldest entries of the user beyond
    /// the limit.
    ///
    /// A user not seen before may push the audit over its user limit; the
    /// user whose latest decision is oldest is then dropped.
    pub fn record(&self, entry: AuditEntry) {
        let user = entry.user;
        let new_user = {
            let mut user_entries = self.entries.entry(user).or_default();
            let new_user = user_entries.is_empty();
            user_entries.push(entry);
            if user_entries.len() > self.max_entries_per_user {
                let to_remove = user_entries.len() - self.max_entries_per_user;
                user_entries.drain(0..to_remove);
            }
            new_user
        };

        if new_user {
            while self.entries.len() > self.max_users {
                if !self.evict_stalest(user) {
                    break;
                }
            }
        }
    }

    /// Drop the user other than `keep` whose latest entry is oldest.
    fn evict_stalest(&self, keep: UserId) -> bool {
        let stalest = self
            .entries
            .iter()
            .filter(|e| *e.key() != keep)
            .min_by_key(|e| e.value().last().map(|entry| entry.timestamp))
            .map(|e| *e.key());
        match stalest {
            Some(user) => {
                self.entries.remove(&user);
                debug!("Dropped audit entries of user {}", user);
                true
            }
            None => false,
        }
    }

    /// Entries of one user, oldest first.
    pub fn entries_for(&self, user: UserId) -> Vec<AuditEntry> {
        self.entries
            .get(&user)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Look up one entry by id.
    pub fn find(&self, id: Uuid) -> Option<AuditEntry> {
        self.entries
            .iter()
            .find_map(|e| e.value().iter().find(|entry| entry.id == id).cloned())
    }

    /// All entries with the given outcome.
    pub fn entries_by_outcome(&self, allowed: bool) -> Vec<AuditEntry> {
        self.filter(|entry| entry.allowed == allowed)
    }

    /// All denials in which `acl` did not grant the permission.
    pub fn denials_lacking(&self, acl: AclId) -> Vec<AuditEntry> {
        self.filter(|entry| !entry.allowed && entry.lacking.contains(&acl))
    }

    /// Clear the entries of one user.
    pub fn clear_user(&self, user: UserId) {
        self.entries.remove(&user);
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.value().len()).sum()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn filter<F>(&self, predicate: F) -> Vec<AuditEntry>
    where
        F: Fn(&AuditEntry) -> bool,
    {
        let mut entries: Vec<AuditEntry> = self
            .entries
            .iter()
            .flat_map(|e| e.value().iter().filter(|entry| predicate(entry)).cloned().collect::<Vec<_>>())
            .collect();
        entries.sort_by_key(|entry| entry.timestamp);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::id::ContentId;

    fn decision(allowed: bool, lacking: Vec<AclId>) -> Decision {
        Decision {
            allowed,
            reason: if allowed {
                DecisionReason::Granted
            } else {
                DecisionReason::NotGranted
            },
            lacking,
        }
    }

    fn entry(user: u64, allowed: bool, lacking: Vec<AclId>) -> AuditEntry {
        AuditEntry::new(
            UserId::from_raw(user),
            &ObjectRef::Content(ContentId::from_raw(1)),
            Permission::Read,
            &decision(allowed, lacking),
        )
    }

    #[test]
    fn test_record_and_trim() {
        let audit = DecisionAudit::new(2, 10);
        audit.record(entry(1, true, vec![]));
        audit.record(entry(1, false, vec![AclId::from_raw(5)]));
        audit.record(entry(1, false, vec![AclId::from_raw(6)]));

        // Only the last two are kept
        let entries = audit.entries_for(UserId::from_raw(1));
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| !e.allowed));
        assert!(audit.entries_for(UserId::from_raw(2)).is_empty());
    }

    #[test]
    fn test_filters() {
        let audit = DecisionAudit::new(10, 10);
        audit.record(entry(1, true, vec![]));
        audit.record(entry(2, false, vec![AclId::from_raw(5)]));
        audit.record(entry(3, false, vec![AclId::from_raw(6)]));

        assert_eq!(audit.entries_by_outcome(true).len(), 1);
        assert_eq!(audit.entries_by_outcome(false).len(), 2);
        let lacking = audit.denials_lacking(AclId::from_raw(5));
        assert_eq!(lacking.len(), 1);
        assert_eq!(lacking[0].user, UserId::from_raw(2));

        let denied = audit.find(lacking[0].id).unwrap();
        assert_eq!(denied, lacking[0]);
        assert!(audit.find(Uuid::new_v4()).is_none());

        audit.clear_user(UserId::from_raw(2));
        assert_eq!(audit.len(), 2);
    }

    #[test]
    fn test_least_recently_audited_user_is_dropped() {
        let audit = DecisionAudit::new(10, 2);
        let start = Utc::now();
        let at = |user: u64, seconds: i64| {
            let mut e = entry(user, true, vec![]);
            e.timestamp = start + chrono::Duration::seconds(seconds);
            e
        };

        audit.record(at(1, 0));
        audit.record(at(2, 1));
        // User 1 is active again, so user 2 is now the stalest
        audit.record(at(1, 2));
        audit.record(at(3, 3));

        assert!(audit.entries_for(UserId::from_raw(2)).is_empty());
        assert_eq!(audit.entries_for(UserId::from_raw(1)).len(), 2);
        assert_eq!(audit.entries_for(UserId::from_raw(3)).len(), 1);
        assert_eq!(audit.len(), 3);
    }
}
