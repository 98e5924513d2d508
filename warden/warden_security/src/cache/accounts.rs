//! Account data behind tickets.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use warden_acl::{Invalidation, InvalidationSink, SharedSink};
use warden_core::error::{NotFoundError, Result};
use warden_core::id::{GroupId, MandatorId, UserId};
use warden_core::types::{Role, UserTicket};

/// Builds tickets for users.
pub trait AccountSource: Send + Sync {
    /// Build a fresh ticket for `user`.
    ///
    /// # Returns
    ///
    /// * `Ok(UserTicket)` - The ticket.
    /// * `Err` - If the user does not exist.
    fn load_ticket(&self, user: UserId) -> Result<UserTicket>;

    /// Report account changes to `sink`.
    ///
    /// Sources that cannot observe changes ignore this; their owners must
    /// emit [`Invalidation::User`] themselves.
    fn set_invalidation_sink(&self, _sink: Arc<dyn InvalidationSink>) {}
}

impl<T: AccountSource + ?Sized> AccountSource for Arc<T> {
    fn load_ticket(&self, user: UserId) -> Result<UserTicket> {
        (**self).load_ticket(user)
    }

    fn set_invalidation_sink(&self, sink: Arc<dyn InvalidationSink>) {
        (**self).set_invalidation_sink(sink)
    }
}

/// Roles and groups of one user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The user.
    pub user: UserId,

    /// The user's mandator.
    pub mandator: MandatorId,

    /// Auto-group of the mandator.
    pub mandator_group: GroupId,

    /// Explicit group memberships.
    pub groups: BTreeSet<GroupId>,

    /// Assigned roles.
    pub roles: BTreeSet<Role>,
}

impl Account {
    /// An account without explicit groups or roles.
    pub fn new(user: UserId, mandator: MandatorId, mandator_group: GroupId) -> Self {
        Self {
            user,
            mandator,
            mandator_group,
            groups: BTreeSet::new(),
            roles: BTreeSet::new(),
        }
    }

    /// Add a group.
    pub fn with_group(mut self, group: GroupId) -> Self {
        self.groups.insert(group);
        self
    }

    /// Add a role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }
}

/// Accounts held in memory.
#[derive(Clone, Default)]
pub struct InMemoryAccounts {
    accounts: Arc<DashMap<UserId, Account>>,
    sink: SharedSink,
}

impl InMemoryAccounts {
    /// Create an empty account source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an account.
    pub fn put(&self, account: Account) {
        let user = account.user;
        if self.accounts.insert(user, account).is_some() {
            self.sink.invalidate(&Invalidation::User(user));
        }
    }

    /// Change an account in place.
    pub fn update<F>(&self, user: UserId, f: F) -> Result<()>
    where
        F: FnOnce(&mut Account),
    {
        {
            let mut account = self.accounts.get_mut(&user).ok_or(NotFoundError::User(user))?;
            f(&mut account);
        }
        self.sink.invalidate(&Invalidation::User(user));
        Ok(())
    }

    /// Remove an account.
    pub fn remove(&self, user: UserId) -> Option<Account> {
        let removed = self.accounts.remove(&user).map(|(_, account)| account);
        if removed.is_some() {
            self.sink.invalidate(&Invalidation::User(user));
        }
        removed
    }
}

impl AccountSource for InMemoryAccounts {
    fn load_ticket(&self, user: UserId) -> Result<UserTicket> {
        let account = self.accounts.get(&user).ok_or(NotFoundError::User(user))?;
        Ok(UserTicket::builder(account.user, account.mandator, account.mandator_group)
            .groups(account.groups.iter().copied())
            .roles(account.roles.iter().copied())
            .build())
    }

    fn set_invalidation_sink(&self, sink: Arc<dyn InvalidationSink>) {
        self.sink.set(sink);
    }
}
