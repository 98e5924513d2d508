//! Cached tickets with dirty flags.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use warden_acl::{Invalidation, InvalidationSink};
use warden_core::error::Result;
use warden_core::id::{AclId, GroupId, UserId};
use warden_core::types::UserTicket;

use super::AccountSource;

struct Entry {
    ticket: Arc<UserTicket>,
    dirty: bool,
}

/// Tickets by user, rebuilt from the account source when flagged dirty.
///
/// Staleness is bounded by the next [`get`](Self::get) after an
/// invalidation; readers holding an older `Arc<UserTicket>` keep using it
/// until their request ends. Every invalidation advances an epoch first,
/// and a rebuild that saw the epoch move while loading stores its ticket
/// as dirty.
pub struct TicketStore<A> {
    /// Source of fresh tickets.
    source: A,

    /// Cached tickets.
    entries: DashMap<UserId, Entry>,

    /// Capacity bound.
    max_entries: usize,

    /// Advanced before every round of dirty flagging.
    epoch: AtomicU64,
}

impl<A> TicketStore<A>
where
    A: AccountSource,
{
    /// Create a ticket store.
    ///
    /// # Arguments
    ///
    /// * `source` - Builds tickets for missing or dirty entries.
    /// * `max_entries` - Maximum number of cached tickets.
    pub fn new(source: A, max_entries: usize) -> Self {
        Self {
            source,
            entries: DashMap::new(),
            max_entries,
            epoch: AtomicU64::new(0),
        }
    }

    /// The ticket of `user`, rebuilt if missing or dirty.
    pub fn get(&self, user: UserId) -> Result<Arc<UserTicket>> {
        if let Some(entry) = self.entries.get(&user) {
            if !entry.dirty {
                return Ok(entry.ticket.clone());
            }
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let ticket = Arc::new(self.source.load_ticket(user)?);
        self.entries.insert(
            user,
            Entry {
                ticket: ticket.clone(),
                dirty: false,
            },
        );

        // An invalidation during the load may have missed the new entry
        if self.epoch.load(Ordering::SeqCst) != epoch {
            if let Some(mut entry) = self.entries.get_mut(&user) {
                entry.dirty = true;
            }
            debug!(user = %user, "Ticket refreshed while invalidated, kept dirty");
        } else {
            debug!(user = %user, "Ticket refreshed");
        }
        self.evict(user);
        Ok(ticket)
    }

    /// Drop the cached ticket of `user`.
    pub fn remove(&self, user: UserId) {
        self.entries.remove(&user);
    }

    /// Whether the ticket of `user` is cached and dirty.
    pub fn is_dirty(&self, user: UserId) -> Option<bool> {
        self.entries.get(&user).map(|entry| entry.dirty)
    }

    /// Number of cached tickets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no ticket is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flag the ticket of `user` dirty.
    pub fn flag_dirty_having_user(&self, user: UserId) -> usize {
        self.flag_dirty(|ticket| ticket.user_id() == user)
    }

    /// Flag every ticket that is a member of `group` dirty.
    pub fn flag_dirty_having_group(&self, group: GroupId) -> usize {
        self.flag_dirty(|ticket| ticket.is_in_group(group))
    }

    /// Flag every ticket holding `acl` through one of `groups` dirty.
    pub fn flag_dirty_having_acl(&self, acl: AclId, groups: &[GroupId]) -> usize {
        let flagged = self.flag_dirty(|ticket| groups.iter().any(|group| ticket.is_in_group(*group)));
        debug!(acl = %acl, flagged, "Tickets flagged for ACL change");
        flagged
    }

    /// Flag every ticket dirty.
    pub fn flag_dirty_all(&self) -> usize {
        self.flag_dirty(|_| true)
    }

    fn flag_dirty<F>(&self, matches: F) -> usize
    where
        F: Fn(&UserTicket) -> bool,
    {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let mut flagged = 0;
        for mut entry in self.entries.iter_mut() {
            if !entry.dirty && matches(&entry.ticket) {
                entry.dirty = true;
                flagged += 1;
            }
        }
        flagged
    }

    /// Evict entries beyond the capacity bound, dirty ones first.
    fn evict(&self, keep: UserId) {
        while self.entries.len() > self.max_entries {
            let dirty = self
                .entries
                .iter()
                .find(|e| *e.key() != keep && e.dirty)
                .map(|e| *e.key());
            let victim = match dirty {
                Some(user) => Some(user),
                None => self
                    .entries
                    .iter()
                    .find(|e| *e.key() != keep)
                    .map(|e| *e.key()),
            };
            match victim {
                Some(user) => {
                    self.entries.remove(&user);
                }
                None => break,
            }
        }
    }
}

impl<A> InvalidationSink for TicketStore<A>
where
    A: AccountSource,
{
    fn invalidate(&self, event: &Invalidation) {
        match event {
            Invalidation::User(user) => {
                self.flag_dirty_having_user(*user);
            }
            Invalidation::Group(group) => {
                self.flag_dirty_having_group(*group);
            }
            Invalidation::Acl { acl, groups } => {
                self.flag_dirty_having_acl(*acl, groups);
            }
            Invalidation::All => {
                self.flag_dirty_all();
            }
            // Tickets do not depend on steps, types or contents
            Invalidation::Step(_) | Invalidation::Type(_) | Invalidation::Content(_) => {}
        }
    }
}
