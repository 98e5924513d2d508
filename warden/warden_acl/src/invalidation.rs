//! Invalidation events.
//!
//! Every administrative write that may change someone's effective
//! permissions emits an [`Invalidation`]. Caches of tickets and security
//! infos subscribe through [`InvalidationSink`] and mark the affected
//! entries dirty; the next read recomputes them.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};
use warden_core::id::{AclId, ContentId, ContentTypeId, GroupId, StepId, UserId};

/// What changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Invalidation {
    /// Roles or groups of one account changed.
    User(UserId),

    /// Assignments of one group changed.
    Group(GroupId),

    /// An ACL changed or was removed; `groups` held assignments on it.
    Acl {
        /// The ACL.
        acl: AclId,
        /// Groups that had assignments on the ACL before the change.
        groups: Vec<GroupId>,
    },

    /// A workflow step changed its ACL.
    Step(StepId),

    /// A content type changed its ACLs or permission toggles.
    Type(ContentTypeId),

    /// A content record changed its ACLs, step or creator.
    Content(ContentId),

    /// Everything is stale.
    All,
}

impl fmt::Display for Invalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user {}", id),
            Self::Group(id) => write!(f, "group {}", id),
            Self::Acl { acl, groups } => write!(f, "acl {} ({} groups)", acl, groups.len()),
            Self::Step(id) => write!(f, "step {}", id),
            Self::Type(id) => write!(f, "type {}", id),
            Self::Content(id) => write!(f, "content {}", id),
            Self::All => write!(f, "all"),
        }
    }
}

/// Receiver of invalidation events.
pub trait InvalidationSink: Send + Sync {
    /// Handle one event. Must not fail and must not block for long.
    fn invalidate(&self, event: &Invalidation);
}

impl<T: InvalidationSink + ?Sized> InvalidationSink for Arc<T> {
    fn invalidate(&self, event: &Invalidation) {
        (**self).invalidate(event)
    }
}

/// A sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl InvalidationSink for NoopSink {
    fn invalidate(&self, _event: &Invalidation) {}
}

/// A sink that can be replaced after construction.
///
/// Clones share the slot, so every clone of a registry reports to the sink
/// set last on any of them. The slot holds the sink weakly: caches own
/// the sources that report to them.
#[derive(Clone)]
pub struct SharedSink(Arc<RwLock<Option<Weak<dyn InvalidationSink>>>>);

impl SharedSink {
    /// A slot that drops events until a sink is set.
    pub fn new() -> Self {
        Self(Arc::new(RwLock::new(None)))
    }

    /// Report to `sink` from now on, for as long as it is alive.
    pub fn set(&self, sink: Arc<dyn InvalidationSink>) {
        *self.0.write() = Some(Arc::downgrade(&sink));
    }
}

impl Default for SharedSink {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSink")
    }
}

impl InvalidationSink for SharedSink {
    fn invalidate(&self, event: &Invalidation) {
        // Release the slot before delivering
        let sink = self.0.read().as_ref().and_then(Weak::upgrade);
        if let Some(sink) = sink {
            sink.invalidate(event);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Records every event it receives.
    #[derive(Default)]
    pub struct RecordingSink {
        pub events: Mutex<Vec<Invalidation>>,
    }

    impl InvalidationSink for RecordingSink {
        fn invalidate(&self, event: &Invalidation) {
            self.events.lock().push(event.clone());
        }
    }
}
