//! # Warden ACL
//!
//! `warden_acl` holds the data the permission evaluator consumes: ACLs,
//! groups and the per-group permission bits of every ACL.
//!
//! Key concepts:
//!
//! 1. **ACL**: A named, mandator-owned permission template of a fixed
//!    category. Ids up to a reserved threshold are internal.
//!
//! 2. **Assignment**: The permission set one group holds on one ACL. At
//!    most one row exists per pair and empty rows are never stored.
//!
//! 3. **Snapshot**: An immutable copy of ACL headers and assignment bits
//!    that the evaluator reads through [`AssignmentLookup`].
//!
//! 4. **Invalidation**: Every administrative write reports what changed so
//!    that cached tickets and security infos can be refreshed.

pub mod engine;
pub mod invalidation;
pub mod model;
pub mod store;

pub use engine::{AclEngine, AclEngineConfig, AclUsage};
pub use invalidation::{Invalidation, InvalidationSink, NoopSink, SharedSink};
pub use model::{Acl, AclAssignment, AclUpdate, AssignmentRow, Group, LifecycleInfo, NewAcl};
pub use store::{AclHeader, AclSnapshot, AclStore, AssignmentLookup, InMemoryAclStore};
