//! # Warden Security
//!
//! Permission evaluation for the Warden access-control engine.
//!
//! A request flows through this crate as follows:
//!
//! 1. the caller's [`UserTicket`](warden_core::UserTicket) comes from the
//!    [`TicketStore`], rebuilt whenever an invalidation flagged it dirty;
//! 2. the object's [`SecurityInfo`] is computed by the provider of its
//!    category and cached per content;
//! 3. the [`PermissionEvaluator`] decides over a consistent
//!    [`AclSnapshot`](warden_acl::AclSnapshot) of the assignment graph;
//! 4. loaded values the caller may not read are masked, and the
//!    [`SaveGuard`] restores them before an edit is persisted.
//!
//! [`SecurityService`] bundles these steps.
//!
//! ## Crate Structure
//!
//! - **info**: Security snapshots and per-category providers
//! - **engine**: The permission evaluator and its policy
//! - **value**: Masking and save checks of property values
//! - **cache**: Ticket store, security info cache, invalidation fanout
//! - **audit**: Recent decisions per user
//! - **config**: Configuration loading and validation
//! - **logging**: Subscriber initialisation

pub mod audit;
pub mod cache;
pub mod config;
pub mod engine;
pub mod info;
pub mod logging;
pub mod service;
pub mod value;

pub use audit::{AuditEntry, DecisionAudit};
pub use cache::{
    Account, AccountSource, InMemoryAccounts, InvalidationFanout, SecurityInfoCache, TicketStore,
};
pub use config::{ConfigError, LoggingConfig, SecurityConfig};
pub use engine::{
    Decision, DecisionReason, EvaluationConfig, PermissionEvaluator, PropertyAclFallback,
    StepAclScope,
};
pub use info::{
    BriefcaseDef, BriefcaseRegistry, ContentRecord, ContentRepository, ContentTypeDef,
    GoverningAclSource, ProviderRegistry, SecuredObject, SecurityInfo, StepDef, StepRegistry,
    TypeRegistry, TypeSecurity,
};
pub use logging::init_logging;
pub use service::SecurityService;
pub use value::{
    unwrap_no_access_values, wrap_no_access_values, ContentTree, FieldValue, Masked, SaveGuard,
};
