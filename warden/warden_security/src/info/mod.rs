//! Security snapshots and the per-category providers that compute them.

mod providers;
mod security_info;

pub use providers::{
    BriefcaseDef, BriefcaseRegistry, ContentRecord, ContentRepository, ContentTypeDef, StepDef,
    StepRegistry, TypeRegistry,
};
pub use security_info::{SecurityInfo, TypeSecurity};

use std::collections::HashMap;
use std::sync::Arc;

use warden_acl::InvalidationSink;
use warden_core::error::{NotFoundError, Result};
use warden_core::id::{BriefcaseId, ContentId, ContentTypeId, StepId};
use warden_core::types::AclCategory;

/// A reference to an object secured by ACLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecuredObject {
    /// A content instance.
    Content(ContentId),
    /// A content type.
    Type(ContentTypeId),
    /// A workflow step.
    Step(StepId),
    /// A briefcase.
    Briefcase(BriefcaseId),
}

impl SecuredObject {
    /// The ACL category governing this kind of object.
    pub fn category(&self) -> AclCategory {
        match self {
            Self::Content(_) => AclCategory::Instance,
            Self::Type(_) => AclCategory::Structure,
            Self::Step(_) => AclCategory::Workflow,
            Self::Briefcase(_) => AclCategory::Briefcase,
        }
    }
}

/// Supplies security snapshots for the objects of one category.
pub trait GoverningAclSource: Send + Sync {
    /// The category this source is responsible for.
    fn category(&self) -> AclCategory;

    /// Compute the security snapshot of `object`.
    ///
    /// # Returns
    ///
    /// * `Ok(SecurityInfo)` - The snapshot.
    /// * `Err` - If the object does not exist or belongs to another category.
    fn security_info(&self, object: &SecuredObject) -> Result<SecurityInfo>;

    /// Report changes to the objects of this source to `sink`.
    ///
    /// Sources whose snapshots are never cached may ignore this.
    fn set_invalidation_sink(&self, _sink: Arc<dyn InvalidationSink>) {}
}

/// Dispatches snapshot requests to the provider of the object's category.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<AclCategory, Arc<dyn GoverningAclSource>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any previous one of its category.
    pub fn register(&mut self, provider: Arc<dyn GoverningAclSource>) {
        self.providers.insert(provider.category(), provider);
    }

    /// Register a provider, builder style.
    pub fn with(mut self, provider: Arc<dyn GoverningAclSource>) -> Self {
        self.register(provider);
        self
    }

    /// Route the change events of every provider to `sink`.
    pub fn set_invalidation_sink(&self, sink: Arc<dyn InvalidationSink>) {
        for provider in self.providers.values() {
            provider.set_invalidation_sink(sink.clone());
        }
    }

    /// Compute the snapshot of `object`.
    pub fn resolve(&self, object: &SecuredObject) -> Result<SecurityInfo> {
        let provider = self
            .providers
            .get(&object.category())
            .ok_or(NotFoundError::Provider(object.category()))?;
        provider.security_info(object)
    }
}
