//! Governing-ACL providers.
//!
//! One provider per ACL category supplies the security snapshot of the
//! objects it owns: the type registry for STRUCTURE, the workflow step
//! registry for WORKFLOW, the content repository for INSTANCE and the
//! briefcase registry for BRIEFCASE. Each of them also reports whether it
//! still references an ACL, which keeps referenced ACLs from being removed.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use warden_acl::{AclUsage, Invalidation, InvalidationSink, SharedSink};
use warden_core::error::{NotFoundError, ObjectRef, Result};
use warden_core::id::{AclId, BriefcaseId, ContentId, ContentTypeId, MandatorId, StepId, UserId};
use warden_core::types::{AclCategory, TypePermissions};

use super::{GoverningAclSource, SecuredObject, SecurityInfo, TypeSecurity};

/// A content type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeDef {
    /// Security settings of the type.
    pub security: TypeSecurity,

    /// Type name.
    pub name: String,

    /// Property assignments with an explicit ACL, by property path.
    pub property_acls: BTreeMap<String, AclId>,
}

impl ContentTypeDef {
    /// Create a type definition.
    pub fn new(
        id: ContentTypeId,
        name: impl Into<String>,
        mandator: MandatorId,
        acl: AclId,
        permissions: TypePermissions,
    ) -> Self {
        Self {
            security: TypeSecurity {
                id,
                acl,
                permissions,
                mandator,
            },
            name: name.into(),
            property_acls: BTreeMap::new(),
        }
    }

    /// Assign an ACL to a property.
    pub fn with_property_acl(mut self, path: impl Into<String>, acl: AclId) -> Self {
        self.property_acls.insert(path.into(), acl);
        self
    }

    fn references(&self, acl: AclId) -> bool {
        self.security.acl == acl || self.property_acls.values().any(|a| *a == acl)
    }
}

/// A workflow step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDef {
    /// The step.
    pub id: StepId,

    /// Step name.
    pub name: String,

    /// The step's WORKFLOW ACL.
    pub acl: AclId,
}

/// A persisted content instance as far as security needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// The content.
    pub id: ContentId,

    /// Its type.
    pub type_id: ContentTypeId,

    /// Owning mandator.
    pub mandator: MandatorId,

    /// Instance ACLs.
    pub acls: BTreeSet<AclId>,

    /// Current workflow step.
    pub step: Option<StepId>,

    /// Creator.
    pub creator: UserId,
}

/// A briefcase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefcaseDef {
    /// The briefcase.
    pub id: BriefcaseId,

    /// Name.
    pub name: String,

    /// Owning mandator.
    pub mandator: MandatorId,

    /// Shared briefcases carry a BRIEFCASE ACL; private ones only their
    /// owner may use.
    pub acl: Option<AclId>,

    /// The owner.
    pub owner: UserId,
}

/// Content types by id.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: Arc<DashMap<ContentTypeId, ContentTypeDef>>,
    sink: SharedSink,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a type.
    pub fn register(&self, def: ContentTypeDef) {
        let id = def.security.id;
        self.types.insert(id, def);
        self.sink.invalidate(&Invalidation::Type(id));
    }

    /// Get a type.
    pub fn get(&self, id: ContentTypeId) -> Result<ContentTypeDef> {
        Ok(self.types.get(&id).ok_or(NotFoundError::Type(id))?.clone())
    }

    /// Remove a type.
    pub fn remove(&self, id: ContentTypeId) -> Option<ContentTypeDef> {
        let removed = self.types.remove(&id).map(|(_, def)| def);
        if removed.is_some() {
            self.sink.invalidate(&Invalidation::Type(id));
        }
        removed
    }
}

impl GoverningAclSource for TypeRegistry {
    fn category(&self) -> AclCategory {
        AclCategory::Structure
    }

    fn security_info(&self, object: &SecuredObject) -> Result<SecurityInfo> {
        let SecuredObject::Type(id) = object else {
            return Err(NotFoundError::Provider(object.category()).into());
        };
        let def = self.get(*id)?;
        Ok(SecurityInfo::new(ObjectRef::Type(*id), [def.security.acl])
            .with_type_permissions(TypePermissions::INSTANCE)
            .with_mandator(def.security.mandator))
    }

    fn set_invalidation_sink(&self, sink: Arc<dyn InvalidationSink>) {
        self.sink.set(sink);
    }
}

impl AclUsage for TypeRegistry {
    fn usage_of(&self, acl: AclId) -> Option<String> {
        self.types
            .iter()
            .find(|e| e.value().references(acl))
            .map(|e| format!("type '{}'", e.value().name))
    }
}

/// Workflow steps by id.
#[derive(Clone, Default)]
pub struct StepRegistry {
    steps: Arc<DashMap<StepId, StepDef>>,
    sink: SharedSink,
}

impl StepRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a step.
    pub fn register(&self, def: StepDef) {
        let id = def.id;
        self.steps.insert(id, def);
        self.sink.invalidate(&Invalidation::Step(id));
    }

    /// Get a step.
    pub fn get(&self, id: StepId) -> Result<StepDef> {
        Ok(self.steps.get(&id).ok_or(NotFoundError::Step(id))?.clone())
    }
}

impl GoverningAclSource for StepRegistry {
    fn category(&self) -> AclCategory {
        AclCategory::Workflow
    }

    fn security_info(&self, object: &SecuredObject) -> Result<SecurityInfo> {
        let SecuredObject::Step(id) = object else {
            return Err(NotFoundError::Provider(object.category()).into());
        };
        let def = self.get(*id)?;
        Ok(SecurityInfo::new(ObjectRef::Step(*id), [def.acl])
            .with_type_permissions(TypePermissions::INSTANCE))
    }

    fn set_invalidation_sink(&self, sink: Arc<dyn InvalidationSink>) {
        self.sink.set(sink);
    }
}

impl AclUsage for StepRegistry {
    fn usage_of(&self, acl: AclId) -> Option<String> {
        self.steps
            .iter()
            .find(|e| e.value().acl == acl)
            .map(|e| format!("step '{}'", e.value().name))
    }
}

/// Content records by id, resolved against the type and step registries.
#[derive(Clone)]
pub struct ContentRepository {
    contents: Arc<DashMap<ContentId, ContentRecord>>,
    types: TypeRegistry,
    steps: StepRegistry,
    sink: SharedSink,
}

impl ContentRepository {
    /// Create an empty repository.
    pub fn new(types: TypeRegistry, steps: StepRegistry) -> Self {
        Self {
            contents: Arc::new(DashMap::new()),
            types,
            steps,
            sink: SharedSink::new(),
        }
    }

    /// Add or replace a content record.
    ///
    /// Replacing a record invalidates its cached snapshot, so this is the
    /// point after which a save is visible to permission checks.
    pub fn store(&self, record: ContentRecord) {
        let id = record.id;
        if self.contents.insert(id, record).is_some() {
            self.sink.invalidate(&Invalidation::Content(id));
        }
    }

    /// Get a content record.
    pub fn get(&self, id: ContentId) -> Result<ContentRecord> {
        Ok(self
            .contents
            .get(&id)
            .ok_or(NotFoundError::Content(id))?
            .clone())
    }

    /// Remove a content record.
    pub fn remove(&self, id: ContentId) -> Option<ContentRecord> {
        let removed = self.contents.remove(&id).map(|(_, record)| record);
        if removed.is_some() {
            self.sink.invalidate(&Invalidation::Content(id));
        }
        removed
    }

    /// The type registry.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// The step registry.
    pub fn steps(&self) -> &StepRegistry {
        &self.steps
    }
}

impl GoverningAclSource for ContentRepository {
    fn category(&self) -> AclCategory {
        AclCategory::Instance
    }

    fn security_info(&self, object: &SecuredObject) -> Result<SecurityInfo> {
        let SecuredObject::Content(id) = object else {
            return Err(NotFoundError::Provider(object.category()).into());
        };
        let record = self.get(*id)?;
        let def = self.types.get(record.type_id)?;

        let mut info =
            SecurityInfo::for_content(ObjectRef::Content(*id), &def.security, record.acls.iter().copied())
                .with_mandator(record.mandator)
                .with_creator(record.creator);
        if let Some(step) = record.step {
            info = info.with_step_acl(self.steps.get(step)?.acl);
        }
        if def.security.permissions.use_property() {
            info.property_acls = def.property_acls.clone();
        }
        Ok(info)
    }

    fn set_invalidation_sink(&self, sink: Arc<dyn InvalidationSink>) {
        // Content snapshots also depend on their types and steps
        self.types.sink.set(sink.clone());
        self.steps.sink.set(sink.clone());
        self.sink.set(sink);
    }
}

impl AclUsage for ContentRepository {
    fn usage_of(&self, acl: AclId) -> Option<String> {
        self.contents
            .iter()
            .find(|e| e.value().acls.contains(&acl))
            .map(|e| format!("content {}", e.key()))
    }
}

/// Briefcases by id.
#[derive(Clone, Default)]
pub struct BriefcaseRegistry {
    briefcases: Arc<DashMap<BriefcaseId, BriefcaseDef>>,
}

impl BriefcaseRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a briefcase.
    pub fn register(&self, def: BriefcaseDef) {
        self.briefcases.insert(def.id, def);
    }

    /// Get a briefcase.
    pub fn get(&self, id: BriefcaseId) -> Result<BriefcaseDef> {
        Ok(self
            .briefcases
            .get(&id)
            .ok_or(NotFoundError::Briefcase(id))?
            .clone())
    }
}

impl GoverningAclSource for BriefcaseRegistry {
    fn category(&self) -> AclCategory {
        AclCategory::Briefcase
    }

    fn security_info(&self, object: &SecuredObject) -> Result<SecurityInfo> {
        let SecuredObject::Briefcase(id) = object else {
            return Err(NotFoundError::Provider(object.category()).into());
        };
        let def = self.get(*id)?;
        Ok(SecurityInfo::new(ObjectRef::Briefcase(*id), def.acl)
            .with_type_permissions(TypePermissions::INSTANCE)
            .with_mandator(def.mandator)
            .with_creator(def.owner))
    }
}

impl AclUsage for BriefcaseRegistry {
    fn usage_of(&self, acl: AclId) -> Option<String> {
        self.briefcases
            .iter()
            .find(|e| e.value().acl == Some(acl))
            .map(|e| format!("briefcase '{}'", e.value().name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: ContentTypeId = ContentTypeId::from_raw(20);

    fn repository() -> ContentRepository {
        let types = TypeRegistry::new();
        types.register(
            ContentTypeDef::new(ARTICLE, "Article", MandatorId::from_raw(1), AclId::from_raw(2), TypePermissions::all())
                .with_property_acl("/SALARY", AclId::from_raw(1010)),
        );
        let steps = StepRegistry::new();
        steps.register(StepDef {
            id: StepId::from_raw(3),
            name: "Edit".to_string(),
            acl: AclId::from_raw(3),
        });
        ContentRepository::new(types, steps)
    }

    #[test]
    fn test_content_security_info() {
        let repo = repository();
        repo.store(ContentRecord {
            id: ContentId::from_raw(1),
            type_id: ARTICLE,
            mandator: MandatorId::from_raw(1),
            acls: [AclId::from_raw(1001), AclId::from_raw(1002)].into_iter().collect(),
            step: Some(StepId::from_raw(3)),
            creator: UserId::from_raw(50),
        });

        let info = repo
            .security_info(&SecuredObject::Content(ContentId::from_raw(1)))
            .unwrap();
        assert_eq!(info.type_acl, Some(AclId::from_raw(2)));
        assert_eq!(info.instance_acls.len(), 2);
        assert_eq!(info.step_acl, Some(AclId::from_raw(3)));
        assert_eq!(info.creator, Some(UserId::from_raw(50)));
        assert_eq!(info.property_acls.get("/SALARY"), Some(&AclId::from_raw(1010)));
    }

    #[test]
    fn test_missing_content_and_wrong_object() {
        let repo = repository();
        assert!(matches!(
            repo.security_info(&SecuredObject::Content(ContentId::from_raw(9))),
            Err(warden_core::Error::NotFound(NotFoundError::Content(_)))
        ));
        assert!(matches!(
            repo.security_info(&SecuredObject::Type(ARTICLE)),
            Err(warden_core::Error::NotFound(NotFoundError::Provider(_)))
        ));
    }

    #[test]
    fn test_usage() {
        let repo = repository();
        assert_eq!(
            repo.types().usage_of(AclId::from_raw(1010)),
            Some("type 'Article'".to_string())
        );
        assert_eq!(repo.steps().usage_of(AclId::from_raw(3)), Some("step 'Edit'".to_string()));
        assert_eq!(repo.usage_of(AclId::from_raw(1001)), None);
    }

    #[derive(Default)]
    struct Recorder(parking_lot::Mutex<Vec<Invalidation>>);

    impl InvalidationSink for Recorder {
        fn invalidate(&self, event: &Invalidation) {
            self.0.lock().push(event.clone());
        }
    }

    #[test]
    fn test_changes_are_reported() {
        let repo = repository();
        let recorder = Arc::new(Recorder::default());
        repo.set_invalidation_sink(recorder.clone());

        let record = ContentRecord {
            id: ContentId::from_raw(1),
            type_id: ARTICLE,
            mandator: MandatorId::from_raw(1),
            acls: BTreeSet::from([AclId::from_raw(1001)]),
            step: None,
            creator: UserId::from_raw(50),
        };
        // A new record has no cached snapshot yet
        repo.store(record.clone());
        assert!(recorder.0.lock().is_empty());

        repo.store(record);
        repo.steps().register(StepDef {
            id: StepId::from_raw(3),
            name: "Closed".to_string(),
            acl: AclId::from_raw(4),
        });
        repo.types().remove(ARTICLE);
        repo.remove(ContentId::from_raw(1));
        assert!(repo.remove(ContentId::from_raw(1)).is_none());

        assert_eq!(
            *recorder.0.lock(),
            vec![
                Invalidation::Content(ContentId::from_raw(1)),
                Invalidation::Step(StepId::from_raw(3)),
                Invalidation::Type(ARTICLE),
                Invalidation::Content(ContentId::from_raw(1)),
            ]
        );
    }

    #[test]
    fn test_private_briefcase_has_no_acl() {
        let registry = BriefcaseRegistry::new();
        registry.register(BriefcaseDef {
            id: BriefcaseId::from_raw(4),
            name: "Mine".to_string(),
            mandator: MandatorId::from_raw(1),
            acl: None,
            owner: UserId::from_raw(50),
        });
        let info = registry
            .security_info(&SecuredObject::Briefcase(BriefcaseId::from_raw(4)))
            .unwrap();
        assert!(info.instance_acls.is_empty());
        assert!(info.is_owned_by(UserId::from_raw(50)));
    }
}
