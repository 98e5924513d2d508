//! The security facade.
//!
//! [`SecurityService`] ties the pieces together for one request: it takes
//! a consistent snapshot of the assignment graph, resolves the object's
//! [`SecurityInfo`] through the provider registry (cached for contents),
//! evaluates, audits and applies value masking.

use std::sync::Arc;
use tracing::debug;

use warden_acl::{AclEngine, AclEngineConfig, AclSnapshot, AclStore, Invalidation, InvalidationSink};
use warden_core::error::{InvalidParameterError, ObjectRef, Result};
use warden_core::id::{AclId, ContentId, UserId};
use warden_core::log_event;
use warden_core::types::{Permission, PermissionSet, UserTicket};
use warden_core::utils::LogLevel;

use crate::audit::{AuditEntry, DecisionAudit};
use crate::cache::{AccountSource, InvalidationFanout, SecurityInfoCache, TicketStore};
use crate::config::SecurityConfig;
use crate::engine::{EvaluationConfig, PermissionEvaluator};
use crate::info::{ContentTypeDef, ProviderRegistry, SecuredObject, SecurityInfo};
use crate::value::{wrap_no_access_values, ContentTree, SaveGuard};

/// Entry point for permission checks on secured objects.
pub struct SecurityService<S, A> {
    /// ACL and assignment storage.
    store: S,

    /// Per-category security info providers.
    providers: ProviderRegistry,

    /// ACL administration limits.
    acl_config: AclEngineConfig,

    /// Evaluation policy.
    evaluation: EvaluationConfig,

    /// Cached tickets.
    tickets: Arc<TicketStore<A>>,

    /// Cached content security infos.
    infos: Arc<SecurityInfoCache>,

    /// Decision audit, if enabled.
    audit: Option<DecisionAudit>,

    /// Receives invalidations and forwards them to the caches.
    fanout: Arc<InvalidationFanout>,
}

impl<S, A> SecurityService<S, A>
where
    S: AclStore,
    A: AccountSource + 'static,
{
    /// Create a service.
    ///
    /// # Arguments
    ///
    /// * `store` - ACL and assignment storage.
    /// * `accounts` - Source of user tickets.
    /// * `providers` - Security info providers by category.
    /// * `config` - The security configuration.
    pub fn new(store: S, accounts: A, providers: ProviderRegistry, config: &SecurityConfig) -> Self {
        let fanout = Arc::new(InvalidationFanout::new());

        // Account and registry changes reach the caches through the fanout
        accounts.set_invalidation_sink(fanout.clone());
        providers.set_invalidation_sink(fanout.clone());

        let tickets = Arc::new(TicketStore::new(accounts, config.ticket_cache.max_entries));
        let infos = Arc::new(SecurityInfoCache::new(
            config.security_info_cache.enabled,
            config.security_info_cache.max_entries,
        ));
        fanout.add_sink(tickets.clone());
        fanout.add_sink(infos.clone());

        let audit = config
            .audit
            .enabled
            .then(|| DecisionAudit::new(config.audit.max_entries_per_user, config.audit.max_users));

        log_event!(LogLevel::Info, "Security service created",
            ticket_cache => config.ticket_cache.max_entries,
            info_cache => config.security_info_cache.enabled,
            audit => config.audit.enabled,
        );

        Self {
            store,
            providers,
            acl_config: config.acl.clone(),
            evaluation: config.evaluation.clone(),
            tickets,
            infos,
            audit,
            fanout,
        }
    }

    /// The sink administrative writes must report to.
    pub fn invalidation_sink(&self) -> Arc<dyn InvalidationSink> {
        self.fanout.clone()
    }

    /// The ticket of `user`, rebuilt if it was flagged dirty.
    pub fn ticket(&self, user: UserId) -> Result<Arc<UserTicket>> {
        self.tickets.get(user)
    }

    /// The ticket store.
    pub fn tickets(&self) -> &TicketStore<A> {
        &self.tickets
    }

    /// The security info cache.
    pub fn info_cache(&self) -> &SecurityInfoCache {
        &self.infos
    }

    /// The decision audit, if enabled.
    pub fn audit(&self) -> Option<&DecisionAudit> {
        self.audit.as_ref()
    }

    /// An evaluator over a fresh snapshot of the assignment graph.
    pub fn evaluator(&self) -> PermissionEvaluator<AclSnapshot> {
        PermissionEvaluator::new(self.store.snapshot(), self.evaluation.clone())
    }

    /// The security info of `object`.
    pub fn security_info(&self, object: &SecuredObject) -> Result<Arc<SecurityInfo>> {
        match object {
            SecuredObject::Content(id) => self
                .infos
                .get_or_load(*id, || self.providers.resolve(object)),
            _ => self.providers.resolve(object).map(Arc::new),
        }
    }

    /// Whether `ticket` may perform `permission` on `object`.
    pub fn may_perform(
        &self,
        ticket: &UserTicket,
        permission: Permission,
        object: &SecuredObject,
    ) -> Result<bool> {
        let info = self.security_info(object)?;
        Ok(self.evaluator().may_perform(ticket, permission, &info))
    }

    /// Check `permission` on `object`, recording the decision when
    /// auditing is enabled.
    pub fn check_permission(
        &self,
        ticket: &UserTicket,
        permission: Permission,
        object: &SecuredObject,
    ) -> Result<()> {
        let info = self.security_info(object)?;
        self.check_audited(&self.evaluator(), ticket, permission, &info)
    }

    /// Every permission `ticket` holds on `object`.
    pub fn get_permissions(&self, ticket: &UserTicket, object: &SecuredObject) -> Result<PermissionSet> {
        let info = self.security_info(object)?;
        self.evaluator().get_permissions(ticket, &info)
    }

    /// Secure a content tree loaded from storage.
    ///
    /// Fails if the caller may not read the content; otherwise masks the
    /// properties the caller may not read and marks those it may not edit
    /// as read-only.
    pub fn load_secured(&self, ticket: &UserTicket, stored: ContentTree) -> Result<ContentTree> {
        let id = content_id(&stored)?;
        let info = self.security_info(&SecuredObject::Content(id))?;
        let evaluator = self.evaluator();

        self.check_audited(&evaluator, ticket, Permission::Read, &info)?;
        Ok(wrap_no_access_values(&evaluator, ticket, &info, stored))
    }

    /// Check an edit of existing content and produce the tree to persist.
    ///
    /// The cached snapshot stays valid until the record changes: storing
    /// the record through [`ContentRepository`](crate::info::ContentRepository)
    /// invalidates it, other stores must call
    /// [`content_changed`](Self::content_changed) after persisting.
    pub fn prepare_save(
        &self,
        ticket: &UserTicket,
        edited: ContentTree,
        persisted: &ContentTree,
    ) -> Result<ContentTree> {
        let id = content_id(&edited)?;
        if persisted.id != Some(id) {
            return Err(InvalidParameterError::new(
                "persisted",
                format!("stored tree does not belong to content {}", id),
            )
            .into());
        }

        let info = self.security_info(&SecuredObject::Content(id))?;
        let evaluator = self.evaluator();
        SaveGuard::new(&evaluator).prepare_save(ticket, &info, edited, Some(persisted))
    }

    /// Check the creation of new content and produce the tree to persist.
    ///
    /// # Arguments
    ///
    /// * `ticket` - The creator.
    /// * `content_type` - Type of the new content.
    /// * `content_acls` - Instance ACLs the content will get.
    /// * `step_acl` - ACL of the initial workflow step, if any.
    /// * `edited` - The new content's properties.
    pub fn prepare_create(
        &self,
        ticket: &UserTicket,
        content_type: &ContentTypeDef,
        content_acls: &[AclId],
        step_acl: Option<AclId>,
        edited: ContentTree,
    ) -> Result<ContentTree> {
        let security = &content_type.security;
        let mut info = SecurityInfo::for_content(
            ObjectRef::NewContent(security.id),
            security,
            content_acls.iter().copied(),
        )
        .with_mandator(ticket.mandator_id())
        .with_creator(ticket.user_id())
        .not_persisted();
        if let Some(acl) = step_acl {
            info = info.with_step_acl(acl);
        }
        if security.permissions.use_property() {
            info.property_acls = content_type.property_acls.clone();
        }

        let evaluator = self.evaluator();
        self.check_audited(&evaluator, ticket, Permission::Create, &info)?;
        SaveGuard::new(&evaluator).prepare_save(ticket, &info, edited, None)
    }

    /// Report that the persisted record of `content` changed.
    ///
    /// Goes through the generation bump, so a load that raced with the
    /// write cannot put the old snapshot back.
    pub fn content_changed(&self, content: ContentId) {
        self.fanout.invalidate(&Invalidation::Content(content));
    }

    fn check_audited(
        &self,
        evaluator: &PermissionEvaluator<AclSnapshot>,
        ticket: &UserTicket,
        permission: Permission,
        info: &SecurityInfo,
    ) -> Result<()> {
        let decision = evaluator.decide(ticket, permission, info);
        let audit_id = self.audit.as_ref().map(|audit| {
            let entry = AuditEntry::new(ticket.user_id(), &info.object, permission, &decision);
            let id = entry.id;
            audit.record(entry);
            id
        });
        if !decision.allowed {
            debug!(
                user = %ticket.user_id(),
                object = %info.object,
                permission = %permission,
                reason = %decision.reason,
                audit_id = ?audit_id,
                "Access denied"
            );
        }
        decision.into_result(info.object, permission)
    }
}

impl<S, A> SecurityService<S, A>
where
    S: AclStore + Clone,
    A: AccountSource + 'static,
{
    /// An ACL engine over the same store, reporting to this service's
    /// caches.
    pub fn acl_engine(&self) -> AclEngine<S> {
        AclEngine::new(self.store.clone(), self.acl_config.clone()).with_sink(self.invalidation_sink())
    }
}

fn content_id(tree: &ContentTree) -> Result<ContentId> {
    tree.id
        .ok_or_else(|| InvalidParameterError::new("tree", "content has no id").into())
}
