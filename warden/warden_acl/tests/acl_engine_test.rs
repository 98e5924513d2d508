//! Integration tests for ACL administration.
//!
//! These go through the public engine API only and check what ends up in
//! the store and in snapshots.

use std::sync::Arc;

use parking_lot::Mutex;
use warden_acl::{
    AclEngine, AclEngineConfig, AclStore, AclUpdate, AssignmentLookup, AssignmentRow, Group,
    InMemoryAclStore, Invalidation, InvalidationSink, NewAcl,
};
use warden_core::error::{AccessError, Error};
use warden_core::id::{AclId, GroupId, MandatorId, UserId};
use warden_core::types::{AclCategory, PermissionSet, Role, UserTicket};

const MANDATOR: MandatorId = MandatorId::from_raw(3);
const GROUP_7: GroupId = GroupId::from_raw(7);

#[derive(Default)]
struct Collect(Mutex<Vec<Invalidation>>);

impl InvalidationSink for Collect {
    fn invalidate(&self, event: &Invalidation) {
        self.0.lock().push(event.clone());
    }
}

fn setup() -> (AclEngine<InMemoryAclStore>, Arc<Collect>, UserTicket) {
    let store = InMemoryAclStore::new();
    store.insert_group(Group::new(GROUP_7, MANDATOR, "Group 7")).unwrap();
    let sink = Arc::new(Collect::default());
    let engine = AclEngine::new(store, AclEngineConfig::default()).with_sink(sink.clone());
    let ticket = UserTicket::builder(UserId::from_raw(42), MANDATOR, GroupId::from_raw(30))
        .role(Role::MandatorSupervisor)
        .build();
    (engine, sink, ticket)
}

#[test]
fn test_all_false_assignment_stores_nothing() {
    let (engine, _, ticket) = setup();
    let acl = engine
        .create(&ticket, NewAcl::new("Docs", "Docs", MANDATOR, AclCategory::Instance))
        .unwrap();

    // Assign with every bit false
    let nothing = PermissionSet::from_flags(false, false, false, false, false, false);
    engine.assign(&ticket, acl, GROUP_7, nothing).unwrap();

    // No row in the store, no row in a snapshot
    assert!(engine
        .load_assignments(&ticket, Some(acl), Some(GROUP_7))
        .unwrap()
        .is_empty());
    assert_eq!(engine.store().snapshot().lookup(acl, GROUP_7), None);
}

#[test]
fn test_internal_acl_removal_fails_for_everyone() {
    let (engine, _, ticket) = setup();
    let supervisor = ticket.clone_as_global_supervisor();

    for id in [1, 2, 3, 4, 5, 6, 8] {
        let err = engine.remove(&supervisor, AclId::from_raw(id)).unwrap_err();
        assert!(matches!(err, Error::Access(AccessError::InternalAcl(_))));
        let err = engine.remove(&ticket, AclId::from_raw(id)).unwrap_err();
        assert!(matches!(err, Error::Access(AccessError::InternalAcl(_))));
    }

    // Still there
    assert_eq!(engine.load_all(&ticket, None).unwrap().len(), 7);
}

#[test]
fn test_admin_lifecycle_feeds_snapshot() {
    let (engine, sink, ticket) = setup();

    // Create and grant read to group 7
    let acl = engine
        .create(
            &ticket,
            NewAcl::new("News", "News", MANDATOR, AclCategory::Instance)
                .with_description("Newsroom content")
                .with_color("steelblue"),
        )
        .unwrap();
    engine.assign(&ticket, acl, GROUP_7, PermissionSet::READ).unwrap();

    let snapshot = engine.store().snapshot();
    assert_eq!(snapshot.lookup(acl, GROUP_7), Some(PermissionSet::READ));
    assert_eq!(snapshot.acl_mandator(acl), Some(MANDATOR));

    // Widen through a full update
    engine
        .update(
            &ticket,
            acl,
            AclUpdate::new().assignments(vec![AssignmentRow::new(
                GROUP_7,
                PermissionSet::READ | PermissionSet::EDIT,
            )]),
        )
        .unwrap();
    assert_eq!(
        engine.store().snapshot().lookup(acl, GROUP_7),
        Some(PermissionSet::READ | PermissionSet::EDIT)
    );

    // Remove it again
    engine.remove(&ticket, acl).unwrap();
    let snapshot = engine.store().snapshot();
    assert_eq!(snapshot.lookup(acl, GROUP_7), None);
    assert_eq!(snapshot.acl_mandator(acl), None);

    let events = sink.0.lock();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], Invalidation::Group(GROUP_7));
    assert!(matches!(events[2], Invalidation::Acl { acl: a, .. } if a == acl));
}

#[test]
fn test_foreign_acl_is_invisible() {
    let (engine, _, ticket) = setup();
    let other = UserTicket::builder(UserId::from_raw(77), MandatorId::from_raw(4), GroupId::from_raw(40))
        .role(Role::AclManagement)
        .build();
    let acl = engine
        .create(&other, NewAcl::new("Other", "Other", MandatorId::from_raw(4), AclCategory::Workflow))
        .unwrap();

    assert!(matches!(
        engine.load(&ticket, acl),
        Err(Error::Access(AccessError::ForeignMandator { .. }))
    ));
    assert!(engine.assign(&ticket, acl, GROUP_7, PermissionSet::READ).is_err());
    assert!(engine.load(&ticket.clone_as_global_supervisor(), acl).is_ok());
}

#[test]
fn test_global_acl_assignments_belong_to_global_supervisor() {
    let (engine, sink, ticket) = setup();
    let everyone = AclCategory::Instance.default_acl();

    // A mandator's admin sees the global ACL but may not change its rows
    let err = engine
        .assign(&ticket, everyone, GroupId::EVERYONE, PermissionSet::all())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Access(AccessError::ForeignMandator { target, .. }) if target == MandatorId::GLOBAL
    ));
    assert!(matches!(
        engine.unassign(&ticket, everyone, GroupId::EVERYONE),
        Err(Error::Access(AccessError::ForeignMandator { .. }))
    ));
    assert_eq!(engine.store().snapshot().lookup(everyone, GroupId::EVERYONE), None);
    assert!(sink.0.lock().is_empty());

    // Reading the rows is still allowed
    assert!(engine
        .load_assignments(&ticket, Some(everyone), None)
        .unwrap()
        .is_empty());

    let supervisor = ticket.clone_as_global_supervisor();
    engine
        .assign(&supervisor, everyone, GroupId::EVERYONE, PermissionSet::READ)
        .unwrap();
    assert_eq!(
        engine.store().snapshot().lookup(everyone, GroupId::EVERYONE),
        Some(PermissionSet::READ)
    );
}
