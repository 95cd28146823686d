mod common;

use common::{organization, root_with, MockTransport};
use customeros_core::model::common::User;
use customeros_core::model::organization::Organization;
use customeros_core::{EntityStatus, StoreError};
use parking_lot::Mutex;
use std::sync::Arc;

fn decode(value: serde_json::Value) -> Organization {
    serde_json::from_value(value).unwrap()
}

#[test]
fn get_returns_the_same_instance_for_an_id() {
    let transport = MockTransport::new();
    let root = root_with(&transport);
    let organizations = root.organizations().unwrap();

    let first = organizations.get("org-1");
    let second = organizations.get("org-1");
    let other = organizations.get("org-2");

    assert!(first.ptr_eq(&second));
    assert!(!first.ptr_eq(&other));
    assert_eq!(first.status(), EntityStatus::Unloaded);
    assert_eq!(first.value().metadata.id, "org-1");

    let upserted = organizations.upsert(vec![decode(organization("org-1", "Acme"))]);
    assert!(upserted[0].ptr_eq(&first));
    assert_eq!(second.read(|org| org.name.clone()), "Acme");
    assert_eq!(transport.total_calls(), 0);
}

#[test]
fn failed_write_restores_the_pre_update_value_exactly() {
    let transport = MockTransport::new();
    let root = root_with(&transport);
    let organizations = root.organizations().unwrap();
    let entity = organizations
        .upsert(vec![decode(organization("org-1", "Acme"))])
        .remove(0);
    let before = entity.value();
    let version = entity.version();

    entity
        .update(|org| {
            org.name = "Acme Renamed".to_string();
            org.owner = Some(User {
                id: "u1".to_string(),
                ..User::default()
            });
        })
        .unwrap();
    entity.update(|org| org.website = Some("acme.io".to_string())).unwrap();
    assert_eq!(entity.status(), EntityStatus::Dirty);
    assert_ne!(entity.value(), before);

    entity.rollback().unwrap();
    assert_eq!(entity.value(), before);
    assert_eq!(entity.status(), EntityStatus::Loaded);
    assert_eq!(entity.version(), version);
}

#[test]
fn late_mutation_response_after_a_newer_push_is_a_conflict() {
    let transport = MockTransport::new();
    let root = root_with(&transport);
    let entity = root.organizations().unwrap().get("org-1");
    entity.push(decode(organization("org-1", "Acme")), 4);
    assert_eq!(entity.version(), 4);

    let base = entity
        .update(|org| org.name = "Local edit".to_string())
        .unwrap();
    assert_eq!(base, 4);
    assert_eq!(entity.version(), 4);

    entity.commit(decode(organization("org-1", "Server edit")), 5);
    assert_eq!(entity.version(), 5);
    assert_eq!(entity.status(), EntityStatus::Loaded);

    let late = entity.reconcile(base, decode(organization("org-1", "Local edit")));
    assert!(matches!(
        late,
        Err(StoreError::Conflict {
            expected_version: 4,
            actual_version: 5,
            ..
        })
    ));
    assert_eq!(entity.read(|org| org.name.clone()), "Server edit");
}

#[test]
fn version_never_moves_backwards() {
    let transport = MockTransport::new();
    let root = root_with(&transport);
    let entity = root.organizations().unwrap().get("org-1");

    entity.push(decode(organization("org-1", "v7")), 7);
    entity.push(decode(organization("org-1", "older")), 3);

    assert_eq!(entity.version(), 8);
    assert_eq!(entity.read(|org| org.name.clone()), "older");
}

#[test]
fn illegal_transitions_are_rejected() {
    let transport = MockTransport::new();
    let root = root_with(&transport);
    let entity = root.organizations().unwrap().get("org-1");

    assert!(matches!(
        entity.update(|org| org.name = "x".to_string()),
        Err(StoreError::InvalidTransition { from: EntityStatus::Unloaded, .. })
    ));
    assert!(matches!(
        entity.rollback(),
        Err(StoreError::InvalidTransition { .. })
    ));
    assert!(matches!(entity.retry(), Err(StoreError::InvalidTransition { .. })));
}

#[test]
fn listeners_see_each_change_until_unsubscribed() {
    let transport = MockTransport::new();
    let root = root_with(&transport);
    let entity = root.organizations().unwrap().get("org-1");
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    let subscription = entity.subscribe(move |event| sink.lock().push(event.status));

    entity.push(decode(organization("org-1", "Acme")), 1);
    entity.update(|org| org.name = "Edit".to_string()).unwrap();
    entity.rollback().unwrap();
    subscription.unsubscribe();
    entity.invalidate();

    assert_eq!(
        *seen.lock(),
        vec![
            EntityStatus::Loaded,
            EntityStatus::Dirty,
            EntityStatus::Loaded
        ]
    );
}

#[test]
fn entity_reaches_its_root_without_owning_it() {
    let transport = MockTransport::new();
    let root = root_with(&transport);
    let entity = root.organizations().unwrap().get("org-1");

    let back = entity.root().expect("root should be alive");
    assert!(Arc::ptr_eq(&back, &root));
    drop(back);

    drop(root);
    assert!(entity.root().is_none());
}
