mod common;

use common::{as_transport, by_ids, contract, invoice, organization, root_with, MockTransport};
use customeros_core::model::contact::Contact;
use customeros_core::model::contract::Contract;
use customeros_core::model::invoice::Invoice;
use customeros_core::model::organization::Organization;
use customeros_core::{
    dispatch, DomainName, EntityStatus, GroupMessage, RootStore, StoreError,
};
use serde_json::json;

#[test]
fn unregistered_domain_is_a_configuration_error() {
    let transport = MockTransport::new();
    let root = RootStore::builder()
        .register_graphql::<Organization>(as_transport(&transport))
        .build()
        .unwrap();

    assert_eq!(root.domains(), vec![DomainName::Organizations]);
    assert!(root.organizations().is_ok());
    assert!(matches!(root.contracts(), Err(StoreError::Configuration(_))));
    assert!(matches!(
        root.get::<Contract>(DomainName::Organizations),
        Err(StoreError::Configuration(_))
    ));
}

#[test]
fn registering_a_domain_twice_fails() {
    let transport = MockTransport::new();
    let built = RootStore::builder()
        .register_graphql::<Invoice>(as_transport(&transport))
        .register_graphql::<Invoice>(as_transport(&transport))
        .build();
    assert!(matches!(built, Err(StoreError::Configuration(_))));
}

#[test]
fn relationships_resolve_through_the_identity_maps() {
    let transport = MockTransport::new();
    let root = root_with(&transport);

    let mut org: Organization = serde_json::from_value(organization("org-1", "Acme")).unwrap();
    org.contracts = vec![
        customeros_core::model::common::EntityRef::new("c-1"),
        customeros_core::model::common::EntityRef::new("c-unknown"),
    ];
    let org = root.organizations().unwrap().upsert(vec![org]).remove(0);
    let contracts = root.contracts().unwrap().upsert(vec![serde_json::from_value(contract(
        "c-1", "org-1", None, 1,
    ))
    .unwrap()]);
    let invoices = root.invoices().unwrap().upsert(vec![
        serde_json::from_value(invoice("i-1", "c-1", "DUE")).unwrap(),
        serde_json::from_value(invoice("i-2", "c-2", "PAID")).unwrap(),
    ]);

    let linked = root.contracts_of_organization(&org);
    assert_eq!(linked.len(), 1);
    assert!(linked[0].ptr_eq(&contracts[0]));
    assert!(!root.contracts().unwrap().contains("c-unknown"));

    let parent = root.contract_of_invoice(&invoices[0]).unwrap();
    assert!(parent.ptr_eq(&contracts[0]));
    assert!(root.contract_of_invoice(&invoices[1]).is_none());
    assert!(!root.contracts().unwrap().contains("c-2"));

    let of_contract = root.invoices_of_contract("c-1");
    assert_eq!(of_contract.len(), 1);
    assert!(of_contract[0].ptr_eq(&invoices[0]));

    let contact: Contact = serde_json::from_value(json!({
        "id": "ct-1",
        "organizations": { "content": [{ "metadata": { "id": "org-1" } }] }
    }))
    .unwrap();
    let contact = root.contacts().unwrap().upsert(vec![contact]).remove(0);
    let employers = root.organizations_of_contact(&contact);
    assert_eq!(employers.len(), 1);
    assert!(employers[0].ptr_eq(&org));
}

#[test]
fn invalidate_all_resets_every_collection() {
    let transport = MockTransport::new();
    let root = root_with(&transport);
    let org = root
        .organizations()
        .unwrap()
        .upsert(vec![serde_json::from_value(organization("org-1", "Acme")).unwrap()])
        .remove(0);
    assert_eq!(root.entry_count(), 1);

    root.invalidate_all();
    assert_eq!(org.status(), EntityStatus::Unloaded);
    assert_eq!(org.read(|value| value.name.clone()), "Acme");
    assert_eq!(root.entry_count(), 1);
}

#[tokio::test]
async fn group_messages_reach_the_named_collection() {
    let transport = MockTransport::new();
    transport.respond(
        "getOrganizationsByIds",
        by_ids(
            "organizations_ByIds",
            vec![organization("org-1", "Acme"), organization("org-2", "Globex")],
        ),
    );
    let root = root_with(&transport);
    let organizations = root.organizations().unwrap();

    let append = GroupMessage::from_json(
        r#"{"domain":"organizations","action":"APPEND","ids":["org-1","org-2"]}"#,
    )
    .unwrap();
    dispatch(&root, append).await.unwrap();
    assert_eq!(organizations.len(), 2);
    assert_eq!(transport.calls("getOrganizationsByIds"), 1);

    let invalidate = GroupMessage::from_json(
        r#"{"domain":"organizations","action":"INVALIDATE","ids":["org-2"]}"#,
    )
    .unwrap();
    dispatch(&root, invalidate).await.unwrap();
    assert_eq!(transport.calls("getOrganizationsByIds"), 2);
    assert_eq!(organizations.get("org-2").version(), 2);

    let delete = GroupMessage::from_json(
        r#"{"domain":"organizations","action":"DELETE","ids":["org-1"]}"#,
    )
    .unwrap();
    dispatch(&root, delete).await.unwrap();
    assert!(!organizations.contains("org-1"));

    let unknown =
        GroupMessage::from_json(r#"{"domain":"tickets","action":"UPDATE","ids":[]}"#).unwrap();
    assert!(matches!(
        dispatch(&root, unknown).await,
        Err(StoreError::Configuration(_))
    ));
}
