mod common;

use common::{by_ids, services_with, test_config, MockTransport};
use customeros_core::model::flow::FlowStatus;
use customeros_core::service::flow_sequence_service::FlowSequenceInput;
use customeros_core::service::flow_service::FlowInput;
use customeros_core::{EntityStatus, GraphQlMessage, StoreError};
use serde_json::{json, Value};

fn flow(id: &str, name: &str, status: &str) -> Value {
    json!({
        "metadata": { "id": id },
        "name": name,
        "description": null,
        "status": status
    })
}

#[tokio::test]
async fn get_flows_writes_through_the_collection() {
    let transport = MockTransport::new();
    transport.respond_data(
        "getFlows",
        json!({ "flows": [flow("f-1", "Onboarding", "ACTIVE"), flow("f-2", "Renewal", "INACTIVE")] }),
    );
    let (root, services) = services_with(&transport, &test_config());

    let flows = services.flows().unwrap().get_flows().await.unwrap();

    assert_eq!(flows.len(), 2);
    let collection = root.flows().unwrap();
    assert!(collection.get("f-1").ptr_eq(&flows[0]));
    assert_eq!(flows[0].read(|f| f.status), FlowStatus::Active);
    assert!(collection.is_fully_loaded());
}

#[tokio::test]
async fn get_flows_failure_is_typed() {
    let transport = MockTransport::new();
    transport.fail(
        "getFlows",
        StoreError::GraphQl(vec![GraphQlMessage::new("not authorized")]),
    );
    let (root, services) = services_with(&transport, &test_config());

    let err = services.flows().unwrap().get_flows().await.unwrap_err();

    assert!(matches!(err, StoreError::GraphQl(ref messages) if messages[0].message == "not authorized"));
    assert!(root.flows().unwrap().is_empty());
    assert!(root.flows().unwrap().error().is_some());
}

#[tokio::test]
async fn get_flow_surfaces_not_found() {
    let transport = MockTransport::new();
    transport.respond(
        "getFlowsByIds",
        by_ids("flows_ByIds", vec![flow("f-1", "Onboarding", "ACTIVE")]),
    );
    let (_root, services) = services_with(&transport, &test_config());
    let service = services.flows().unwrap();

    let found = service.get_flow("f-1").await.unwrap();
    assert_eq!(found.status(), EntityStatus::Loaded);

    let err = service.get_flow("f-404").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { domain: "flows", .. }));
}

#[tokio::test]
async fn merge_without_id_creates_a_flow() {
    let transport = MockTransport::new();
    transport.respond("flowMerge", |variables| {
        assert!(variables["input"].get("id").is_none());
        let name = variables["input"]["name"].clone();
        Ok(json!({ "flow_Merge": {
            "metadata": { "id": "f-new" },
            "name": name,
            "status": "INACTIVE"
        } }))
    });
    let (root, services) = services_with(&transport, &test_config());

    let created = services
        .flows()
        .unwrap()
        .merge_flow(FlowInput {
            name: "Expansion".to_string(),
            ..FlowInput::default()
        })
        .await
        .unwrap();

    assert_eq!(created.id(), "f-new");
    assert_eq!(created.read(|f| f.name.clone()), "Expansion");
    assert_eq!(root.flows().unwrap().ids(), vec!["f-new".to_string()]);
}

#[tokio::test]
async fn change_status_takes_the_server_copy() {
    let transport = MockTransport::new();
    transport.respond_data(
        "getFlows",
        json!({ "flows": [flow("f-1", "Onboarding", "INACTIVE")] }),
    );
    transport.respond_data(
        "flowChangeStatus",
        json!({ "flow_ChangeStatus": flow("f-1", "Onboarding (live)", "ACTIVE") }),
    );
    let (_root, services) = services_with(&transport, &test_config());
    let service = services.flows().unwrap();
    service.get_flows().await.unwrap();

    let updated = service.change_status("f-1", FlowStatus::Active).await.unwrap();

    assert_eq!(updated.read(|f| f.status), FlowStatus::Active);
    assert_eq!(updated.read(|f| f.name.clone()), "Onboarding (live)");
    assert_eq!(
        transport.variables("flowChangeStatus")[0]["status"],
        json!("ACTIVE")
    );
}

#[tokio::test]
async fn sequences_are_created_under_their_flow() {
    let transport = MockTransport::new();
    transport.respond_data(
        "getFlowSequences",
        json!({ "sequences": [{
            "metadata": { "id": "s-1" },
            "name": "Day 1",
            "status": "ACTIVE",
            "flow": { "metadata": { "id": "f-1" } }
        }] }),
    );
    transport.respond("flowSequenceCreate", |variables| {
        Ok(json!({ "flow_sequence_Create": {
            "metadata": { "id": "s-2" },
            "name": variables["input"]["name"].clone(),
            "status": "INACTIVE",
            "flow": { "metadata": { "id": variables["input"]["flowId"].clone() } }
        } }))
    });
    let (root, services) = services_with(&transport, &test_config());
    let service = services.flow_sequences().unwrap();

    let existing = service.get_sequences("f-1").await.unwrap();
    assert_eq!(existing.len(), 1);
    assert_eq!(transport.variables("getFlowSequences")[0]["flowId"], json!("f-1"));

    let created = service
        .create_sequence(FlowSequenceInput {
            flow_id: "f-1".to_string(),
            name: "Day 3".to_string(),
            description: None,
        })
        .await
        .unwrap();

    assert_eq!(created.id(), "s-2");
    assert_eq!(created.read(|s| s.flow_id().map(str::to_string)), Some("f-1".to_string()));
    assert_eq!(
        root.flow_sequences().unwrap().ids(),
        vec!["s-1".to_string(), "s-2".to_string()]
    );
}

#[tokio::test]
async fn contact_update_must_echo_the_same_id() {
    let transport = MockTransport::new();
    transport.respond_data(
        "getContacts",
        json!({ "contacts": { "content": [{ "id": "ct-1", "firstName": "Ada" }], "totalElements": 1 } }),
    );
    transport.respond_data("updateContact", json!({ "contact_Update": { "id": "ct-2" } }));
    let (root, services) = services_with(&transport, &test_config());
    let service = services.contacts().unwrap();
    service.get_contacts().await.unwrap();
    let contact = root.contacts().unwrap().get("ct-1");

    let err = service
        .update_contact("ct-1", |c| c.last_name = Some("Lovelace".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Decode(_)));
    assert!(contact.read(|c| c.last_name.is_none()));
    assert_eq!(contact.status(), EntityStatus::Loaded);
}
