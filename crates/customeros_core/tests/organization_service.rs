mod common;

use common::{by_ids, organization, services_with, test_config, MockTransport};
use customeros_core::model::common::User;
use customeros_core::model::organization::{Organization, OrganizationStage};
use customeros_core::service::organization_service::OrganizationInput;
use customeros_core::{EntityStatus, GraphQlMessage, StoreError};
use serde_json::{json, Value};
use std::collections::HashSet;

const LIST: &str = "getOrganizations";

fn page(records: Vec<Value>, total: u64) -> Value {
    json!({ "dashboardView_Organizations": { "content": records, "totalElements": total } })
}

#[tokio::test]
async fn bootstrap_fills_the_collection_and_refresh_keeps_identity() {
    let transport = MockTransport::new();
    transport.respond_data(
        LIST,
        page(
            vec![
                organization("org-1", "Acme"),
                organization("org-2", "Globex"),
                organization("org-3", "Initech"),
            ],
            3,
        ),
    );
    let (root, services) = services_with(&transport, &test_config());
    let service = services.organizations().unwrap();
    let organizations = root.organizations().unwrap();

    let handles = service.get_organizations().await.unwrap();
    assert_eq!(handles.len(), 3);
    assert_eq!(organizations.len(), 3);
    let ids: HashSet<String> = handles.iter().map(|handle| handle.id()).collect();
    assert_eq!(ids.len(), 3);
    assert!(!handles[0].ptr_eq(&handles[1]));
    assert!(organizations.is_fully_loaded());
    assert_eq!(organizations.total_elements(), Some(3));

    let before = organizations.get("org-2");
    transport.respond_data(
        LIST,
        page(
            vec![
                organization("org-1", "Acme"),
                organization("org-2", "Globex Corporation"),
                organization("org-3", "Initech"),
            ],
            3,
        ),
    );
    let gate = transport.hold(LIST);
    let refresh = service.get_organizations();
    let lookup = async {
        let during = organizations.get("org-2");
        gate.add_permits(1);
        during
    };
    let (refreshed, during) = tokio::join!(refresh, lookup);
    refreshed.unwrap();

    assert!(during.ptr_eq(&before));
    assert!(organizations.get("org-2").ptr_eq(&before));
    assert_eq!(before.read(|org| org.name.clone()), "Globex Corporation");
    assert_eq!(organizations.len(), 3);
}

#[tokio::test]
async fn bootstrap_pages_until_the_server_total() {
    let transport = MockTransport::new();
    transport.respond(LIST, |variables| {
        let page_index = variables["pagination"]["page"].as_u64().unwrap_or(0);
        let limit = variables["pagination"]["limit"].as_u64().unwrap_or(0);
        let records = (page_index * limit..(page_index + 1) * limit)
            .filter(|n| *n < 5)
            .map(|n| organization(&format!("org-{n}"), "Org"))
            .collect();
        Ok(page(records, 5))
    });
    let config = test_config().with_page_sizes(2, 2);
    let (root, services) = services_with(&transport, &config);

    let handles = services
        .organizations()
        .unwrap()
        .get_organizations()
        .await
        .unwrap();

    assert_eq!(handles.len(), 5);
    assert_eq!(transport.calls(LIST), 3);
    let pages: Vec<u64> = transport
        .variables(LIST)
        .iter()
        .map(|variables| variables["pagination"]["page"].as_u64().unwrap())
        .collect();
    assert_eq!(pages, vec![0, 1, 2]);
    assert!(root.organizations().unwrap().is_fully_loaded());
}

#[tokio::test]
async fn bootstrap_skips_overlap_when_page_sizes_do_not_line_up() {
    let transport = MockTransport::new();
    transport.respond(LIST, |variables| {
        let page_index = variables["pagination"]["page"].as_u64().unwrap_or(0);
        let limit = variables["pagination"]["limit"].as_u64().unwrap_or(0);
        let records = (page_index * limit..(page_index + 1) * limit)
            .filter(|n| *n < 7)
            .map(|n| organization(&format!("org-{n}"), "Org"))
            .collect();
        Ok(page(records, 7))
    });
    let config = test_config().with_page_sizes(4, 3);
    let (root, services) = services_with(&transport, &config);

    let handles = services
        .organizations()
        .unwrap()
        .get_organizations()
        .await
        .unwrap();

    assert_eq!(handles.len(), 7);
    let ids: HashSet<String> = handles.iter().map(|handle| handle.id()).collect();
    assert_eq!(ids.len(), 7);
    let organizations = root.organizations().unwrap();
    assert_eq!(organizations.len(), 7);
    assert!(organizations.is_fully_loaded());
    let requested: Vec<(u64, u64)> = transport
        .variables(LIST)
        .iter()
        .map(|variables| {
            (
                variables["pagination"]["page"].as_u64().unwrap(),
                variables["pagination"]["limit"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(requested, vec![(0, 4), (1, 3), (2, 3)]);
}

#[tokio::test]
async fn bootstrap_failure_is_surfaced_and_recorded() {
    let transport = MockTransport::new();
    transport.fail(LIST, StoreError::Network("timeout".to_string()));
    let (root, services) = services_with(&transport, &test_config());

    let err = services
        .organizations()
        .unwrap()
        .get_organizations()
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Network(_)));
    let organizations = root.organizations().unwrap();
    assert!(organizations.is_empty());
    assert!(!organizations.is_bootstrapped());
    assert!(organizations.error().is_some());
}

#[tokio::test]
async fn rejected_update_rolls_back_to_the_loaded_value() {
    let transport = MockTransport::new();
    transport.respond_data(LIST, page(vec![organization("org-1", "Acme")], 1));
    transport.fail(
        "updateOrganization",
        StoreError::GraphQl(vec![GraphQlMessage::new("name is reserved")]),
    );
    let (root, services) = services_with(&transport, &test_config());
    let service = services.organizations().unwrap();
    service.get_organizations().await.unwrap();
    let entity = root.organizations().unwrap().get("org-1");
    let before = entity.value();

    let err = service
        .update_organization("org-1", |org| org.name = "Reserved".to_string())
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::GraphQl(_)));
    assert_eq!(entity.value(), before);
    assert_eq!(entity.status(), EntityStatus::Loaded);
}

#[tokio::test]
async fn accepted_update_commits_the_edit() {
    let transport = MockTransport::new();
    transport.respond(
        "getOrganizationsByIds",
        by_ids("organizations_ByIds", vec![organization("org-1", "Acme")]),
    );
    transport.respond_data(
        "updateOrganization",
        json!({ "organization_Update": { "metadata": { "id": "org-1" } } }),
    );
    let (root, services) = services_with(&transport, &test_config());

    let entity = services
        .organizations()
        .unwrap()
        .update_organization("org-1", |org| org.website = Some("acme.io".to_string()))
        .await
        .unwrap();

    assert_eq!(transport.calls("getOrganizationsByIds"), 1);
    assert_eq!(entity.status(), EntityStatus::Loaded);
    assert_eq!(entity.version(), 2);
    assert_eq!(
        root.organizations()
            .unwrap()
            .get("org-1")
            .read(|org| org.website.clone()),
        Some("acme.io".to_string())
    );
    let sent = &transport.variables("updateOrganization")[0]["input"];
    assert_eq!(sent["website"], json!("acme.io"));
    assert_eq!(sent["patch"], json!(true));
}

#[tokio::test]
async fn update_overtaken_by_a_push_refetches_and_reports_conflict() {
    let transport = MockTransport::new();
    transport.respond(
        "getOrganizationsByIds",
        by_ids("organizations_ByIds", vec![organization("org-1", "From server")]),
    );
    let (root, services) = services_with(&transport, &test_config());
    let entity = root.organizations().unwrap().get("org-1");
    let seed: Organization = serde_json::from_value(organization("org-1", "Acme")).unwrap();
    entity.push(seed, 4);

    let pushed = entity.clone();
    transport.respond("updateOrganization", move |_| {
        let newer: Organization =
            serde_json::from_value(organization("org-1", "Pushed")).unwrap();
        pushed.push(newer, 5);
        Ok(json!({ "organization_Update": { "metadata": { "id": "org-1" } } }))
    });

    let err = services
        .organizations()
        .unwrap()
        .update_organization("org-1", |org| org.name = "Local".to_string())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::Conflict {
            expected_version: 4,
            actual_version: 5,
            ..
        }
    ));
    assert_eq!(transport.calls("getOrganizationsByIds"), 1);
    assert_eq!(entity.status(), EntityStatus::Loaded);
    assert_eq!(entity.read(|org| org.name.clone()), "From server");
}

#[tokio::test]
async fn overlapping_updates_on_one_organization_both_confirm() {
    let transport = MockTransport::new();
    transport.respond_data(LIST, page(vec![organization("org-1", "Acme")], 1));
    transport.respond_data(
        "updateOrganization",
        json!({ "organization_Update": { "metadata": { "id": "org-1" } } }),
    );
    let (root, services) = services_with(&transport, &test_config());
    let service = services.organizations().unwrap();
    service.get_organizations().await.unwrap();
    let entity = root.organizations().unwrap().get("org-1");
    let loaded_version = entity.version();

    let gate = transport.hold("updateOrganization");
    let first = service.update_organization("org-1", |org| org.name = "First".to_string());
    let second =
        service.update_organization("org-1", |org| org.website = Some("acme.io".to_string()));
    let release = async {
        gate.add_permits(2);
    };
    let (first, second, ()) = tokio::join!(first, second, release);

    first.unwrap();
    second.unwrap();
    assert_eq!(transport.calls("updateOrganization"), 2);
    assert_eq!(transport.calls("getOrganizationsByIds"), 0);
    assert_eq!(entity.status(), EntityStatus::Loaded);
    assert_eq!(entity.version(), loaded_version + 2);
    assert_eq!(entity.read(|org| org.name.clone()), "First");
    assert_eq!(
        entity.read(|org| org.website.clone()),
        Some("acme.io".to_string())
    );
}

#[tokio::test]
async fn create_moves_the_draft_to_the_server_id_and_refetches() {
    let transport = MockTransport::new();
    transport.respond_data(
        "createOrganization",
        json!({ "organization_Create": { "metadata": { "id": "org-new" } } }),
    );
    transport.respond(
        "getOrganizationsByIds",
        by_ids("organizations_ByIds", vec![organization("org-new", "Unnamed")]),
    );
    let (root, services) = services_with(&transport, &test_config());

    let created = services
        .organizations()
        .unwrap()
        .create_organization(OrganizationInput {
            stage: Some(OrganizationStage::Lead),
            ..OrganizationInput::default()
        })
        .await
        .unwrap();

    assert_eq!(created.id(), "org-new");
    let organizations = root.organizations().unwrap();
    assert_eq!(organizations.ids(), vec!["org-new".to_string()]);
    assert!(organizations.get("org-new").ptr_eq(&created));
    assert_eq!(created.status(), EntityStatus::Loaded);
    let sent = &transport.variables("createOrganization")[0]["input"];
    assert_eq!(sent["name"], json!("Unnamed"));
    assert_eq!(sent["stage"], json!("LEAD"));
    assert_eq!(
        transport.variables("getOrganizationsByIds")[0]["ids"],
        json!(["org-new"])
    );
    // the refetched copy replaces the draft's stage
    assert_eq!(created.read(|org| org.stage), Some(OrganizationStage::Engaged));
}

#[tokio::test]
async fn failed_create_leaves_no_draft_behind() {
    let transport = MockTransport::new();
    transport.fail(
        "createOrganization",
        StoreError::Network("connection reset".to_string()),
    );
    let (root, services) = services_with(&transport, &test_config());

    let err = services
        .organizations()
        .unwrap()
        .create_organization(OrganizationInput::default())
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Network(_)));
    assert!(root.organizations().unwrap().is_empty());
}

#[tokio::test]
async fn merge_drops_merged_organizations_and_refetches_the_primary() {
    let transport = MockTransport::new();
    transport.respond_data(
        LIST,
        page(
            vec![
                organization("org-1", "Acme"),
                organization("org-2", "Acme Inc"),
                organization("org-3", "ACME"),
            ],
            3,
        ),
    );
    transport.fail(
        "mergeOrganizations",
        StoreError::Network("connection reset".to_string()),
    );
    transport.respond(
        "getOrganizationsByIds",
        by_ids("organizations_ByIds", vec![organization("org-1", "Acme Group")]),
    );
    let (root, services) = services_with(&transport, &test_config());
    let service = services.organizations().unwrap();
    service.get_organizations().await.unwrap();
    let organizations = root.organizations().unwrap();
    let second = organizations.get("org-2");

    let merged = vec!["org-1".to_string(), "org-2".to_string(), "org-3".to_string()];
    assert!(service.merge_organizations("org-1", &merged).await.is_err());
    assert_eq!(organizations.len(), 3);
    assert!(organizations.get("org-2").ptr_eq(&second));
    assert_eq!(transport.calls("getOrganizationsByIds"), 0);

    transport.respond_data(
        "mergeOrganizations",
        json!({ "organization_Merge": { "id": "org-1" } }),
    );
    service.merge_organizations("org-1", &merged).await.unwrap();

    assert_eq!(
        transport.variables("mergeOrganizations")[1]["mergedOrganizationIds"],
        json!(["org-2", "org-3"])
    );
    assert_eq!(organizations.ids(), vec!["org-1".to_string()]);
    assert_eq!(
        organizations.get("org-1").read(|org| org.name.clone()),
        "Acme Group"
    );
}

#[tokio::test]
async fn merge_into_itself_sends_nothing() {
    let transport = MockTransport::new();
    let (_root, services) = services_with(&transport, &test_config());

    services
        .organizations()
        .unwrap()
        .merge_organizations("org-1", &["org-1".to_string()])
        .await
        .unwrap();

    assert_eq!(transport.total_calls(), 0);
}

#[tokio::test]
async fn stage_change_rolls_back_only_the_rejected_organization() {
    let transport = MockTransport::new();
    transport.respond_data(
        LIST,
        page(
            vec![organization("org-1", "Acme"), organization("org-2", "Globex")],
            2,
        ),
    );
    transport.respond("updateOrganization", |variables| {
        let id = variables["input"]["id"].as_str().unwrap_or_default().to_string();
        if id == "org-2" {
            return Err(StoreError::GraphQl(vec![GraphQlMessage::new("stage locked")]));
        }
        Ok(json!({ "organization_Update": { "metadata": { "id": id } } }))
    });
    let (root, services) = services_with(&transport, &test_config());
    let service = services.organizations().unwrap();
    service.get_organizations().await.unwrap();

    let ids = vec!["org-1".to_string(), "org-2".to_string()];
    let err = service
        .update_stage(&ids, OrganizationStage::Trial)
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::GraphQl(_)));
    assert_eq!(transport.calls("updateOrganization"), 2);
    let organizations = root.organizations().unwrap();
    assert_eq!(
        organizations.get("org-1").read(|org| org.stage),
        Some(OrganizationStage::Trial)
    );
    let rejected = organizations.get("org-2");
    assert_eq!(rejected.read(|org| org.stage), Some(OrganizationStage::Engaged));
    assert_eq!(rejected.status(), EntityStatus::Loaded);
    for sent in transport.variables("updateOrganization") {
        assert_eq!(sent["input"]["stage"], json!("TRIAL"));
    }
}

#[tokio::test]
async fn owner_can_be_set_and_cleared() {
    let transport = MockTransport::new();
    transport.respond_data(LIST, page(vec![organization("org-1", "Acme")], 1));
    transport.respond_data(
        "setOrganizationOwner",
        json!({ "organization_SetOwner": { "id": "org-1" } }),
    );
    transport.respond_data(
        "unsetOrganizationOwner",
        json!({ "organization_UnsetOwner": { "id": "org-1" } }),
    );
    let (_root, services) = services_with(&transport, &test_config());
    let service = services.organizations().unwrap();
    service.get_organizations().await.unwrap();

    let owner = User {
        id: "u1".to_string(),
        name: Some("Uma".to_string()),
        ..User::default()
    };
    let entity = service.set_owner("org-1", Some(owner)).await.unwrap();
    assert_eq!(entity.read(|org| org.owner.as_ref().map(|o| o.id.clone())), Some("u1".to_string()));
    assert_eq!(
        transport.variables("setOrganizationOwner")[0]["userId"],
        json!("u1")
    );

    service.set_owner("org-1", None).await.unwrap();
    assert!(entity.read(|org| org.owner.is_none()));
    assert_eq!(transport.calls("unsetOrganizationOwner"), 1);
}

#[tokio::test]
async fn failed_hide_restores_the_same_instances() {
    let transport = MockTransport::new();
    transport.respond_data(
        LIST,
        page(
            vec![organization("org-1", "Acme"), organization("org-2", "Globex")],
            2,
        ),
    );
    transport.fail(
        "hideOrganizations",
        StoreError::Network("connection reset".to_string()),
    );
    let (root, services) = services_with(&transport, &test_config());
    let service = services.organizations().unwrap();
    service.get_organizations().await.unwrap();
    let organizations = root.organizations().unwrap();
    let first = organizations.get("org-1");

    let ids = vec!["org-1".to_string()];
    assert!(service.hide_organizations(&ids).await.is_err());
    assert!(organizations.get("org-1").ptr_eq(&first));

    transport.respond_data(
        "hideOrganizations",
        json!({ "organization_HideAll": { "result": true } }),
    );
    service.hide_organizations(&ids).await.unwrap();
    assert!(!organizations.contains("org-1"));
    assert!(organizations.contains("org-2"));
}
