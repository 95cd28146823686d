#![allow(dead_code)]

use async_trait::async_trait;
use customeros_core::transport::operation_name;
use customeros_core::{RootStore, ServiceRegistry, StoreConfig, StoreError, StoreResult, Transport};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

type Responder = Arc<dyn Fn(&Value) -> StoreResult<Value> + Send + Sync>;

/// Scripted transport keyed by GraphQL operation name.
#[derive(Default)]
pub struct MockTransport {
    responders: Mutex<HashMap<String, Responder>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(
        &self,
        operation: &str,
        responder: impl Fn(&Value) -> StoreResult<Value> + Send + Sync + 'static,
    ) {
        self.responders
            .lock()
            .insert(operation.to_string(), Arc::new(responder));
    }

    pub fn respond_data(&self, operation: &str, data: Value) {
        self.respond(operation, move |_| Ok(data.clone()));
    }

    pub fn fail(&self, operation: &str, error: StoreError) {
        self.respond(operation, move |_| Err(error.clone()));
    }

    /// Holds requests for `operation` until permits are added to the
    /// returned semaphore.
    pub fn hold(&self, operation: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .insert(operation.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(name, _)| name == operation)
            .count()
    }

    pub fn variables(&self, operation: &str) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter(|(name, _)| name == operation)
            .map(|(_, variables)| variables.clone())
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, document: &str, variables: Value) -> StoreResult<Value> {
        let operation = operation_name(document).to_string();
        self.calls.lock().push((operation.clone(), variables.clone()));

        let gate = self.gates.lock().get(&operation).cloned();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|_| StoreError::Network("gate closed".to_string()))?
                .forget();
        }

        let responder = self.responders.lock().get(&operation).cloned();
        match responder {
            Some(responder) => responder(&variables),
            None => Err(StoreError::Network(format!(
                "no response scripted for {operation}"
            ))),
        }
    }
}

/// Answers a batch query with the records whose ids were requested.
pub fn by_ids(field: &'static str, records: Vec<Value>) -> impl Fn(&Value) -> StoreResult<Value> {
    move |variables| {
        let wanted: Vec<&str> = variables["ids"]
            .as_array()
            .map(|ids| ids.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let found: Vec<Value> = records
            .iter()
            .filter(|record| {
                let id = record["metadata"]["id"]
                    .as_str()
                    .or_else(|| record["id"].as_str())
                    .unwrap_or_default();
                wanted.contains(&id)
            })
            .cloned()
            .collect();
        Ok(json!({ field: found }))
    }
}

pub fn organization(id: &str, name: &str) -> Value {
    json!({
        "metadata": { "id": id },
        "name": name,
        "relationship": "CUSTOMER",
        "stage": "ENGAGED",
        "contracts": []
    })
}

pub fn contract(id: &str, organization_id: &str, ended: Option<&str>, cycle: i64) -> Value {
    json!({
        "metadata": { "id": id },
        "contractName": format!("Contract {id}"),
        "contractStatus": "LIVE",
        "contractEnded": ended,
        "committedPeriodInMonths": 12,
        "organization": { "metadata": { "id": organization_id } },
        "billingDetails": { "billingCycleInMonths": cycle }
    })
}

pub fn invoice(id: &str, contract_id: &str, status: &str) -> Value {
    json!({
        "metadata": { "id": id },
        "invoiceNumber": format!("INV-{id}"),
        "status": status,
        "issued": "2024-03-15T22:00:00Z",
        "amountDue": 100.0,
        "contract": { "metadata": { "id": contract_id } }
    })
}

pub fn root_with(transport: &Arc<MockTransport>) -> Arc<RootStore> {
    let transport: Arc<dyn Transport> = Arc::clone(transport) as Arc<dyn Transport>;
    RootStore::new(transport, Default::default()).expect("root store should build")
}

pub fn as_transport(transport: &Arc<MockTransport>) -> Arc<dyn Transport> {
    Arc::clone(transport) as Arc<dyn Transport>
}

pub fn services_with(
    transport: &Arc<MockTransport>,
    config: &StoreConfig,
) -> (Arc<RootStore>, ServiceRegistry) {
    let root = root_with(transport);
    let services = ServiceRegistry::new(as_transport(transport), Arc::clone(&root), config)
        .expect("services should register");
    (root, services)
}

pub fn test_config() -> StoreConfig {
    StoreConfig::new("http://localhost:10000", "test-key", "tester@example.com")
}
