#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use stratus_core::{
    ClientConfig, ClientConfigLayer, ClientFactory, NodeInstance, NodeProperties,
    OperationContext, Params, ResourceSpec, SdkError, ServiceClient,
};

pub const WIDGET_TYPE: &str = "stratus.nodes.test.Widget";

/// Name-identified resource with a `State` status
pub const WIDGET: ResourceSpec = ResourceSpec {
    type_name: "Test Widget",
    service: "widgets",
    id_param: "Name",
    describe_operation: "describe_widgets",
    describe_filter: "Names",
    response_key: "Widgets",
    status_key: Some("State"),
    arn_key: Some("WidgetArn"),
    create_operation: "create_widget",
    create_response_key: Some("Widget"),
    delete_operation: "delete_widget",
    not_found_codes: &["WidgetNotFound"],
};

/// Resource whose identifier is assigned by the provider on creation
pub const GADGET: ResourceSpec = ResourceSpec {
    type_name: "Test Gadget",
    service: "widgets",
    id_param: "GadgetId",
    describe_operation: "describe_gadgets",
    describe_filter: "GadgetIds",
    response_key: "Gadgets",
    status_key: Some("State"),
    arn_key: None,
    create_operation: "create_gadget",
    create_response_key: Some("Gadget"),
    delete_operation: "delete_gadget",
    not_found_codes: &["InvalidGadgetID.NotFound"],
};

/// Scripted in-memory service client.
///
/// Each operation answers from its own queue; the last scripted answer
/// repeats. Unscripted operations answer `{}`.
pub struct FakeClient {
    service: String,
    scripts: Mutex<HashMap<String, VecDeque<Result<Value, SdkError>>>>,
    calls: Mutex<Vec<(String, Params)>>,
}

impl FakeClient {
    pub fn new(service: &str) -> Arc<Self> {
        Arc::new(Self {
            service: service.to_string(),
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn script(&self, operation: &str, results: Vec<Result<Value, SdkError>>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(operation.to_string(), results.into());
    }

    pub fn calls(&self) -> Vec<(String, Params)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, operation: &str) -> Vec<Params> {
        self.calls()
            .into_iter()
            .filter(|(op, _)| op == operation)
            .map(|(_, params)| params)
            .collect()
    }

    /// Every call that is not a read
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|(op, _)| op)
            .filter(|op| !op.starts_with("describe_") && !op.starts_with("get_"))
            .collect()
    }
}

#[async_trait]
impl ServiceClient for FakeClient {
    fn service_name(&self) -> &str {
        &self.service
    }

    async fn call(&self, operation: &str, params: Params) -> Result<Value, SdkError> {
        self.calls
            .lock()
            .unwrap()
            .push((operation.to_string(), params));

        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(operation) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| Ok(json!({}))),
            None => Ok(json!({})),
        }
    }
}

/// Hands out the same scripted clients for every manager
pub struct FakeFactory {
    clients: HashMap<String, Arc<FakeClient>>,
    pub created: Mutex<Vec<(String, ClientConfig)>>,
}

impl FakeFactory {
    pub fn new(clients: Vec<Arc<FakeClient>>) -> Arc<Self> {
        Arc::new(Self {
            clients: clients
                .into_iter()
                .map(|c| (c.service.clone(), c))
                .collect(),
            created: Mutex::new(Vec::new()),
        })
    }

    pub fn created_services(&self) -> Vec<String> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .map(|(s, _)| s.clone())
            .collect()
    }
}

#[async_trait]
impl ClientFactory for FakeFactory {
    async fn create(
        &self,
        service: &str,
        config: &ClientConfig,
    ) -> Result<Arc<dyn ServiceClient>, SdkError> {
        let client = self.clients.get(service).ok_or_else(|| {
            let mut known: Vec<&str> = self.clients.keys().map(String::as_str).collect();
            known.sort();
            SdkError::UnknownService {
                name: service.to_string(),
                known: known.join(", "),
            }
        })?;
        self.created
            .lock()
            .unwrap()
            .push((service.to_string(), config.clone()));
        Ok(client.clone())
    }
}

/// Describe response holding one widget in the given state
pub fn widget(name: &str, state: &str) -> Result<Value, SdkError> {
    Ok(json!({
        "Widgets": [{
            "Name": name,
            "State": state,
            "WidgetArn": format!("arn:test:widget/{}", name),
        }]
    }))
}

pub fn gadget(id: &str, state: &str) -> Result<Value, SdkError> {
    Ok(json!({"Gadgets": [{"GadgetId": id, "State": state}]}))
}

pub fn no_widgets() -> Result<Value, SdkError> {
    Ok(json!({"Widgets": []}))
}

pub fn not_found(code: &str) -> Result<Value, SdkError> {
    Err(SdkError::service("Describe", code, "The resource does not exist"))
}

pub fn params(value: Value) -> Params {
    value.as_object().cloned().unwrap()
}

pub fn widget_node(properties: Value) -> NodeInstance {
    let properties: NodeProperties = serde_json::from_value(properties).unwrap();
    NodeInstance::new("widget_x1y2z3", "widget")
        .with_type("stratus.nodes.Root")
        .with_type(WIDGET_TYPE)
        .with_properties(properties)
}

pub fn context(instance: NodeInstance, factory: Arc<FakeFactory>) -> OperationContext {
    OperationContext::new(instance, factory).with_env(ClientConfigLayer::default())
}
