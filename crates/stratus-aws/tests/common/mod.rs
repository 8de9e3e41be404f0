#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use stratus_core::{
    ClientConfig, ClientConfigLayer, ClientFactory, NodeInstance, NodeProperties,
    OperationContext, Params, RuntimeProperties, SdkError, ServiceClient,
};

/// In-memory stand-in for the EC2 client.
///
/// Operations answer from scripted queues (the last answer repeats);
/// anything unscripted answers `{}`.
#[derive(Default)]
pub struct FakeEc2 {
    scripts: Mutex<HashMap<String, VecDeque<Result<Value, SdkError>>>>,
    calls: Mutex<Vec<(String, Params)>>,
}

impl FakeEc2 {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, operation: &str, results: Vec<Result<Value, SdkError>>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(operation.to_string(), results.into());
    }

    pub fn calls_to(&self, operation: &str) -> Vec<Params> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(op, _)| op == operation)
            .map(|(_, params)| params.clone())
            .collect()
    }
}

#[async_trait]
impl ServiceClient for FakeEc2 {
    fn service_name(&self) -> &str {
        "ec2"
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

pub struct FakeFactory {
    ec2: Arc<FakeEc2>,
}

impl FakeFactory {
    pub fn new(ec2: Arc<FakeEc2>) -> Arc<Self> {
        Arc::new(Self { ec2 })
    }
}

#[async_trait]
impl ClientFactory for FakeFactory {
    async fn create(
        &self,
        service: &str,
        _config: &ClientConfig,
    ) -> Result<Arc<dyn ServiceClient>, SdkError> {
        match service {
            "ec2" => Ok(self.ec2.clone()),
            _ => Err(SdkError::UnknownService {
                name: service.to_string(),
                known: "ec2".to_string(),
            }),
        }
    }
}

pub fn node(id: &str, type_name: &str, properties: Value) -> NodeInstance {
    let properties: NodeProperties = serde_json::from_value(properties).unwrap();
    NodeInstance::new(id, id.split('_').next().unwrap_or(id))
        .with_type(type_name)
        .with_properties(properties)
}

/// Node whose resource has already been created
pub fn created(mut instance: NodeInstance, resource_id: &str) -> NodeInstance {
    let mut bag = RuntimeProperties::new();
    bag.set_resource_id(resource_id);
    instance.runtime_properties = bag;
    instance
}

pub fn context(instance: NodeInstance, factory: Arc<FakeFactory>) -> OperationContext {
    OperationContext::new(instance, factory).with_env(ClientConfigLayer::default())
}

pub fn not_found(code: &str) -> Result<Value, SdkError> {
    Err(SdkError::service("describe", code, "does not exist"))
}
