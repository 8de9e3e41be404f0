//! Resource handle abstraction
//!
//! Every resource type exposes the same capability set: read its remote
//! properties, derive a status from them, and issue create/delete calls.
//! Handles never poll or retry; the lifecycle wrappers do.

use crate::client::{Params, ServiceClient};
use crate::error::SdkError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Capability interface implemented per resource type
#[async_trait]
pub trait ResourceHandle: Send + Sync {
    /// Human readable resource type (e.g. "AWS EC2 VPC")
    fn type_name(&self) -> &str;

    /// Identifier the handle reads and deletes by
    fn resource_id(&self) -> Option<&str>;

    fn set_resource_id(&mut self, id: String);

    /// Remote read.
    ///
    /// Returns `Ok(None)` when the resource does not exist (or the id is not
    /// known yet); only unmodeled SDK errors are `Err`.
    async fn properties(&self) -> Result<Option<Value>, SdkError>;

    /// Status token derived from a properties object
    fn status_of(&self, properties: &Value) -> Option<String>;

    /// ARN (or equivalent) derived from a properties object
    fn arn_of(&self, _properties: &Value) -> Option<String> {
        None
    }

    /// Identifier assigned by the provider, read from a create response
    fn id_from_response(&self, _response: &Value) -> Option<String> {
        None
    }

    /// Current status; `None` when the resource is absent
    async fn status(&self) -> Result<Option<String>, SdkError> {
        let properties = self.properties().await?;
        Ok(properties.as_ref().and_then(|p| self.status_of(p)))
    }

    /// Issue the creation call
    async fn create(&self, params: Params) -> Result<Value, SdkError>;

    /// Issue the deletion call; an already deleted resource is not an error
    async fn delete(&self, params: Params) -> Result<Value, SdkError>;

    /// Issue a resource specific call (attach, detach, modify, ...)
    async fn mutate(&self, operation: &str, params: Params) -> Result<Value, SdkError>;
}

/// Factory of handles for one resource type
pub trait ResourceKind: Send + Sync {
    fn type_name(&self) -> &str;

    /// Service the handle's client must talk to
    fn service(&self) -> &str;

    /// Key of the resource identifier in call parameters
    fn id_param(&self) -> &str;

    fn handle(
        &self,
        client: Arc<dyn ServiceClient>,
        resource_id: Option<String>,
    ) -> Box<dyn ResourceHandle>;
}

/// Declarative description of a describe/create/delete style resource
#[derive(Debug, Clone, Copy)]
pub struct ResourceSpec {
    pub type_name: &'static str,
    pub service: &'static str,

    /// Identifier key, both in call parameters and in described objects
    pub id_param: &'static str,

    pub describe_operation: &'static str,
    /// List parameter the describe call filters by (e.g. "VpcIds")
    pub describe_filter: &'static str,
    /// List key of the describe response (e.g. "Vpcs")
    pub response_key: &'static str,

    /// Status member; when `None` an existing resource counts as "available"
    pub status_key: Option<&'static str>,
    pub arn_key: Option<&'static str>,

    pub create_operation: &'static str,
    /// Object of the create response holding the new identifier (e.g. "Vpc")
    pub create_response_key: Option<&'static str>,

    pub delete_operation: &'static str,

    /// Service error codes meaning "this resource does not exist"
    pub not_found_codes: &'static [&'static str],
}

impl ResourceKind for ResourceSpec {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn service(&self) -> &str {
        self.service
    }

    fn id_param(&self) -> &str {
        self.id_param
    }

    fn handle(
        &self,
        client: Arc<dyn ServiceClient>,
        resource_id: Option<String>,
    ) -> Box<dyn ResourceHandle> {
        Box::new(DescribedResource::new(*self, client, resource_id))
    }
}

/// Handle driven by a [`ResourceSpec`]
pub struct DescribedResource {
    spec: ResourceSpec,
    client: Arc<dyn ServiceClient>,
    resource_id: Option<String>,
}

impl DescribedResource {
    pub fn new(
        spec: ResourceSpec,
        client: Arc<dyn ServiceClient>,
        resource_id: Option<String>,
    ) -> Self {
        Self {
            spec,
            client,
            resource_id,
        }
    }

    pub fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    fn with_id(&self, mut params: Params) -> Params {
        if !params.contains_key(self.spec.id_param) {
            if let Some(id) = &self.resource_id {
                params.insert(self.spec.id_param.to_string(), Value::String(id.clone()));
            }
        }
        params
    }
}

#[async_trait]
impl ResourceHandle for DescribedResource {
    fn type_name(&self) -> &str {
        self.spec.type_name
    }

    fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    fn set_resource_id(&mut self, id: String) {
        self.resource_id = Some(id);
    }

    async fn properties(&self) -> Result<Option<Value>, SdkError> {
        let Some(id) = self.resource_id.as_deref() else {
            return Ok(None);
        };

        let mut params = Params::new();
        params.insert(
            self.spec.describe_filter.to_string(),
            Value::Array(vec![Value::String(id.to_string())]),
        );

        let response = match self
            .client
            .call(self.spec.describe_operation, params)
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_not_found(self.spec.not_found_codes) => {
                tracing::debug!(
                    resource_type = self.spec.type_name,
                    resource_id = id,
                    "Resource not found"
                );
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let found = response
            .get(self.spec.response_key)
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .filter(|item| item.is_object())
            .cloned();

        if found.is_none() {
            tracing::debug!(
                resource_type = self.spec.type_name,
                resource_id = id,
                "Describe returned no matching resource"
            );
        }
        Ok(found)
    }

    fn status_of(&self, properties: &Value) -> Option<String> {
        match self.spec.status_key {
            Some(key) => properties.get(key).and_then(Value::as_str).map(String::from),
            None => Some("available".to_string()),
        }
    }

    fn arn_of(&self, properties: &Value) -> Option<String> {
        let key = self.spec.arn_key?;
        properties.get(key).and_then(Value::as_str).map(String::from)
    }

    fn id_from_response(&self, response: &Value) -> Option<String> {
        let object = match self.spec.create_response_key {
            Some(key) => response.get(key)?,
            None => response,
        };
        object
            .get(self.spec.id_param)
            .and_then(Value::as_str)
            .map(String::from)
    }

    async fn create(&self, params: Params) -> Result<Value, SdkError> {
        tracing::info!(
            resource_type = self.spec.type_name,
            operation = self.spec.create_operation,
            "Creating resource"
        );
        self.client.call(self.spec.create_operation, params).await
    }

    async fn delete(&self, params: Params) -> Result<Value, SdkError> {
        let params = self.with_id(params);
        tracing::info!(
            resource_type = self.spec.type_name,
            resource_id = self.resource_id.as_deref().unwrap_or_default(),
            "Deleting resource"
        );
        match self.client.call(self.spec.delete_operation, params).await {
            Err(e) if e.is_not_found(self.spec.not_found_codes) => {
                tracing::debug!(
                    resource_type = self.spec.type_name,
                    "Resource already deleted"
                );
                Ok(Value::Object(Default::default()))
            }
            other => other,
        }
    }

    async fn mutate(&self, operation: &str, params: Params) -> Result<Value, SdkError> {
        let params = self.with_id(params);
        tracing::info!(
            resource_type = self.spec.type_name,
            resource_id = self.resource_id.as_deref().unwrap_or_default(),
            operation = operation,
            "Calling resource operation"
        );
        self.client.call(operation, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    const WIDGET: ResourceSpec = ResourceSpec {
        type_name: "Test Widget",
        service: "widgets",
        id_param: "WidgetId",
        describe_operation: "describe_widgets",
        describe_filter: "WidgetIds",
        response_key: "Widgets",
        status_key: Some("State"),
        arn_key: Some("WidgetArn"),
        create_operation: "create_widget",
        create_response_key: Some("Widget"),
        delete_operation: "delete_widget",
        not_found_codes: &["InvalidWidgetID.NotFound"],
    };

    /// Answers every call with the same result and records the parameters
    struct StaticClient {
        result: Result<Value, SdkError>,
        calls: Mutex<Vec<(String, Params)>>,
    }

    impl StaticClient {
        fn new(result: Result<Value, SdkError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ServiceClient for StaticClient {
        fn service_name(&self) -> &str {
            "widgets"
        }

        async fn call(&self, operation: &str, params: Params) -> Result<Value, SdkError> {
            self.calls
                .lock()
                .unwrap()
                .push((operation.to_string(), params));
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn test_properties_without_id_skips_remote_call() {
        let client = StaticClient::new(Ok(json!({})));
        let handle = WIDGET.handle(client.clone(), None);

        assert_eq!(handle.properties().await.unwrap(), None);
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_properties_and_status() {
        let client = StaticClient::new(Ok(json!({
            "Widgets": [{"WidgetId": "w-1", "State": "pending", "WidgetArn": "arn:w-1"}]
        })));
        let handle = WIDGET.handle(client.clone(), Some("w-1".to_string()));

        let props = handle.properties().await.unwrap().unwrap();
        assert_eq!(handle.status_of(&props).as_deref(), Some("pending"));
        assert_eq!(handle.arn_of(&props).as_deref(), Some("arn:w-1"));
        assert_eq!(handle.status().await.unwrap().as_deref(), Some("pending"));

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls[0].0, "describe_widgets");
        assert_eq!(calls[0].1["WidgetIds"], json!(["w-1"]));
    }

    #[tokio::test]
    async fn test_not_found_and_empty_responses_are_absent() {
        let missing = StaticClient::new(Err(SdkError::service(
            "DescribeWidgets",
            "InvalidWidgetID.NotFound",
            "gone",
        )));
        let handle = WIDGET.handle(missing, Some("w-1".to_string()));
        assert_eq!(handle.properties().await.unwrap(), None);
        assert_eq!(handle.status().await.unwrap(), None);

        let empty = StaticClient::new(Ok(json!({"Widgets": []})));
        let handle = WIDGET.handle(empty, Some("w-1".to_string()));
        assert_eq!(handle.properties().await.unwrap(), None);

        let malformed = StaticClient::new(Ok(json!("unexpected")));
        let handle = WIDGET.handle(malformed, Some("w-1".to_string()));
        assert_eq!(handle.properties().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unmodeled_errors_propagate() {
        let denied = SdkError::service("DescribeWidgets", "UnauthorizedOperation", "denied");
        let client = StaticClient::new(Err(denied.clone()));
        let handle = WIDGET.handle(client, Some("w-1".to_string()));

        assert_eq!(handle.properties().await.unwrap_err(), denied);
        assert_eq!(handle.delete(Params::new()).await.unwrap_err(), denied);
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_resource() {
        let client = StaticClient::new(Err(SdkError::service(
            "DeleteWidget",
            "InvalidWidgetID.NotFound",
            "gone",
        )));
        let handle = WIDGET.handle(client.clone(), Some("w-1".to_string()));

        assert_eq!(handle.delete(Params::new()).await.unwrap(), json!({}));
        let calls = client.calls.lock().unwrap();
        assert_eq!(calls[0].1["WidgetId"], json!("w-1"));
    }

    #[test]
    fn test_id_from_create_response() {
        let client = StaticClient::new(Ok(json!({})));
        let handle = WIDGET.handle(client, None);
        let response = json!({"Widget": {"WidgetId": "w-9"}});
        assert_eq!(handle.id_from_response(&response).as_deref(), Some("w-9"));
        assert_eq!(handle.id_from_response(&json!({})), None);
    }
}
