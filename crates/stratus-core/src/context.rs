//! Node instances and invocation contexts handed in by the orchestrator

use crate::client::{ClientFactory, Params};
use crate::config::ClientConfigLayer;
use crate::runtime::RuntimeProperties;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Node configuration recognised by the framework
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeProperties {
    /// Treat the resource as pre-existing and read-only
    pub use_external_resource: bool,

    /// Identifier of the resource, mostly used with external resources
    pub resource_id: Option<String>,

    /// SDK call arguments
    pub resource_config: Params,

    /// Per-node client configuration
    pub client_config: ClientConfigLayer,
}

/// A node instance as seen by one lifecycle invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInstance {
    /// Instance id (unique per deployment)
    pub id: String,

    /// Node name in the blueprint
    pub node_id: String,

    /// Type hierarchy, most generic first
    #[serde(default)]
    pub type_hierarchy: Vec<String>,

    #[serde(default)]
    pub properties: NodeProperties,

    #[serde(default)]
    pub runtime_properties: RuntimeProperties,

    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// Directed edge from this instance to a target instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub target: NodeInstance,
}

impl NodeInstance {
    pub fn new(id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_id: node_id.into(),
            type_hierarchy: Vec::new(),
            properties: NodeProperties::default(),
            runtime_properties: RuntimeProperties::new(),
            relationships: Vec::new(),
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_hierarchy.push(type_name.into());
        self
    }

    pub fn with_properties(mut self, properties: NodeProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_runtime_properties(mut self, runtime_properties: RuntimeProperties) -> Self {
        self.runtime_properties = runtime_properties;
        self
    }

    pub fn with_relationship(
        mut self,
        relationship_type: impl Into<String>,
        target: NodeInstance,
    ) -> Self {
        self.relationships.push(Relationship {
            relationship_type: relationship_type.into(),
            target,
        });
        self
    }

    /// Whether `type_name` appears anywhere in the type hierarchy
    pub fn is_type(&self, type_name: &str) -> bool {
        self.type_hierarchy.iter().any(|t| t == type_name)
    }

    pub fn is_external(&self) -> bool {
        self.properties.use_external_resource
    }
}

/// First relationship target whose type hierarchy contains `type_name`
pub fn find_related<'a>(
    relationships: &'a [Relationship],
    type_name: &str,
) -> Option<&'a NodeInstance> {
    relationships
        .iter()
        .map(|r| &r.target)
        .find(|t| t.is_type(type_name))
}

/// Context of a node lifecycle operation
pub struct OperationContext {
    pub instance: NodeInstance,

    pub client_factory: Arc<dyn ClientFactory>,

    /// Environment configuration layer captured for this invocation
    pub env: ClientConfigLayer,

    /// How many times the orchestrator already retried this operation
    pub retry_number: u32,
}

impl OperationContext {
    pub fn new(instance: NodeInstance, client_factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            instance,
            client_factory,
            env: ClientConfigLayer::from_env(),
            retry_number: 0,
        }
    }

    pub fn with_env(mut self, env: ClientConfigLayer) -> Self {
        self.env = env;
        self
    }

    pub fn with_retry_number(mut self, retry_number: u32) -> Self {
        self.retry_number = retry_number;
        self
    }
}

/// Context of a relationship operation (source → target)
pub struct RelationshipContext {
    pub source: NodeInstance,
    pub target: NodeInstance,
    pub client_factory: Arc<dyn ClientFactory>,
    pub env: ClientConfigLayer,
    pub retry_number: u32,
}

impl RelationshipContext {
    pub fn new(
        source: NodeInstance,
        target: NodeInstance,
        client_factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            source,
            target,
            client_factory,
            env: ClientConfigLayer::from_env(),
            retry_number: 0,
        }
    }

    pub fn with_env(mut self, env: ClientConfigLayer) -> Self {
        self.env = env;
        self
    }
}

/// Explicit arguments of one invocation
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    /// Call parameters, highest priority by default
    pub resource_config: Option<Params>,

    /// Call-site client configuration
    pub client_config: Option<ClientConfigLayer>,

    /// Run the operation even for an external resource
    pub force_operation: bool,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource_config(mut self, resource_config: Params) -> Self {
        self.resource_config = Some(resource_config);
        self
    }

    pub fn with_client_config(mut self, client_config: ClientConfigLayer) -> Self {
        self.client_config = Some(client_config);
        self
    }

    pub fn force(mut self) -> Self {
        self.force_operation = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_properties_from_json() {
        let props: NodeProperties = serde_json::from_value(json!({
            "use_external_resource": true,
            "resource_id": "vpc-abc",
            "client_config": {"region_name": "us-east-1"}
        }))
        .unwrap();

        assert!(props.use_external_resource);
        assert_eq!(props.resource_id.as_deref(), Some("vpc-abc"));
        assert!(props.resource_config.is_empty());
        assert_eq!(props.client_config.region_name.as_deref(), Some("us-east-1"));
    }

    #[test]
    fn test_find_related_by_type() {
        let mut vpc = NodeInstance::new("vpc_1", "vpc")
            .with_type("stratus.nodes.Root")
            .with_type("stratus.nodes.aws.ec2.Vpc");
        vpc.runtime_properties.set_resource_id("vpc-123");

        let subnet = NodeInstance::new("subnet_1", "subnet")
            .with_relationship("stratus.relationships.depends_on", vpc);

        let found = find_related(&subnet.relationships, "stratus.nodes.Root").unwrap();
        assert_eq!(found.runtime_properties.resource_id(), Some("vpc-123"));
        assert!(find_related(&subnet.relationships, "stratus.nodes.aws.ec2.Subnet").is_none());
        assert!(!subnet.is_external());
    }
}
