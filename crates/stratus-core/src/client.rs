//! Cloud SDK client abstraction
//!
//! A [`ServiceClient`] is one SDK client for one service (`ec2`, `sts`, ...).
//! Operations are addressed by their snake_case SDK name
//! (`describe_vpcs`, `create_vpc`) and take/return JSON objects whose keys
//! follow the service's PascalCase member names (`VpcIds`, `CidrBlock`).

use crate::config::ClientConfig;
use crate::error::SdkError;
use async_trait::async_trait;
use std::sync::Arc;

/// Keyword arguments of an SDK call
pub type Params = serde_json::Map<String, serde_json::Value>;

/// A client bound to one cloud service
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// Service name this client talks to (e.g. "ec2")
    fn service_name(&self) -> &str;

    /// Invoke an SDK operation
    async fn call(&self, operation: &str, params: Params) -> Result<serde_json::Value, SdkError>;
}

/// Builds service clients from a resolved configuration
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Build a client for `service`.
    ///
    /// Unsupported service names must fail with [`SdkError::UnknownService`].
    async fn create(
        &self,
        service: &str,
        config: &ClientConfig,
    ) -> Result<Arc<dyn ServiceClient>, SdkError>;
}
