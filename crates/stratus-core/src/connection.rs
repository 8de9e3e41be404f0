//! Connection manager: one cached client per service name

use crate::client::{ClientFactory, Params, ServiceClient};
use crate::config::{ClientConfig, ClientConfigLayer};
use crate::error::{ConfigError, SdkError};
use std::collections::HashMap;
use std::sync::Arc;

const ACCOUNT_SERVICE: &str = "sts";
const ACCOUNT_OPERATION: &str = "get_caller_identity";

/// Owns the resolved client configuration and the clients built from it.
///
/// A manager lives for one lifecycle invocation; clients are never shared
/// across managers.
pub struct ConnectionManager {
    factory: Arc<dyn ClientFactory>,
    config: ClientConfig,
    clients: HashMap<String, Arc<dyn ServiceClient>>,
}

impl ConnectionManager {
    pub fn new(factory: Arc<dyn ClientFactory>, config: ClientConfig) -> Self {
        Self {
            factory,
            config,
            clients: HashMap::new(),
        }
    }

    /// Resolve layered configuration and build a manager from it
    pub fn from_layers(
        factory: Arc<dyn ClientFactory>,
        call_site: Option<&ClientConfigLayer>,
        node: &ClientConfigLayer,
        env: &ClientConfigLayer,
    ) -> Result<Self, ConfigError> {
        let config = ClientConfig::resolve(call_site, node, env)?;
        Ok(Self::new(factory, config))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Client for `service`, built on first use
    pub async fn client(&mut self, service: &str) -> Result<Arc<dyn ServiceClient>, SdkError> {
        if let Some(client) = self.clients.get(service) {
            return Ok(client.clone());
        }

        tracing::debug!(service = service, "Creating service client");
        let client = self.factory.create(service, &self.config).await?;
        self.clients.insert(service.to_string(), client.clone());
        Ok(client)
    }

    /// Account id of the caller, or `None` when the lookup fails
    pub async fn get_account_id(&self) -> Option<String> {
        let client = match self.factory.create(ACCOUNT_SERVICE, &self.config).await {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "Unable to create STS client");
                return None;
            }
        };

        match client.call(ACCOUNT_OPERATION, Params::new()).await {
            Ok(response) => {
                let account = response
                    .get("Account")
                    .and_then(|v| v.as_str())
                    .map(String::from);
                if account.is_none() {
                    tracing::warn!("Caller identity response has no Account field");
                }
                account
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unable to resolve caller account id");
                None
            }
        }
    }
}
