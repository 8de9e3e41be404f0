//! Client configuration resolution
//!
//! Layers, highest priority first:
//!
//! 1. explicit call-site `client_config`
//! 2. node `client_config` property
//! 3. environment (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
//!    `AWS_SESSION_TOKEN`, `AWS_DEFAULT_REGION` / `AWS_REGION`)
//! 4. nothing, in which case the SDK default credential chain applies
//!
//! Credentials resolve as one group: the highest layer that mentions any
//! credential key supplies access key, secret and session token together.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
const ENV_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
const ENV_REGION: &str = "AWS_REGION";

/// One layer of client configuration, as written in node properties
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigLayer {
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,
    pub region_name: Option<String>,
    pub endpoint_url: Option<String>,
}

impl ClientConfigLayer {
    /// Read the environment layer
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            aws_access_key_id: var(ENV_ACCESS_KEY_ID),
            aws_secret_access_key: var(ENV_SECRET_ACCESS_KEY),
            aws_session_token: var(ENV_SESSION_TOKEN),
            region_name: var(ENV_DEFAULT_REGION).or_else(|| var(ENV_REGION)),
            endpoint_url: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn has_credentials(&self) -> bool {
        self.aws_access_key_id.is_some()
            || self.aws_secret_access_key.is_some()
            || self.aws_session_token.is_some()
    }

    fn credentials(&self, layer: &str) -> Result<Credentials, ConfigError> {
        let missing = |key: &str| ConfigError::IncompleteCredentials {
            layer: layer.to_string(),
            missing: key.to_string(),
        };
        let access_key_id = self
            .aws_access_key_id
            .clone()
            .ok_or_else(|| missing("aws_access_key_id"))?;
        let secret_access_key = self
            .aws_secret_access_key
            .clone()
            .ok_or_else(|| missing("aws_secret_access_key"))?;
        Ok(Credentials {
            access_key_id,
            secret_access_key,
            session_token: self.aws_session_token.clone(),
        })
    }
}

/// Static credentials handed to the SDK
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "** redacted **"),
            )
            .finish()
    }
}

/// Fully resolved client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    /// `None` means the SDK default credential chain
    pub credentials: Option<Credentials>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
}

impl ClientConfig {
    /// Merge configuration layers in priority order
    pub fn resolve(
        call_site: Option<&ClientConfigLayer>,
        node: &ClientConfigLayer,
        env: &ClientConfigLayer,
    ) -> Result<Self, ConfigError> {
        let layers: Vec<(&str, &ClientConfigLayer)> = call_site
            .map(|layer| ("call-site", layer))
            .into_iter()
            .chain([("node", node), ("environment", env)])
            .collect();

        let credentials = match layers.iter().find(|(_, layer)| layer.has_credentials()) {
            Some((name, layer)) => {
                tracing::debug!(layer = name, "Using static credentials");
                Some(layer.credentials(name)?)
            }
            None => None,
        };

        let region = layers
            .iter()
            .find_map(|(_, layer)| layer.region_name.clone());
        let endpoint_url = layers
            .iter()
            .find_map(|(_, layer)| layer.endpoint_url.clone());

        Ok(Self {
            credentials,
            region,
            endpoint_url,
        })
    }

    /// Whether the SDK default credential chain will be used
    pub fn uses_default_chain(&self) -> bool {
        self.credentials.is_none()
    }
}
