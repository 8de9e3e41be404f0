//! Lifecycle wrappers
//!
//! A resource module supplies small business operations (shape parameters,
//! issue one SDK call). The wrappers here turn them into orchestrator entry
//! points that are safe to re-invoke:
//!
//! ```text
//! aws_resource(kind, options, wait_for_status(policy, Create))
//!   │ resolve client config, build handle
//!   │ resolve identifier (aws_params), merge call arguments
//!   │ external resource? verify and short-circuit
//!   └─► wait_for_status
//!         │ run Create once per physical attempt
//!         └─ poll status: good → Ok, pending → Retry, bad → NonRecoverable
//! ```
//!
//! All state is reconstructed from the runtime properties on every
//! invocation.

use crate::client::Params;
use crate::connection::ConnectionManager;
use crate::context::{
    self, CallArgs, NodeInstance, OperationContext, Relationship, RelationshipContext,
};
use crate::error::{LifecycleError, Result};
use crate::params::{ParamSources, Precedence, aws_params, resolve_param};
use crate::resource::{ResourceHandle, ResourceKind};
use crate::runtime::RuntimeProperties;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Default interval suggested to the orchestrator before a retry
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(15);

/// State handed to a business operation
pub struct Call<'a> {
    pub handle: &'a mut dyn ResourceHandle,

    /// Effective SDK call arguments
    pub params: &'a mut Params,

    /// Runtime properties of the node (the source node for relationships)
    pub runtime: &'a mut RuntimeProperties,

    /// Relationships of the node the operation runs on
    pub relationships: &'a [Relationship],

    /// Target node of a relationship operation
    pub target: Option<&'a NodeInstance>,

    /// The invocation started from a settled resource identity: one recorded
    /// without parameters of an unfinished creation attempt
    pub created_before: bool,

    pub retry_after: Option<Duration>,
}

impl Call<'_> {
    /// First relationship target of the given type
    pub fn find_related(&self, type_name: &str) -> Option<&NodeInstance> {
        context::find_related(self.relationships, type_name)
    }

    /// Resource identity recorded by the first related node of the given type
    pub fn related_resource_id(&self, type_name: &str) -> Option<String> {
        self.find_related(type_name)
            .and_then(|t| t.runtime_properties.resource_id())
            .map(String::from)
    }

    /// `"<type> ID# \"<id>\""`, used in operator facing messages
    pub fn label(&self) -> String {
        format!(
            "{} ID# \"{}\"",
            self.handle.type_name(),
            self.handle.resource_id().unwrap_or("<unknown>")
        )
    }

    /// Record a new identifier on both the handle and the runtime properties
    pub fn record_resource_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.handle.set_resource_id(id.clone());
        self.runtime.set_resource_id(id);
    }

    /// Convert an SDK error into a non-recoverable error naming this resource
    pub fn sdk_error(&self, err: &crate::error::SdkError) -> LifecycleError {
        LifecycleError::from_sdk(self.handle.type_name(), self.handle.resource_id(), err)
    }
}

/// A step of a lifecycle operation
#[async_trait]
pub trait Operation: Send + Sync {
    async fn run(&self, call: &mut Call<'_>) -> Result<()>;
}

/// Issue the handle's create call with the effective parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct Create;

#[async_trait]
impl Operation for Create {
    async fn run(&self, call: &mut Call<'_>) -> Result<()> {
        let response = call
            .handle
            .create(call.params.clone())
            .await
            .map_err(|e| call.sdk_error(&e))?;

        if let Some(id) = call.handle.id_from_response(&response) {
            call.record_resource_id(id);
        }
        tracing::debug!(resource = call.label().as_str(), "Create call issued");
        Ok(())
    }
}

/// Issue the handle's delete call with the effective parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct Delete;

#[async_trait]
impl Operation for Delete {
    async fn run(&self, call: &mut Call<'_>) -> Result<()> {
        call.handle
            .delete(call.params.clone())
            .await
            .map_err(|e| call.sdk_error(&e))?;
        tracing::debug!(resource = call.label().as_str(), "Delete call issued");
        Ok(())
    }
}

/// Issue a resource specific call with the effective parameters.
///
/// The response is recorded in the runtime properties under the operation
/// name (the source node's properties for relationship operations).
#[derive(Debug, Clone, Copy)]
pub struct Mutate(pub &'static str);

#[async_trait]
impl Operation for Mutate {
    async fn run(&self, call: &mut Call<'_>) -> Result<()> {
        let response = call
            .handle
            .mutate(self.0, call.params.clone())
            .await
            .map_err(|e| call.sdk_error(&e))?;
        call.runtime.set(self.0, response);
        tracing::debug!(
            resource = call.label().as_str(),
            operation = self.0,
            "Resource operation issued"
        );
        Ok(())
    }
}

/// Lifecycle phase a wrapper serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Delete,
    /// configure, start, stop, modify, ...
    Other,
}

/// Per-wrapper behaviour
#[derive(Debug, Clone)]
pub struct ResourceOptions {
    pub operation: OperationKind,
    pub precedence: Precedence,
    /// Fall back to the instance id when no identifier is configured
    pub name_from_instance: bool,
    pub retry_after: Option<Duration>,
}

impl ResourceOptions {
    pub fn new(operation: OperationKind) -> Self {
        Self {
            operation,
            precedence: Precedence::default(),
            name_from_instance: false,
            retry_after: Some(DEFAULT_RETRY_AFTER),
        }
    }

    pub fn create() -> Self {
        Self::new(OperationKind::Create)
    }

    pub fn delete() -> Self {
        Self::new(OperationKind::Delete)
    }

    pub fn other() -> Self {
        Self::new(OperationKind::Other)
    }

    pub fn with_precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn name_from_instance(mut self) -> Self {
        self.name_from_instance = true;
        self
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

fn merge_params(layers: &[Option<&Params>]) -> Params {
    let mut merged = Params::new();
    for layer in layers.iter().flatten() {
        for (key, value) in layer.iter() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Node lifecycle entry point around a business operation
pub struct AwsResource<K, O> {
    kind: K,
    options: ResourceOptions,
    inner: O,
}

/// Wrap `inner` as a node lifecycle entry point for resources of `kind`
pub fn aws_resource<K: ResourceKind, O: Operation>(
    kind: K,
    options: ResourceOptions,
    inner: O,
) -> AwsResource<K, O> {
    AwsResource {
        kind,
        options,
        inner,
    }
}

impl<K: ResourceKind, O: Operation> AwsResource<K, O> {
    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn options(&self) -> &ResourceOptions {
        &self.options
    }

    /// Run the operation once.
    ///
    /// `Ok(())` means the operation is complete. [`LifecycleError::Retry`]
    /// asks the orchestrator to invoke it again later.
    pub async fn invoke(&self, ctx: &mut OperationContext, args: CallArgs) -> Result<()> {
        let type_name = self.kind.type_name().to_string();
        let operation = self.options.operation;
        let instance = &mut ctx.instance;

        if operation == OperationKind::Delete && instance.runtime_properties.is_deleted() {
            tracing::info!(
                resource_type = type_name.as_str(),
                instance = instance.id.as_str(),
                "Resource already deleted"
            );
            return Ok(());
        }

        let identity_at_entry = instance.runtime_properties.resource_id().map(String::from);
        // an identity seeded next to pending parameters belongs to a create
        // call that has not succeeded yet
        let settled_identity = identity_at_entry.is_some()
            && instance
                .runtime_properties
                .resource_config()
                .is_none_or(|config| config.is_empty());
        let external = instance.is_external() && !args.force_operation;

        if external && operation == OperationKind::Delete {
            tracing::info!(
                resource_type = type_name.as_str(),
                resource_id = identity_at_entry.as_deref().unwrap_or_default(),
                "External resource, not deleting"
            );
            instance.runtime_properties.mark_deleted();
            return Ok(());
        }

        let mut connection = ConnectionManager::from_layers(
            ctx.client_factory.clone(),
            args.client_config.as_ref(),
            &instance.properties.client_config,
            &ctx.env,
        )?;
        let client = connection
            .client(self.kind.service())
            .await
            .map_err(|e| LifecycleError::from_sdk(&type_name, identity_at_entry.as_deref(), &e))?;

        let initial_id = identity_at_entry
            .clone()
            .or_else(|| instance.properties.resource_id.clone());
        let mut handle = self.kind.handle(client, initial_id.clone());

        let fallback = instance.properties.resource_id.clone().or_else(|| {
            self.options
                .name_from_instance
                .then(|| instance.id.clone())
        });
        let sources = ParamSources {
            call_params: args.resource_config.as_ref(),
            node_config: Some(&instance.properties.resource_config),
            fallback: fallback.as_deref(),
            handle_id: initial_id.as_deref(),
        };

        if external {
            let resolved = resolve_param(
                self.kind.id_param(),
                &sources,
                &instance.runtime_properties,
                self.options.precedence,
            );
            return verify_external(handle.as_mut(), resolved, &mut instance.runtime_properties)
                .await;
        }

        let mut params = match operation {
            OperationKind::Delete => merge_params(&[args.resource_config.as_ref()]),
            _ => {
                let stored = instance.runtime_properties.resource_config().cloned();
                let layers = match self.options.precedence {
                    Precedence::CallParametersFirst => [
                        Some(&instance.properties.resource_config),
                        stored.as_ref(),
                        args.resource_config.as_ref(),
                    ],
                    Precedence::RuntimeStateFirst => [
                        Some(&instance.properties.resource_config),
                        args.resource_config.as_ref(),
                        stored.as_ref(),
                    ],
                };
                merge_params(&layers)
            }
        };

        let resolved = aws_params(
            self.kind.id_param(),
            &sources,
            &mut instance.runtime_properties,
            self.options.precedence,
            &mut params,
        );
        if let Some(id) = resolved {
            handle.set_resource_id(id);
        }

        if operation != OperationKind::Delete {
            instance
                .runtime_properties
                .set_resource_config(params.clone());
        }

        tracing::info!(
            resource_type = type_name.as_str(),
            resource_id = handle.resource_id().unwrap_or_default(),
            operation = ?operation,
            retry_number = ctx.retry_number,
            "Running lifecycle operation"
        );

        let mut call = Call {
            handle: handle.as_mut(),
            params: &mut params,
            runtime: &mut instance.runtime_properties,
            relationships: &instance.relationships,
            target: None,
            created_before: settled_identity,
            retry_after: self.options.retry_after,
        };
        self.inner.run(&mut call).await
    }
}

/// Confirm an external resource exists and mirror its identity.
///
/// The runtime properties are only written once the resource is confirmed.
async fn verify_external(
    handle: &mut dyn ResourceHandle,
    resolved: Option<String>,
    runtime: &mut RuntimeProperties,
) -> Result<()> {
    let type_name = handle.type_name().to_string();
    let Some(id) = resolved else {
        return Err(LifecycleError::non_recoverable(format!(
            "Cannot use_external_resource because no {} identifier was provided",
            type_name
        )));
    };
    handle.set_resource_id(id.clone());

    let properties = handle
        .properties()
        .await
        .map_err(|e| LifecycleError::from_sdk(&type_name, Some(&id), &e))?;

    let Some(properties) = properties else {
        return Err(LifecycleError::non_recoverable(format!(
            "Cannot use_external_resource because {} ID# \"{}\" does not exist",
            type_name, id
        )));
    };

    tracing::info!(
        resource_type = type_name.as_str(),
        resource_id = id.as_str(),
        "Using external resource"
    );
    if let Some(arn) = handle.arn_of(&properties) {
        runtime.set_arn(arn);
    }
    runtime.set_resource_id(id);
    Ok(())
}

/// Which runtime identity of the target a relationship operation passes on
#[derive(Debug, Clone)]
pub struct RelationshipOptions {
    /// Call parameter receiving the target identifier (e.g. "VpcId")
    pub target_param: String,
    pub retry_after: Option<Duration>,
}

impl RelationshipOptions {
    pub fn new(target_param: impl Into<String>) -> Self {
        Self {
            target_param: target_param.into(),
            retry_after: Some(DEFAULT_RETRY_AFTER),
        }
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

/// Relationship entry point around a business operation
pub struct AwsRelationship<K, O> {
    kind: K,
    options: RelationshipOptions,
    inner: O,
}

/// Wrap `inner` as a relationship entry point.
///
/// `kind` describes the source resource; the target's identity is passed to
/// `inner` under [`RelationshipOptions::target_param`].
pub fn aws_relationship<K: ResourceKind, O: Operation>(
    kind: K,
    options: RelationshipOptions,
    inner: O,
) -> AwsRelationship<K, O> {
    AwsRelationship {
        kind,
        options,
        inner,
    }
}

impl<K: ResourceKind, O: Operation> AwsRelationship<K, O> {
    pub async fn invoke(&self, ctx: &mut RelationshipContext, args: CallArgs) -> Result<()> {
        let type_name = self.kind.type_name().to_string();
        let source = &mut ctx.source;
        let target = &ctx.target;

        if source.is_external() && !args.force_operation {
            tracing::info!(
                resource_type = type_name.as_str(),
                source = source.id.as_str(),
                target = target.id.as_str(),
                "External resource, skipping relationship operation"
            );
            return Ok(());
        }

        let target_id = target
            .runtime_properties
            .resource_id()
            .map(String::from)
            .or_else(|| target.properties.resource_id.clone())
            .ok_or_else(|| {
                LifecycleError::non_recoverable(format!(
                    "Missing required relationship: target {} of {} has no resource identifier",
                    target.id, source.id
                ))
            })?;

        let source_id = source
            .runtime_properties
            .resource_id()
            .map(String::from)
            .or_else(|| source.properties.resource_id.clone())
            .ok_or_else(|| {
                LifecycleError::non_recoverable(format!(
                    "{} of node {} has no resource identifier",
                    type_name, source.id
                ))
            })?;

        let mut connection = ConnectionManager::from_layers(
            ctx.client_factory.clone(),
            args.client_config.as_ref(),
            &source.properties.client_config,
            &ctx.env,
        )?;
        let client = connection
            .client(self.kind.service())
            .await
            .map_err(|e| LifecycleError::from_sdk(&type_name, Some(&source_id), &e))?;
        let mut handle = self.kind.handle(client, Some(source_id.clone()));

        let mut params = merge_params(&[args.resource_config.as_ref()]);
        params.insert(
            self.kind.id_param().to_string(),
            Value::String(source_id.clone()),
        );
        params.insert(
            self.options.target_param.clone(),
            Value::String(target_id.clone()),
        );

        tracing::info!(
            resource_type = type_name.as_str(),
            source = source_id.as_str(),
            target = target_id.as_str(),
            "Running relationship operation"
        );

        let mut call = Call {
            handle: handle.as_mut(),
            params: &mut params,
            runtime: &mut source.runtime_properties,
            relationships: &source.relationships,
            target: Some(target),
            created_before: true,
            retry_after: self.options.retry_after,
        };
        self.inner.run(&mut call).await
    }
}
