//! Stratus lifecycle framework
//!
//! This crate is the shared core every AWS resource module is built on. It
//! turns small "shape parameters, call the SDK" functions into lifecycle
//! operations an orchestrator can invoke repeatedly until a resource
//! converges.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  Orchestrator                    │
//! │        invoke → Ok / Retry / NonRecoverable      │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                 stratus-core                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  lifecycle: aws_resource / relationship  │   │
//! │  │  polling: wait_for_status / _delete      │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐   │
//! │  │   params   │ │  runtime   │ │ connection │   │
//! │  └────────────┘ └────────────┘ └────────────┘   │
//! └───────┬─────────────────────────────────────────┘
//!         │ trait ServiceClient / ResourceHandle
//! ┌───────▼───────┐
//! │  stratus-aws  │
//! └───────────────┘
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod params;
pub mod polling;
pub mod resource;
pub mod runtime;
pub mod store;

// Re-exports
pub use client::{ClientFactory, Params, ServiceClient};
pub use config::{ClientConfig, ClientConfigLayer, Credentials};
pub use connection::ConnectionManager;
pub use context::{
    CallArgs, NodeInstance, NodeProperties, OperationContext, Relationship, RelationshipContext,
};
pub use error::{ConfigError, LifecycleError, Result, SdkError, StoreError};
pub use lifecycle::{
    AwsRelationship, AwsResource, Call, Create, Delete, Mutate, Operation, OperationKind,
    RelationshipOptions, ResourceOptions, aws_relationship, aws_resource,
};
pub use params::{ParamSources, Precedence, aws_params, resolve_param};
pub use polling::{
    DeletePolicy, StatusClass, StatusPolicy, WaitForDelete, WaitForStatus, wait_for_delete,
    wait_for_status,
};
pub use resource::{DescribedResource, ResourceHandle, ResourceKind, ResourceSpec};
pub use runtime::RuntimeProperties;
pub use store::{DeploymentState, InstanceRecord, PropertyStore, StateLock};
