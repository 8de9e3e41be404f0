//! AWS binding for Stratus
//!
//! This crate connects the lifecycle framework in `stratus-core` to the AWS
//! SDK and provides EC2 networking resource modules built on it.
//!
//! # Modules
//!
//! - [`sdk`]: `AwsClientFactory` for `ec2` and `sts`
//! - [`vpc`], [`subnet`], [`internet_gateway`]: lifecycle entry points
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use stratus_aws::{AwsClientFactory, vpc};
//! use stratus_core::{CallArgs, LifecycleError, OperationContext};
//!
//! let mut ctx = OperationContext::new(instance, Arc::new(AwsClientFactory::new()));
//! match vpc::create().invoke(&mut ctx, CallArgs::new()).await {
//!     Ok(()) => println!("VPC {:?} ready", ctx.instance.runtime_properties.resource_id()),
//!     Err(LifecycleError::Retry { retry_after, .. }) => schedule_again(retry_after),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

pub mod error;
pub mod internet_gateway;
pub mod sdk;
pub mod subnet;
pub mod vpc;

pub use error::{AwsError, Result};
pub use internet_gateway::{INTERNET_GATEWAY, INTERNET_GATEWAY_TYPE};
pub use sdk::{AwsClientFactory, Ec2Client, StsClient};
pub use subnet::{CreateSubnet, SUBNET, SUBNET_TYPE};
pub use vpc::{VPC, VPC_TYPE};
