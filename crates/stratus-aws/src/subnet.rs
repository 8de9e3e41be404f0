//! EC2 subnet
//!
//! A subnet lives in a VPC. When `VpcId` is not part of the resource
//! configuration it is taken from the node's relationship to a VPC node.

use crate::vpc::VPC_TYPE;
use async_trait::async_trait;
use serde_json::Value;
use stratus_core::{
    AwsResource, Call, Create, Delete, DeletePolicy, LifecycleError, Operation, ResourceOptions,
    ResourceSpec, Result, StatusPolicy, WaitForDelete, WaitForStatus, aws_resource,
    wait_for_delete, wait_for_status,
};

pub const SUBNET_TYPE: &str = "stratus.nodes.aws.ec2.Subnet";

const VPC_ID: &str = "VpcId";

pub const SUBNET: ResourceSpec = ResourceSpec {
    type_name: "AWS EC2 Subnet",
    service: crate::sdk::EC2,
    id_param: "SubnetId",
    describe_operation: "describe_subnets",
    describe_filter: "SubnetIds",
    response_key: "Subnets",
    status_key: Some("State"),
    arn_key: Some("SubnetArn"),
    create_operation: "create_subnet",
    create_response_key: Some("Subnet"),
    delete_operation: "delete_subnet",
    not_found_codes: &["InvalidSubnetID.NotFound"],
};

/// Create call with the VPC filled in from a relationship
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateSubnet;

#[async_trait]
impl Operation for CreateSubnet {
    async fn run(&self, call: &mut Call<'_>) -> Result<()> {
        if !call.params.contains_key(VPC_ID) {
            let vpc_id = call.related_resource_id(VPC_TYPE).ok_or_else(|| {
                LifecycleError::non_recoverable(format!(
                    "{} requires a {} in its resource_config or a relationship to a VPC",
                    call.label(),
                    VPC_ID
                ))
            })?;
            tracing::debug!(vpc_id = vpc_id.as_str(), "VPC taken from relationship");
            call.params.insert(VPC_ID.to_string(), Value::String(vpc_id));
        }
        Create.run(call).await
    }
}

pub fn create() -> AwsResource<ResourceSpec, WaitForStatus<CreateSubnet>> {
    aws_resource(
        SUBNET,
        ResourceOptions::create(),
        wait_for_status(StatusPolicy::new(&["available"], &["pending"]), CreateSubnet),
    )
}

pub fn delete() -> AwsResource<ResourceSpec, WaitForDelete<Delete>> {
    aws_resource(
        SUBNET,
        ResourceOptions::delete(),
        wait_for_delete(DeletePolicy::default(), Delete),
    )
}
