//! EC2 internet gateway
//!
//! Gateways have no status of their own; one that can be described is
//! ready. Attachment to a VPC is a relationship operation on the gateway
//! node with the VPC as target.

use stratus_core::{
    AwsRelationship, AwsResource, Create, Delete, DeletePolicy, Mutate, RelationshipOptions,
    ResourceOptions, ResourceSpec, StatusPolicy, WaitForDelete, WaitForStatus, aws_relationship,
    aws_resource, wait_for_delete, wait_for_status,
};

pub const INTERNET_GATEWAY_TYPE: &str = "stratus.nodes.aws.ec2.InternetGateway";

pub const INTERNET_GATEWAY: ResourceSpec = ResourceSpec {
    type_name: "AWS EC2 Internet Gateway",
    service: crate::sdk::EC2,
    id_param: "InternetGatewayId",
    describe_operation: "describe_internet_gateways",
    describe_filter: "InternetGatewayIds",
    response_key: "InternetGateways",
    status_key: None,
    arn_key: None,
    create_operation: "create_internet_gateway",
    create_response_key: Some("InternetGateway"),
    delete_operation: "delete_internet_gateway",
    not_found_codes: &["InvalidInternetGatewayID.NotFound"],
};

pub fn create() -> AwsResource<ResourceSpec, WaitForStatus<Create>> {
    aws_resource(
        INTERNET_GATEWAY,
        ResourceOptions::create(),
        wait_for_status(StatusPolicy::new(&["available"], &[]), Create),
    )
}

/// The gateway must be detached from every VPC first. A gateway that can
/// still be described after the delete call is treated as still deleting.
pub fn delete() -> AwsResource<ResourceSpec, WaitForDelete<Delete>> {
    aws_resource(
        INTERNET_GATEWAY,
        ResourceOptions::delete(),
        wait_for_delete(DeletePolicy::new(&["deleted"], &["available"]), Delete),
    )
}

pub fn attach_to() -> AwsRelationship<ResourceSpec, Mutate> {
    aws_relationship(
        INTERNET_GATEWAY,
        RelationshipOptions::new("VpcId"),
        Mutate("attach_internet_gateway"),
    )
}

pub fn detach_from() -> AwsRelationship<ResourceSpec, Mutate> {
    aws_relationship(
        INTERNET_GATEWAY,
        RelationshipOptions::new("VpcId"),
        Mutate("detach_internet_gateway"),
    )
}
