//! EC2 VPC

use stratus_core::{
    AwsResource, Create, Delete, DeletePolicy, ResourceOptions, ResourceSpec, StatusPolicy,
    WaitForDelete, WaitForStatus, aws_resource, wait_for_delete, wait_for_status,
};

pub const VPC_TYPE: &str = "stratus.nodes.aws.ec2.Vpc";

pub const VPC: ResourceSpec = ResourceSpec {
    type_name: "AWS EC2 VPC",
    service: crate::sdk::EC2,
    id_param: "VpcId",
    describe_operation: "describe_vpcs",
    describe_filter: "VpcIds",
    response_key: "Vpcs",
    status_key: Some("State"),
    arn_key: None,
    create_operation: "create_vpc",
    create_response_key: Some("Vpc"),
    delete_operation: "delete_vpc",
    not_found_codes: &["InvalidVpcID.NotFound"],
};

/// Create the VPC and wait until it is `available`
pub fn create() -> AwsResource<ResourceSpec, WaitForStatus<Create>> {
    aws_resource(
        VPC,
        ResourceOptions::create(),
        wait_for_status(StatusPolicy::new(&["available"], &["pending"]), Create),
    )
}

pub fn delete() -> AwsResource<ResourceSpec, WaitForDelete<Delete>> {
    aws_resource(
        VPC,
        ResourceOptions::delete(),
        wait_for_delete(DeletePolicy::default(), Delete),
    )
}
