//! AWS SDK binding
//!
//! [`AwsClientFactory`] builds typed SDK clients from a resolved
//! [`ClientConfig`] and exposes them through the operation-name based
//! [`ServiceClient`] interface the lifecycle framework talks to. Request
//! parameters and responses use the service's own PascalCase field names.

use crate::error::{AwsError, Result as ParamResult};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::config::{Credentials, Region};
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError as AwsSdkError};
use aws_sdk_ec2::types::{InternetGateway, Subnet, Tenancy, Vpc};
use serde_json::{Value, json};
use std::sync::Arc;
use stratus_core::{ClientConfig, ClientFactory, Params, SdkError, ServiceClient};

pub const EC2: &str = "ec2";
pub const STS: &str = "sts";

const KNOWN_SERVICES: &[&str] = &[EC2, STS];
const PROVIDER_NAME: &str = "stratus";

/// Builds SDK clients for the services Stratus resource modules use
#[derive(Debug, Clone, Default)]
pub struct AwsClientFactory;

impl AwsClientFactory {
    pub fn new() -> Self {
        Self
    }

    async fn sdk_config(config: &ClientConfig) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(creds) = &config.credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                creds.session_token.clone(),
                None,
                PROVIDER_NAME,
            ));
        }
        if let Some(url) = &config.endpoint_url {
            loader = loader.endpoint_url(url.clone());
        }

        loader.load().await
    }
}

#[async_trait]
impl ClientFactory for AwsClientFactory {
    async fn create(
        &self,
        service: &str,
        config: &ClientConfig,
    ) -> Result<Arc<dyn ServiceClient>, SdkError> {
        if !KNOWN_SERVICES.contains(&service) {
            return Err(SdkError::UnknownService {
                name: service.to_string(),
                known: KNOWN_SERVICES.join(", "),
            });
        }

        tracing::debug!(
            service = service,
            region = config.region.as_deref().unwrap_or("<default>"),
            default_chain = config.uses_default_chain(),
            "Loading AWS SDK configuration"
        );
        let sdk_config = Self::sdk_config(config).await;

        let client: Arc<dyn ServiceClient> = match service {
            EC2 => Arc::new(Ec2Client::new(aws_sdk_ec2::Client::new(&sdk_config))),
            _ => Arc::new(StsClient::new(aws_sdk_sts::Client::new(&sdk_config))),
        };
        Ok(client)
    }
}

/// Map an SDK failure onto the framework's error type.
///
/// Modeled service errors keep their code and message; everything else
/// (dispatch, timeout, response parsing) becomes a transport error.
fn service_error<E, R>(operation: &str, err: AwsSdkError<E, R>) -> SdkError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    if let Some(service_err) = err.as_service_error() {
        if let Some(code) = service_err.code() {
            return SdkError::service(
                operation,
                code,
                service_err.message().unwrap_or_default(),
            );
        }
    }
    SdkError::Transport(DisplayErrorContext(&err).to_string())
}

fn string_param(operation: &str, params: &Params, name: &str) -> ParamResult<Option<String>> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(AwsError::InvalidParameter {
            operation: operation.to_string(),
            name: name.to_string(),
            expected: "a string",
        }),
    }
}

fn required_string(operation: &str, params: &Params, name: &str) -> ParamResult<String> {
    string_param(operation, params, name)?.ok_or_else(|| AwsError::MissingParameter {
        operation: operation.to_string(),
        name: name.to_string(),
    })
}

fn string_list(operation: &str, params: &Params, name: &str) -> ParamResult<Option<Vec<String>>> {
    let invalid = || AwsError::InvalidParameter {
        operation: operation.to_string(),
        name: name.to_string(),
        expected: "a list of strings",
    };
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(String::from).ok_or_else(invalid))
            .collect::<ParamResult<Vec<_>>>()
            .map(Some),
        Some(_) => Err(invalid()),
    }
}

fn bool_param(operation: &str, params: &Params, name: &str) -> ParamResult<Option<bool>> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(AwsError::InvalidParameter {
            operation: operation.to_string(),
            name: name.to_string(),
            expected: "a boolean",
        }),
    }
}

pub fn vpc_json(vpc: &Vpc) -> Value {
    json!({
        "VpcId": vpc.vpc_id(),
        "State": vpc.state().map(|s| s.as_str()),
        "CidrBlock": vpc.cidr_block(),
        "IsDefault": vpc.is_default(),
        "OwnerId": vpc.owner_id(),
        "DhcpOptionsId": vpc.dhcp_options_id(),
        "InstanceTenancy": vpc.instance_tenancy().map(|t| t.as_str()),
    })
}

pub fn subnet_json(subnet: &Subnet) -> Value {
    json!({
        "SubnetId": subnet.subnet_id(),
        "SubnetArn": subnet.subnet_arn(),
        "VpcId": subnet.vpc_id(),
        "State": subnet.state().map(|s| s.as_str()),
        "CidrBlock": subnet.cidr_block(),
        "AvailabilityZone": subnet.availability_zone(),
        "AvailableIpAddressCount": subnet.available_ip_address_count(),
        "MapPublicIpOnLaunch": subnet.map_public_ip_on_launch(),
        "OwnerId": subnet.owner_id(),
    })
}

pub fn internet_gateway_json(gateway: &InternetGateway) -> Value {
    let attachments: Vec<Value> = gateway
        .attachments()
        .iter()
        .map(|a| {
            json!({
                "VpcId": a.vpc_id(),
                "State": a.state().map(|s| s.as_str()),
            })
        })
        .collect();

    json!({
        "InternetGatewayId": gateway.internet_gateway_id(),
        "OwnerId": gateway.owner_id(),
        "Attachments": attachments,
    })
}

/// EC2 operations used by the VPC, subnet and internet gateway modules
pub struct Ec2Client {
    client: aws_sdk_ec2::Client,
}

impl Ec2Client {
    pub fn new(client: aws_sdk_ec2::Client) -> Self {
        Self { client }
    }

    async fn describe_vpcs(&self, op: &str, params: &Params) -> Result<Value, SdkError> {
        let output = self
            .client
            .describe_vpcs()
            .set_vpc_ids(string_list(op, params, "VpcIds")?)
            .send()
            .await
            .map_err(|e| service_error(op, e))?;
        let vpcs: Vec<Value> = output.vpcs().iter().map(vpc_json).collect();
        Ok(json!({ "Vpcs": vpcs }))
    }

    async fn create_vpc(&self, op: &str, params: &Params) -> Result<Value, SdkError> {
        let tenancy = string_param(op, params, "InstanceTenancy")?;
        let output = self
            .client
            .create_vpc()
            .set_cidr_block(string_param(op, params, "CidrBlock")?)
            .set_amazon_provided_ipv6_cidr_block(bool_param(
                op,
                params,
                "AmazonProvidedIpv6CidrBlock",
            )?)
            .set_instance_tenancy(tenancy.as_deref().map(Tenancy::from))
            .send()
            .await
            .map_err(|e| service_error(op, e))?;
        Ok(json!({ "Vpc": output.vpc().map(vpc_json) }))
    }

    async fn delete_vpc(&self, op: &str, params: &Params) -> Result<Value, SdkError> {
        self.client
            .delete_vpc()
            .vpc_id(required_string(op, params, "VpcId")?)
            .send()
            .await
            .map_err(|e| service_error(op, e))?;
        Ok(json!({}))
    }

    async fn describe_subnets(&self, op: &str, params: &Params) -> Result<Value, SdkError> {
        let output = self
            .client
            .describe_subnets()
            .set_subnet_ids(string_list(op, params, "SubnetIds")?)
            .send()
            .await
            .map_err(|e| service_error(op, e))?;
        let subnets: Vec<Value> = output.subnets().iter().map(subnet_json).collect();
        Ok(json!({ "Subnets": subnets }))
    }

    async fn create_subnet(&self, op: &str, params: &Params) -> Result<Value, SdkError> {
        let output = self
            .client
            .create_subnet()
            .vpc_id(required_string(op, params, "VpcId")?)
            .set_cidr_block(string_param(op, params, "CidrBlock")?)
            .set_availability_zone(string_param(op, params, "AvailabilityZone")?)
            .set_ipv6_cidr_block(string_param(op, params, "Ipv6CidrBlock")?)
            .send()
            .await
            .map_err(|e| service_error(op, e))?;
        Ok(json!({ "Subnet": output.subnet().map(subnet_json) }))
    }

    async fn delete_subnet(&self, op: &str, params: &Params) -> Result<Value, SdkError> {
        self.client
            .delete_subnet()
            .subnet_id(required_string(op, params, "SubnetId")?)
            .send()
            .await
            .map_err(|e| service_error(op, e))?;
        Ok(json!({}))
    }

    async fn describe_internet_gateways(
        &self,
        op: &str,
        params: &Params,
    ) -> Result<Value, SdkError> {
        let output = self
            .client
            .describe_internet_gateways()
            .set_internet_gateway_ids(string_list(op, params, "InternetGatewayIds")?)
            .send()
            .await
            .map_err(|e| service_error(op, e))?;
        let gateways: Vec<Value> = output
            .internet_gateways()
            .iter()
            .map(internet_gateway_json)
            .collect();
        Ok(json!({ "InternetGateways": gateways }))
    }

    async fn create_internet_gateway(&self, op: &str) -> Result<Value, SdkError> {
        let output = self
            .client
            .create_internet_gateway()
            .send()
            .await
            .map_err(|e| service_error(op, e))?;
        Ok(json!({ "InternetGateway": output.internet_gateway().map(internet_gateway_json) }))
    }

    async fn delete_internet_gateway(&self, op: &str, params: &Params) -> Result<Value, SdkError> {
        self.client
            .delete_internet_gateway()
            .internet_gateway_id(required_string(op, params, "InternetGatewayId")?)
            .send()
            .await
            .map_err(|e| service_error(op, e))?;
        Ok(json!({}))
    }

    async fn attach_internet_gateway(&self, op: &str, params: &Params) -> Result<Value, SdkError> {
        self.client
            .attach_internet_gateway()
            .internet_gateway_id(required_string(op, params, "InternetGatewayId")?)
            .vpc_id(required_string(op, params, "VpcId")?)
            .send()
            .await
            .map_err(|e| service_error(op, e))?;
        Ok(json!({}))
    }

    async fn detach_internet_gateway(&self, op: &str, params: &Params) -> Result<Value, SdkError> {
        self.client
            .detach_internet_gateway()
            .internet_gateway_id(required_string(op, params, "InternetGatewayId")?)
            .vpc_id(required_string(op, params, "VpcId")?)
            .send()
            .await
            .map_err(|e| service_error(op, e))?;
        Ok(json!({}))
    }
}

#[async_trait]
impl ServiceClient for Ec2Client {
    fn service_name(&self) -> &str {
        EC2
    }

    async fn call(&self, operation: &str, params: Params) -> Result<Value, SdkError> {
        tracing::debug!(service = EC2, operation = operation, "Calling AWS");
        match operation {
            "describe_vpcs" => self.describe_vpcs(operation, &params).await,
            "create_vpc" => self.create_vpc(operation, &params).await,
            "delete_vpc" => self.delete_vpc(operation, &params).await,
            "describe_subnets" => self.describe_subnets(operation, &params).await,
            "create_subnet" => self.create_subnet(operation, &params).await,
            "delete_subnet" => self.delete_subnet(operation, &params).await,
            "describe_internet_gateways" => {
                self.describe_internet_gateways(operation, &params).await
            }
            "create_internet_gateway" => self.create_internet_gateway(operation).await,
            "delete_internet_gateway" => self.delete_internet_gateway(operation, &params).await,
            "attach_internet_gateway" => self.attach_internet_gateway(operation, &params).await,
            "detach_internet_gateway" => self.detach_internet_gateway(operation, &params).await,
            _ => Err(AwsError::UnsupportedOperation {
                service: EC2.to_string(),
                operation: operation.to_string(),
            }
            .into()),
        }
    }
}

/// Caller identity lookups
pub struct StsClient {
    client: aws_sdk_sts::Client,
}

impl StsClient {
    pub fn new(client: aws_sdk_sts::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ServiceClient for StsClient {
    fn service_name(&self) -> &str {
        STS
    }

    async fn call(&self, operation: &str, _params: Params) -> Result<Value, SdkError> {
        tracing::debug!(service = STS, operation = operation, "Calling AWS");
        match operation {
            "get_caller_identity" => {
                let output = self
                    .client
                    .get_caller_identity()
                    .send()
                    .await
                    .map_err(|e| service_error(operation, e))?;
                Ok(json!({
                    "Account": output.account(),
                    "Arn": output.arn(),
                    "UserId": output.user_id(),
                }))
            }
            _ => Err(AwsError::UnsupportedOperation {
                service: STS.to_string(),
                operation: operation.to_string(),
            }
            .into()),
        }
    }
}
