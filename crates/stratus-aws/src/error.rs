//! AWS binding error types

use stratus_core::SdkError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AwsError {
    #[error("{service} client does not support the {operation} operation")]
    UnsupportedOperation { service: String, operation: String },

    #[error("Missing required parameter in input: \"{name}\"")]
    MissingParameter { operation: String, name: String },

    #[error("Invalid type for parameter {name}, expected {expected}")]
    InvalidParameter {
        operation: String,
        name: String,
        expected: &'static str,
    },
}

impl AwsError {
    /// Error code the service itself would report
    pub fn code(&self) -> &'static str {
        match self {
            AwsError::UnsupportedOperation { .. } => "InvalidAction",
            AwsError::MissingParameter { .. } => "MissingParameter",
            AwsError::InvalidParameter { .. } => "InvalidParameterValue",
        }
    }

    fn operation(&self) -> &str {
        match self {
            AwsError::UnsupportedOperation { operation, .. }
            | AwsError::MissingParameter { operation, .. }
            | AwsError::InvalidParameter { operation, .. } => operation,
        }
    }
}

impl From<AwsError> for SdkError {
    fn from(err: AwsError) -> Self {
        SdkError::service(err.operation(), err.code(), err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_maps_to_service_error() {
        let err = AwsError::MissingParameter {
            operation: "delete_vpc".to_string(),
            name: "VpcId".to_string(),
        };
        let sdk: SdkError = err.into();
        assert_eq!(sdk.code(), Some("MissingParameter"));
        assert!(sdk.to_string().contains("\"VpcId\""));
        assert!(sdk.to_string().contains("delete_vpc"));
    }

    #[test]
    fn test_unsupported_operation_code() {
        let err = AwsError::UnsupportedOperation {
            service: "ec2".to_string(),
            operation: "run_instances".to_string(),
        };
        assert_eq!(err.code(), "InvalidAction");
        assert_eq!(
            err.to_string(),
            "ec2 client does not support the run_instances operation"
        );
    }
}
