mod common;

use common::*;
use serde_json::json;
use stratus_core::{ClientConfig, ClientConfigLayer, ConnectionManager, SdkError};

#[tokio::test]
async fn test_client_is_memoized_per_manager() {
    let factory = FakeFactory::new(vec![FakeClient::new("widgets")]);

    let mut first = ConnectionManager::new(factory.clone(), ClientConfig::default());
    first.client("widgets").await.unwrap();
    first.client("widgets").await.unwrap();
    assert_eq!(factory.created_services(), vec!["widgets"]);

    let mut second = ConnectionManager::new(factory.clone(), ClientConfig::default());
    second.client("widgets").await.unwrap();
    assert_eq!(factory.created_services(), vec!["widgets", "widgets"]);
}

#[tokio::test]
async fn test_unknown_service_error_is_unmodified() {
    let factory = FakeFactory::new(vec![FakeClient::new("widgets"), FakeClient::new("sts")]);
    let mut manager = ConnectionManager::new(factory, ClientConfig::default());

    let err = manager.client("gizmos").await.err().unwrap();
    assert_eq!(
        err,
        SdkError::UnknownService {
            name: "gizmos".to_string(),
            known: "sts, widgets".to_string(),
        }
    );
}

#[tokio::test]
async fn test_account_id() {
    let sts = FakeClient::new("sts");
    sts.script(
        "get_caller_identity",
        vec![Ok(json!({"Account": "123456789012", "Arn": "arn:aws:iam::123456789012:user/ci"}))],
    );
    let factory = FakeFactory::new(vec![sts]);
    let manager = ConnectionManager::new(factory, ClientConfig::default());

    assert_eq!(manager.get_account_id().await.as_deref(), Some("123456789012"));
}

#[tokio::test]
async fn test_account_id_failure_is_none() {
    let sts = FakeClient::new("sts");
    sts.script(
        "get_caller_identity",
        vec![Err(SdkError::service(
            "GetCallerIdentity",
            "ExpiredToken",
            "The security token included in the request is expired",
        ))],
    );
    let factory = FakeFactory::new(vec![sts]);
    let manager = ConnectionManager::new(factory, ClientConfig::default());
    assert_eq!(manager.get_account_id().await, None);

    let no_sts = FakeFactory::new(vec![FakeClient::new("widgets")]);
    let manager = ConnectionManager::new(no_sts, ClientConfig::default());
    assert_eq!(manager.get_account_id().await, None);
}

#[tokio::test]
async fn test_layers_resolve_before_client_creation() {
    let factory = FakeFactory::new(vec![FakeClient::new("widgets")]);
    let call_site = ClientConfigLayer {
        region_name: Some("us-west-2".to_string()),
        ..Default::default()
    };
    let node = ClientConfigLayer {
        region_name: Some("eu-west-1".to_string()),
        endpoint_url: Some("http://localhost:4566".to_string()),
        ..Default::default()
    };

    let mut manager = ConnectionManager::from_layers(
        factory.clone(),
        Some(&call_site),
        &node,
        &ClientConfigLayer::default(),
    )
    .unwrap();
    manager.client("widgets").await.unwrap();

    let created = factory.created.lock().unwrap();
    let config = &created[0].1;
    assert_eq!(config.region.as_deref(), Some("us-west-2"));
    assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:4566"));
    assert!(config.uses_default_chain());
}

#[test]
fn test_incomplete_layer_is_rejected() {
    let factory = FakeFactory::new(vec![FakeClient::new("widgets")]);
    let node = ClientConfigLayer {
        aws_access_key_id: Some("AKIA".to_string()),
        ..Default::default()
    };

    let result =
        ConnectionManager::from_layers(factory, None, &node, &ClientConfigLayer::default());
    assert!(result.is_err());
}
