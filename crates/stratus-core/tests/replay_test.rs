//! Replays lifecycle operations the way an orchestrator does: runtime
//! properties are loaded before and persisted after every invocation.

mod common;

use common::*;
use serde_json::json;
use stratus_core::{
    CallArgs, Create, Delete, DeletePolicy, LifecycleError, PropertyStore, ResourceOptions,
    StatusPolicy, aws_resource, wait_for_delete, wait_for_status,
};
use tempfile::tempdir;

const MAX_ATTEMPTS: u32 = 10;

#[tokio::test]
async fn test_create_and_delete_across_invocations() {
    let dir = tempdir().unwrap();
    let store = PropertyStore::new(dir.path());

    let client = FakeClient::new("widgets");
    client.script(
        "describe_widgets",
        vec![
            widget("foo", "pending"),
            widget("foo", "pending"),
            widget("foo", "available"),
        ],
    );
    let factory = FakeFactory::new(vec![client.clone()]);

    let create = aws_resource(
        WIDGET,
        ResourceOptions::create(),
        wait_for_status(StatusPolicy::new(&["available"], &["pending"]), Create),
    );

    let lock = store.acquire_lock().await.unwrap();
    let mut attempts = 0;
    loop {
        let bag = store.load_instance("widget_x1y2z3").await.unwrap();
        let node = widget_node(json!({"resource_config": {"Name": "foo"}}))
            .with_runtime_properties(bag);
        let mut ctx = context(node, factory.clone()).with_retry_number(attempts);

        let result = create.invoke(&mut ctx, CallArgs::new()).await;
        store
            .save_instance(&ctx.instance.id, &ctx.instance.runtime_properties)
            .await
            .unwrap();

        attempts += 1;
        match result {
            Ok(()) => break,
            Err(LifecycleError::Retry { .. }) if attempts < MAX_ATTEMPTS => continue,
            Err(e) => panic!("create did not converge: {}", e),
        }
    }
    lock.release().await.unwrap();

    assert_eq!(attempts, 3);
    assert_eq!(client.calls_to("create_widget").len(), 1);
    let persisted = store.load_instance("widget_x1y2z3").await.unwrap();
    assert_eq!(persisted.resource_id(), Some("foo"));
    assert_eq!(persisted.arn(), Some("arn:test:widget/foo"));

    client.script(
        "describe_widgets",
        vec![widget("foo", "deleting"), no_widgets()],
    );
    let delete = aws_resource(
        WIDGET,
        ResourceOptions::delete(),
        wait_for_delete(DeletePolicy::default(), Delete),
    );

    let mut attempts = 0;
    loop {
        let bag = store.load_instance("widget_x1y2z3").await.unwrap();
        let node = widget_node(json!({})).with_runtime_properties(bag);
        let mut ctx = context(node, factory.clone());

        let result = delete.invoke(&mut ctx, CallArgs::new()).await;
        store
            .save_instance(&ctx.instance.id, &ctx.instance.runtime_properties)
            .await
            .unwrap();

        attempts += 1;
        match result {
            Ok(()) => break,
            Err(e) if e.is_retry() && attempts < MAX_ATTEMPTS => continue,
            Err(e) => panic!("delete did not converge: {}", e),
        }
    }

    assert_eq!(attempts, 2);
    assert_eq!(client.calls_to("delete_widget").len(), 1);

    let state = store.load().await.unwrap();
    assert_eq!(state.deleted_instances(), vec!["widget_x1y2z3"]);
}
