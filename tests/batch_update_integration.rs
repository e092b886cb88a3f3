//! End-to-end batch update tests against the SQLite fixture.

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::{engine, matching_ids, now, single};
use sift::domain::{CalloutResponse, Contact};
use sift::prelude::*;
use sift::ErrorCode;

#[tokio::test]
async fn test_update_reports_ids_and_affected() {
    let engine = engine().await;
    let result = BatchUpdateOperation::<_, CalloutResponse>::new(engine.clone())
        .rules(single("bucket", "equal", "text", json!(["inbox"])))
        .now(now())
        .set("bucket", "archived")
        .exec()
        .await
        .unwrap();

    assert_eq!(result.affected, 2);
    let mut ids: Vec<i64> = result.ids.iter().filter_map(|id| id.as_i64()).collect();
    ids.sort();
    assert_eq!(ids, vec![10, 12]);

    let archived = single("bucket", "equal", "text", json!(["archived"]));
    assert_eq!(matching_ids::<CalloutResponse>(&engine, archived).await, vec![10, 11, 12]);
}

#[tokio::test]
async fn test_update_through_handler_fields() {
    let engine = engine().await;
    let result = BatchUpdateOperation::<_, Contact>::new(engine.clone())
        .rules(single("tags", "contains", "array", json!(["vip"])))
        .now(now())
        .set("newsletterStatus", "pending")
        .set("deliveryOptIn", false)
        .exec()
        .await
        .unwrap();
    assert_eq!(result.affected, 2);

    let pending = single("newsletterStatus", "equal", "enum", json!(["pending"]));
    assert_eq!(matching_ids::<Contact>(&engine, pending).await, vec![1, 3]);

    let opted_in = single("deliveryOptIn", "equal", "boolean", json!([true]));
    assert!(matching_ids::<Contact>(&engine, opted_in).await.is_empty());
}

#[tokio::test]
async fn test_update_matching_nothing() {
    let engine = engine().await;
    let result = BatchUpdateOperation::<_, Contact>::new(engine)
        .rules(RuleGroup::or([]))
        .set("bio", "never written")
        .exec()
        .await
        .unwrap();
    assert_eq!(result.affected, 0);
    assert!(result.ids.is_empty());
}

#[tokio::test]
async fn test_update_assigns_null() {
    let engine = engine().await;
    BatchUpdateOperation::<_, CalloutResponse>::new(engine.clone())
        .rules(single("assignee", "equal", "contact", json!(["me"])))
        .actor("3")
        .set("assigneeId", FilterValue::Null)
        .exec()
        .await
        .unwrap();

    let unassigned = single("assignee", "is_empty", "contact", json!([]));
    assert_eq!(matching_ids::<CalloutResponse>(&engine, unassigned).await, vec![10, 11, 12]);
}

#[tokio::test]
async fn test_invalid_update_changes_nothing() {
    let engine = engine().await;
    let err = BatchUpdateOperation::<_, Contact>::new(engine.clone())
        .rules(single("tags", "contains", "text", json!(["vip"])))
        .set("bio", "x")
        .exec()
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidRule);
    assert_eq!(err.context.operation.as_deref(), Some("batch_update"));

    let err = BatchUpdateOperation::<_, Contact>::new(engine.clone())
        .rules(RuleGroup::and([]))
        .exec()
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidParameter);

    let written = single("bio", "equal", "text", json!(["x"]));
    assert!(matching_ids::<Contact>(&engine, written).await.is_empty());
}

#[tokio::test]
async fn test_update_of_unknown_column_is_database_error() {
    let engine = engine().await;
    let err = BatchUpdateOperation::<_, Contact>::new(engine)
        .set("nickname", "x")
        .exec()
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DatabaseError);
    assert!(err.context.sql.is_some());
}
