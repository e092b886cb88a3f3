//! Array rules over a plain JSON column, without a field handler.

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::{matching_ids, single};
use sift::prelude::*;

/// Items carry their tags inline, either as a list or as a key to flag map.
struct Item;

impl Entity for Item {
    const NAME: &'static str = "Item";
    const TABLE_NAME: &'static str = "item";
    const ALIAS: &'static str = "i";

    fn filter_schema() -> FilterSchema {
        FilterSchema::new().field("tags", FieldDefinition::new(ValueType::Array).nullable())
    }
}

async fn items() -> SqliteEngine {
    let engine = SqliteEngine::memory().await.unwrap();
    engine
        .execute_batch(
            r#"
            CREATE TABLE item (id INTEGER PRIMARY KEY, tags TEXT);
            INSERT INTO item (id, tags) VALUES
                (5, '{"other":true}'),
                (1, '{"vip":true}'),
                (4, NULL),
                (2, '{"vip":false}'),
                (3, '["vip"]'),
                (6, '[]'),
                (7, '{"vip":0,"other":""}');
            "#,
        )
        .await
        .unwrap();
    engine
}

#[tokio::test]
async fn test_contains_matches_elements_and_truthy_keys() {
    let engine = items().await;

    let contains = single("tags", "contains", "array", json!(["vip"]));
    assert_eq!(matching_ids::<Item>(&engine, contains).await, vec![1, 3]);

    let not_contains = single("tags", "not_contains", "array", json!(["vip"]));
    assert_eq!(matching_ids::<Item>(&engine, not_contains).await, vec![2, 4, 5, 6, 7]);
}

#[tokio::test]
async fn test_emptiness_ignores_falsy_keys() {
    let engine = items().await;

    let empty = single("tags", "is_empty", "array", json!([]));
    assert_eq!(matching_ids::<Item>(&engine, empty).await, vec![2, 4, 6, 7]);

    let not_empty = single("tags", "is_not_empty", "array", json!([]));
    assert_eq!(matching_ids::<Item>(&engine, not_empty).await, vec![1, 3, 5]);
}
