//! Shared fixture: an in-memory membership database.
//!
//! Rows are inserted out of id order so results only come back sorted when a
//! test asks for it.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use sift::prelude::*;

pub const SCHEMA: &str = r#"
CREATE TABLE contact (
    id INTEGER PRIMARY KEY,
    email TEXT NOT NULL,
    firstname TEXT NOT NULL,
    lastname TEXT NOT NULL,
    bio TEXT,
    joined TEXT NOT NULL,
    lastSeen TEXT,
    contributionType TEXT NOT NULL,
    contributionMonthlyAmount REAL,
    deliveryOptIn INTEGER NOT NULL,
    newsletterStatus TEXT NOT NULL
);
CREATE TABLE contact_role (
    contactId INTEGER NOT NULL REFERENCES contact (id),
    "type" TEXT NOT NULL,
    dateAdded TEXT NOT NULL,
    dateExpires TEXT
);
CREATE TABLE contact_tag_assignment (
    contactId INTEGER NOT NULL REFERENCES contact (id),
    tagId TEXT NOT NULL
);
CREATE TABLE callout_response (
    id INTEGER PRIMARY KEY,
    calloutId TEXT NOT NULL,
    contactId INTEGER REFERENCES contact (id),
    assigneeId INTEGER REFERENCES contact (id),
    bucket TEXT NOT NULL,
    createdAt TEXT NOT NULL,
    updatedAt TEXT NOT NULL,
    answers TEXT
);
CREATE TABLE callout_response_tag (
    responseId INTEGER NOT NULL REFERENCES callout_response (id),
    tagId TEXT NOT NULL
);
CREATE TABLE callout_tag (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    calloutId TEXT NOT NULL
);
CREATE TABLE payment (
    id INTEGER PRIMARY KEY,
    contactId INTEGER REFERENCES contact (id),
    amount REAL NOT NULL,
    status TEXT NOT NULL,
    chargeDate TEXT NOT NULL
);
"#;

pub const FIXTURES: &str = r#"
INSERT INTO contact VALUES
    (2, 'b@example.com', 'Bob', 'Ng', '', '2024-02-01 08:00:00', NULL, 'Manual', NULL, 0, 'unsubscribed'),
    (3, 'c@example.org', 'Cat', 'Fox', 'Loves 100% cotton', '2024-04-30 23:59:59', '2024-04-30 12:00:00', 'None', NULL, 1, 'none'),
    (1, 'a@example.com', 'Ann', 'Lee', NULL, '2023-06-15 10:00:00', '2024-05-01 08:00:00', 'Automatic', 5.0, 1, 'subscribed');

INSERT INTO contact_role VALUES
    (3, 'member', '2023-01-01 00:00:00', '2023-12-31 23:00:00'),
    (2, 'member', '2023-01-01 00:00:00', '2024-06-01 00:00:00'),
    (1, 'member', '2023-06-15 10:00:00', NULL),
    (3, 'admin', '2024-01-01 00:00:00', NULL);

INSERT INTO contact_tag_assignment VALUES (3, 'volunteer'), (1, 'vip'), (3, 'vip');

INSERT INTO callout_response VALUES
    (11, 'survey-1', 2, 3, 'archived', '2024-04-02 09:00:00', '2024-04-03 09:00:00',
        '{"about": {"name": "Bob", "age": 45, "colours": {"red": false, "blue": true}}}'),
    (12, 'survey-2', NULL, NULL, 'inbox', '2024-04-20 18:30:00', '2024-04-20 18:30:00',
        '{"about": {"name": "Anon", "colours": {}}}'),
    (10, 'survey-1', 1, NULL, 'inbox', '2024-04-01 10:00:00', '2024-04-01 10:00:00',
        '{"about": {"name": "Ann", "age": 31, "colours": {"red": true, "blue": false}}}');

INSERT INTO callout_response_tag VALUES (10, 'follow-up'), (12, 'follow-up'), (12, 'spam');

INSERT INTO callout_tag VALUES
    (1, 'follow-up', 'Needs a reply', 'survey-1'),
    (2, 'spam', NULL, 'survey-2');

INSERT INTO payment VALUES
    (102, 2, 20.0, 'successful', '2024-04-20 12:00:00'),
    (100, 1, 5.0, 'successful', '2024-04-15 00:00:00'),
    (101, 1, 5.0, 'failed', '2024-03-15 00:00:00');
"#;

/// The instant every test compiles against.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
}

/// A fresh in-memory database with the fixture loaded.
pub async fn engine() -> SqliteEngine {
    let engine = SqliteEngine::memory().await.expect("open in-memory database");
    engine.execute_batch(SCHEMA).await.expect("create schema");
    engine.execute_batch(FIXTURES).await.expect("load fixtures");
    engine
}

/// Parse a rule group, panicking on malformed JSON.
pub fn rules(json: &str) -> RuleGroup {
    RuleGroup::from_json(json).expect("valid rule group")
}

/// A single-rule AND group.
pub fn single(field: &str, operator: &str, value_type: &str, values: JsonValue) -> RuleGroup {
    rules(&format!(
        r#"{{"condition":"AND","rules":[{{"field":"{field}","operator":"{operator}","type":"{value_type}","value":{values}}}]}}"#
    ))
}

#[derive(Debug, Deserialize)]
pub struct IdRow {
    pub id: i64,
}

/// Ids of the `M` rows matching `group`, ascending.
pub async fn matching_ids<M: Entity>(engine: &SqliteEngine, group: RuleGroup) -> Vec<i64> {
    try_matching_ids::<M>(engine, group).await.expect("select succeeds")
}

/// Like [`matching_ids`], but surfaces the error.
pub async fn try_matching_ids<M: Entity>(
    engine: &SqliteEngine,
    group: RuleGroup,
) -> QueryResult<Vec<i64>> {
    let page: Paginated<IdRow> = SelectOperation::<_, M>::new(engine.clone())
        .rules(group)
        .now(now())
        .order_by(format!("{}.id", M::ALIAS))
        .exec()
        .await?;
    assert_eq!(page.total as usize, page.rows.len());
    Ok(page.rows.into_iter().map(|row| row.id).collect())
}
