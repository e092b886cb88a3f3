//! # Sift
//!
//! Dynamic filters for list and bulk-update endpoints.
//!
//! Sift takes a client-supplied rule tree of nested AND/OR groups, checks it
//! against the entity's filter schema, and compiles it into a single
//! parameterized SQL predicate:
//! - A per-type operator table with NULL-as-empty and date-truncation rules
//! - Field handlers for computed and relational fields
//! - Per-rule parameter namespacing, so one predicate never reuses a name
//! - `SelectOperation` and `BatchUpdateOperation` executors
//! - A SQLite engine built on `tokio-rusqlite`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sift::prelude::*;
//! use sift::domain::Contact;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = SqliteEngine::connect(&SqliteConfig::from_url("sqlite://./members.db")?).await?;
//!
//!     let rules = RuleGroup::from_json(r#"{
//!         "condition": "OR",
//!         "rules": [
//!             {"field": "email", "operator": "equal", "type": "text", "value": ["ann@example.com"]},
//!             {"field": "membershipExpires", "operator": "greater", "type": "date", "value": ["2024-01-01"]}
//!         ]
//!     }"#)?;
//!
//!     let page: Paginated<serde_json::Value> = SelectOperation::<_, Contact>::new(engine)
//!         .rules(rules)
//!         .order_by("c.joined DESC")
//!         .take(25)
//!         .exec()
//!         .await?;
//!
//!     println!("{} contacts match", page.total);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use sift_query::{
    compiler, config, domain, error, handler, logging, namespace, operations, operators, prepare,
    rule, schema, sql, traits, value,
};

/// SQLite execution.
pub mod sqlite {
    pub use sift_sqlite::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use sift_query::prelude::*;
    pub use sift_sqlite::{SqliteConfig, SqliteEngine};
}

// Re-export key types at the crate root
pub use sift_query::{
    compile, CompileError, CompiledPredicate, Compiler, CompilerConfig, ErrorCode, QueryError,
    QueryResult, RuleGroup, SiftConfig,
};
pub use sift_sqlite::{SqliteConfig, SqliteEngine, SqliteError};
