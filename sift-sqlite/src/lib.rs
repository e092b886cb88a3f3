//! SQLite query engine for Sift.
//!
//! This crate runs the statements produced by `sift-query` against SQLite,
//! using `tokio-rusqlite` for asynchronous access.
//!
//! # Features
//!
//! - Named `:param` binding straight from a compiled predicate's parameter map
//! - Rows decoded to JSON objects, with JSON text columns decoded in place
//! - `UPDATE ... RETURNING` for batch updates
//! - In-memory and file-based databases, configured from a URL or `sift.toml`
//!
//! # Example
//!
//! ```rust,no_run
//! use sift_query::domain::Contact;
//! use sift_query::prelude::*;
//! use sift_sqlite::{SqliteConfig, SqliteEngine};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = SqliteEngine::connect(&SqliteConfig::from_url("sqlite://./members.db")?).await?;
//!
//! let filter = RuleGroup::from_json(
//!     r#"{"condition":"AND","rules":[{"field":"email","operator":"ends_with","type":"text","value":["@example.com"]}]}"#,
//! )?;
//! let page: Paginated<serde_json::Value> = SelectOperation::<_, Contact>::new(engine)
//!     .rules(filter)
//!     .take(20)
//!     .exec()
//!     .await?;
//! println!("{} of {}", page.rows.len(), page.total);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod types;

pub use config::{DatabasePath, JournalMode, SqliteConfig};
pub use engine::SqliteEngine;
pub use error::{SqliteError, SqliteResult};
