//! Seams between the compiler, the executors and the database.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value as JsonValue;

use crate::error::QueryResult;
use crate::handler::HandlerRegistry;
use crate::schema::FilterSchema;
use crate::value::Params;

/// A boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Runs parameterized statements.
///
/// Statements reference parameters as `:name`; `params` holds them under the
/// bare name. Rows come back as JSON objects keyed by column name.
pub trait QueryEngine: Send + Sync + Clone + 'static {
    /// Run a `SELECT` and return every row.
    fn query_rows(&self, sql: &str, params: Params) -> BoxFuture<'_, QueryResult<Vec<JsonValue>>>;

    /// Run a single-row, single-column `SELECT COUNT(*)`.
    fn query_count(&self, sql: &str, params: Params) -> BoxFuture<'_, QueryResult<u64>>;

    /// Run a mutating statement with a `RETURNING` clause and return the
    /// returned rows.
    fn execute_returning(
        &self,
        sql: &str,
        params: Params,
    ) -> BoxFuture<'_, QueryResult<Vec<JsonValue>>>;
}

/// A filterable entity family.
///
/// ```rust
/// use sift_query::traits::Entity;
/// use sift_query::schema::{FieldDefinition, FilterSchema};
/// use sift_query::rule::ValueType;
///
/// struct Invoice;
///
/// impl Entity for Invoice {
///     const NAME: &'static str = "Invoice";
///     const TABLE_NAME: &'static str = "invoice";
///     const ALIAS: &'static str = "i";
///
///     fn filter_schema() -> FilterSchema {
///         FilterSchema::new().field("total", FieldDefinition::new(ValueType::Number))
///     }
/// }
///
/// assert_eq!(Invoice::field_prefix(), "i.");
/// ```
pub trait Entity: Send + Sync + 'static {
    /// Name used in errors and logs.
    const NAME: &'static str;

    /// Backing table.
    const TABLE_NAME: &'static str;

    /// Alias the table is selected under.
    const ALIAS: &'static str;

    /// Primary key column.
    const PRIMARY_KEY: &'static str = "id";

    /// Fields clients may filter on.
    fn filter_schema() -> FilterSchema;

    /// Field handlers; defaults to none, so every field uses its column.
    fn handlers() -> HandlerRegistry {
        HandlerRegistry::new()
    }

    /// Column prefix handlers and the default handler see.
    fn field_prefix() -> String {
        format!("{}.", Self::ALIAS)
    }
}
