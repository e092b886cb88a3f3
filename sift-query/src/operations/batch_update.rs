//! Batch update operation: update every row matching a rule tree.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

use super::FilterInput;
use crate::compiler::CompilerConfig;
use crate::error::{QueryError, QueryResult};
use crate::handler::HandlerRegistry;
use crate::rule::RuleGroup;
use crate::schema::FilterSchema;
use crate::sql::UpdateStatement;
use crate::traits::{Entity, QueryEngine};
use crate::value::FilterValue;

type ShapeFn = Box<dyn Fn(&mut UpdateStatement) + Send + Sync>;

/// Outcome of a batch update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchUpdateResult {
    /// Number of rows updated.
    pub affected: u64,
    /// Primary keys of the updated rows.
    pub ids: Vec<JsonValue>,
}

/// Updates every row of `M` matching a rule tree in one statement.
///
/// # Example
///
/// ```rust,ignore
/// let result = BatchUpdateOperation::<_, CalloutResponse>::new(engine)
///     .rules(RuleGroup::from_json(&body)?)
///     .actor(&admin_id)
///     .set("bucket", "archived")
///     .exec()
///     .await?;
/// println!("archived {} responses", result.affected);
/// ```
pub struct BatchUpdateOperation<E: QueryEngine, M: Entity> {
    engine: E,
    filter: FilterInput,
    updates: Vec<(String, FilterValue)>,
    shape: Option<ShapeFn>,
    _model: PhantomData<M>,
}

impl<E: QueryEngine, M: Entity> BatchUpdateOperation<E, M> {
    /// Create an update with no assignments that matches every row.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            filter: FilterInput::default(),
            updates: Vec::new(),
            shape: None,
            _model: PhantomData,
        }
    }

    /// Filter rows with `rules`.
    pub fn rules(mut self, rules: RuleGroup) -> Self {
        self.filter.rules = rules;
        self
    }

    /// Set the acting contact `"me"` resolves to.
    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.filter.actor = Some(actor.into());
        self
    }

    /// Validate against `schema` instead of the entity's own.
    pub fn schema(mut self, schema: FilterSchema) -> Self {
        self.filter.schema = Some(schema);
        self
    }

    /// Use `handlers` instead of the entity's own.
    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.filter.handlers = Some(handlers);
        self
    }

    /// Replace the compiler configuration.
    pub fn config(mut self, config: CompilerConfig) -> Self {
        self.filter.config = config;
        self
    }

    /// Pin the instant relative dates resolve against.
    pub fn now(mut self, now: DateTime<Utc>) -> Self {
        self.filter.now = Some(now);
        self
    }

    /// Set a column to a new value.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.updates.push((column.into(), value.into()));
        self
    }

    /// Set multiple columns from an iterator.
    pub fn set_many(
        mut self,
        values: impl IntoIterator<Item = (impl Into<String>, impl Into<FilterValue>)>,
    ) -> Self {
        for (column, value) in values {
            self.updates.push((column.into(), value.into()));
        }
        self
    }

    /// Adjust the statement after the filter is applied, e.g. to add joins
    /// the filtering sub-select needs.
    pub fn shape(mut self, shape: impl Fn(&mut UpdateStatement) + Send + Sync + 'static) -> Self {
        self.shape = Some(Box::new(shape));
        self
    }

    /// Build the statement without running it.
    pub fn build(&self) -> QueryResult<UpdateStatement> {
        if self.updates.is_empty() {
            return Err(QueryError::invalid_parameter("update payload is empty")
                .with_context("batch_update")
                .with_entity(M::NAME)
                .with_suggestion("Call .set(column, value) at least once"));
        }

        let predicate = self.filter.compile::<M>("batch_update")?;

        let mut statement = UpdateStatement::new(M::TABLE_NAME, M::ALIAS, M::PRIMARY_KEY);
        for (column, value) in &self.updates {
            statement.set(column.as_str(), value.clone());
        }
        statement.filter(predicate.sql, predicate.params);
        if let Some(shape) = &self.shape {
            shape(&mut statement);
        }
        Ok(statement)
    }

    /// Run the update and collect the primary keys of the updated rows.
    #[instrument(skip_all, fields(entity = M::NAME))]
    pub async fn exec(self) -> QueryResult<BatchUpdateResult> {
        let statement = self.build()?;
        let sql = statement.to_sql();
        let params = statement.params();
        debug!(sql = %sql, params = params.len(), "executing batch update");

        let rows = self.engine.execute_returning(&sql, params).await?;
        let ids: Vec<JsonValue> = rows
            .into_iter()
            .map(|mut row| row.get_mut(M::PRIMARY_KEY).map(JsonValue::take).unwrap_or_default())
            .collect();

        Ok(BatchUpdateResult {
            affected: ids.len() as u64,
            ids,
        })
    }
}
