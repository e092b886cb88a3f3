//! Select operation: filtered rows plus the total match count.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use super::FilterInput;
use crate::compiler::CompilerConfig;
use crate::error::{QueryError, QueryResult};
use crate::handler::HandlerRegistry;
use crate::rule::RuleGroup;
use crate::schema::FilterSchema;
use crate::sql::SelectStatement;
use crate::traits::{Entity, QueryEngine};

type ShapeFn = Box<dyn Fn(&mut SelectStatement) + Send + Sync>;

/// One page of rows and the number of rows matching the filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    /// Rows of this page.
    pub rows: Vec<T>,
    /// Matches across all pages.
    pub total: u64,
}

/// A query that lists the rows of `M` matching a rule tree.
///
/// # Example
///
/// ```rust,ignore
/// let page: Paginated<ContactRow> = SelectOperation::<_, Contact>::new(engine)
///     .rules(RuleGroup::from_json(&body)?)
///     .actor(&current_contact_id)
///     .order_by("c.joined DESC")
///     .skip(0)
///     .take(25)
///     .exec()
///     .await?;
/// ```
pub struct SelectOperation<E: QueryEngine, M: Entity> {
    engine: E,
    filter: FilterInput,
    order_by: Vec<String>,
    skip: Option<u64>,
    take: Option<u64>,
    shape: Option<ShapeFn>,
    _model: PhantomData<M>,
}

impl<E: QueryEngine, M: Entity> SelectOperation<E, M> {
    /// Create a select that matches every row.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            filter: FilterInput::default(),
            order_by: Vec::new(),
            skip: None,
            take: None,
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

    /// Add an ordering term, e.g. `c.joined DESC`.
    pub fn order_by(mut self, term: impl Into<String>) -> Self {
        self.order_by.push(term.into());
        self
    }

    /// Skip a number of rows.
    pub fn skip(mut self, n: u64) -> Self {
        self.skip = Some(n);
        self
    }

    /// Take at most `n` rows.
    pub fn take(mut self, n: u64) -> Self {
        self.take = Some(n);
        self
    }

    /// Adjust the statement after the filter is applied (joins, extra
    /// conditions, custom columns).
    pub fn shape(mut self, shape: impl Fn(&mut SelectStatement) + Send + Sync + 'static) -> Self {
        self.shape = Some(Box::new(shape));
        self
    }

    /// Build the statement without running it.
    pub fn build(&self) -> QueryResult<SelectStatement> {
        let predicate = self.filter.compile::<M>("select")?;

        let mut statement = SelectStatement::new(M::TABLE_NAME, M::ALIAS);
        statement.and_where(predicate.sql, predicate.params);
        for term in &self.order_by {
            statement.order_by(term.as_str());
        }
        if let Some(take) = self.take {
            statement.limit(take);
        }
        if let Some(skip) = self.skip {
            statement.offset(skip);
        }
        if let Some(shape) = &self.shape {
            shape(&mut statement);
        }
        Ok(statement)
    }

    /// Run the rows and count statements and deserialize each row as `T`.
    #[instrument(skip_all, fields(entity = M::NAME))]
    pub async fn exec<T: DeserializeOwned>(self) -> QueryResult<Paginated<T>> {
        let statement = self.build()?;
        let rows_sql = statement.to_sql();
        let count_sql = statement.to_count_sql();
        let params = statement.params().clone();
        debug!(sql = %rows_sql, params = params.len(), "executing select");

        let (rows, total) = futures::try_join!(
            self.engine.query_rows(&rows_sql, params.clone()),
            self.engine.query_count(&count_sql, params),
        )?;

        let rows = rows
            .into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| {
                    QueryError::deserialization(e.to_string())
                        .with_entity(M::NAME)
                        .with_sql(rows_sql.as_str())
                })
            })
            .collect::<QueryResult<Vec<T>>>()?;

        Ok(Paginated { rows, total })
    }
}
