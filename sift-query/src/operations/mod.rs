//! Query executors driven by rule trees.
//!
//! - `SelectOperation` - filtered, paginated rows plus the total count
//! - `BatchUpdateOperation` - update every row matching a filter

mod batch_update;
mod select;

pub use batch_update::{BatchUpdateOperation, BatchUpdateResult};
pub use select::{Paginated, SelectOperation};

use chrono::{DateTime, Utc};

use crate::compiler::{CompiledPredicate, Compiler, CompilerConfig};
use crate::error::{CompileError, QueryError, QueryResult};
use crate::handler::HandlerRegistry;
use crate::rule::RuleGroup;
use crate::schema::FilterSchema;
use crate::traits::Entity;

/// Filter inputs shared by the executors.
#[derive(Debug, Clone)]
struct FilterInput {
    rules: RuleGroup,
    actor: Option<String>,
    schema: Option<FilterSchema>,
    handlers: Option<HandlerRegistry>,
    config: CompilerConfig,
    now: Option<DateTime<Utc>>,
}

impl Default for FilterInput {
    fn default() -> Self {
        Self {
            // AND over nothing matches every row
            rules: RuleGroup::and([]),
            actor: None,
            schema: None,
            handlers: None,
            config: CompilerConfig::default(),
            now: None,
        }
    }
}

impl FilterInput {
    /// Validate and compile the rules for entity `M`.
    fn compile<M: Entity>(&self, operation: &'static str) -> QueryResult<CompiledPredicate> {
        let default_schema;
        let schema = match &self.schema {
            Some(schema) => schema,
            None => {
                default_schema = M::filter_schema();
                &default_schema
            }
        };
        let default_handlers;
        let handlers = match &self.handlers {
            Some(handlers) => handlers,
            None => {
                default_handlers = M::handlers();
                &default_handlers
            }
        };

        let into_query_error =
            |err: CompileError| QueryError::from(err).with_context(operation).with_entity(M::NAME);

        self.rules
            .check_depth(self.config.max_depth)
            .and_then(|()| schema.validate(&self.rules))
            .map_err(into_query_error)?;

        let prefix = M::field_prefix();
        let mut compiler = Compiler::new(handlers)
            .schema(schema)
            .actor(self.actor.as_deref())
            .field_prefix(&prefix)
            .config(self.config);
        if let Some(now) = self.now {
            compiler = compiler.now(now);
        }
        compiler.compile(&self.rules).map_err(into_query_error)
    }
}
