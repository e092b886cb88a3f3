//! # sift-query
//!
//! Compiles JSON rule trees into parameterized SQL predicates.
//!
//! This crate provides:
//! - The rule model (`RuleGroup`, `Rule`) and its JSON wire format
//! - A per-type operator table and per-rule value preparation
//! - Field handlers for columns that need more than a plain comparison
//! - A recursive compiler with per-rule parameter namespacing
//! - `SelectOperation` and `BatchUpdateOperation` executors over a
//!   pluggable `QueryEngine`
//! - Filter schemas for the example entity families in [`domain`]
//!
//! ## Compiling a rule tree
//!
//! ```rust
//! use sift_query::prelude::*;
//!
//! let group = RuleGroup::from_json(r#"{
//!     "condition": "AND",
//!     "rules": [
//!         {"field": "amount", "operator": "between", "type": "number", "value": [5, 20]},
//!         {"condition": "OR", "rules": []}
//!     ]
//! }"#).unwrap();
//!
//! let handlers = HandlerRegistry::new();
//! let predicate = Compiler::new(&handlers).field_prefix("p.").compile(&group).unwrap();
//! assert_eq!(predicate.sql, "((p.amount BETWEEN :a_0 AND :b_0) AND FALSE)");
//! assert_eq!(predicate.params["a_0"], FilterValue::Int(5));
//! ```
//!
//! ## Custom field handlers
//!
//! ```rust
//! use sift_query::prelude::*;
//!
//! let handlers = HandlerRegistry::new().register(
//!     "hasPayments",
//!     |builder: &mut FragmentBuilder, ctx: &FieldHandlerContext<'_>| {
//!         let sql = ctx.namespace_param("c.id IN (SELECT contactId FROM payment WHERE status = :status)");
//!         builder.and_where(sql);
//!         Ok(Some(Params::from_iter([("status".to_string(), FilterValue::from("successful"))])))
//!     },
//! );
//!
//! let group = RuleGroup::and([
//!     Rule::new("hasPayments", Operator::Equal, ValueType::Boolean, vec![true.into()]).into(),
//! ]);
//! let predicate = Compiler::new(&handlers).compile(&group).unwrap();
//! assert_eq!(
//!     predicate.sql,
//!     "((c.id IN (SELECT contactId FROM payment WHERE status = :status_0)))"
//! );
//! ```

pub mod compiler;
pub mod config;
pub mod domain;
pub mod error;
pub mod handler;
pub mod logging;
pub mod namespace;
pub mod operations;
pub mod operators;
pub mod prepare;
pub mod rule;
pub mod schema;
pub mod sql;
pub mod traits;
pub mod value;

pub use compiler::{compile, CompiledPredicate, Compiler, CompilerConfig};
pub use config::SiftConfig;
pub use error::{CompileError, CompileResult, ErrorCode, ErrorContext, QueryError, QueryResult};
pub use handler::{
    DefaultHandler, FieldHandlerContext, FilterHandler, FragmentBuilder, HandlerRegistry,
};
pub use operations::{BatchUpdateOperation, BatchUpdateResult, Paginated, SelectOperation};
pub use rule::{Condition, Operator, Rule, RuleGroup, RuleNode, RuleValue, ValueType};
pub use schema::{FieldDefinition, FilterSchema};
pub use sql::{SelectStatement, UpdateStatement};
pub use traits::{BoxFuture, Entity, QueryEngine};
pub use value::{FilterValue, Params};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::compiler::{CompiledPredicate, Compiler};
    pub use crate::error::{CompileError, CompileResult, QueryError, QueryResult};
    pub use crate::handler::{FieldHandlerContext, FragmentBuilder, HandlerRegistry};
    pub use crate::operations::*;
    pub use crate::rule::{Condition, Operator, Rule, RuleGroup, RuleNode, RuleValue, ValueType};
    pub use crate::schema::{FieldDefinition, FilterSchema};
    pub use crate::traits::{Entity, QueryEngine};
    pub use crate::value::{FilterValue, Params};
}
