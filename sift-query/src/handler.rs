//! Field handlers and their registry.
//!
//! A [`FilterHandler`] translates one rule into SQL conditions. Most fields
//! need nothing special and fall through to the default handler, which
//! applies the operator table to `<prefix><field>`. Fields backed by a join
//! table, a JSON column or a computed expression register their own handler.
//!
//! Handlers are registered either under an exact field name or under a
//! trailing-dot prefix (`"answers."`) that catches a whole family of
//! dynamically named sub-fields.
//!
//! ```rust
//! use sift_query::handler::{FieldHandlerContext, FragmentBuilder, HandlerRegistry};
//! use sift_query::CompileResult;
//! use sift_query::value::Params;
//!
//! fn full_name(builder: &mut FragmentBuilder, ctx: &FieldHandlerContext<'_>) -> CompileResult<Option<Params>> {
//!     let column = format!("{0}firstname || ' ' || {0}lastname", ctx.field_prefix());
//!     builder.and_where(ctx.to_comparison(&column)?);
//!     Ok(None)
//! }
//!
//! let registry = HandlerRegistry::new().register("fullName", full_name);
//! assert!(registry.contains("fullName"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{CompileError, CompileResult};
use crate::namespace::ParamNamespace;
use crate::operators;
use crate::prepare::PreparedRule;
use crate::rule::{Operator, Rule, RuleValue, ValueType};
use crate::sql::quote_identifier;
use crate::value::{FilterValue, Params};

const COLUMN_SLOT: &str = "{column}";

/// Collects the conditions a handler emits for one rule.
///
/// Conditions are combined with `AND` and the result is parenthesized.
#[derive(Debug, Default)]
pub struct FragmentBuilder {
    conditions: Vec<String>,
}

impl FragmentBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition.
    pub fn and_where(&mut self, condition: impl Into<String>) -> &mut Self {
        self.conditions.push(condition.into());
        self
    }

    /// Check if no condition has been added.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render the fragment for `rule`.
    ///
    /// A handler that emitted nothing has broken its contract.
    pub fn build(self, rule: &Rule) -> CompileResult<String> {
        if self.conditions.is_empty() {
            return Err(CompileError::HandlerContract {
                field: rule.field.clone(),
                detail: "a rule without emitting any condition".to_string(),
            });
        }
        Ok(format!("({})", self.conditions.join(" AND ")))
    }
}

/// Everything a handler may read about the rule it is translating.
#[derive(Debug)]
pub struct FieldHandlerContext<'a> {
    rule: &'a Rule,
    prepared: PreparedRule,
    namespace: ParamNamespace,
    field_prefix: &'a str,
    actor: Option<&'a str>,
    now: DateTime<Utc>,
}

impl<'a> FieldHandlerContext<'a> {
    pub(crate) fn new(
        rule: &'a Rule,
        prepared: PreparedRule,
        namespace: ParamNamespace,
        field_prefix: &'a str,
        actor: Option<&'a str>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            rule,
            prepared,
            namespace,
            field_prefix,
            actor,
            now,
        }
    }

    /// The rule being translated.
    pub fn rule(&self) -> &'a Rule {
        self.rule
    }

    /// Field path of the rule.
    pub fn field(&self) -> &'a str {
        &self.rule.field
    }

    /// Operator of the rule.
    pub fn operator(&self) -> Operator {
        self.rule.operator
    }

    /// Declared value type of the rule.
    pub fn value_type(&self) -> ValueType {
        self.rule.value_type
    }

    /// Values after preparation (dates truncated, `"me"` resolved).
    pub fn values(&self) -> &[FilterValue] {
        &self.prepared.values
    }

    /// Values as supplied on the wire.
    pub fn raw_values(&self) -> &'a [RuleValue] {
        &self.rule.values
    }

    /// Table alias prefix of the statement, e.g. `"c."`.
    pub fn field_prefix(&self) -> &'a str {
        self.field_prefix
    }

    /// Acting contact, if any.
    pub fn actor(&self) -> Option<&'a str> {
        self.actor
    }

    /// The instant this compile call treats as "now".
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Index of this rule within the compile call.
    pub fn rule_index(&self) -> usize {
        self.namespace.index()
    }

    /// Compare `column` using the rule's operator and type.
    ///
    /// The column is wrapped as the rule requires and the value placeholders
    /// are already namespaced.
    pub fn to_comparison(&self, column: &str) -> CompileResult<String> {
        self.to_comparison_as(self.rule.value_type, column)
    }

    /// Compare `column` with the rule's operator, templating as `value_type`.
    ///
    /// Used by handlers whose storage type differs from the declared one.
    pub fn to_comparison_as(&self, value_type: ValueType, column: &str) -> CompileResult<String> {
        // The column is spliced in after rewriting so placeholders a handler
        // already namespaced inside it are left alone.
        let template = operators::comparison(value_type, self.rule.operator, COLUMN_SLOT)
            .ok_or_else(|| CompileError::handler_contract(self.rule))?;
        Ok(self
            .namespace
            .rewrite(&template)
            .replace(COLUMN_SLOT, &self.prepared.wrap.apply(column)))
    }

    /// Rewrite `:name` placeholders in a raw fragment into this rule's namespace.
    pub fn namespace_param(&self, sql: &str) -> String {
        self.namespace.rewrite(sql)
    }

    /// Namespaced name of a bare parameter.
    pub fn param_name(&self, raw: &str) -> String {
        self.namespace.param_name(raw)
    }

    /// Contract violation for this rule, for handlers reached with a type or
    /// operator they do not support.
    pub fn unsupported(&self) -> CompileError {
        CompileError::handler_contract(self.rule)
    }
}

/// Translates a rule into SQL conditions.
///
/// Returns extra named parameters referenced by the emitted SQL. Their names
/// are bare; the compiler moves them into the rule's namespace.
pub trait FilterHandler: Send + Sync {
    /// Emit conditions for `ctx` into `builder`.
    fn apply(
        &self,
        builder: &mut FragmentBuilder,
        ctx: &FieldHandlerContext<'_>,
    ) -> CompileResult<Option<Params>>;
}

impl<F> FilterHandler for F
where
    F: Fn(&mut FragmentBuilder, &FieldHandlerContext<'_>) -> CompileResult<Option<Params>>
        + Send
        + Sync,
{
    fn apply(
        &self,
        builder: &mut FragmentBuilder,
        ctx: &FieldHandlerContext<'_>,
    ) -> CompileResult<Option<Params>> {
        self(builder, ctx)
    }
}

/// Applies the operator table to `<prefix><field>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl FilterHandler for DefaultHandler {
    fn apply(
        &self,
        builder: &mut FragmentBuilder,
        ctx: &FieldHandlerContext<'_>,
    ) -> CompileResult<Option<Params>> {
        let column = format!("{}{}", ctx.field_prefix(), quote_identifier(ctx.field()));
        builder.and_where(ctx.to_comparison(&column)?);
        Ok(None)
    }
}

static DEFAULT_HANDLER: DefaultHandler = DefaultHandler;

/// Field name to handler mapping with prefix catch-alls.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    exact: HashMap<String, Arc<dyn FilterHandler>>,
    prefixes: HashMap<String, Arc<dyn FilterHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry; every field uses the default handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler function.
    ///
    /// A name ending in `.` registers a catch-all for that prefix.
    pub fn register<F>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut FragmentBuilder, &FieldHandlerContext<'_>) -> CompileResult<Option<Params>>
            + Send
            + Sync
            + 'static,
    {
        self.register_handler(name, handler)
    }

    /// Register any [`FilterHandler`] implementation.
    pub fn register_handler(
        mut self,
        name: impl Into<String>,
        handler: impl FilterHandler + 'static,
    ) -> Self {
        let name = name.into();
        let handler: Arc<dyn FilterHandler> = Arc::new(handler);
        if name.ends_with('.') {
            self.prefixes.insert(name, handler);
        } else {
            self.exact.insert(name, handler);
        }
        self
    }

    /// Add every handler of `other`, replacing same-named entries.
    pub fn merge(mut self, other: &HandlerRegistry) -> Self {
        self.exact
            .extend(other.exact.iter().map(|(k, v)| (k.clone(), Arc::clone(v))));
        self.prefixes
            .extend(other.prefixes.iter().map(|(k, v)| (k.clone(), Arc::clone(v))));
        self
    }

    /// Check if a handler is registered under exactly `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.exact.contains_key(name) || self.prefixes.contains_key(name)
    }

    /// Resolve the handler for `field`: exact name, then the prefix up to
    /// and including the first `.`, then the default handler.
    pub fn lookup(&self, field: &str) -> &dyn FilterHandler {
        if let Some(handler) = self.exact.get(field) {
            return handler.as_ref();
        }
        field
            .find('.')
            .and_then(|dot| self.prefixes.get(&field[..=dot]))
            .map(|handler| handler.as_ref())
            .unwrap_or(&DEFAULT_HANDLER)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut exact: Vec<_> = self.exact.keys().collect();
        let mut prefixes: Vec<_> = self.prefixes.keys().collect();
        exact.sort();
        prefixes.sort();
        f.debug_struct("HandlerRegistry")
            .field("exact", &exact)
            .field("prefixes", &prefixes)
            .finish()
    }
}
