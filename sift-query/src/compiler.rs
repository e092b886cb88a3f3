//! Rule tree to SQL predicate compilation.
//!
//! The compiler walks a [`RuleGroup`] depth-first. Empty groups become their
//! neutral element, every other group becomes a parenthesized join of its
//! children, and every leaf is handed to the field handler the registry
//! resolves for it. One [`RuleCounter`] is threaded through the whole walk so
//! parameter names stay unique across the tree.
//!
//! ```rust
//! use sift_query::compiler::compile;
//! use sift_query::handler::HandlerRegistry;
//! use sift_query::rule::RuleGroup;
//!
//! let group = RuleGroup::from_json(r#"{
//!     "condition": "OR",
//!     "rules": [
//!         {"field": "email", "operator": "equal", "type": "text", "value": ["a@example.com"]},
//!         {"field": "email", "operator": "equal", "type": "text", "value": ["b@example.com"]}
//!     ]
//! }"#).unwrap();
//!
//! let predicate = compile(&group, None, &HandlerRegistry::new(), "c.").unwrap();
//! assert_eq!(predicate.sql, "((c.email = :a_0) OR (c.email = :a_1))");
//! assert_eq!(predicate.params.len(), 2);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::CompileResult;
use crate::handler::{FieldHandlerContext, FragmentBuilder, HandlerRegistry};
use crate::namespace::RuleCounter;
use crate::prepare::{prepare, PrepareContext};
use crate::rule::{Rule, RuleGroup, RuleNode};
use crate::schema::{check_leaf, FilterSchema};
use crate::value::Params;

/// Default limit on group nesting.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Names the operator table binds rule values to, in order.
const VALUE_PARAMS: [&str; 2] = ["a", "b"];

/// Tunables of the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Deepest group nesting accepted; the root group is depth 1.
    ///
    /// Compilation recurses once per level, so this also bounds stack use.
    pub max_depth: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A compiled boolean SQL expression and the parameters it references.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    /// Parenthesized predicate, or `TRUE`/`FALSE` for an empty root group.
    pub sql: String,
    /// Namespaced parameters in visitation order.
    pub params: Params,
}

/// Compiles rule groups for one entity.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'a> {
    handlers: &'a HandlerRegistry,
    schema: Option<&'a FilterSchema>,
    actor: Option<&'a str>,
    field_prefix: &'a str,
    config: CompilerConfig,
    now: Option<DateTime<Utc>>,
}

impl<'a> Compiler<'a> {
    /// Create a compiler over `handlers` with no prefix and no actor.
    pub fn new(handlers: &'a HandlerRegistry) -> Self {
        Self {
            handlers,
            schema: None,
            actor: None,
            field_prefix: "",
            config: CompilerConfig::default(),
            now: None,
        }
    }

    /// Read column nullability from `schema`.
    pub fn schema(mut self, schema: &'a FilterSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set the acting contact that `"me"` resolves to.
    pub fn actor(mut self, actor: Option<&'a str>) -> Self {
        self.actor = actor;
        self
    }

    /// Prefix prepended to plain column names, e.g. `"c."`.
    pub fn field_prefix(mut self, prefix: &'a str) -> Self {
        self.field_prefix = prefix;
        self
    }

    /// Replace the configuration.
    pub fn config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Pin "now" instead of reading the system clock.
    pub fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Compile `group` into a predicate.
    pub fn compile(&self, group: &RuleGroup) -> CompileResult<CompiledPredicate> {
        group.check_depth(self.config.max_depth)?;

        let mut walk = Walk {
            compiler: self,
            now: self.now.unwrap_or_else(Utc::now),
            counter: RuleCounter::new(),
            params: Params::new(),
        };
        let sql = walk.group(group)?;

        debug!(
            rules = walk.counter.visited(),
            params = walk.params.len(),
            "compiled rule group"
        );
        Ok(CompiledPredicate {
            sql,
            params: walk.params,
        })
    }
}

/// Compile `group` with default configuration.
pub fn compile(
    group: &RuleGroup,
    actor: Option<&str>,
    handlers: &HandlerRegistry,
    field_prefix: &str,
) -> CompileResult<CompiledPredicate> {
    Compiler::new(handlers)
        .actor(actor)
        .field_prefix(field_prefix)
        .compile(group)
}

struct Walk<'c, 'a> {
    compiler: &'c Compiler<'a>,
    now: DateTime<Utc>,
    counter: RuleCounter,
    params: Params,
}

impl Walk<'_, '_> {
    // Recursion is bounded by the depth check in `Compiler::compile`.
    fn group(&mut self, group: &RuleGroup) -> CompileResult<String> {
        if group.is_empty() {
            return Ok(group.condition.neutral().to_string());
        }

        let mut parts = Vec::with_capacity(group.rules.len());
        for node in &group.rules {
            let part = match node {
                RuleNode::Group(child) => self.group(child)?,
                RuleNode::Rule(rule) => self.rule(rule)?,
            };
            parts.push(part);
        }
        Ok(format!("({})", parts.join(group.condition.as_sql())))
    }

    fn rule(&mut self, rule: &Rule) -> CompileResult<String> {
        check_leaf(rule)?;

        let compiler = self.compiler;
        let namespace = self.counter.next();
        let nullable = compiler
            .schema
            .is_some_and(|schema| schema.is_nullable(&rule.field));
        let prepared = prepare(
            rule,
            &PrepareContext {
                actor: compiler.actor,
                nullable,
                now: self.now,
            },
        )?;

        for (name, value) in VALUE_PARAMS.iter().zip(&prepared.values) {
            self.params.insert(namespace.param_name(name), value.clone());
        }

        let ctx = FieldHandlerContext::new(
            rule,
            prepared,
            namespace,
            compiler.field_prefix,
            compiler.actor,
            self.now,
        );
        let mut builder = FragmentBuilder::new();
        let extra = compiler
            .handlers
            .lookup(&rule.field)
            .apply(&mut builder, &ctx)?;
        if let Some(extra) = extra {
            self.params.extend(namespace.params(extra));
        }

        trace!(
            field = %rule.field,
            operator = %rule.operator,
            index = namespace.index(),
            "compiled rule"
        );
        builder.build(rule)
    }
}
