//! Per-rule parameter namespacing.
//!
//! Every rule visited during one compile call gets the next index from a
//! [`RuleCounter`]. Parameter names used by that rule's fragment are suffixed
//! with `_<index>`, so the same field and operator can appear any number of
//! times in one tree (or inside a handler's sub-select) without collisions.
//!
//! ```rust
//! use sift_query::namespace::RuleCounter;
//!
//! let mut counter = RuleCounter::new();
//! let first = counter.next();
//! let second = counter.next();
//!
//! assert_eq!(first.rewrite("x = :a"), "x = :a_0");
//! assert_eq!(second.rewrite("x = :a AND y::text = :b"), "x = :a_1 AND y::text = :b_1");
//! ```

use std::sync::LazyLock;

use regex_lite::{Captures, Regex};

use crate::value::Params;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(::?)([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder pattern is valid")
});

/// Hands out rule indexes in visitation order for one compile call.
#[derive(Debug, Default)]
pub struct RuleCounter {
    next: usize,
}

impl RuleCounter {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the namespace for the next visited rule.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> ParamNamespace {
        let namespace = ParamNamespace { index: self.next };
        self.next += 1;
        namespace
    }

    /// Number of rules visited so far.
    pub fn visited(&self) -> usize {
        self.next
    }
}

/// The parameter namespace of a single rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamNamespace {
    index: usize,
}

impl ParamNamespace {
    /// The rule's visitation index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Namespaced form of a bare parameter name.
    pub fn param_name(&self, raw: &str) -> String {
        format!("{}_{}", raw, self.index)
    }

    /// Rewrite every `:name` placeholder in `sql` into this namespace.
    ///
    /// `::type` casts are left untouched.
    pub fn rewrite(&self, sql: &str) -> String {
        PLACEHOLDER
            .replace_all(sql, |caps: &Captures<'_>| {
                if &caps[1] == "::" {
                    caps[0].to_string()
                } else {
                    format!(":{}", self.param_name(&caps[2]))
                }
            })
            .into_owned()
    }

    /// Move `params` into this namespace.
    pub fn params(&self, params: Params) -> Params {
        params
            .into_iter()
            .map(|(name, value)| (self.param_name(&name), value))
            .collect()
    }
}
