//! Rule trees as produced by filter-builder UIs and API query parameters.
//!
//! A [`RuleGroup`] combines [`Rule`]s and nested groups with a boolean
//! [`Condition`]. The wire format is JSON:
//!
//! ```rust
//! use sift_query::rule::{Condition, RuleGroup, RuleNode};
//!
//! let group = RuleGroup::from_json(r#"{
//!     "condition": "OR",
//!     "rules": [
//!         {"field": "email", "operator": "equal", "type": "text", "value": ["a@example.com"]},
//!         {"condition": "AND", "rules": []}
//!     ]
//! }"#).unwrap();
//!
//! assert_eq!(group.condition, Condition::Or);
//! assert!(matches!(group.rules[1], RuleNode::Group(_)));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};

/// Boolean connective of a rule group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// All children must hold.
    #[serde(rename = "AND", alias = "and")]
    And,
    /// At least one child must hold.
    #[serde(rename = "OR", alias = "or")]
    Or,
}

impl Condition {
    /// SQL keyword joining the children.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }

    /// Predicate an empty group compiles to.
    pub fn neutral(&self) -> &'static str {
        match self {
            Self::And => "TRUE",
            Self::Or => "FALSE",
        }
    }
}

/// The declared value type of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Short text.
    Text,
    /// Long text where "empty" means the empty string.
    Blob,
    /// Integer or decimal number.
    Number,
    /// Date or timestamp.
    Date,
    /// True or false.
    Boolean,
    /// JSON array column.
    Array,
    /// One of a fixed set of strings.
    Enum,
    /// Reference to a contact id; accepts the `"me"` sentinel.
    Contact,
}

impl ValueType {
    /// Wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Blob => "blob",
            Self::Number => "number",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Enum => "enum",
            Self::Contact => "contact",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// `=`
    Equal,
    /// `<>`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
    /// Inclusive range.
    Between,
    /// Outside an inclusive range.
    NotBetween,
    /// Substring (text) or membership (array).
    Contains,
    /// Negated [`Operator::Contains`].
    NotContains,
    /// Prefix match.
    BeginsWith,
    /// Negated prefix match.
    NotBeginsWith,
    /// Suffix match.
    EndsWith,
    /// Negated suffix match.
    NotEndsWith,
    /// No value stored.
    IsEmpty,
    /// Some value stored.
    IsNotEmpty,
}

impl Operator {
    /// Wire name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "not_equal",
            Self::Less => "less",
            Self::LessOrEqual => "less_or_equal",
            Self::Greater => "greater",
            Self::GreaterOrEqual => "greater_or_equal",
            Self::Between => "between",
            Self::NotBetween => "not_between",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::BeginsWith => "begins_with",
            Self::NotBeginsWith => "not_begins_with",
            Self::EndsWith => "ends_with",
            Self::NotEndsWith => "not_ends_with",
            Self::IsEmpty => "is_empty",
            Self::IsNotEmpty => "is_not_empty",
        }
    }

    /// Number of values the operator consumes.
    pub fn arity(&self) -> usize {
        match self {
            Self::IsEmpty | Self::IsNotEmpty => 0,
            Self::Between | Self::NotBetween => 2,
            _ => 1,
        }
    }

    /// Whether values are matched with `LIKE` patterns.
    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            Self::Contains
                | Self::NotContains
                | Self::BeginsWith
                | Self::NotBeginsWith
                | Self::EndsWith
                | Self::NotEndsWith
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value as supplied on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value (also dates, enums and contact ids).
    String(String),
}

impl RuleValue {
    /// Borrow the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for RuleValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for RuleValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for RuleValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for RuleValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for RuleValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// A single leaf condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Dot-delimited field path.
    pub field: String,
    /// Comparison operator.
    pub operator: Operator,
    /// Declared value type.
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Comparison values (0 to 2 depending on the operator).
    #[serde(rename = "value", default)]
    pub values: Vec<RuleValue>,
}

impl Rule {
    /// Create a new rule.
    pub fn new(
        field: impl Into<String>,
        operator: Operator,
        value_type: ValueType,
        values: Vec<RuleValue>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value_type,
            values,
        }
    }
}

/// A child of a group: either a leaf rule or a nested group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleNode {
    /// Nested group.
    Group(RuleGroup),
    /// Leaf rule.
    Rule(Rule),
}

impl From<Rule> for RuleNode {
    fn from(rule: Rule) -> Self {
        Self::Rule(rule)
    }
}

impl From<RuleGroup> for RuleNode {
    fn from(group: RuleGroup) -> Self {
        Self::Group(group)
    }
}

/// A boolean combination of rules and nested groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroup {
    /// How children combine.
    pub condition: Condition,
    /// Children, in order.
    pub rules: Vec<RuleNode>,
}

impl RuleGroup {
    /// Create a new group.
    pub fn new(condition: Condition, rules: impl IntoIterator<Item = RuleNode>) -> Self {
        Self {
            condition,
            rules: rules.into_iter().collect(),
        }
    }

    /// Create an AND group.
    pub fn and(rules: impl IntoIterator<Item = RuleNode>) -> Self {
        Self::new(Condition::And, rules)
    }

    /// Create an OR group.
    pub fn or(rules: impl IntoIterator<Item = RuleNode>) -> Self {
        Self::new(Condition::Or, rules)
    }

    /// Parse a group from its JSON wire format.
    pub fn from_json(json: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check if the group has no children.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Visit every leaf rule depth-first, in the order the compiler does.
    pub fn leaves(&self) -> Vec<&Rule> {
        let mut out = Vec::new();
        let mut pending: Vec<&RuleNode> = self.rules.iter().rev().collect();
        while let Some(node) = pending.pop() {
            match node {
                RuleNode::Rule(rule) => out.push(rule),
                RuleNode::Group(group) => pending.extend(group.rules.iter().rev()),
            }
        }
        out
    }

    /// Nesting depth; a group with only leaf children has depth 1.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((group, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(group.rules.iter().filter_map(|node| match node {
                RuleNode::Group(child) => Some((child, depth + 1)),
                RuleNode::Rule(_) => None,
            }));
        }
        deepest
    }

    /// Reject the tree if any group nests deeper than `max_depth`.
    ///
    /// Runs without recursion and stops at the first group past the limit,
    /// so arbitrarily deep input is refused in bounded stack space. The
    /// error carries that group's condition but none of its children.
    pub fn check_depth(&self, max_depth: usize) -> CompileResult<()> {
        let mut pending = vec![(self, 1)];
        while let Some((group, depth)) = pending.pop() {
            if depth > max_depth {
                return Err(CompileError::invalid_group(
                    format!(
                        "group at depth {} exceeds the limit of {} nested levels",
                        depth, max_depth
                    ),
                    group,
                ));
            }
            pending.extend(group.rules.iter().filter_map(|node| match node {
                RuleNode::Group(child) => Some((child, depth + 1)),
                RuleNode::Rule(_) => None,
            }));
        }
        Ok(())
    }
}

impl Drop for RuleGroup {
    // Unlink nested groups onto a work list so deep trees drop iteratively.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.rules);
        while let Some(node) = pending.pop() {
            if let RuleNode::Group(mut group) = node {
                pending.append(&mut group.rules);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule() {
        let rule: Rule = serde_json::from_str(
            r#"{"field":"age","operator":"between","type":"number","value":[18, 30.5]}"#,
        )
        .unwrap();

        assert_eq!(rule.operator, Operator::Between);
        assert_eq!(rule.value_type, ValueType::Number);
        assert_eq!(rule.values, vec![RuleValue::Int(18), RuleValue::Float(30.5)]);
    }

    #[test]
    fn test_missing_value_defaults_to_empty() {
        let rule: Rule =
            serde_json::from_str(r#"{"field":"bio","operator":"is_empty","type":"text"}"#).unwrap();
        assert!(rule.values.is_empty());
    }

    #[test]
    fn test_parse_nested_group() {
        let group = RuleGroup::from_json(
            r#"{"condition":"and","rules":[
                {"condition":"OR","rules":[
                    {"field":"a","operator":"equal","type":"boolean","value":[true]}
                ]},
                {"field":"b","operator":"is_not_empty","type":"date","value":[]}
            ]}"#,
        )
        .unwrap();

        assert_eq!(group.condition, Condition::And);
        assert_eq!(group.depth(), 2);
        let fields: Vec<_> = group.leaves().iter().map(|r| r.field.as_str()).collect();
        assert_eq!(fields, vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_operator_is_malformed() {
        let err = RuleGroup::from_json(
            r#"{"condition":"AND","rules":[{"field":"a","operator":"like","type":"text","value":["x"]}]}"#,
        )
        .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let rule = Rule::new("tags", Operator::NotContains, ValueType::Array, vec!["vip".into()]);
        let json = serde_json::to_value(RuleNode::from(rule)).unwrap();
        assert_eq!(json["operator"], "not_contains");
        assert_eq!(json["type"], "array");
        assert_eq!(json["value"][0], "vip");
    }

    #[test]
    fn test_operator_arity() {
        assert_eq!(Operator::IsEmpty.arity(), 0);
        assert_eq!(Operator::Equal.arity(), 1);
        assert_eq!(Operator::NotBetween.arity(), 2);
        assert!(Operator::EndsWith.is_pattern());
        assert!(!Operator::Equal.is_pattern());
    }

    fn nested(depth: usize) -> RuleGroup {
        let leaf = Rule::new("a", Operator::Equal, ValueType::Boolean, vec![true.into()]);
        let mut group = RuleGroup::and([leaf.into()]);
        for level in 1..depth {
            let child: RuleNode = group.into();
            group = if level % 2 == 0 {
                RuleGroup::and([child])
            } else {
                RuleGroup::or([child])
            };
        }
        group
    }

    #[test]
    fn test_check_depth_limit() {
        let group = nested(4);
        assert_eq!(group.depth(), 4);
        assert!(group.check_depth(4).is_ok());

        match group.check_depth(3).unwrap_err() {
            CompileError::InvalidRule { message, rule } => {
                assert!(message.contains("depth 4"), "{message}");
                assert!(matches!(*rule, RuleNode::Group(ref g) if g.is_empty()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_very_deep_tree_is_refused_and_dropped() {
        let group = nested(200_000);
        let err = group.check_depth(32).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(group.leaves().len(), 1);
        drop(group);
    }
}
