//! Allowed-field schemas and rule validation.
//!
//! An entity declares which fields may be filtered on, with which type, and
//! whether the backing column can be NULL. Validation runs before
//! compilation so a client cannot reach a handler with a field or value shape
//! it was never meant to accept.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};
use crate::operators;
use crate::rule::{Rule, RuleGroup, RuleValue, ValueType};

/// Declaration of one filterable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Declared type; `None` lets each rule choose (dynamic fields).
    #[serde(rename = "type", default)]
    pub value_type: Option<ValueType>,
    /// Whether the backing column may hold NULL.
    #[serde(default)]
    pub nullable: bool,
    /// Permitted values of an `enum` field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl FieldDefinition {
    /// A non-nullable field of `value_type`.
    pub fn new(value_type: ValueType) -> Self {
        Self {
            value_type: Some(value_type),
            nullable: false,
            options: Vec::new(),
        }
    }

    /// A field whose type is taken from each rule.
    pub fn dynamic() -> Self {
        Self {
            value_type: None,
            nullable: false,
            options: Vec::new(),
        }
    }

    /// An `enum` field with its permitted values.
    pub fn enumeration<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            value_type: Some(ValueType::Enum),
            nullable: false,
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    /// Mark the backing column as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// The filterable fields of an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSchema {
    fields: IndexMap<String, FieldDefinition>,
}

impl FilterSchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field. A name ending in `.` declares a dynamic family.
    pub fn field(mut self, name: impl Into<String>, definition: FieldDefinition) -> Self {
        self.fields.insert(name.into(), definition);
        self
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if no field is declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Definition of `field`: exact name first, then its first-segment prefix.
    pub fn get(&self, field: &str) -> Option<&FieldDefinition> {
        self.fields.get(field).or_else(|| {
            field
                .find('.')
                .and_then(|dot| self.fields.get(&field[..=dot]))
        })
    }

    /// Whether `field` is declared nullable. Unknown fields are not.
    pub fn is_nullable(&self, field: &str) -> bool {
        self.get(field).is_some_and(|def| def.nullable)
    }

    /// Check every rule in `group`, in compilation order.
    pub fn validate(&self, group: &RuleGroup) -> CompileResult<()> {
        group
            .leaves()
            .into_iter()
            .try_for_each(|rule| self.validate_rule(rule))
    }

    /// Check a single rule.
    pub fn validate_rule(&self, rule: &Rule) -> CompileResult<()> {
        let definition = self.get(&rule.field).ok_or_else(|| {
            CompileError::invalid_rule(format!("unknown field '{}'", rule.field), rule)
        })?;

        if let Some(declared) = definition.value_type {
            if declared != rule.value_type {
                return Err(CompileError::invalid_rule(
                    format!(
                        "field '{}' is of type '{}', not '{}'",
                        rule.field, declared, rule.value_type
                    ),
                    rule,
                ));
            }
        }

        check_leaf(rule)?;

        for value in &rule.values {
            if !shape_matches(rule.value_type, value) {
                return Err(CompileError::invalid_rule(
                    format!("value of wrong shape for type '{}'", rule.value_type),
                    rule,
                ));
            }
        }

        if rule.value_type == ValueType::Enum && !definition.options.is_empty() {
            for value in &rule.values {
                let value = value.as_str().unwrap_or_default();
                if !definition.options.iter().any(|option| option == value) {
                    return Err(CompileError::invalid_rule(
                        format!(
                            "'{}' is not an option of '{}' (expected one of: {})",
                            value,
                            rule.field,
                            definition.options.join(", ")
                        ),
                        rule,
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Check that the operator exists for the type and receives the right
/// number of values.
pub fn check_leaf(rule: &Rule) -> CompileResult<()> {
    if !operators::supports(rule.value_type, rule.operator) {
        return Err(CompileError::invalid_rule(
            format!(
                "operator '{}' is not valid for type '{}'",
                rule.operator, rule.value_type
            ),
            rule,
        ));
    }
    let arity = rule.operator.arity();
    if rule.values.len() != arity {
        return Err(CompileError::invalid_rule(
            format!(
                "operator '{}' takes {} value(s), got {}",
                rule.operator,
                arity,
                rule.values.len()
            ),
            rule,
        ));
    }
    Ok(())
}

fn shape_matches(value_type: ValueType, value: &RuleValue) -> bool {
    match value_type {
        ValueType::Number => matches!(value, RuleValue::Int(_) | RuleValue::Float(_)),
        ValueType::Boolean => matches!(value, RuleValue::Bool(_)),
        ValueType::Array => true,
        _ => matches!(value, RuleValue::String(_)),
    }
}
