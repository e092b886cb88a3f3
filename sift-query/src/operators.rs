//! Per-type operator table.
//!
//! Each [`ValueType`] maps a fixed set of [`Operator`]s to a comparison
//! template over a column expression. Templates reference the rule's values
//! as `:a` (first) and `:b` (second); the compiler namespaces them per rule.
//!
//! ```rust
//! use sift_query::operators;
//! use sift_query::rule::{Operator, ValueType};
//!
//! let sql = operators::comparison(ValueType::Number, Operator::Between, "c.amount");
//! assert_eq!(sql.as_deref(), Some("c.amount BETWEEN :a AND :b"));
//!
//! // Unknown pairs have no template.
//! assert!(operators::comparison(ValueType::Boolean, Operator::Contains, "c.flag").is_none());
//! ```

use crate::rule::{Operator, ValueType};

use Operator::*;

const TEXT: &[Operator] = &[
    Equal,
    NotEqual,
    Contains,
    NotContains,
    BeginsWith,
    NotBeginsWith,
    EndsWith,
    NotEndsWith,
    IsEmpty,
    IsNotEmpty,
];

const BLOB: &[Operator] = &[Contains, NotContains, IsEmpty, IsNotEmpty];

const ORDERED: &[Operator] = &[
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Between,
    NotBetween,
    IsEmpty,
    IsNotEmpty,
];

const EQUALITY: &[Operator] = &[Equal, NotEqual, IsEmpty, IsNotEmpty];

const ARRAY: &[Operator] = &[Contains, NotContains, IsEmpty, IsNotEmpty];

/// Operators defined for a value type.
pub fn operators_for(value_type: ValueType) -> &'static [Operator] {
    match value_type {
        ValueType::Text => TEXT,
        ValueType::Blob => BLOB,
        ValueType::Number | ValueType::Date => ORDERED,
        ValueType::Boolean | ValueType::Enum | ValueType::Contact => EQUALITY,
        ValueType::Array => ARRAY,
    }
}

/// Check whether the table has an entry for `(value_type, operator)`.
pub fn supports(value_type: ValueType, operator: Operator) -> bool {
    operators_for(value_type).contains(&operator)
}

/// Render the comparison template for `column`.
///
/// Returns `None` when the pair is not in the table.
pub fn comparison(value_type: ValueType, operator: Operator, column: &str) -> Option<String> {
    if !supports(value_type, operator) {
        return None;
    }
    match value_type {
        ValueType::Blob => blob(operator, column),
        ValueType::Array => array(operator, column),
        ValueType::Text => equality(operator, column)
            .or_else(|| pattern(operator, column))
            .or_else(|| nullable(operator, column)),
        ValueType::Number | ValueType::Date => equality(operator, column)
            .or_else(|| ordering(operator, column))
            .or_else(|| nullable(operator, column)),
        ValueType::Boolean | ValueType::Enum | ValueType::Contact => {
            equality(operator, column).or_else(|| nullable(operator, column))
        }
    }
}

fn equality(operator: Operator, c: &str) -> Option<String> {
    match operator {
        Equal => Some(format!("{c} = :a")),
        NotEqual => Some(format!("{c} <> :a")),
        _ => None,
    }
}

fn nullable(operator: Operator, c: &str) -> Option<String> {
    match operator {
        IsEmpty => Some(format!("{c} IS NULL")),
        IsNotEmpty => Some(format!("{c} IS NOT NULL")),
        _ => None,
    }
}

fn ordering(operator: Operator, c: &str) -> Option<String> {
    match operator {
        Less => Some(format!("{c} < :a")),
        LessOrEqual => Some(format!("{c} <= :a")),
        Greater => Some(format!("{c} > :a")),
        GreaterOrEqual => Some(format!("{c} >= :a")),
        Between => Some(format!("{c} BETWEEN :a AND :b")),
        NotBetween => Some(format!("{c} NOT BETWEEN :a AND :b")),
        _ => None,
    }
}

// Values reach these templates with LIKE wildcards already escaped. SQLite
// folds case for ASCII letters only, so `contains "arger"` finds "Arger" but
// not "ÄRGER"; `lower()` has the same limit without the ICU extension.
fn pattern(operator: Operator, c: &str) -> Option<String> {
    match operator {
        Contains => Some(format!("{c} LIKE '%' || :a || '%' ESCAPE '\\'")),
        NotContains => Some(format!("{c} NOT LIKE '%' || :a || '%' ESCAPE '\\'")),
        BeginsWith => Some(format!("{c} LIKE :a || '%' ESCAPE '\\'")),
        NotBeginsWith => Some(format!("{c} NOT LIKE :a || '%' ESCAPE '\\'")),
        EndsWith => Some(format!("{c} LIKE '%' || :a ESCAPE '\\'")),
        NotEndsWith => Some(format!("{c} NOT LIKE '%' || :a ESCAPE '\\'")),
        _ => None,
    }
}

fn blob(operator: Operator, c: &str) -> Option<String> {
    match operator {
        IsEmpty => Some(format!("{c} = ''")),
        IsNotEmpty => Some(format!("{c} <> ''")),
        _ => pattern(operator, c),
    }
}

/// Membership in a JSON column: an array element equal to the value, or an
/// object key named by the value whose value is truthy (not `false`, `null`,
/// `0` or `""`). NULL columns have no members.
fn array(operator: Operator, c: &str) -> Option<String> {
    let member = format!(
        "SELECT 1 FROM json_each({c}) WHERE CASE json_type({c}) \
         WHEN 'object' THEN {} ELSE json_each.value = :a END",
        truthy_entry("json_each.key = :a AND ")
    );
    let any = format!(
        "SELECT 1 FROM json_each({c}) WHERE CASE json_type({c}) \
         WHEN 'object' THEN {} ELSE TRUE END",
        truthy_entry("")
    );
    match operator {
        Contains => Some(format!("EXISTS ({member})")),
        NotContains => Some(format!("NOT EXISTS ({member})")),
        IsEmpty => Some(format!("NOT EXISTS ({any})")),
        IsNotEmpty => Some(format!("EXISTS ({any})")),
        _ => None,
    }
}

fn truthy_entry(key_test: &str) -> String {
    format!(
        "{key_test}json_each.type NOT IN ('false', 'null') AND json_each.value NOT IN (0, '')"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ALL_TYPES: [ValueType; 8] = [
        ValueType::Text,
        ValueType::Blob,
        ValueType::Number,
        ValueType::Date,
        ValueType::Boolean,
        ValueType::Array,
        ValueType::Enum,
        ValueType::Contact,
    ];

    #[test]
    fn test_every_listed_operator_has_a_template() {
        for ty in ALL_TYPES {
            for op in operators_for(ty) {
                assert!(comparison(ty, *op, "x").is_some(), "{ty} {op}");
            }
        }
    }

    #[test]
    fn test_equality_family() {
        for ty in [ValueType::Text, ValueType::Number, ValueType::Enum, ValueType::Contact] {
            assert_eq!(comparison(ty, Equal, "c.x").unwrap(), "c.x = :a");
            assert_eq!(comparison(ty, NotEqual, "c.x").unwrap(), "c.x <> :a");
        }
    }

    #[test]
    fn test_blob_empty_means_empty_string() {
        assert_eq!(comparison(ValueType::Blob, IsEmpty, "c.notes").unwrap(), "c.notes = ''");
        assert_eq!(comparison(ValueType::Blob, IsNotEmpty, "c.notes").unwrap(), "c.notes <> ''");
        assert_eq!(comparison(ValueType::Text, IsEmpty, "c.bio").unwrap(), "c.bio IS NULL");
        assert!(comparison(ValueType::Blob, Equal, "c.notes").is_none());
    }

    #[test]
    fn test_pattern_templates() {
        assert_eq!(
            comparison(ValueType::Text, BeginsWith, "c.email").unwrap(),
            "c.email LIKE :a || '%' ESCAPE '\\'"
        );
        assert_eq!(
            comparison(ValueType::Text, NotEndsWith, "c.email").unwrap(),
            "c.email NOT LIKE '%' || :a ESCAPE '\\'"
        );
        assert!(comparison(ValueType::Blob, BeginsWith, "c.notes").is_none());
    }

    #[test]
    fn test_ordering_only_for_numbers_and_dates() {
        assert_eq!(comparison(ValueType::Date, Less, "d").unwrap(), "d < :a");
        assert_eq!(
            comparison(ValueType::Number, NotBetween, "n").unwrap(),
            "n NOT BETWEEN :a AND :b"
        );
        assert!(comparison(ValueType::Text, Less, "t").is_none());
        assert!(comparison(ValueType::Boolean, Greater, "b").is_none());
    }

    #[test]
    fn test_array_templates() {
        assert_eq!(
            comparison(ValueType::Array, Contains, "i.tags").unwrap(),
            "EXISTS (SELECT 1 FROM json_each(i.tags) WHERE CASE json_type(i.tags) \
             WHEN 'object' THEN json_each.key = :a AND json_each.type NOT IN ('false', 'null') \
             AND json_each.value NOT IN (0, '') ELSE json_each.value = :a END)"
        );
        assert_eq!(
            comparison(ValueType::Array, IsEmpty, "i.tags").unwrap(),
            "NOT EXISTS (SELECT 1 FROM json_each(i.tags) WHERE CASE json_type(i.tags) \
             WHEN 'object' THEN json_each.type NOT IN ('false', 'null') \
             AND json_each.value NOT IN (0, '') ELSE TRUE END)"
        );
        assert!(comparison(ValueType::Array, Equal, "i.tags").is_none());
    }

    #[test]
    fn test_array_negations_wrap_the_same_test() {
        for (positive, negative) in [(Contains, NotContains), (IsNotEmpty, IsEmpty)] {
            let positive = comparison(ValueType::Array, positive, "i.tags").unwrap();
            let negative = comparison(ValueType::Array, negative, "i.tags").unwrap();
            assert_eq!(negative, format!("NOT {positive}"));
        }
    }
}
