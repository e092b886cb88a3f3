//! Callout responses: survey answers stored as a JSON document per response.
//!
//! Answers are addressed as `answers.<slide>.<key>`. Most answer types are a
//! scalar under that path; multiple-choice answers are an object of option
//! keys to booleans, so `array` rules test the truthiness of one key.

use crate::domain::{column, linked};
use crate::error::{CompileError, CompileResult};
use crate::handler::{FieldHandlerContext, FragmentBuilder, HandlerRegistry};
use crate::rule::{Operator, ValueType};
use crate::schema::{FieldDefinition, FilterSchema};
use crate::traits::Entity;
use crate::value::{FilterValue, Params};

/// The `callout_response` table.
#[derive(Debug, Clone, Copy)]
pub struct CalloutResponse;

impl Entity for CalloutResponse {
    const NAME: &'static str = "CalloutResponse";
    const TABLE_NAME: &'static str = "callout_response";
    const ALIAS: &'static str = "r";

    fn filter_schema() -> FilterSchema {
        FilterSchema::new()
            .field("callout", FieldDefinition::new(ValueType::Text))
            .field("contact", FieldDefinition::new(ValueType::Contact).nullable())
            .field("assignee", FieldDefinition::new(ValueType::Contact).nullable())
            .field("bucket", FieldDefinition::new(ValueType::Text))
            .field("createdAt", FieldDefinition::new(ValueType::Date))
            .field("updatedAt", FieldDefinition::new(ValueType::Date))
            .field("tags", FieldDefinition::new(ValueType::Array))
            .field("answers.", FieldDefinition::dynamic().nullable())
    }

    fn handlers() -> HandlerRegistry {
        HandlerRegistry::new()
            .register("callout", column("calloutId"))
            .register("contact", column("contactId"))
            .register("assignee", column("assigneeId"))
            .register("tags", linked("callout_response_tag", "responseId", "tagId"))
            .register("answers.", answer)
    }
}

/// JSON path of `answers.<slide>.<key>`.
fn answer_path(ctx: &FieldHandlerContext<'_>) -> CompileResult<String> {
    let parts: Vec<_> = ctx.field().split('.').collect();
    match parts.as_slice() {
        [_, slide, key] if !slide.is_empty() && !key.is_empty() => {
            if slide.contains('"') || key.contains('"') {
                return Err(CompileError::invalid_rule(
                    "answer keys may not contain '\"'",
                    ctx.rule(),
                ));
            }
            Ok(format!("$.\"{slide}\".\"{key}\""))
        }
        _ => Err(CompileError::invalid_rule(
            format!("'{}' is not of the form answers.<slide>.<key>", ctx.field()),
            ctx.rule(),
        )),
    }
}

fn answer(
    builder: &mut FragmentBuilder,
    ctx: &FieldHandlerContext<'_>,
) -> CompileResult<Option<Params>> {
    let path = answer_path(ctx)?;
    let document = format!("{}answers", ctx.field_prefix());

    let condition = match ctx.value_type() {
        ValueType::Array => {
            let option =
                format!("COALESCE(json_extract({document}, :path || '.' || json_quote(:a)), 0)");
            let chosen =
                format!("SELECT 1 FROM json_each({document}, :path) WHERE json_each.value");
            let template = match ctx.operator() {
                Operator::Contains => format!("{option} = 1"),
                Operator::NotContains => format!("{option} = 0"),
                Operator::IsNotEmpty => format!("EXISTS ({chosen})"),
                Operator::IsEmpty => format!("NOT EXISTS ({chosen})"),
                _ => return Err(ctx.unsupported()),
            };
            ctx.namespace_param(&template)
        }
        ValueType::Number => {
            let extracted = ctx.namespace_param(&format!("json_extract({document}, :path)"));
            ctx.to_comparison(&format!("CAST({extracted} AS REAL)"))?
        }
        _ => ctx.to_comparison(&ctx.namespace_param(&format!("json_extract({document}, :path)")))?,
    };

    builder.and_where(condition);
    Ok(Some(Params::from_iter([("path".to_string(), FilterValue::String(path))])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::compile_rule;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_renamed_columns() {
        let predicate = compile_rule::<CalloutResponse>(
            "assignee",
            Operator::Equal,
            ValueType::Contact,
            vec!["me".into()],
        )
        .unwrap();
        assert_eq!(predicate.sql, "((r.assigneeId = :a_0))");
        assert_eq!(predicate.params["a_0"], FilterValue::from("actor-1"));

        let predicate = compile_rule::<CalloutResponse>(
            "contact",
            Operator::IsEmpty,
            ValueType::Contact,
            vec![],
        )
        .unwrap();
        assert_eq!(predicate.sql, "((r.contactId IS NULL))");
    }

    #[test]
    fn test_text_answer() {
        let predicate = compile_rule::<CalloutResponse>(
            "answers.about.name",
            Operator::Contains,
            ValueType::Text,
            vec!["ann".into()],
        )
        .unwrap();
        assert_eq!(
            predicate.sql,
            "((COALESCE(json_extract(r.answers, :path_0), '') LIKE '%' || :a_0 || '%' ESCAPE '\\'))"
        );
        assert_eq!(predicate.params["path_0"], FilterValue::from("$.\"about\".\"name\""));
    }

    #[test]
    fn test_number_answer_is_cast() {
        let predicate = compile_rule::<CalloutResponse>(
            "answers.about.age",
            Operator::Between,
            ValueType::Number,
            vec![18.into(), 30.into()],
        )
        .unwrap();
        assert_eq!(
            predicate.sql,
            "((CAST(json_extract(r.answers, :path_0) AS REAL) BETWEEN :a_0 AND :b_0))"
        );
    }

    #[test]
    fn test_choice_answer_tests_key_truthiness() {
        let predicate = compile_rule::<CalloutResponse>(
            "answers.prefs.topics",
            Operator::Contains,
            ValueType::Array,
            vec!["housing".into()],
        )
        .unwrap();
        assert_eq!(
            predicate.sql,
            "((COALESCE(json_extract(r.answers, :path_0 || '.' || json_quote(:a_0)), 0) = 1))"
        );

        let predicate = compile_rule::<CalloutResponse>(
            "answers.prefs.topics",
            Operator::IsEmpty,
            ValueType::Array,
            vec![],
        )
        .unwrap();
        assert_eq!(
            predicate.sql,
            "((NOT EXISTS (SELECT 1 FROM json_each(r.answers, :path_0) WHERE json_each.value)))"
        );
    }

    #[test]
    fn test_malformed_answer_field() {
        for field in ["answers.about", "answers.a.b.c", "answers.\"x.y"] {
            let x = vec!["x".into()];
            let err = compile_rule::<CalloutResponse>(field, Operator::Equal, ValueType::Text, x)
                .unwrap_err();
            assert!(matches!(err, CompileError::InvalidRule { .. }), "{field}");
        }
    }

    #[test]
    fn test_repeated_answer_rules_do_not_collide() {
        use crate::compiler::Compiler;
        use crate::rule::{Rule, RuleGroup};

        let rule = || -> crate::rule::RuleNode {
            Rule::new("answers.about.age", Operator::Greater, ValueType::Number, vec![20.into()])
                .into()
        };
        let group = RuleGroup::or([rule(), rule()]);
        let handlers = CalloutResponse::handlers();
        let predicate = Compiler::new(&handlers).field_prefix("r.").compile(&group).unwrap();
        let keys: Vec<_> = predicate.params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a_0", "path_0", "a_1", "path_1"]);
    }
}
