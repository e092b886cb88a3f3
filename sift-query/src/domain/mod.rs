//! Filterable entity families of the membership platform.
//!
//! Each entity declares its filter schema and the handlers for fields that
//! are not a plain column of its table: join tables, role windows, JSON
//! answers. Table and column names follow the platform's SQLite schema
//! (camelCase columns, singular table names).

mod callout_response;
mod contact;
mod payment;
mod tag;

pub use callout_response::CalloutResponse;
pub use contact::Contact;
pub use payment::Payment;
pub use tag::CalloutTag;

use crate::error::{CompileError, CompileResult};
use crate::handler::{FieldHandlerContext, FragmentBuilder};
use crate::rule::{Operator, ValueType};
use crate::value::{FilterValue, Params};

/// Handler comparing a column whose name differs from the field's.
pub fn column(
    name: &'static str,
) -> impl Fn(&mut FragmentBuilder, &FieldHandlerContext<'_>) -> CompileResult<Option<Params>>
+ Send
+ Sync
+ 'static {
    move |builder: &mut FragmentBuilder, ctx: &FieldHandlerContext<'_>| {
        builder.and_where(ctx.to_comparison(&format!("{}{}", ctx.field_prefix(), name))?);
        Ok(None)
    }
}

/// Handler for an `array` field backed by a join table.
///
/// `contains` keeps rows linked to the value, `is_not_empty` rows linked to
/// anything; the negated operators keep the rest.
pub fn linked(
    table: &'static str,
    owner: &'static str,
    target: &'static str,
) -> impl Fn(&mut FragmentBuilder, &FieldHandlerContext<'_>) -> CompileResult<Option<Params>>
+ Send
+ Sync
+ 'static {
    move |builder: &mut FragmentBuilder, ctx: &FieldHandlerContext<'_>| {
        if ctx.value_type() != ValueType::Array {
            return Err(ctx.unsupported());
        }
        let tagged = || format!("SELECT {owner} FROM {table} WHERE {target} = :a");
        let any = || format!("SELECT {owner} FROM {table}");
        let (negate, subselect) = match ctx.operator() {
            Operator::Contains => (false, tagged()),
            Operator::NotContains => (true, tagged()),
            Operator::IsNotEmpty => (false, any()),
            Operator::IsEmpty => (true, any()),
            _ => return Err(ctx.unsupported()),
        };
        builder.and_where(membership(ctx, negate, &ctx.namespace_param(&subselect)));
        Ok(None)
    }
}

/// `<prefix>id [NOT] IN (<subselect>)`. The sub-select must already be
/// namespaced.
pub(crate) fn membership(ctx: &FieldHandlerContext<'_>, negate: bool, subselect: &str) -> String {
    format!(
        "{}id {}IN ({})",
        ctx.field_prefix(),
        if negate { "NOT " } else { "" },
        subselect
    )
}

/// For `boolean` flag fields: whether the rule selects rows where the flag
/// holds. Only `equal` and `not_equal` make sense for such fields.
pub(crate) fn flag_selects_true(ctx: &FieldHandlerContext<'_>) -> CompileResult<bool> {
    let value = match ctx.values().first() {
        Some(FilterValue::Bool(value)) => *value,
        _ => return Err(ctx.unsupported()),
    };
    match ctx.operator() {
        Operator::Equal => Ok(value),
        Operator::NotEqual => Ok(!value),
        _ => Err(CompileError::invalid_rule(
            format!("'{}' only supports equal and not_equal", ctx.field()),
            ctx.rule(),
        )),
    }
}
