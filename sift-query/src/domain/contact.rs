//! Contacts: people with roles, contributions and newsletter status.

use crate::domain::{flag_selects_true, linked, membership};
use crate::error::{CompileError, CompileResult};
use crate::handler::{FieldHandlerContext, FragmentBuilder, HandlerRegistry};
use crate::prepare::DatePrecision;
use crate::rule::{Operator, ValueType};
use crate::schema::{FieldDefinition, FilterSchema};
use crate::traits::Entity;
use crate::value::{FilterValue, Params};

/// Roles that are in effect at `:now`.
const ACTIVE_ROLES: &str = "SELECT contactId FROM contact_role \
     WHERE strftime('%Y-%m-%d %H:%M:%S', dateAdded) <= :now \
     AND (dateExpires IS NULL OR strftime('%Y-%m-%d %H:%M:%S', dateExpires) > :now)";

/// The `contact` table.
#[derive(Debug, Clone, Copy)]
pub struct Contact;

impl Entity for Contact {
    const NAME: &'static str = "Contact";
    const TABLE_NAME: &'static str = "contact";
    const ALIAS: &'static str = "c";

    fn filter_schema() -> FilterSchema {
        FilterSchema::new()
            .field("email", FieldDefinition::new(ValueType::Text))
            .field("firstname", FieldDefinition::new(ValueType::Text))
            .field("lastname", FieldDefinition::new(ValueType::Text))
            .field("bio", FieldDefinition::new(ValueType::Text).nullable())
            .field("joined", FieldDefinition::new(ValueType::Date))
            .field("lastSeen", FieldDefinition::new(ValueType::Date).nullable())
            .field(
                "contributionType",
                FieldDefinition::enumeration(["Automatic", "Manual", "Gift", "None"]),
            )
            .field(
                "contributionMonthlyAmount",
                FieldDefinition::new(ValueType::Number).nullable(),
            )
            .field("deliveryOptIn", FieldDefinition::new(ValueType::Boolean))
            .field(
                "newsletterStatus",
                FieldDefinition::enumeration([
                    "subscribed",
                    "unsubscribed",
                    "cleaned",
                    "pending",
                    "none",
                ]),
            )
            .field("activeMembership", FieldDefinition::new(ValueType::Boolean))
            .field("activePermission", FieldDefinition::enumeration(["member", "admin"]))
            .field("membershipStarts", FieldDefinition::new(ValueType::Date))
            .field("membershipExpires", FieldDefinition::new(ValueType::Date))
            .field("tags", FieldDefinition::new(ValueType::Array))
            .field("callouts.", FieldDefinition::new(ValueType::Boolean))
    }

    fn handlers() -> HandlerRegistry {
        HandlerRegistry::new()
            .register("activeMembership", active_membership)
            .register("activePermission", active_permission)
            .register("membershipStarts", membership_window("dateAdded"))
            .register("membershipExpires", membership_window("dateExpires"))
            .register("tags", linked("contact_tag_assignment", "contactId", "tagId"))
            .register("callouts.", callout_participation)
    }
}

fn now_param(ctx: &FieldHandlerContext<'_>) -> Params {
    let now = DatePrecision::Second.truncate(&ctx.now().naive_utc());
    Params::from_iter([("now".to_string(), FilterValue::String(now))])
}

fn active_membership(
    builder: &mut FragmentBuilder,
    ctx: &FieldHandlerContext<'_>,
) -> CompileResult<Option<Params>> {
    let selects = flag_selects_true(ctx)?;
    let subselect = format!("{ACTIVE_ROLES} AND \"type\" = 'member'");
    builder.and_where(membership(ctx, !selects, &ctx.namespace_param(&subselect)));
    Ok(Some(now_param(ctx)))
}

fn active_permission(
    builder: &mut FragmentBuilder,
    ctx: &FieldHandlerContext<'_>,
) -> CompileResult<Option<Params>> {
    let (negate, subselect) = match ctx.operator() {
        Operator::Equal => (false, format!("{ACTIVE_ROLES} AND \"type\" = :a")),
        Operator::NotEqual => (true, format!("{ACTIVE_ROLES} AND \"type\" = :a")),
        Operator::IsNotEmpty => (false, ACTIVE_ROLES.to_string()),
        Operator::IsEmpty => (true, ACTIVE_ROLES.to_string()),
        _ => return Err(ctx.unsupported()),
    };
    builder.and_where(membership(ctx, negate, &ctx.namespace_param(&subselect)));
    Ok(Some(now_param(ctx)))
}

/// Compare one end of the contact's membership role.
fn membership_window(
    role_column: &'static str,
) -> impl Fn(&mut FragmentBuilder, &FieldHandlerContext<'_>) -> CompileResult<Option<Params>>
+ Send
+ Sync
+ 'static {
    move |builder: &mut FragmentBuilder, ctx: &FieldHandlerContext<'_>| {
        let subselect = format!(
            "SELECT contactId FROM contact_role WHERE \"type\" = 'member' AND {}",
            ctx.to_comparison(role_column)?
        );
        builder.and_where(membership(ctx, false, &subselect));
        Ok(None)
    }
}

/// `callouts.<id>.hasAnswered`
fn callout_participation(
    builder: &mut FragmentBuilder,
    ctx: &FieldHandlerContext<'_>,
) -> CompileResult<Option<Params>> {
    let callout_id = match ctx.field().split('.').collect::<Vec<_>>().as_slice() {
        ["callouts", id, "hasAnswered"] if !id.is_empty() => (*id).to_string(),
        _ => {
            return Err(CompileError::invalid_rule(
                format!("unknown callout field '{}'", ctx.field()),
                ctx.rule(),
            ));
        }
    };

    let selects = flag_selects_true(ctx)?;
    let subselect = ctx.namespace_param(
        "SELECT contactId FROM callout_response \
         WHERE calloutId = :calloutId AND contactId IS NOT NULL",
    );
    builder.and_where(membership(ctx, !selects, &subselect));
    Ok(Some(Params::from_iter([(
        "calloutId".to_string(),
        FilterValue::String(callout_id),
    )])))
}
