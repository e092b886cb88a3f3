//! Tags defined on a callout for sorting its responses.

use crate::domain::column;
use crate::handler::HandlerRegistry;
use crate::rule::ValueType;
use crate::schema::{FieldDefinition, FilterSchema};
use crate::traits::Entity;

/// The `callout_tag` table.
#[derive(Debug, Clone, Copy)]
pub struct CalloutTag;

impl Entity for CalloutTag {
    const NAME: &'static str = "CalloutTag";
    const TABLE_NAME: &'static str = "callout_tag";
    const ALIAS: &'static str = "t";

    fn filter_schema() -> FilterSchema {
        FilterSchema::new()
            .field("name", FieldDefinition::new(ValueType::Text))
            .field("description", FieldDefinition::new(ValueType::Text).nullable())
            .field("callout", FieldDefinition::new(ValueType::Text))
    }

    fn handlers() -> HandlerRegistry {
        HandlerRegistry::new().register("callout", column("calloutId"))
    }
}
