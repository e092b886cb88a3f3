//! Payments collected from contacts.

use crate::domain::column;
use crate::handler::HandlerRegistry;
use crate::rule::ValueType;
use crate::schema::{FieldDefinition, FilterSchema};
use crate::traits::Entity;

/// The `payment` table.
#[derive(Debug, Clone, Copy)]
pub struct Payment;

impl Entity for Payment {
    const NAME: &'static str = "Payment";
    const TABLE_NAME: &'static str = "payment";
    const ALIAS: &'static str = "p";

    fn filter_schema() -> FilterSchema {
        FilterSchema::new()
            .field("contact", FieldDefinition::new(ValueType::Contact).nullable())
            .field("amount", FieldDefinition::new(ValueType::Number))
            .field(
                "status",
                FieldDefinition::enumeration(["pending", "successful", "failed", "cancelled"]),
            )
            .field("chargeDate", FieldDefinition::new(ValueType::Date))
    }

    fn handlers() -> HandlerRegistry {
        HandlerRegistry::new().register("contact", column("contactId"))
    }
}
