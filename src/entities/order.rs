use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;
use validator::ValidationError;

/// Lifecycle states a delivery order moves through. Stored as the
/// upper-case string form; transitions are not constrained to a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Assigned,
    InTransit,
    Delivered,
    Cancelled,
}

/// City applied when the caller does not name one.
pub const DEFAULT_CITY: &str = "Manila";
/// Recorded creator when the caller does not identify itself.
pub const DEFAULT_CREATED_BY: &str = "System";

pub const INVALID_STATUS_MESSAGE: &str =
    "Invalid status. Must be one of: PENDING, ASSIGNED, IN_TRANSIT, DELIVERED, CANCELLED";

static PHONE_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?1?\d{9,15}$").expect("phone pattern is valid"));

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Public reference, assigned once at creation and never altered.
    #[sea_orm(unique)]
    pub order_number: String,

    pub customer_name: String,
    pub customer_email: Option<String>,
    pub phone_number: String,

    #[sea_orm(column_type = "Text")]
    pub delivery_address: String,
    pub delivery_city: String,
    pub delivery_postal_code: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub order_description: Option<String>,
    pub order_status: String,

    pub assigned_driver: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub driver_notes: Option<String>,

    pub pickup_time: Option<DateTime<Utc>>,
    pub delivery_time: Option<DateTime<Utc>>,

    #[sea_orm(column_type = "Decimal(Some((9, 6)))", nullable)]
    pub current_latitude: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((9, 6)))", nullable)]
    pub current_longitude: Option<Decimal>,

    pub delivery_photo_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_delivered(&self) -> bool {
        self.order_status == OrderStatus::Delivered.as_ref()
    }

    pub fn has_driver(&self) -> bool {
        self.assigned_driver
            .as_deref()
            .map_or(false, |driver| !driver.is_empty())
    }
}

/// Mints a public order reference like `ORD-1A2B3C4D`.
pub fn generate_order_number() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("ORD-{}", token[..8].to_uppercase())
}

pub fn validate_phone_number(value: &str) -> Result<(), ValidationError> {
    if !value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' '))
    {
        return Err(field_error(
            "phone_number",
            "Phone number must contain only digits, +, -, and spaces",
        ));
    }
    if !PHONE_NUMBER_PATTERN.is_match(value) {
        return Err(field_error(
            "phone_number",
            "Phone number must be entered in format: '+999999999'. Up to 15 digits.",
        ));
    }
    Ok(())
}

pub fn validate_order_status(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<OrderStatus>()
        .map(|_| ())
        .map_err(|_| field_error("order_status", INVALID_STATUS_MESSAGE))
}

/// Enforces the decimal(9,6) storage shape on GPS coordinates.
pub fn validate_coordinate(value: &Decimal) -> Result<(), ValidationError> {
    if value.scale() > 6 {
        return Err(field_error(
            "coordinate",
            "Ensure that there are no more than 6 decimal places.",
        ));
    }
    let digits = value.mantissa().unsigned_abs().to_string().len();
    if digits > 9 {
        return Err(field_error(
            "coordinate",
            "Ensure that there are no more than 9 digits in total.",
        ));
    }
    Ok(())
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}
