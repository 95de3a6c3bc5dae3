use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::entities::order::{self, OrderStatus, DEFAULT_CITY, DEFAULT_CREATED_BY};
use crate::errors::{FieldErrors, ServiceError};
use crate::services::orders::{NewOrder, OrderChanges, OrderFilters};
use crate::AppState;

/// Render format for created_at/updated_at in the full projection.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const REQUIRED_MESSAGE: &str = "This field is required.";
const BLANK_MESSAGE: &str = "This field may not be blank.";

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

/// Full projection of an order; the response shape for every item-level
/// operation and for the driver/status/search collections.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub phone_number: String,
    pub delivery_address: String,
    pub delivery_city: String,
    pub delivery_postal_code: Option<String>,
    pub order_description: Option<String>,
    pub order_status: String,
    pub assigned_driver: Option<String>,
    pub driver_notes: Option<String>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub delivery_time: Option<DateTime<Utc>>,
    pub current_latitude: Option<Decimal>,
    pub current_longitude: Option<Decimal>,
    pub delivery_photo_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: String,
    pub is_delivered: bool,
    pub has_driver: bool,
}

impl From<&order::Model> for OrderResponse {
    fn from(model: &order::Model) -> Self {
        Self {
            id: model.id,
            order_number: model.order_number.clone(),
            customer_name: model.customer_name.clone(),
            customer_email: model.customer_email.clone(),
            phone_number: model.phone_number.clone(),
            delivery_address: model.delivery_address.clone(),
            delivery_city: model.delivery_city.clone(),
            delivery_postal_code: model.delivery_postal_code.clone(),
            order_description: model.order_description.clone(),
            order_status: model.order_status.clone(),
            assigned_driver: model.assigned_driver.clone(),
            driver_notes: model.driver_notes.clone(),
            pickup_time: model.pickup_time,
            delivery_time: model.delivery_time,
            current_latitude: model.current_latitude,
            current_longitude: model.current_longitude,
            delivery_photo_url: model.delivery_photo_url.clone(),
            created_at: model.created_at.format(TIMESTAMP_FORMAT).to_string(),
            updated_at: model.updated_at.format(TIMESTAMP_FORMAT).to_string(),
            created_by: model.created_by.clone(),
            is_delivered: model.is_delivered(),
            has_driver: model.has_driver(),
        }
    }
}

/// Trimmed projection used only by the bulk list operation.
#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub id: i64,
    pub order_number: String,
    pub customer_name: String,
    pub delivery_city: String,
    pub order_status: String,
    pub assigned_driver: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&order::Model> for OrderSummary {
    fn from(model: &order::Model) -> Self {
        Self {
            id: model.id,
            order_number: model.order_number.clone(),
            customer_name: model.customer_name.clone(),
            delivery_city: model.delivery_city.clone(),
            order_status: model.order_status.clone(),
            assigned_driver: model.assigned_driver.clone(),
            created_at: model.created_at,
        }
    }
}

/// Create projection: the narrow field set offices submit for a new order.
/// Everything else takes entity defaults.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    pub customer_name: Option<String>,

    #[validate(custom = "order::validate_phone_number")]
    pub phone_number: Option<String>,

    pub delivery_address: Option<String>,

    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub delivery_city: Option<String>,

    pub order_description: Option<String>,

    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    pub created_by: Option<String>,
}

impl CreateOrderRequest {
    fn validate_payload(&self) -> Result<(), ServiceError> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "customer_name", &self.customer_name);
        require(&mut errors, "phone_number", &self.phone_number);
        require(&mut errors, "delivery_address", &self.delivery_address);
        if let Err(failures) = self.validate() {
            errors.extend(failures.into());
        }
        errors.into_result()
    }

    fn into_new_order(self) -> NewOrder {
        NewOrder {
            customer_name: self.customer_name.unwrap_or_default(),
            phone_number: self.phone_number.unwrap_or_default(),
            delivery_address: self.delivery_address.unwrap_or_default(),
            delivery_city: self.delivery_city.unwrap_or_else(|| DEFAULT_CITY.to_string()),
            order_description: self.order_description,
            created_by: self
                .created_by
                .unwrap_or_else(|| DEFAULT_CREATED_BY.to_string()),
        }
    }
}

/// Full-view write projection shared by replace (PUT) and partial update
/// (PATCH). Read-only fields (order_number, timestamps, derived flags) are
/// not represented and silently ignored if sent.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct OrderWriteRequest {
    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    pub customer_name: Option<String>,

    #[validate(email(message = "Enter a valid email address."))]
    pub customer_email: Option<String>,

    #[validate(custom = "order::validate_phone_number")]
    pub phone_number: Option<String>,

    pub delivery_address: Option<String>,

    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub delivery_city: Option<String>,

    #[validate(length(max = 10, message = "Ensure this field has no more than 10 characters."))]
    pub delivery_postal_code: Option<String>,

    pub order_description: Option<String>,

    #[validate(custom = "order::validate_order_status")]
    pub order_status: Option<String>,

    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    pub assigned_driver: Option<String>,

    pub driver_notes: Option<String>,

    pub pickup_time: Option<DateTime<Utc>>,
    pub delivery_time: Option<DateTime<Utc>>,

    #[validate(custom = "order::validate_coordinate")]
    pub current_latitude: Option<Decimal>,

    #[validate(custom = "order::validate_coordinate")]
    pub current_longitude: Option<Decimal>,

    #[validate(url(message = "Enter a valid URL."))]
    pub delivery_photo_url: Option<String>,

    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    pub created_by: Option<String>,
}

impl OrderWriteRequest {
    fn validate_payload(&self, partial: bool) -> Result<(), ServiceError> {
        let mut errors = FieldErrors::new();
        if !partial {
            require(&mut errors, "customer_name", &self.customer_name);
            require(&mut errors, "phone_number", &self.phone_number);
            require(&mut errors, "delivery_address", &self.delivery_address);
        }
        if let Err(failures) = self.validate() {
            errors.extend(failures.into());
        }
        errors.into_result()
    }

    fn into_changes(self, partial: bool) -> OrderChanges {
        let mut changes = OrderChanges {
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            phone_number: self.phone_number,
            delivery_address: self.delivery_address,
            delivery_city: self.delivery_city,
            delivery_postal_code: self.delivery_postal_code,
            order_description: self.order_description,
            order_status: self.order_status,
            assigned_driver: self.assigned_driver,
            driver_notes: self.driver_notes,
            pickup_time: self.pickup_time,
            delivery_time: self.delivery_time,
            current_latitude: self.current_latitude,
            current_longitude: self.current_longitude,
            delivery_photo_url: self.delivery_photo_url,
            created_by: self.created_by,
        };
        if !partial {
            // A full replace resets defaulted fields the caller omitted.
            changes
                .delivery_city
                .get_or_insert_with(|| DEFAULT_CITY.to_string());
            changes
                .order_status
                .get_or_insert_with(|| OrderStatus::Pending.to_string());
            changes
                .created_by
                .get_or_insert_with(|| DEFAULT_CREATED_BY.to_string());
        }
        changes
    }
}

/// Status-update projection: the slice drivers send from the field app.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[validate(custom = "order::validate_order_status")]
    pub order_status: Option<String>,

    pub driver_notes: Option<String>,

    #[validate(custom = "order::validate_coordinate")]
    pub current_latitude: Option<Decimal>,

    #[validate(custom = "order::validate_coordinate")]
    pub current_longitude: Option<Decimal>,

    #[validate(url(message = "Enter a valid URL."))]
    pub delivery_photo_url: Option<String>,

    pub pickup_time: Option<DateTime<Utc>>,
    pub delivery_time: Option<DateTime<Utc>>,
}

impl UpdateStatusRequest {
    /// Field rules plus the one cross-field rule this projection owns:
    /// marking an order DELIVERED requires a delivery time, either in the
    /// same payload or already stored on the record.
    fn validate_against(&self, existing: &order::Model) -> Result<(), ServiceError> {
        let mut errors = FieldErrors::new();
        if let Err(failures) = self.validate() {
            errors.extend(failures.into());
        }

        let marking_delivered =
            self.order_status.as_deref() == Some(OrderStatus::Delivered.as_ref());
        if marking_delivered && self.delivery_time.is_none() && existing.delivery_time.is_none() {
            errors.add(
                "delivery_time",
                "Delivery time is required when marking order as delivered",
            );
        }

        errors.into_result()
    }

    fn into_changes(self) -> OrderChanges {
        OrderChanges {
            order_status: self.order_status,
            driver_notes: self.driver_notes,
            current_latitude: self.current_latitude,
            current_longitude: self.current_longitude,
            delivery_photo_url: self.delivery_photo_url,
            pickup_time: self.pickup_time,
            delivery_time: self.delivery_time,
            ..OrderChanges::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Query parameters and response envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub driver: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DriverParams {
    pub driver: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusParams {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub count: usize,
    pub results: Vec<OrderSummary>,
}

#[derive(Debug, Serialize)]
pub struct DriverOrdersResponse {
    pub driver: String,
    pub count: usize,
    pub orders: Vec<OrderResponse>,
}

#[derive(Debug, Serialize)]
pub struct StatusOrdersResponse {
    pub status: String,
    pub count: usize,
    pub orders: Vec<OrderResponse>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub count: usize,
    pub results: Vec<OrderResponse>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// List all orders with optional status/driver/city filtering
/// GET /api/orders/
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ServiceError> {
    let filters = OrderFilters {
        status: params.status,
        driver: params.driver,
        city: params.city,
    };
    let orders = state.orders.list_orders(&filters).await?;
    Ok(Json(ListResponse {
        count: orders.len(),
        results: orders.iter().map(OrderSummary::from).collect(),
    }))
}

/// Create a new order
/// POST /api/orders/
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ServiceError> {
    request.validate_payload()?;
    let created = state.orders.create_order(request.into_new_order()).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&created))))
}

/// Get a single order by ID
/// GET /api/orders/{id}/
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ServiceError> {
    let id = parse_order_id(&id)?;
    let model = state
        .orders
        .get_order(id)
        .await?
        .ok_or_else(order_not_found)?;
    Ok(Json(OrderResponse::from(&model)))
}

/// Replace an order (PUT): full-view validation over the complete payload
/// PUT /api/orders/{id}/
pub async fn replace_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<OrderWriteRequest>,
) -> Result<Json<OrderResponse>, ServiceError> {
    let id = parse_order_id(&id)?;
    // Unknown id wins over an invalid body, matching retrieve semantics.
    state
        .orders
        .get_order(id)
        .await?
        .ok_or_else(order_not_found)?;
    request.validate_payload(false)?;
    let updated = state.orders.update_order(id, request.into_changes(false)).await?;
    Ok(Json(OrderResponse::from(&updated)))
}

/// Partially update an order (PATCH): only supplied fields are touched
/// PATCH /api/orders/{id}/
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<OrderWriteRequest>,
) -> Result<Json<OrderResponse>, ServiceError> {
    let id = parse_order_id(&id)?;
    state
        .orders
        .get_order(id)
        .await?
        .ok_or_else(order_not_found)?;
    request.validate_payload(true)?;
    let updated = state.orders.update_order(id, request.into_changes(true)).await?;
    Ok(Json(OrderResponse::from(&updated)))
}

/// Quick status update for drivers, re-serialized through the full view
/// PATCH /api/orders/{id}/update_status/
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ServiceError> {
    let id = parse_order_id(&id)?;
    let existing = state
        .orders
        .get_order(id)
        .await?
        .ok_or_else(order_not_found)?;
    request.validate_against(&existing)?;
    let updated = state.orders.update_order(id, request.into_changes()).await?;
    Ok(Json(OrderResponse::from(&updated)))
}

/// Delete an order
/// DELETE /api/orders/{id}/
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_order_id(&id)?;
    state.orders.delete_order(id).await?;
    // The 204 body is non-standard but part of the public contract.
    Ok((
        StatusCode::NO_CONTENT,
        Json(json!({ "message": "Order deleted successfully" })),
    ))
}

/// Orders assigned to a specific driver (case-insensitive substring)
/// GET /api/orders/by_driver/?driver=John
pub async fn orders_by_driver(
    State(state): State<AppState>,
    Query(params): Query<DriverParams>,
) -> Result<Json<DriverOrdersResponse>, ServiceError> {
    let driver = params
        .driver
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ServiceError::MissingParameter("Driver parameter is required".to_string())
        })?;

    let orders = state.orders.find_by_driver(&driver).await?;
    Ok(Json(DriverOrdersResponse {
        count: orders.len(),
        orders: orders.iter().map(OrderResponse::from).collect(),
        driver,
    }))
}

/// Orders in a given status (exact match after upper-casing)
/// GET /api/orders/by_status/?status=PENDING
pub async fn orders_by_status(
    State(state): State<AppState>,
    Query(params): Query<StatusParams>,
) -> Result<Json<StatusOrdersResponse>, ServiceError> {
    let status = params
        .status
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ServiceError::MissingParameter("Status parameter is required".to_string())
        })?;

    let orders = state.orders.find_by_status(&status).await?;
    Ok(Json(StatusOrdersResponse {
        status: status.to_uppercase(),
        count: orders.len(),
        orders: orders.iter().map(OrderResponse::from).collect(),
    }))
}

/// Search across customer name, order number, address, and phone number
/// GET /api/orders/search/?q=term
pub async fn search_orders(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ServiceError> {
    let query = params.q.filter(|value| !value.is_empty()).ok_or_else(|| {
        ServiceError::MissingParameter("Search query parameter (q) is required".to_string())
    })?;

    let orders = state.orders.search(&query).await?;
    Ok(Json(SearchResponse {
        count: orders.len(),
        results: orders.iter().map(OrderResponse::from).collect(),
        query,
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Item ids arrive as path strings; anything non-numeric resolves to the
/// same 404 an unknown numeric id would.
fn parse_order_id(raw: &str) -> Result<i64, ServiceError> {
    raw.parse::<i64>().map_err(|_| order_not_found())
}

fn order_not_found() -> ServiceError {
    ServiceError::NotFound("Order not found".to_string())
}

fn require(errors: &mut FieldErrors, field: &str, value: &Option<String>) {
    match value.as_deref() {
        None => errors.add(field, REQUIRED_MESSAGE),
        Some(present) if present.trim().is_empty() => errors.add(field, BLANK_MESSAGE),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stored_order(delivery_time: Option<DateTime<Utc>>) -> order::Model {
        order::Model {
            id: 7,
            order_number: "ORD-0A1B2C3D".into(),
            customer_name: "Ana Cruz".into(),
            customer_email: None,
            phone_number: "+639171234567".into(),
            delivery_address: "123 Rizal St".into(),
            delivery_city: DEFAULT_CITY.into(),
            delivery_postal_code: None,
            order_description: None,
            order_status: "IN_TRANSIT".into(),
            assigned_driver: Some("John Smith".into()),
            driver_notes: None,
            pickup_time: None,
            delivery_time,
            current_latitude: None,
            current_longitude: None,
            delivery_photo_url: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 3, 2, 9, 15, 0).unwrap(),
            created_by: "ops".into(),
        }
    }

    #[test]
    fn full_view_formats_audit_timestamps() {
        let response = OrderResponse::from(&stored_order(None));
        assert_eq!(response.created_at, "2024-03-01 08:30:00");
        assert_eq!(response.updated_at, "2024-03-02 09:15:00");
        assert!(!response.is_delivered);
        assert!(response.has_driver);
    }

    #[test]
    fn create_payload_requires_core_fields() {
        let request = CreateOrderRequest {
            customer_name: None,
            phone_number: None,
            delivery_address: Some("  ".into()),
            delivery_city: None,
            order_description: None,
            created_by: None,
        };
        let error = request.validate_payload().unwrap_err();
        match error {
            ServiceError::Validation(fields) => {
                assert!(fields.contains("customer_name"));
                assert!(fields.contains("phone_number"));
                assert!(fields.contains("delivery_address"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_payload_applies_defaults() {
        let request = CreateOrderRequest {
            customer_name: Some("Ana Cruz".into()),
            phone_number: Some("+639171234567".into()),
            delivery_address: Some("123 Rizal St".into()),
            delivery_city: None,
            order_description: None,
            created_by: None,
        };
        assert!(request.validate_payload().is_ok());
        let new_order = request.into_new_order();
        assert_eq!(new_order.delivery_city, "Manila");
        assert_eq!(new_order.created_by, "System");
    }

    #[test]
    fn replace_resets_defaulted_fields_patch_does_not() {
        let request = OrderWriteRequest {
            customer_name: Some("Ana Cruz".into()),
            phone_number: Some("+639171234567".into()),
            delivery_address: Some("123 Rizal St".into()),
            ..OrderWriteRequest::default()
        };
        let replace = OrderWriteRequest {
            customer_name: request.customer_name.clone(),
            phone_number: request.phone_number.clone(),
            delivery_address: request.delivery_address.clone(),
            ..OrderWriteRequest::default()
        }
        .into_changes(false);
        assert_eq!(replace.delivery_city.as_deref(), Some("Manila"));
        assert_eq!(replace.order_status.as_deref(), Some("PENDING"));
        assert_eq!(replace.created_by.as_deref(), Some("System"));

        let partial = request.into_changes(true);
        assert!(partial.delivery_city.is_none());
        assert!(partial.order_status.is_none());
        assert!(partial.created_by.is_none());
    }

    #[test]
    fn delivered_without_time_anywhere_is_rejected() {
        let request = UpdateStatusRequest {
            order_status: Some("DELIVERED".into()),
            driver_notes: None,
            current_latitude: None,
            current_longitude: None,
            delivery_photo_url: None,
            pickup_time: None,
            delivery_time: None,
        };
        let error = request.validate_against(&stored_order(None)).unwrap_err();
        match error {
            ServiceError::Validation(fields) => assert!(fields.contains("delivery_time")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn delivered_with_stored_time_passes() {
        let request = UpdateStatusRequest {
            order_status: Some("DELIVERED".into()),
            driver_notes: None,
            current_latitude: None,
            current_longitude: None,
            delivery_photo_url: None,
            pickup_time: None,
            delivery_time: None,
        };
        let stored = stored_order(Some(Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap()));
        assert!(request.validate_against(&stored).is_ok());
    }

    #[test]
    fn non_numeric_id_is_not_found() {
        assert!(matches!(
            parse_order_id("abc"),
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(parse_order_id("42").unwrap(), 42);
    }
}
