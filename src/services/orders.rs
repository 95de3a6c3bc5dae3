use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{info, instrument};

use crate::db::DbPool;
use crate::entities::order::{
    self, generate_order_number, ActiveModel as OrderActiveModel, Entity as OrderEntity,
    Model as OrderModel, OrderStatus,
};
use crate::errors::ServiceError;

/// Resolved field values for a new order; projection defaults are already
/// applied by the time this struct is built.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub phone_number: String,
    pub delivery_address: String,
    pub delivery_city: String,
    pub order_description: Option<String>,
    pub created_by: String,
}

/// Field-level changes to apply to an existing order. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct OrderChanges {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub phone_number: Option<String>,
    pub delivery_address: Option<String>,
    pub delivery_city: Option<String>,
    pub delivery_postal_code: Option<String>,
    pub order_description: Option<String>,
    pub order_status: Option<String>,
    pub assigned_driver: Option<String>,
    pub driver_notes: Option<String>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub delivery_time: Option<DateTime<Utc>>,
    pub current_latitude: Option<Decimal>,
    pub current_longitude: Option<Decimal>,
    pub delivery_photo_url: Option<String>,
    pub created_by: Option<String>,
}

/// Optional narrowing of the list operation; provided filters combine
/// conjunctively.
#[derive(Debug, Clone, Default)]
pub struct OrderFilters {
    pub status: Option<String>,
    pub driver: Option<String>,
    pub city: Option<String>,
}

/// Service for managing delivery orders against the persistence store.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Creates a new order with a freshly generated order number and
    /// status PENDING.
    #[instrument(skip(self, data), fields(customer_name = %data.customer_name))]
    pub async fn create_order(&self, data: NewOrder) -> Result<OrderModel, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let model = OrderActiveModel {
            order_number: Set(generate_order_number()),
            customer_name: Set(data.customer_name),
            phone_number: Set(data.phone_number),
            delivery_address: Set(data.delivery_address),
            delivery_city: Set(data.delivery_city),
            order_description: Set(data.order_description),
            order_status: Set(OrderStatus::Pending.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(data.created_by),
            customer_email: Set(None),
            delivery_postal_code: Set(None),
            assigned_driver: Set(None),
            driver_notes: Set(None),
            pickup_time: Set(None),
            delivery_time: Set(None),
            current_latitude: Set(None),
            current_longitude: Set(None),
            delivery_photo_url: Set(None),
            ..Default::default()
        };

        let created = model.insert(db).await?;
        info!(
            order_id = created.id,
            order_number = %created.order_number,
            "order created"
        );
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, id: i64) -> Result<Option<OrderModel>, ServiceError> {
        let db = &*self.db_pool;
        Ok(OrderEntity::find_by_id(id).one(db).await?)
    }

    /// Lists orders newest-first, narrowed by any provided filters.
    #[instrument(skip(self, filters))]
    pub async fn list_orders(&self, filters: &OrderFilters) -> Result<Vec<OrderModel>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = OrderEntity::find().order_by_desc(order::Column::CreatedAt);
        if let Some(status) = filters.status.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(order::Column::OrderStatus.eq(status.to_uppercase()));
        }
        if let Some(driver) = filters.driver.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(contains_ci(order::Column::AssignedDriver, driver));
        }
        if let Some(city) = filters.city.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(contains_ci(order::Column::DeliveryCity, city));
        }

        Ok(query.all(db).await?)
    }

    /// Applies the given changes to an order and refreshes its updated_at.
    #[instrument(skip(self, changes))]
    pub async fn update_order(
        &self,
        id: i64,
        changes: OrderChanges,
    ) -> Result<OrderModel, ServiceError> {
        let db = &*self.db_pool;

        let existing = OrderEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let mut active: OrderActiveModel = existing.into();
        if let Some(value) = changes.customer_name {
            active.customer_name = Set(value);
        }
        if let Some(value) = changes.customer_email {
            active.customer_email = Set(Some(value));
        }
        if let Some(value) = changes.phone_number {
            active.phone_number = Set(value);
        }
        if let Some(value) = changes.delivery_address {
            active.delivery_address = Set(value);
        }
        if let Some(value) = changes.delivery_city {
            active.delivery_city = Set(value);
        }
        if let Some(value) = changes.delivery_postal_code {
            active.delivery_postal_code = Set(Some(value));
        }
        if let Some(value) = changes.order_description {
            active.order_description = Set(Some(value));
        }
        if let Some(value) = changes.order_status {
            active.order_status = Set(value);
        }
        if let Some(value) = changes.assigned_driver {
            active.assigned_driver = Set(Some(value));
        }
        if let Some(value) = changes.driver_notes {
            active.driver_notes = Set(Some(value));
        }
        if let Some(value) = changes.pickup_time {
            active.pickup_time = Set(Some(value));
        }
        if let Some(value) = changes.delivery_time {
            active.delivery_time = Set(Some(value));
        }
        if let Some(value) = changes.current_latitude {
            active.current_latitude = Set(Some(value));
        }
        if let Some(value) = changes.current_longitude {
            active.current_longitude = Set(Some(value));
        }
        if let Some(value) = changes.delivery_photo_url {
            active.delivery_photo_url = Set(Some(value));
        }
        if let Some(value) = changes.created_by {
            active.created_by = Set(value);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        info!(order_id = updated.id, "order updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: i64) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let result = OrderEntity::delete_by_id(id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Order not found".to_string()));
        }
        info!(order_id = id, "order deleted");
        Ok(())
    }

    /// Orders whose assigned driver contains the given name fragment.
    #[instrument(skip(self))]
    pub async fn find_by_driver(&self, driver: &str) -> Result<Vec<OrderModel>, ServiceError> {
        let db = &*self.db_pool;
        Ok(OrderEntity::find()
            .filter(contains_ci(order::Column::AssignedDriver, driver))
            .order_by_desc(order::Column::CreatedAt)
            .all(db)
            .await?)
    }

    /// Orders in exactly the given status (upper-cased before matching).
    #[instrument(skip(self))]
    pub async fn find_by_status(&self, status: &str) -> Result<Vec<OrderModel>, ServiceError> {
        let db = &*self.db_pool;
        Ok(OrderEntity::find()
            .filter(order::Column::OrderStatus.eq(status.to_uppercase()))
            .order_by_desc(order::Column::CreatedAt)
            .all(db)
            .await?)
    }

    /// Substring search across customer name, order number, address, and
    /// phone number.
    #[instrument(skip(self))]
    pub async fn search(&self, term: &str) -> Result<Vec<OrderModel>, ServiceError> {
        let db = &*self.db_pool;

        let matches = Condition::any()
            .add(contains_ci(order::Column::CustomerName, term))
            .add(contains_ci(order::Column::OrderNumber, term))
            .add(contains_ci(order::Column::DeliveryAddress, term))
            .add(contains_ci(order::Column::PhoneNumber, term));

        Ok(OrderEntity::find()
            .filter(matches)
            .order_by_desc(order::Column::CreatedAt)
            .all(db)
            .await?)
    }
}

/// Case-insensitive substring match on a column.
fn contains_ci(column: order::Column, needle: &str) -> SimpleExpr {
    let pattern = format!("%{}%", needle.to_lowercase());
    Expr::expr(Func::lower(Expr::col((OrderEntity, column)))).like(pattern)
}
