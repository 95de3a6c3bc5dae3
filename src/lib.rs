//! Logistics API Library
//!
//! Backend for the delivery-order tracking service: one Order resource
//! exposed over HTTP as JSON, consumed by the driver mobile app and the
//! office-manager web app.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod services;

use std::sync::Arc;

use axum::routing::{get, patch};
use axum::Router;
use sea_orm::DatabaseConnection;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub orders: services::orders::OrderService,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let orders = services::orders::OrderService::new(db.clone());
        Self { db, config, orders }
    }
}

/// Order resource routes, mounted under `/api`. Trailing slashes are part
/// of the public contract.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/orders/",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/orders/by_driver/", get(handlers::orders::orders_by_driver))
        .route("/orders/by_status/", get(handlers::orders::orders_by_status))
        .route("/orders/search/", get(handlers::orders::search_orders))
        .route(
            "/orders/:id/",
            get(handlers::orders::get_order)
                .put(handlers::orders::replace_order)
                .patch(handlers::orders::update_order)
                .delete(handlers::orders::delete_order),
        )
        .route(
            "/orders/:id/update_status/",
            patch(handlers::orders::update_order_status),
        )
}

/// Full application router: banner, health probe, and the `/api` surface.
pub fn app_router() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { "logistics-api up" }))
        .route("/health", get(handlers::health::health_check))
        .nest("/api", api_routes())
}
