//! HTTP API Layer
//!
//! This crate provides the REST API for the billing system using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for bills, returns and credit
//! - **Middleware**: Authentication, authorization, tracing, audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(engine, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;
pub mod seed;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use domain_billing::BillingEngine;

use crate::config::ApiConfig;
use crate::handlers::{billing, health};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: BillingEngine,
    pub config: ApiConfig,
}

/// Creates the main API router
///
/// # Arguments
///
/// * `engine` - Billing engine wired to the configured store
/// * `config` - API configuration
pub fn create_router(engine: BillingEngine, config: ApiConfig) -> Router {
    let state = AppState { engine, config };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let billing_routes = Router::new()
        .route("/", post(billing::create_bill).get(billing::list_bills))
        .route("/return-bill", post(billing::process_return))
        .route("/credit-bill", post(billing::create_credit_payment))
        .route("/credits/summary", get(billing::credit_summary))
        .route("/credits/customers", get(billing::customers_with_credit))
        .route("/customer/:contact", get(billing::bills_for_customer))
        // GET takes a bill number, DELETE a bill id
        .route("/:key", get(billing::get_bill).delete(billing::delete_bill))
        .route("/:key/returns", get(billing::return_history));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/billing", billing_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
