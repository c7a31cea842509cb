//! Billing handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use core_kernel::{BillId, Page};
use domain_billing::CreditSummary;

use crate::auth::{permissions, require, Claims};
use crate::dto::billing::*;
use crate::{error::ApiError, AppState};

/// Records a sale
#[instrument(skip(state, claims, request), fields(user = %claims.sub))]
pub async fn create_bill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateBillDto>,
) -> Result<(StatusCode, Json<BillResponse>), ApiError> {
    require(&claims, permissions::BILL_WRITE)?;
    let view = state.engine.create_bill(request.into()).await?;
    Ok((StatusCode::CREATED, Json(view.into())))
}

/// Lists bills, newest first, with optional free-text search
pub async fn list_bills(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListBillsParams>,
) -> Result<Json<Page<BillResponse>>, ApiError> {
    require(&claims, permissions::BILL_READ)?;
    params.validate()?;
    let page = state.engine.list_bills(params.query()).await?;
    Ok(Json(page.map(BillResponse::from)))
}

pub async fn get_bill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(bill_number): Path<String>,
) -> Result<Json<BillResponse>, ApiError> {
    require(&claims, permissions::BILL_READ)?;
    let view = state.engine.get_bill(&bill_number).await?;
    Ok(Json(view.into()))
}

/// Credit notes raised against a sale, oldest first
pub async fn return_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(bill_number): Path<String>,
) -> Result<Json<Vec<BillResponse>>, ApiError> {
    require(&claims, permissions::BILL_READ)?;
    let views = state.engine.return_history(&bill_number).await?;
    Ok(Json(views.into_iter().map(BillResponse::from).collect()))
}

#[instrument(skip(state, claims, request), fields(user = %claims.sub, bill_number = %request.original_bill_number))]
pub async fn process_return(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<ReturnBillDto>,
) -> Result<(StatusCode, Json<BillResponse>), ApiError> {
    require(&claims, permissions::BILL_RETURN)?;
    request.validate()?;
    let view = state.engine.process_return(request.into()).await?;
    Ok((StatusCode::CREATED, Json(view.into())))
}

#[instrument(skip(state, claims, request), fields(user = %claims.sub))]
pub async fn create_credit_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreditPaymentDto>,
) -> Result<(StatusCode, Json<BillResponse>), ApiError> {
    require(&claims, permissions::CREDIT_WRITE)?;
    let view = state.engine.create_credit_payment(request.into()).await?;
    Ok((StatusCode::CREATED, Json(view.into())))
}

/// Bills of the customer with the given contact
pub async fn bills_for_customer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(contact): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<BillResponse>>, ApiError> {
    require(&claims, permissions::BILL_READ)?;
    params.validate()?;
    let page = state
        .engine
        .bills_for_customer_contact(&contact, params.page_request())
        .await?;
    Ok(Json(page.map(BillResponse::from)))
}

/// Removes a bill record; stock and credit are left untouched
#[instrument(skip(state, claims), fields(user = %claims.sub))]
pub async fn delete_bill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require(&claims, permissions::BILL_DELETE)?;
    state.engine.delete_bill(BillId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn credit_summary(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<CreditSummary>, ApiError> {
    require(&claims, permissions::CREDIT_READ)?;
    Ok(Json(state.engine.credit_summary().await?))
}

/// Customers with an outstanding balance, largest first
pub async fn customers_with_credit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<CreditCustomerResponse>>, ApiError> {
    require(&claims, permissions::CREDIT_READ)?;
    params.validate()?;
    let page = state.engine.customers_with_credit(params.page_request()).await?;
    Ok(Json(page.map(CreditCustomerResponse::from)))
}
