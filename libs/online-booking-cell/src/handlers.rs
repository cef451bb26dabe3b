// libs/online-booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{ApprovePaymentRequest, DialogEvent, OpenSessionRequest};
use crate::services::registry::DialogRegistry;

// ==============================================================================
// SESSION LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn open_session(
    State(registry): State<Arc<DialogRegistry>>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if request.doctor_slug.trim().is_empty() {
        return Err(AppError::BadRequest("doctor_slug is required".to_string()));
    }

    let (session_id, snapshot) = registry.open_session(request.into_profile()).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "session_id": session_id,
            "snapshot": snapshot
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_session(
    State(registry): State<Arc<DialogRegistry>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let dialog = registry.get(session_id).await?;
    Ok(Json(json!(dialog.snapshot().await)))
}

#[axum::debug_handler]
pub async fn reopen_session(
    State(registry): State<Arc<DialogRegistry>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let dialog = registry.get(session_id).await?;
    Ok(Json(json!(dialog.open().await)))
}

#[axum::debug_handler]
pub async fn close_session(
    State(registry): State<Arc<DialogRegistry>>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    registry.remove(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// CONVERSATION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn submit_event(
    State(registry): State<Arc<DialogRegistry>>,
    Path(session_id): Path<Uuid>,
    Json(event): Json<DialogEvent>,
) -> Result<Json<Value>, AppError> {
    let dialog = registry.get(session_id).await?;
    let snapshot = dialog.handle(event).await?;
    Ok(Json(json!(snapshot)))
}

#[axum::debug_handler]
pub async fn confirm_booking(
    State(registry): State<Arc<DialogRegistry>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let dialog = registry.get(session_id).await?;
    let snapshot = dialog.confirm().await?;
    Ok(Json(json!(snapshot)))
}

// ==============================================================================
// PAYMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_payment_order(
    State(registry): State<Arc<DialogRegistry>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let dialog = registry.get(session_id).await?;
    let order_id = dialog.create_payment_order().await?;
    Ok(Json(json!({ "order_id": order_id })))
}

#[axum::debug_handler]
pub async fn approve_payment(
    State(registry): State<Arc<DialogRegistry>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ApprovePaymentRequest>,
) -> Result<Json<Value>, AppError> {
    if request.order_id.trim().is_empty() {
        return Err(AppError::BadRequest("order_id is required".to_string()));
    }

    let dialog = registry.get(session_id).await?;
    let snapshot = dialog.approve_payment(&request.order_id).await?;
    Ok(Json(json!(snapshot)))
}
