use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use opsdesk_core::domain::order::{OrderId, ProcurementOrder, RegionId, StoreId};
use opsdesk_core::domain::step::EvidencePatch;
use opsdesk_core::errors::WorkflowError;
use opsdesk_core::gate::AuditorContext;
use opsdesk_core::service::{CreateOrderRequest, ProcurementService};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ProcurementService>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub store_id: Option<String>,
    pub region_id: Option<String>,
}

/// Caller identity attached to a gate decision.
#[derive(Clone, Debug, Deserialize)]
pub struct AuditDecisionBody {
    pub user_id: String,
    pub role: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RejectBody {
    pub user_id: String,
    pub role: String,
    pub reason: String,
}

type OrderResponse = Result<Json<ProcurementOrder>, (StatusCode, Json<ApiError>)>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/orders", post(create_order).get(list_orders))
        .route("/api/orders/{id}", get(get_order))
        .route("/api/orders/{id}/start", post(start_processing))
        .route("/api/orders/{id}/steps/{step}/evidence", post(record_evidence))
        .route("/api/orders/{id}/advance", post(advance_step))
        .route("/api/orders/{id}/audits/inbound", post(submit_inbound_audit))
        .route("/api/orders/{id}/audits/outbound", post(submit_outbound_audit))
        .route("/api/orders/{id}/approve", post(approve))
        .route("/api/orders/{id}/reject", post(reject))
        .with_state(state)
}

fn error_response(error: WorkflowError) -> (StatusCode, Json<ApiError>) {
    let (status, code) = match &error {
        WorkflowError::InvalidOrder(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_order"),
        WorkflowError::StepIncomplete { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "step_incomplete")
        }
        WorkflowError::InvalidEvidence { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "invalid_evidence")
        }
        WorkflowError::MissingReason => (StatusCode::UNPROCESSABLE_ENTITY, "missing_reason"),
        WorkflowError::UnknownOrder(_) => (StatusCode::NOT_FOUND, "unknown_order"),
        WorkflowError::Unauthorized { .. } => (StatusCode::FORBIDDEN, "unauthorized"),
        WorkflowError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
        WorkflowError::NotPendingAudit(_) => (StatusCode::CONFLICT, "not_pending_audit"),
        WorkflowError::MaterializationFailed(_) => {
            (StatusCode::BAD_GATEWAY, "materialization_failed")
        }
        WorkflowError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "repository"),
    };
    (status, Json(ApiError { error: error.to_string(), code }))
}

async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ProcurementOrder>), (StatusCode, Json<ApiError>)> {
    let order = state.service.create(request).await.map_err(error_response)?;
    info!(
        event_name = "api.order.created",
        correlation_id = %order.id,
        store_id = %order.store.store_id.0,
        "order created"
    );
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order(State(state): State<AppState>, Path(id): Path<String>) -> OrderResponse {
    let order = state.service.get(&OrderId(id)).await.map_err(error_response)?;
    Ok(Json(order))
}

async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ProcurementOrder>>, (StatusCode, Json<ApiError>)> {
    let orders = match (query.store_id, query.region_id) {
        (Some(store_id), _) => state
            .service
            .list_by_store(&StoreId(store_id))
            .await
            .map_err(error_response)?,
        (None, Some(region_id)) => state
            .service
            .list_by_region(&RegionId(region_id))
            .await
            .map_err(error_response)?,
        (None, None) => {
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiError {
                    error: "either store_id or region_id must be given".to_string(),
                    code: "missing_filter",
                }),
            ));
        }
    };
    Ok(Json(orders))
}

async fn start_processing(State(state): State<AppState>, Path(id): Path<String>) -> OrderResponse {
    let order = state.service.start_processing(&OrderId(id)).await.map_err(error_response)?;
    log_transition(&order, "start");
    Ok(Json(order))
}

async fn advance_step(State(state): State<AppState>, Path(id): Path<String>) -> OrderResponse {
    let order = state.service.advance_step(&OrderId(id)).await.map_err(error_response)?;
    log_transition(&order, "advance");
    Ok(Json(order))
}

async fn record_evidence(
    State(state): State<AppState>,
    Path((id, step)): Path<(String, u8)>,
    Json(patch): Json<EvidencePatch>,
) -> OrderResponse {
    let order = state
        .service
        .record_evidence(&OrderId(id), step, patch)
        .await
        .map_err(error_response)?;
    Ok(Json(order))
}

async fn submit_inbound_audit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> OrderResponse {
    let order = state.service.submit_inbound_audit(&OrderId(id)).await.map_err(error_response)?;
    log_transition(&order, "submit_inbound");
    Ok(Json(order))
}

async fn submit_outbound_audit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> OrderResponse {
    let order = state.service.submit_outbound_audit(&OrderId(id)).await.map_err(error_response)?;
    log_transition(&order, "submit_outbound");
    Ok(Json(order))
}

async fn approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AuditDecisionBody>,
) -> OrderResponse {
    let auditor = AuditorContext { user_id: body.user_id, role: body.role };
    let order = state.service.approve(&OrderId(id), &auditor).await.map_err(error_response)?;
    log_transition(&order, "approve");
    Ok(Json(order))
}

async fn reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RejectBody>,
) -> OrderResponse {
    let auditor = AuditorContext { user_id: body.user_id, role: body.role };
    let order = state
        .service
        .reject(&OrderId(id), &auditor, &body.reason)
        .await
        .map_err(error_response)?;
    log_transition(&order, "reject");
    Ok(Json(order))
}

fn log_transition(order: &ProcurementOrder, command: &str) {
    info!(
        event_name = "api.order.transitioned",
        correlation_id = %order.id,
        command,
        status = order.status.as_str(),
        current_step = order.current_step,
        "order state changed"
    );
}
