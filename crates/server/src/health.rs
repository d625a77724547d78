use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::routes::AppState;
use opsdesk_core::domain::order::StoreId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub repository: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let repository = repository_check(&state).await;
    let ready = repository.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "opsdesk-server runtime initialized".to_string(),
        },
        repository,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn repository_check(state: &AppState) -> HealthCheck {
    // A listing against a reserved store id exercises the full repository
    // path without touching real data.
    match state.service.list_by_store(&StoreId("health-probe".to_string())).await {
        Ok(_) => HealthCheck {
            status: "ready",
            detail: "repository query succeeded".to_string(),
        },
        Err(error) => HealthCheck { status: "unavailable", detail: error.to_string() },
    }
}
