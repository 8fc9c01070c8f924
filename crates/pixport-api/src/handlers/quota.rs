//! Quota status handler.

use std::sync::Arc;

use axum::{extract::State, Json};
use pixport_core::models::QuotaStatusResponse;

use crate::error::ErrorResponse;
use crate::state::AppState;
use crate::utils::client_ip::ClientIp;

/// Report the caller's remaining daily upload quota.
#[utoipa::path(
    get,
    path = "/api/v0/quota",
    tag = "quota",
    responses(
        (status = 200, description = "Current quota state", body = QuotaStatusResponse),
        (status = 401, description = "Missing or invalid gallery password", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "quota_status"))]
pub async fn quota_status(
    State(state): State<Arc<AppState>>,
    ClientIp(client_ip): ClientIp,
) -> Json<QuotaStatusResponse> {
    let snapshot = state.quota.peek(&client_ip);
    Json(QuotaStatusResponse {
        remaining: snapshot.remaining,
        reset_time: snapshot.reset_at,
        limit: state.quota.daily_limit(),
    })
}
