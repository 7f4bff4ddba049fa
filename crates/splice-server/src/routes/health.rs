// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Health check HTTP handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::AppState;

/// Health check response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
	/// `healthy` when every component check passed.
	pub status: String,
	/// Result of the database connectivity check.
	pub database: String,
	/// Server version.
	pub version: String,
	/// When the check ran (RFC 3339).
	pub timestamp: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System is healthy", body = HealthResponse),
        (status = 503, description = "System is unhealthy", body = HealthResponse)
    ),
    tag = "health"
)]
/// GET /health - Liveness and database connectivity check.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let database_ok = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();

	let response = HealthResponse {
		status: if database_ok { "healthy" } else { "unhealthy" }.to_string(),
		database: if database_ok { "ok" } else { "error" }.to_string(),
		version: env!("CARGO_PKG_VERSION").to_string(),
		timestamp: chrono::Utc::now().to_rfc3339(),
	};

	let http_status = if database_ok {
		StatusCode::OK
	} else {
		StatusCode::SERVICE_UNAVAILABLE
	};

	(http_status, Json(response))
}
