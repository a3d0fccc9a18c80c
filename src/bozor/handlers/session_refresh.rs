use crate::{bozor::error::ApiError, session::SessionIssuer};
use axum::{extract::Extension, http::StatusCode, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Refresh {
    refresh_token: Option<String>,
}

#[utoipa::path(
    post,
    path = "/refresh",
    request_body = Refresh,
    responses(
        (status = 201, description = "New access token", content_type = "application/json"),
        (status = 400, description = "Refresh token missing", body = String),
        (status = 401, description = "Invalid or expired refresh token", body = String),
    ),
    tag = "users"
)]
#[instrument(skip(sessions, payload))]
pub async fn refresh(
    Extension(sessions): Extension<Arc<SessionIssuer>>,
    payload: Option<Json<Refresh>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let refresh_token = payload
        .and_then(|Json(payload)| payload.refresh_token)
        .ok_or_else(|| ApiError::Validation("Refresh token is required".to_string()))?;

    // the refresh token is not rotated: no revocation state exists
    let access_token = sessions.refresh(&refresh_token)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "accessToken": access_token })),
    ))
}
