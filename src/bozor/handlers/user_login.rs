use crate::{
    bozor::error::ApiError,
    session::{SessionIssuer, Subject},
    store::UserRepo,
};
use anyhow::Context;
use axum::{
    extract::rejection::QueryRejection,
    extract::{Extension, Query},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};

#[derive(ToSchema, IntoParams, Deserialize, Debug)]
#[into_params(parameter_in = Query)]
pub struct Login {
    email: String,
    password: String,
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = Login,
    params(Login),
    responses(
        (status = 200, description = "Access and refresh tokens with the user record", content_type = "application/json"),
        (status = 400, description = "Wrong password or missing credentials", body = String),
        (status = 404, description = "User not found", body = String),
    ),
    tag = "users"
)]
#[instrument(skip(pool, sessions, query, payload))]
pub async fn login(
    Extension(pool): Extension<PgPool>,
    Extension(sessions): Extension<Arc<SessionIssuer>>,
    query: Result<Query<Login>, QueryRejection>,
    payload: Option<Json<Login>>,
) -> Result<Json<Value>, ApiError> {
    // JSON body first, query parameters kept as the legacy fallback
    let credentials = match (payload, query) {
        (Some(Json(body)), _) => body,
        (None, Ok(Query(query))) => query,
        (None, Err(_)) => {
            return Err(ApiError::Validation("Missing credentials".to_string()));
        }
    };

    let user = UserRepo::find_by_email(&pool, &credentials.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let matches =
        bcrypt::verify(&credentials.password, &user.password).context("Failed to verify password")?;

    if !matches {
        return Err(ApiError::Validation("Wrong password".to_string()));
    }

    let subject = Subject {
        id: user.id,
        role: user.role,
    };

    let access_token = sessions
        .issue_access_token(subject)
        .context("Failed to sign access token")?;
    let refresh_token = sessions
        .issue_refresh_token(subject)
        .context("Failed to sign refresh token")?;

    debug!(user_id = user.id, "login successful");

    Ok(Json(json!({
        "accessToken": access_token,
        "refreshToken": refresh_token,
        "user": user,
    })))
}
