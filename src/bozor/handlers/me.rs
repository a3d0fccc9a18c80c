use crate::{auth::AuthUser, bozor::error::ApiError, store::User};
use axum::{extract::Extension, response::Json};
use tracing::instrument;

#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Profile of the authenticated user", body = User, content_type = "application/json"),
        (status = 401, description = "Missing or invalid access token", body = String),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(auth))]
pub async fn me(Extension(auth): Extension<AuthUser>) -> Result<Json<User>, ApiError> {
    Ok(Json(auth.user))
}
