use crate::{
    auth::Role,
    bozor::error::ApiError,
    bozor::handlers::{valid_email, valid_phone},
    store::{NewUser, User, UserRepo},
};
use anyhow::Context;
use axum::{extract::Extension, http::StatusCode, response::Json};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Register {
    name: String,
    password: String,
    region_id: i64,
    phone: String,
    image: Option<String>,
    email: String,
    year: i32,
    role: Option<Role>,
}

#[utoipa::path(
    post,
    path = "/register",
    request_body = Register,
    responses(
        (status = 201, description = "Registration successful", body = User, content_type = "application/json"),
        (status = 400, description = "User with the specified email and phone already exists", body = String),
        (status = 403, description = "Invalid email or phone", body = String),
    ),
    tag = "users"
)]
#[instrument(skip(pool, payload))]
pub async fn register(
    Extension(pool): Extension<PgPool>,
    payload: Option<Json<Register>>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let Some(Json(payload)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    if !valid_email(&payload.email) {
        return Err(ApiError::InvalidContact("Invalid email".to_string()));
    }

    if !valid_phone(&payload.phone) {
        return Err(ApiError::InvalidContact("Invalid phone".to_string()));
    }

    if UserRepo::find_by_contact(&pool, &payload.email, &payload.phone)
        .await?
        .is_some()
    {
        return Err(ApiError::Validation("User already exists".to_string()));
    }

    let hashed = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .context("Failed to hash password")?;

    let user = UserRepo::create(
        &pool,
        &NewUser {
            name: payload.name,
            password: hashed,
            region_id: payload.region_id,
            phone: payload.phone,
            image: payload.image,
            email: payload.email,
            year: payload.year,
            role: payload.role.unwrap_or(Role::User),
        },
    )
    .await?;

    debug!(user_id = user.id, "user registered");

    Ok((StatusCode::CREATED, Json(user)))
}
