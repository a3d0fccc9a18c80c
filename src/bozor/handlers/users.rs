use crate::{
    auth::{AuthUser, Role},
    bozor::error::ApiError,
    store::{sort_column, ListUsers, User, UserRepo, UserUpdate},
};
use anyhow::Context;
use axum::{
    extract::rejection::QueryRejection,
    extract::{Extension, Path, Query},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::instrument;
use utoipa::IntoParams;

#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    page: Option<i64>,
    limit: Option<i64>,
    sort: Option<String>,
    order: Option<String>,
    role: Option<Role>,
}

#[utoipa::path(
    get,
    path = "/users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Paginated user listing", content_type = "application/json"),
        (status = 400, description = "Unknown sort field or order", body = String),
        (status = 401, description = "Missing or invalid access token", body = String),
        (status = 403, description = "Access denied", body = String),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(pool, auth, query))]
pub async fn list_users(
    Extension(pool): Extension<PgPool>,
    Extension(auth): Extension<AuthUser>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    auth.require(&[Role::Admin])?;

    let Ok(Query(query)) = query else {
        return Err(ApiError::Validation("Invalid query parameters".to_string()));
    };

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let sort = query.sort.as_deref().unwrap_or("createdAt");
    let sort = sort_column(sort)
        .ok_or_else(|| ApiError::Validation(format!("Unknown sort field: {sort}")))?;

    let descending = match query.order.as_deref().map(str::to_uppercase).as_deref() {
        None | Some("DESC") => true,
        Some("ASC") => false,
        Some(other) => {
            return Err(ApiError::Validation(format!("Unknown order: {other}")));
        }
    };

    let (users, total) = UserRepo::list(
        &pool,
        &ListUsers {
            role: query.role,
            sort: sort.to_string(),
            descending,
            limit,
            offset: (page - 1) * limit,
        },
    )
    .await?;

    Ok(Json(json!({
        "total": total,
        "page": page,
        "totalPages": (total + limit - 1) / limit,
        "data": users,
    })))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User record", body = User, content_type = "application/json"),
        (status = 401, description = "Missing or invalid access token", body = String),
        (status = 403, description = "Access denied", body = String),
        (status = 404, description = "User not found", body = String),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(pool, auth))]
pub async fn get_user(
    Extension(pool): Extension<PgPool>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    auth.require(&[Role::Admin])?;

    let user = UserRepo::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated user", body = User, content_type = "application/json"),
        (status = 401, description = "Missing or invalid access token", body = String),
        (status = 404, description = "User not found", body = String),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(pool, payload))]
pub async fn update_user(
    Extension(pool): Extension<PgPool>,
    Path(id): Path<i64>,
    payload: Option<Json<UserUpdate>>,
) -> Result<Json<User>, ApiError> {
    let Some(Json(mut update)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    // incoming plaintext passwords are hashed before they reach the store
    if let Some(password) = update.password.take() {
        let hashed =
            bcrypt::hash(&password, bcrypt::DEFAULT_COST).context("Failed to hash password")?;
        update.password = Some(hashed);
    }

    let user = UserRepo::update(&pool, id, &update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Deleted user", content_type = "application/json"),
        (status = 401, description = "Missing or invalid access token", body = String),
        (status = 404, description = "User not found", body = String),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(pool))]
pub async fn delete_user(
    Extension(pool): Extension<PgPool>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let user = UserRepo::delete(&pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({ "message": "User deleted", "user": user })))
}
