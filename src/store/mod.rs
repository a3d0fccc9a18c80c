use crate::auth::Role;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{info_span, Instrument};
use utoipa::ToSchema;

/// User record as owned by the relational store.
///
/// The password hash never leaves the API: it is skipped on
/// serialization.
#[derive(ToSchema, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub region_id: i64,
    pub phone: String,
    pub image: Option<String>,
    pub email: String,
    pub year: i32,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub password: String,
    pub region_id: i64,
    pub phone: String,
    pub image: Option<String>,
    pub email: String,
    pub year: i32,
    pub role: Role,
}

/// Partial update: absent fields keep their stored value.
#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: Option<String>,
    pub password: Option<String>,
    pub region_id: Option<i64>,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub email: Option<String>,
    pub year: Option<i32>,
    pub role: Option<Role>,
}

#[derive(Debug)]
pub struct ListUsers {
    pub role: Option<Role>,
    pub sort: String,
    pub descending: bool,
    pub limit: i64,
    pub offset: i64,
}

/// Maps an exposed sort key to a real column. Anything else is rejected
/// before it can reach the query string.
#[must_use]
pub fn sort_column(sort: &str) -> Option<&'static str> {
    match sort {
        "id" => Some("id"),
        "name" => Some("name"),
        "email" => Some("email"),
        "year" => Some("year"),
        "createdAt" => Some("created_at"),
        "updatedAt" => Some("updated_at"),
        _ => None,
    }
}

pub struct UserRepo;

impl UserRepo {
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>> {
        let query = "SELECT * FROM users WHERE id = $1";

        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("Failed to fetch user by id")?;

        row.map(|row| user_from_row(&row)).transpose()
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
        let query = "SELECT * FROM users WHERE email = $1";

        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("Failed to fetch user by email")?;

        row.map(|row| user_from_row(&row)).transpose()
    }

    /// Duplicate check used by registration.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn find_by_contact(pool: &PgPool, email: &str, phone: &str) -> Result<Option<User>> {
        let query = "SELECT * FROM users WHERE email = $1 AND phone = $2";

        let row = sqlx::query(query)
            .bind(email)
            .bind(phone)
            .fetch_optional(pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("Failed to fetch user by contact")?;

        row.map(|row| user_from_row(&row)).transpose()
    }

    /// # Errors
    /// Returns an error if the insert fails (including unique violations).
    pub async fn create(pool: &PgPool, user: &NewUser) -> Result<User> {
        let query = r"
            INSERT INTO users (name, password, region_id, phone, image, email, year, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            ";

        let row = sqlx::query(query)
            .bind(&user.name)
            .bind(&user.password)
            .bind(user.region_id)
            .bind(&user.phone)
            .bind(&user.image)
            .bind(&user.email)
            .bind(user.year)
            .bind(user.role.to_string())
            .fetch_one(pool)
            .instrument(db_span("INSERT", query))
            .await
            .context("Failed to insert user")?;

        user_from_row(&row)
    }

    /// # Errors
    /// Returns an error if the update fails.
    pub async fn update(pool: &PgPool, id: i64, update: &UserUpdate) -> Result<Option<User>> {
        let query = r"
            UPDATE users SET
                name = COALESCE($2, name),
                password = COALESCE($3, password),
                region_id = COALESCE($4, region_id),
                phone = COALESCE($5, phone),
                image = COALESCE($6, image),
                email = COALESCE($7, email),
                year = COALESCE($8, year),
                role = COALESCE($9, role),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            ";

        let row = sqlx::query(query)
            .bind(id)
            .bind(&update.name)
            .bind(&update.password)
            .bind(update.region_id)
            .bind(&update.phone)
            .bind(&update.image)
            .bind(&update.email)
            .bind(update.year)
            .bind(update.role.map(|role| role.to_string()))
            .fetch_optional(pool)
            .instrument(db_span("UPDATE", query))
            .await
            .context("Failed to update user")?;

        row.map(|row| user_from_row(&row)).transpose()
    }

    /// # Errors
    /// Returns an error if the delete fails.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<Option<User>> {
        let query = "DELETE FROM users WHERE id = $1 RETURNING *";

        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("Failed to delete user")?;

        row.map(|row| user_from_row(&row)).transpose()
    }

    /// Paginated listing with an optional role filter. `params.sort` must
    /// already be a whitelisted column from [`sort_column`].
    ///
    /// # Errors
    /// Returns an error if either query fails.
    pub async fn list(pool: &PgPool, params: &ListUsers) -> Result<(Vec<User>, i64)> {
        let direction = if params.descending { "DESC" } else { "ASC" };
        let role = params.role.map(|role| role.to_string());

        let count_query = "SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR role = $1)";

        let total: i64 = sqlx::query_scalar(count_query)
            .bind(&role)
            .fetch_one(pool)
            .instrument(db_span("SELECT", count_query))
            .await
            .context("Failed to count users")?;

        let query = format!(
            "SELECT * FROM users WHERE ($1::text IS NULL OR role = $1) \
             ORDER BY {} {direction} LIMIT $2 OFFSET $3",
            params.sort,
        );

        let rows = sqlx::query(&query)
            .bind(&role)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(pool)
            .instrument(db_span("SELECT", &query))
            .await
            .context("Failed to list users")?;

        let users = rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok((users, total))
    }
}

fn db_span(operation: &str, statement: &str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;

    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        password: row.try_get("password")?,
        region_id: row.try_get("region_id")?,
        phone: row.try_get("phone")?,
        image: row.try_get("image")?,
        email: row.try_get("email")?,
        year: row.try_get("year")?,
        role: role.parse().map_err(|err| anyhow!("{err}"))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_column_whitelist() {
        assert_eq!(sort_column("createdAt"), Some("created_at"));
        assert_eq!(sort_column("name"), Some("name"));
        assert_eq!(sort_column("password"), None);
        assert_eq!(sort_column("id; DROP TABLE users"), None);
    }

    #[test]
    fn test_user_serialization_hides_password() {
        let user = User {
            id: 1,
            name: "Aziza".to_string(),
            password: "$2b$12$hash".to_string(),
            region_id: 3,
            phone: "+998901234567".to_string(),
            image: None,
            email: "aziza@example.com".to_string(),
            year: 1999,
            role: Role::Seller,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).expect("serialize");

        assert!(json.get("password").is_none());
        assert_eq!(json["regionId"], 3);
        assert_eq!(json["role"], "seller");
    }
}
