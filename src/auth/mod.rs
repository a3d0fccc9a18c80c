use crate::{bozor::error::ApiError, session::SessionIssuer, store::{User, UserRepo}};
use axum::{
    body::Body,
    extract::Extension,
    http::Request,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::{fmt, str::FromStr, sync::Arc};
use tracing::debug;
use utoipa::ToSchema;

/// Fixed role labels. Authorization is flat set membership: no role
/// inherits another's permissions.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
    SuperAdmin,
    Seller,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            "super_admin" => Ok(Self::SuperAdmin),
            "seller" => Ok(Self::Seller),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::SuperAdmin => "super_admin",
            Self::Seller => "seller",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Deny,
}

/// Permit only when `role` is one of `allowed`. A single role behaves
/// as a singleton set.
#[must_use]
pub fn authorize(allowed: &[Role], role: Role) -> Decision {
    if allowed.contains(&role) {
        Decision::Permit
    } else {
        Decision::Deny
    }
}

/// Authenticated subject injected into request extensions by [`authenticate`].
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    /// Gate helper for handlers: access denied unless the subject's role
    /// is in `allowed`.
    pub fn require(&self, allowed: &[Role]) -> Result<(), ApiError> {
        match authorize(allowed, self.user.role) {
            Decision::Permit => Ok(()),
            Decision::Deny => Err(ApiError::Forbidden),
        }
    }
}

/// Bearer-token middleware: verifies the access token, loads the user it
/// names, and stores an [`AuthUser`] extension for downstream handlers.
/// Requests without a valid token are rejected with 401.
pub async fn authenticate(
    Extension(pool): Extension<PgPool>,
    Extension(sessions): Extension<Arc<SessionIssuer>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request)
        .ok_or_else(|| ApiError::Auth("Access token missing".to_string()))?;

    let subject = sessions
        .verify(token)
        .map_err(|err| ApiError::Auth(err.to_string()))?;

    let user = UserRepo::find_by_id(&pool, subject.id)
        .await?
        .ok_or_else(|| ApiError::Auth("User not found".to_string()))?;

    debug!(user_id = user.id, role = %user.role, "authenticated");

    request.extensions_mut().insert(AuthUser { user });

    Ok(next.run(request).await)
}

fn bearer_token<'a>(request: &'a Request<Body>) -> Option<&'a str> {
    request
        .headers()
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_permit() {
        assert_eq!(authorize(&[Role::Admin], Role::Admin), Decision::Permit);
    }

    #[test]
    fn test_authorize_deny() {
        assert_eq!(authorize(&[Role::Admin], Role::User), Decision::Deny);
    }

    #[test]
    fn test_authorize_no_hierarchy() {
        // super_admin is not implicitly an admin
        assert_eq!(authorize(&[Role::Admin], Role::SuperAdmin), Decision::Deny);
        assert_eq!(
            authorize(&[Role::Admin, Role::SuperAdmin], Role::SuperAdmin),
            Decision::Permit
        );
    }

    #[test]
    fn test_role_parse_roundtrip() {
        for role in [Role::Admin, Role::User, Role::SuperAdmin, Role::Seller] {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_bearer_token_extraction() {
        let request = Request::builder()
            .header("authorization", "Bearer abc.def.ghi")
            .body(Body::empty())
            .expect("request");

        assert_eq!(bearer_token(&request), Some("abc.def.ghi"));

        let bare = Request::builder()
            .body(Body::empty())
            .expect("request");

        assert_eq!(bearer_token(&bare), None);
    }
}
