use crate::{auth, notify::Notifiers, otp::OtpEngine, session::SessionIssuer};
use anyhow::Result;
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{debug_span, info};
use ulid::Ulid;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

pub mod error;
pub mod handlers;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Everything the handlers need, injected as request extensions. Secrets
/// live inside the engines; nothing here is read from ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub otp: Arc<OtpEngine>,
    pub sessions: Arc<SessionIssuer>,
    pub notifiers: Notifiers,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::otp::send_otp_sms,
        handlers::otp::send_otp_email,
        handlers::otp::verify_otp,
        handlers::user_register::register,
        handlers::user_login::login,
        handlers::session_refresh::refresh,
        handlers::me::me,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
    ),
    components(schemas(
        handlers::otp::SendOtpSms,
        handlers::otp::SendOtpEmail,
        handlers::otp::VerifyOtp,
        handlers::otp::Verification,
        handlers::user_register::Register,
        handlers::user_login::Login,
        handlers::session_refresh::Refresh,
        crate::store::User,
        crate::store::UserUpdate,
        crate::auth::Role,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "otp", description = "One-time password issuance and verification"),
        (name = "users", description = "Registration, login, sessions and user accounts"),
        (name = "health", description = "Service health"),
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(Clone, Copy)]
struct MakeRequestUlid;

impl MakeRequestId for MakeRequestUlid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Ulid::new().to_string())
            .ok()
            .map(RequestId::new)
    }
}

#[must_use]
pub fn router(state: AppState) -> Router {
    let request_id = HeaderName::from_static("x-request-id");

    // routes behind the bearer-token middleware
    let protected = Router::new()
        .route("/me", get(handlers::me))
        .route("/users", get(handlers::list_users))
        .route(
            "/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route_layer(middleware::from_fn(auth::authenticate));

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health))
        .route("/send-otp-sms", post(handlers::send_otp_sms))
        .route("/send-otp-email", post(handlers::send_otp_email))
        .route("/verify-otp", post(handlers::verify_otp))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUlid))
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    debug_span!(
                        "http",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .layer(Extension(state.pool))
        .layer(Extension(state.otp))
        .layer(Extension(state.sessions))
        .layer(Extension(state.notifiers))
}

/// Binds the listener and serves until the process is stopped.
///
/// # Errors
/// Returns an error if binding or serving fails.
pub async fn new(port: u16, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{port}");

    let app = router(state);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
