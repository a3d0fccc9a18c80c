use crate::{
    bozor::error::ApiError,
    bozor::handlers::{valid_email, valid_phone},
    notify::Notifiers,
    otp::OtpEngine,
};
use axum::{extract::Extension, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct SendOtpSms {
    phone: String,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct SendOtpEmail {
    email: String,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct VerifyOtp {
    otp: String,
    phone: Option<String>,
    email: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct Verification {
    verified: bool,
    message: String,
}

#[utoipa::path(
    post,
    path = "/send-otp-sms",
    request_body = SendOtpSms,
    responses(
        (status = 200, description = "OTP generated and dispatched", body = String),
        (status = 403, description = "Invalid phone number", body = String),
        (status = 502, description = "SMS gateway failure", body = String),
    ),
    tag = "otp"
)]
#[instrument(skip(otp, notifiers, payload))]
pub async fn send_otp_sms(
    Extension(otp): Extension<Arc<OtpEngine>>,
    Extension(notifiers): Extension<Notifiers>,
    payload: Option<Json<SendOtpSms>>,
) -> Result<String, ApiError> {
    let Some(Json(payload)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    if !valid_phone(&payload.phone) {
        return Err(ApiError::InvalidContact(
            "Invalid phone, please enter phone as +998901234567".to_string(),
        ));
    }

    let code = otp.generate(&payload.phone);

    notifiers.sms.send(&payload.phone, &code).await?;

    Ok(code)
}

#[utoipa::path(
    post,
    path = "/send-otp-email",
    request_body = SendOtpEmail,
    responses(
        (status = 200, description = "OTP generated and dispatched", body = String),
        (status = 403, description = "Invalid email address", body = String),
        (status = 502, description = "Mail delivery failure", body = String),
    ),
    tag = "otp"
)]
#[instrument(skip(otp, notifiers, payload))]
pub async fn send_otp_email(
    Extension(otp): Extension<Arc<OtpEngine>>,
    Extension(notifiers): Extension<Notifiers>,
    payload: Option<Json<SendOtpEmail>>,
) -> Result<String, ApiError> {
    let Some(Json(payload)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    if !valid_email(&payload.email) {
        return Err(ApiError::InvalidContact(
            "Invalid email, please enter email as user@example.com".to_string(),
        ));
    }

    let code = otp.generate(&payload.email);

    notifiers.email.send(&payload.email, &code).await?;

    Ok(code)
}

#[utoipa::path(
    post,
    path = "/verify-otp",
    request_body = VerifyOtp,
    responses(
        (status = 200, description = "Code matched", body = Verification),
        (status = 400, description = "Code did not match (negative result) or missing identifier", body = Verification),
    ),
    tag = "otp"
)]
#[instrument(skip(otp, payload))]
pub async fn verify_otp(
    Extension(otp): Extension<Arc<OtpEngine>>,
    payload: Option<Json<VerifyOtp>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Some(Json(payload)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    if payload.phone.is_none() && payload.email.is_none() {
        return Err(ApiError::Validation(
            "Either phone or email is required".to_string(),
        ));
    }

    let match_email = payload
        .email
        .as_deref()
        .map_or(false, |email| otp.verify(&payload.otp, email));
    let match_sms = payload
        .phone
        .as_deref()
        .map_or(false, |phone| otp.verify(&payload.otp, phone));

    debug!(match_email, match_sms, "otp verification outcome");

    // a mismatch is a negative result, not a fault
    if match_email || match_sms {
        Ok((
            StatusCode::OK,
            Json(json!({ "verified": true, "message": "Verified" })),
        ))
    } else {
        Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "verified": false, "message": "Invalid OTP" })),
        ))
    }
}
