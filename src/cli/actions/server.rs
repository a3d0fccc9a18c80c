use crate::{
    bozor::{self, AppState},
    cli::{actions::Action, globals::GlobalArgs},
    notify::{LogNotifier, Notifier, Notifiers, SmsGateway, SmtpMailer},
    otp::OtpEngine,
    session::SessionIssuer,
};
use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::warn;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            otp_step,
            access_ttl_secs,
            refresh_ttl_secs,
            sms,
            smtp,
        } => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(5))
                .connect(&dsn)
                .await?;

            let otp = Arc::new(OtpEngine::new(globals.otp_passphrase.clone(), otp_step));

            let sessions = Arc::new(SessionIssuer::new(
                &globals.jwt_secret,
                access_ttl_secs,
                refresh_ttl_secs,
            ));

            let sms_notifier: Arc<dyn Notifier> = match (sms, globals.sms_token.clone()) {
                (Some(settings), Some(token)) => {
                    Arc::new(SmsGateway::new(settings.url, token, settings.from)?)
                }
                _ => {
                    warn!("SMS gateway not configured, OTP codes will only be logged");
                    Arc::new(LogNotifier)
                }
            };

            let email_notifier: Arc<dyn Notifier> = match (smtp, globals.smtp_password.as_ref()) {
                (Some(settings), Some(password)) => Arc::new(SmtpMailer::new(
                    &settings.relay,
                    settings.username,
                    password,
                    settings.from,
                )?),
                _ => {
                    warn!("SMTP relay not configured, OTP codes will only be logged");
                    Arc::new(LogNotifier)
                }
            };

            let state = AppState {
                pool,
                otp,
                sessions,
                notifiers: Notifiers {
                    sms: sms_notifier,
                    email: email_notifier,
                },
            };

            bozor::new(port, state).await?;
        }
    }

    Ok(())
}
