use crate::bozor::APP_USER_AGENT;
use anyhow::Result;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::{future::Future, pin::Pin, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{error, info};

/// Upper bound on a single delivery attempt. An unresponsive provider
/// must not stall the request indefinitely.
pub const DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivery failure, distinct from an OTP mismatch: the code may be
/// perfectly valid while the channel is down.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("notification provider timed out")]
    Timeout,
    #[error("notification provider rejected the message: {0}")]
    Provider(String),
    #[error("notification transport failure: {0}")]
    Transport(String),
}

type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send + 'a>>;

/// Channel-agnostic delivery contract: push `code` to `destination`.
/// The caller picks the channel by picking the implementation.
pub trait Notifier: Send + Sync {
    fn send<'a>(&'a self, destination: &'a str, code: &'a str) -> SendFuture<'a>;
}

/// One notifier per channel, wired at startup.
#[derive(Clone)]
pub struct Notifiers {
    pub sms: Arc<dyn Notifier>,
    pub email: Arc<dyn Notifier>,
}

/// SMS delivery through an Eskiz-style HTTP gateway.
pub struct SmsGateway {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
    from: String,
}

impl SmsGateway {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: String, token: SecretString, from: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(DISPATCH_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            token,
            from,
        })
    }

    async fn post(&self, destination: &str, code: &str) -> Result<(), DispatchError> {
        let url = format!("{}/message/sms/send", self.base_url.trim_end_matches('/'));

        let payload = serde_json::json!({
            "mobile_phone": destination,
            "message": format!("Your verification code: {code}"),
            "from": self.from,
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(self.token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    DispatchError::Timeout
                } else {
                    DispatchError::Transport(err.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body: Value = response.json().await.unwrap_or_default();
            let message = body["message"].as_str().unwrap_or_default();

            error!("SMS gateway refused message: {} {}", status, message);

            return Err(DispatchError::Provider(format!("{status}, {message}")));
        }

        info!(destination, "OTP sent over SMS");

        Ok(())
    }
}

impl Notifier for SmsGateway {
    fn send<'a>(&'a self, destination: &'a str, code: &'a str) -> SendFuture<'a> {
        Box::pin(self.post(destination, code))
    }
}

/// Email delivery over SMTP.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    /// # Errors
    /// Returns an error if the relay host is invalid.
    pub fn new(
        relay: &str,
        username: String,
        password: &SecretString,
        from: String,
    ) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(relay)?
            .credentials(Credentials::new(
                username,
                password.expose_secret().to_string(),
            ))
            .timeout(Some(DISPATCH_TIMEOUT))
            .build();

        Ok(Self { transport, from })
    }

    async fn deliver(&self, destination: &str, code: &str) -> Result<(), DispatchError> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|_| DispatchError::Transport("invalid sender address".to_string()))?,
            )
            .to(destination
                .parse()
                .map_err(|_| DispatchError::Transport("invalid recipient address".to_string()))?)
            .subject("Your verification code")
            .header(ContentType::TEXT_PLAIN)
            .body(format!("Your verification code: {code}"))
            .map_err(|err| DispatchError::Transport(err.to_string()))?;

        match tokio::time::timeout(DISPATCH_TIMEOUT, self.transport.send(message)).await {
            Err(_) => Err(DispatchError::Timeout),
            Ok(Err(err)) => Err(DispatchError::Provider(err.to_string())),
            Ok(Ok(_)) => {
                info!(destination, "OTP sent over email");
                Ok(())
            }
        }
    }
}

impl Notifier for SmtpMailer {
    fn send<'a>(&'a self, destination: &'a str, code: &'a str) -> SendFuture<'a> {
        Box::pin(self.deliver(destination, code))
    }
}

/// Local dev notifier that logs the code instead of sending it.
#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send<'a>(&'a self, destination: &'a str, code: &'a str) -> SendFuture<'a> {
        Box::pin(async move {
            info!(destination, code, "notification send stub");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let notifier = LogNotifier;

        assert!(notifier.send("+998901234567", "123456").await.is_ok());
    }

    #[tokio::test]
    async fn test_sms_gateway_transport_failure() {
        // nothing listens on this port, the send must surface as transport
        let gateway = SmsGateway::new(
            "http://127.0.0.1:1".to_string(),
            SecretString::from("token".to_string()),
            "4546".to_string(),
        )
        .expect("gateway");

        let result = gateway.send("+998901234567", "123456").await;

        assert!(matches!(
            result,
            Err(DispatchError::Transport(_) | DispatchError::Timeout)
        ));
    }
}
