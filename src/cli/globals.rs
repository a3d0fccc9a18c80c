use secrecy::SecretString;

/// Secret material loaded once at startup and passed explicitly into the
/// OTP engine, session issuer and notification channels.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub otp_passphrase: SecretString,
    pub jwt_secret: SecretString,
    pub sms_token: Option<SecretString>,
    pub smtp_password: Option<SecretString>,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(otp_passphrase: SecretString, jwt_secret: SecretString) -> Self {
        Self {
            otp_passphrase,
            jwt_secret,
            sms_token: None,
            smtp_password: None,
        }
    }

    pub fn set_sms_token(&mut self, token: SecretString) {
        self.sms_token = Some(token);
    }

    pub fn set_smtp_password(&mut self, password: SecretString) {
        self.smtp_password = Some(password);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let mut args = GlobalArgs::new(
            SecretString::from("sirlisoz".to_string()),
            SecretString::from("signing-key".to_string()),
        );

        assert_eq!(args.otp_passphrase.expose_secret(), "sirlisoz");
        assert_eq!(args.jwt_secret.expose_secret(), "signing-key");
        assert!(args.sms_token.is_none());

        args.set_sms_token(SecretString::from("gateway-token".to_string()));
        assert!(args.sms_token.is_some());
    }
}
