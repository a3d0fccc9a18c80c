pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        otp_step: u64,
        access_ttl_secs: i64,
        refresh_ttl_secs: i64,
        sms: Option<SmsSettings>,
        smtp: Option<SmtpSettings>,
    },
}

#[derive(Debug, Clone)]
pub struct SmsSettings {
    pub url: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub relay: String,
    pub username: String,
    pub from: String,
}
