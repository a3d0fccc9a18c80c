pub mod health;
pub use self::health::health;

pub mod otp;
pub use self::otp::{send_otp_email, send_otp_sms, verify_otp};

pub mod user_register;
pub use self::user_register::register;

pub mod user_login;
pub use self::user_login::login;

pub mod session_refresh;
pub use self::session_refresh::refresh;

pub mod me;
pub use self::me::me;

pub mod users;
pub use self::users::{delete_user, get_user, list_users, update_user};

// common functions for the handlers
use regex::Regex;

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

pub fn valid_phone(phone: &str) -> bool {
    Regex::new(r"^\+?\d{1,3}?[-.\s]?\(?\d{2,3}\)?[-.\s]?\d{3}[-.\s]?\d{2}[-.\s]?\d{2}$")
        .map_or(false, |re| re.is_match(phone))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(valid_email("user@example.com"));
        assert!(valid_email("a@b.co"));
        assert!(!valid_email("user@example"));
        assert!(!valid_email("not an email"));
        assert!(!valid_email("@example.com"));
    }

    #[test]
    fn test_valid_phone() {
        assert!(valid_phone("+998901234567"));
        assert!(valid_phone("+998 90 123 45 67"));
        assert!(valid_phone("998901234567"));
        assert!(!valid_phone("12345"));
        assert!(!valid_phone("phone"));
    }
}
