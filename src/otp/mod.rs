use secrecy::{ExposeSecret, SecretString};
use std::time::{SystemTime, UNIX_EPOCH};
use totp_rs::{Algorithm, TOTP};

/// Window size in seconds. A code stays valid for the whole window.
pub const DEFAULT_STEP: u64 = 120;

const DIGITS: usize = 6;

// one adjacent window of clock-skew tolerance on verification
const SKEW: u8 = 1;

/// Time-windowed one-time codes bound to a phone number or email address.
///
/// The shared secret is the identifier concatenated with a static
/// passphrase, so no per-request state is stored: any holder of the
/// passphrase can recompute the expected code for the current window.
/// A code therefore remains valid (and replayable) until its window
/// rolls over.
#[derive(Clone)]
pub struct OtpEngine {
    passphrase: SecretString,
    step: u64,
}

impl OtpEngine {
    #[must_use]
    pub fn new(passphrase: SecretString, step: u64) -> Self {
        Self { passphrase, step }
    }

    /// Generates the code for `identifier` in the current time window.
    ///
    /// Calling this twice inside the same window yields the same code.
    #[must_use]
    pub fn generate(&self, identifier: &str) -> String {
        self.generate_at(identifier, now())
    }

    /// Checks `code` against the current window and one adjacent window
    /// on each side. A mismatch is a normal negative result, not an error.
    #[must_use]
    pub fn verify(&self, code: &str, identifier: &str) -> bool {
        self.verify_at(code, identifier, now())
    }

    pub(crate) fn generate_at(&self, identifier: &str, time: u64) -> String {
        self.totp(identifier).generate(time)
    }

    pub(crate) fn verify_at(&self, code: &str, identifier: &str, time: u64) -> bool {
        let totp = self.totp(identifier);
        let mut matched = false;

        // Check every candidate window without short-circuiting so the
        // comparison count does not depend on the submitted code.
        for offset in -i64::from(SKEW)..=i64::from(SKEW) {
            let Some(window_time) = time.checked_add_signed(offset * self.step as i64) else {
                continue;
            };
            let expected = totp.generate(window_time);
            matched |= constant_time_eq(expected.as_bytes(), code.as_bytes());
        }

        matched
    }

    fn totp(&self, identifier: &str) -> TOTP {
        let secret = format!("{identifier}{}", self.passphrase.expose_secret());

        // new_unchecked: secrets shorter than 128 bits are allowed, the
        // identifier+passphrase concatenation may be short for brief emails
        TOTP::new_unchecked(Algorithm::SHA1, DIGITS, SKEW, self.step, secret.into_bytes())
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }

    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> OtpEngine {
        OtpEngine::new(SecretString::from("sirlisoz".to_string()), DEFAULT_STEP)
    }

    #[test]
    fn test_code_is_six_digits() {
        let code = engine().generate_at("+998901234567", 1_700_000_000);

        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_same_window_same_code() {
        let engine = engine();
        let base = 1_700_000_000 - (1_700_000_000 % DEFAULT_STEP);

        let first = engine.generate_at("+998901234567", base);
        let second = engine.generate_at("+998901234567", base + DEFAULT_STEP - 1);

        assert_eq!(first, second);
    }

    #[test]
    fn test_next_window_different_code() {
        let engine = engine();
        let base = 1_700_000_000;

        let first = engine.generate_at("+998901234567", base);
        let second = engine.generate_at("+998901234567", base + DEFAULT_STEP);

        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_roundtrip() {
        let engine = engine();
        let code = engine.generate_at("+998901234567", 1_700_000_000);

        assert!(engine.verify_at(&code, "+998901234567", 1_700_000_000));
    }

    #[test]
    fn test_verify_adjacent_window() {
        let engine = engine();
        let code = engine.generate_at("+998901234567", 1_700_000_000);

        assert!(engine.verify_at(&code, "+998901234567", 1_700_000_000 + DEFAULT_STEP));
        assert!(engine.verify_at(&code, "+998901234567", 1_700_000_000 - DEFAULT_STEP));
    }

    #[test]
    fn test_verify_rejects_stale_window() {
        let engine = engine();
        let code = engine.generate_at("+998901234567", 1_700_000_000);

        assert!(!engine.verify_at(&code, "+998901234567", 1_700_000_000 + 2 * DEFAULT_STEP));
    }

    #[test]
    fn test_verify_rejects_wrong_digit() {
        let engine = engine();
        let code = engine.generate_at("+998901234567", 1_700_000_000);

        let mut wrong = code.into_bytes();
        wrong[5] = if wrong[5] == b'0' { b'1' } else { b'0' };
        let wrong = String::from_utf8(wrong).expect("ascii digits");

        assert!(!engine.verify_at(&wrong, "+998901234567", 1_700_000_000));
    }

    #[test]
    fn test_verify_rejects_wrong_identifier() {
        let engine = engine();
        let code = engine.generate_at("+998901234567", 1_700_000_000);

        assert!(!engine.verify_at(&code, "+998907654321", 1_700_000_000));
    }

    #[test]
    fn test_email_identifier() {
        let engine = engine();
        let code = engine.generate_at("a@b.co", 1_700_000_000);

        assert!(engine.verify_at(&code, "a@b.co", 1_700_000_000));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"123456", b"123456"));
        assert!(!constant_time_eq(b"123456", b"123457"));
        assert!(!constant_time_eq(b"123456", b"12345"));
    }
}
