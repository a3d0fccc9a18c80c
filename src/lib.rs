pub mod auth;
pub mod bozor;
pub mod cli;
pub mod notify;
pub mod otp;
pub mod session;
pub mod store;
