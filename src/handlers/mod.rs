pub mod auth;
pub mod community;
pub mod dashboard;
pub mod interview;
pub mod otp;
pub mod quiz;
