// src/mail.rs

use async_trait::async_trait;

use crate::{config::Config, error::AppError};

/// Outgoing-mail collaborator. Transport details live behind this seam; a
/// failed dispatch is fatal to the requesting operation and surfaces as
/// `NotificationFailed`, never a silent success.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), AppError>;
}

/// Posts mail as JSON to a configured HTTP relay.
pub struct HttpMailer {
    http: reqwest::Client,
    relay_url: String,
    from: String,
}

impl HttpMailer {
    pub fn new(config: &Config, relay_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            relay_url,
            from: config.mail_from.clone(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), AppError> {
        let resp = self
            .http
            .post(&self.relay_url)
            .json(&serde_json::json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Mail relay unreachable: {}", e);
                AppError::NotificationFailed
            })?;

        if !resp.status().is_success() {
            tracing::error!("Mail relay rejected message: {}", resp.status());
            return Err(AppError::NotificationFailed);
        }

        tracing::info!("Email sent to {}", to);
        Ok(())
    }
}

/// Dev-mode mailer: logs the message instead of sending it. Used when no
/// relay is configured so the OTP flows stay exercisable locally.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<(), AppError> {
        tracing::info!("(dev mail) to={} subject={}", to, subject);
        Ok(())
    }
}

/// Email bodies for the OTP flows.
pub mod templates {
    pub fn registration_otp(code: &str) -> String {
        format!(
            "<div style=\"font-family:sans-serif\">\
             <h2>Welcome to SmartLearn!</h2>\
             <p>Your account verification code is:</p>\
             <h1 style=\"letter-spacing:4px\">{code}</h1>\
             <p>This code expires in 5 minutes.</p>\
             </div>"
        )
    }

    pub fn resend_otp(code: &str) -> String {
        format!(
            "<div style=\"font-family:sans-serif\">\
             <p>Your new SmartLearn verification code is:</p>\
             <h1 style=\"letter-spacing:4px\">{code}</h1>\
             <p>Any previous code is no longer valid. This code expires in 5 minutes.</p>\
             </div>"
        )
    }

    pub fn reset_password_otp(code: &str) -> String {
        format!(
            "<div style=\"font-family:sans-serif\">\
             <h2>Password Reset</h2>\
             <p>Use this code to reset your SmartLearn password:</p>\
             <h1 style=\"letter-spacing:4px\">{code}</h1>\
             <p>If you did not request this, you can ignore this email.</p>\
             </div>"
        )
    }

    pub fn password_reset_success() -> String {
        "<div style=\"font-family:sans-serif\">\
         <h2>Password Changed</h2>\
         <p>Your SmartLearn password was just changed. If this wasn't you, \
         reset it again immediately.</p>\
         </div>"
            .to_string()
    }
}
