//! Captcha detection and challenge/answer pairing

use crate::error::{GatewayError, Result};
use crate::protocol::GatewayClient;

/// A captcha issued by the gateway for one login attempt.
///
/// Not `Clone`: answering consumes the challenge, so it cannot be paired
/// with a second attempt.
#[derive(Debug, PartialEq, Eq)]
pub struct CaptchaChallenge {
    image_relative_url: String,
    display_url: String,
}

impl CaptchaChallenge {
    pub(crate) fn new(image_relative_url: impl Into<String>, display_url: impl Into<String>) -> Self {
        Self {
            image_relative_url: image_relative_url.into(),
            display_url: display_url.into(),
        }
    }

    /// Image reference exactly as the gateway returned it
    pub fn image_relative_url(&self) -> &str {
        &self.image_relative_url
    }

    /// Absolute image URL to show the user
    pub fn display_url(&self) -> &str {
        &self.display_url
    }

    /// Turn the user's reading of the image into a login answer
    pub fn answer(self, text: impl Into<String>) -> CaptchaAnswer {
        CaptchaAnswer {
            text: text.into(),
            relative_url: self.image_relative_url,
        }
    }
}

/// User's answer bound to the challenge it was typed for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaAnswer {
    text: String,
    relative_url: String,
}

impl CaptchaAnswer {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn relative_url(&self) -> &str {
        &self.relative_url
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CaptchaDecision {
    NotRequired,
    Required(CaptchaChallenge),
}

/// Probe the gateway and, when it demands a captcha, fetch one.
///
/// Only the probe's error decides; a failed login never does.
pub async fn probe_requirement(client: &GatewayClient) -> Result<CaptchaDecision> {
    let probe = client.probe_login().await?;

    match probe.error {
        Some(ref err) if err.is_captcha_required() => {
            tracing::info!("   -> Captcha required");
            fetch_challenge(client).await.map(CaptchaDecision::Required)
        }
        Some(err) => {
            tracing::debug!(
                "[{}] probe error {} ({}) does not require captcha",
                client.address(),
                err.code,
                err.message
            );
            Ok(CaptchaDecision::NotRequired)
        }
        None => Ok(CaptchaDecision::NotRequired),
    }
}

/// Fetch a fresh challenge unconditionally
pub async fn fetch_challenge(client: &GatewayClient) -> Result<CaptchaChallenge> {
    let envelope = match client.new_captcha().await {
        Ok(envelope) => envelope,
        Err(GatewayError::Unauthenticated) => return Err(GatewayError::Unauthenticated),
        Err(e) => return Err(GatewayError::captcha_fetch(e.to_string())),
    };

    match envelope.into_result() {
        Ok(Some(url)) if !url.trim().is_empty() => {
            let display_url = client.session().resolve(&url);
            tracing::debug!("[{}] captcha image: {}", client.address(), display_url);
            Ok(CaptchaChallenge::new(url, display_url))
        }
        Ok(_) => Err(GatewayError::captcha_fetch("gateway returned no image")),
        Err(e) => Err(GatewayError::captcha_fetch(format!(
            "{} (code {})",
            e.message, e.code
        ))),
    }
}
