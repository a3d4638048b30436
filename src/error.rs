//! Error taxonomy for gateway calls and the onboarding workflow

use thiserror::Error;

/// Result alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Every failure a gateway step can produce.
///
/// `Display` output is the user-facing message carried by a failed workflow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Transport failure: timeout, refused connection, bad status, garbled body
    #[error("network error: {0}")]
    Network(String),

    /// The gateway reports the session as missing or expired
    #[error("authentication failed")]
    Unauthenticated,

    /// A captcha was required but its image could not be obtained
    #[error("failed to load captcha image: {0}")]
    CaptchaFetch(String),

    /// Well-formed login response that did not accept the credentials
    #[error("invalid credentials")]
    LoginRejected,

    /// Decoded error envelope with a code we do not handle specially
    #[error("gateway error {code}: {message}")]
    Protocol { code: i64, message: String },
}

impl GatewayError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn captcha_fetch(msg: impl Into<String>) -> Self {
        Self::CaptchaFetch(msg.into())
    }

    pub fn protocol(code: i64, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(format!("request timed out: {}", err))
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Network(format!("malformed response body: {}", err))
    }
}
