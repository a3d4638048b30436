//! Gateway JSON-RPC client
//!
//! Wraps a [`GatewaySession`] and speaks the `{method, params}` /
//! `{result, error}` protocol. The unauthenticated error is raised as
//! [`GatewayError::Unauthenticated`] from every call; every other error
//! envelope is handed back to the caller as data.

use crate::captcha::CaptchaAnswer;
use crate::error::{GatewayError, Result};
use crate::http::GatewaySession;
use crate::models::{
    method, CaptchaParams, DdnsRecord, Envelope, LoginParams, RpcRequest, DDNS_PROVIDER,
    LOGIN_DONE,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Username and password as typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub id: String,
    pub password: String,
}

impl Credentials {
    pub fn new(id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            password: password.into(),
        }
    }
}

/// Everything one login attempt sends.
///
/// The captcha answer is present iff a challenge was issued for this
/// attempt; [`CaptchaAnswer`] can only be built from that challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub id: String,
    pub password: String,
    pub captcha_answer: Option<CaptchaAnswer>,
}

impl LoginCredentials {
    pub fn without_captcha(credentials: Credentials) -> Self {
        Self {
            id: credentials.id,
            password: credentials.password,
            captcha_answer: None,
        }
    }

    pub fn with_captcha(credentials: Credentials, answer: CaptchaAnswer) -> Self {
        Self {
            id: credentials.id,
            password: credentials.password,
            captcha_answer: Some(answer),
        }
    }
}

pub struct GatewayClient {
    session: GatewaySession,
}

impl GatewayClient {
    pub fn new(session: GatewaySession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &GatewaySession {
        &self.session
    }

    pub fn address(&self) -> &str {
        self.session.address()
    }

    /// Issue one RPC call and decode its envelope
    pub async fn call<P, T>(&self, method: &str, params: Option<P>) -> Result<Envelope<T>>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        tracing::debug!("[{}] -> {}", self.address(), method);
        let body = self.session.post_json(&RpcRequest { method, params }).await?;
        tracing::trace!("[{}] <- {}: {}", self.address(), method, body);

        let value: serde_json::Value = serde_json::from_str(&body)?;
        if value.get("result").is_none() && value.get("error").is_none() {
            return Err(GatewayError::network(format!(
                "{} returned no result or error",
                method
            )));
        }
        let raw: Envelope<serde_json::Value> = serde_json::from_value(value)?;
        if let Some(err) = raw.error.as_ref().filter(|e| e.is_unauthenticated()) {
            tracing::warn!(
                "[{}] {} rejected: session invalid ({})",
                self.address(),
                method,
                err.code
            );
            return Err(GatewayError::Unauthenticated);
        }

        let result = match raw.result {
            Some(value) => Some(serde_json::from_value(value)?),
            None => None,
        };
        Ok(Envelope {
            result,
            error: raw.error,
        })
    }

    /// Model name the gateway reports, e.g. `A3004NS-M`
    pub async fn product_name(&self) -> Result<Option<String>> {
        self.call::<(), String>(method::PRODUCT_NAME, None)
            .await?
            .into_result()
            .map_err(|e| GatewayError::protocol(e.code, e.message))
    }

    /// Login-capability probe: `session/login` without params.
    ///
    /// The envelope is returned untouched so the caller can inspect the
    /// error shape.
    pub async fn probe_login(&self) -> Result<Envelope<serde_json::Value>> {
        self.call::<(), serde_json::Value>(method::SESSION_LOGIN, None)
            .await
    }

    /// Ask for a fresh captcha; the result is a gateway-relative image URL
    pub async fn new_captcha(&self) -> Result<Envelope<String>> {
        self.call::<(), String>(method::CAPTCHA_NEW, None).await
    }

    /// Authenticate. `Ok(())` only on a `"done"` result.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<()> {
        let captcha = credentials
            .captcha_answer
            .as_ref()
            .map(|answer| CaptchaParams {
                text: answer.text(),
                url: answer.relative_url(),
            });
        let params = LoginParams {
            id: &credentials.id,
            pw: &credentials.password,
            captcha,
        };

        let envelope = self
            .call::<_, serde_json::Value>(method::SESSION_LOGIN, Some(params))
            .await?;

        match envelope.into_result() {
            Ok(Some(serde_json::Value::String(s))) if s == LOGIN_DONE => Ok(()),
            Ok(other) => {
                tracing::debug!("[{}] login result: {:?}", self.address(), other);
                Err(GatewayError::LoginRejected)
            }
            // A wrong captcha answer comes back as another captcha demand
            Err(e) if e.is_captcha_required() => Err(GatewayError::LoginRejected),
            Err(e) => Err(GatewayError::protocol(e.code, e.message)),
        }
    }

    /// Configured DDNS entries, possibly empty
    pub async fn ddns_config(&self) -> Result<Vec<DdnsRecord>> {
        self.call::<_, Vec<DdnsRecord>>(method::DDNS_CONFIG, Some(DDNS_PROVIDER))
            .await?
            .into_result()
            .map(Option::unwrap_or_default)
            .map_err(|e| GatewayError::protocol(e.code, e.message))
    }
}
