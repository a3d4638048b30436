//! Wire models for the gateway's `/cgi/service.cgi` JSON-RPC endpoint

use serde::{Deserialize, Deserializer, Serialize};

/// Session expired or missing
pub const CODE_UNAUTHENTICATED: i64 = -31998;
/// Login needs a captcha (only when `data` carries [`CAPTCHA_TOKEN`])
pub const CODE_CAPTCHA_REQUIRED: i64 = -31997;
pub const CAPTCHA_TOKEN: &str = "captcha";
const UNAUTHENTICATED_MESSAGE: &str = "Unauthenticated";

pub mod method {
    pub const PRODUCT_NAME: &str = "product/name";
    pub const SESSION_LOGIN: &str = "session/login";
    pub const CAPTCHA_NEW: &str = "captcha/new";
    pub const DDNS_CONFIG: &str = "ddns/config";
}

/// Provider argument the gateway expects for `ddns/config`
pub const DDNS_PROVIDER: &str = "iptime";

/// Request body: `{"method": "...", "params": ...}`, params omitted when absent
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, P: Serialize> {
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<P>,
}

/// `{result, error}` wrapper around every response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope<T> {
    pub result: Option<T>,
    pub error: Option<ErrorInfo>,
}

impl<T> Envelope<T> {
    pub fn into_result(self) -> std::result::Result<Option<T>, ErrorInfo> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorInfo {
    pub code: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<String>,
}

impl ErrorInfo {
    pub fn is_unauthenticated(&self) -> bool {
        self.code == CODE_UNAUTHENTICATED && self.message == UNAUTHENTICATED_MESSAGE
    }

    pub fn is_captcha_required(&self) -> bool {
        self.code == CODE_CAPTCHA_REQUIRED && self.data.iter().any(|d| d == CAPTCHA_TOKEN)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `session/login` params
#[derive(Debug, Clone, Serialize)]
pub struct LoginParams<'a> {
    pub id: &'a str,
    pub pw: &'a str,
    pub captcha: Option<CaptchaParams<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptchaParams<'a> {
    pub text: &'a str,
    pub url: &'a str,
}

/// Result value of a successful `session/login`
pub const LOGIN_DONE: &str = "done";

/// One entry of `ddns/config`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DdnsRecord {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub host: Option<String>,
    pub id: Option<String>,
    #[serde(alias = "wanName")]
    pub wan_name: Option<String>,
}
