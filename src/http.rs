//! Per-gateway HTTP session with an explicit cookie jar

use crate::config::HttpConfig;
use crate::error::{GatewayError, Result};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, Url};
use std::sync::Arc;

const SERVICE_PATH: &str = "/cgi/service.cgi";

/// Build a reqwest client with the shared timeouts and browser user agent
pub fn build_client(
    http: &HttpConfig,
    mut headers: HeaderMap,
    jar: Option<Arc<Jar>>,
) -> Result<Client> {
    let agent = HeaderValue::from_str(&http.user_agent)
        .map_err(|e| GatewayError::network(format!("invalid user agent: {}", e)))?;
    headers.insert(USER_AGENT, agent);
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );

    let mut builder = Client::builder()
        .timeout(http.timeout())
        .connect_timeout(http.connect_timeout())
        .default_headers(headers);
    if let Some(jar) = jar {
        builder = builder.cookie_provider(jar);
    }
    Ok(builder.build()?)
}

/// Authentication context for exactly one gateway.
///
/// Cookies the gateway sets are kept in this session's jar and replayed on
/// every later call through the same session. Sessions are never shared
/// between gateways.
pub struct GatewaySession {
    address: String,
    origin: Url,
    endpoint: Url,
    jar: Arc<Jar>,
    client: Client,
}

impl GatewaySession {
    /// Open a session for `address` (`192.168.0.1` or `host:port`)
    pub fn new(address: impl Into<String>, http: &HttpConfig) -> Result<Self> {
        let address = address.into();
        let origin = Url::parse(&format!("http://{}", address))
            .map_err(|e| GatewayError::network(format!("invalid gateway address '{}': {}", address, e)))?;
        let endpoint = origin
            .join(SERVICE_PATH)
            .map_err(|e| GatewayError::network(e.to_string()))?;

        let origin_value = format!("http://{}", address);
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, header_value(&origin_value)?);
        headers.insert(REFERER, header_value(&format!("{}/ui/", origin_value))?);

        let jar = Arc::new(Jar::default());
        let client = build_client(http, headers, Some(Arc::clone(&jar)))?;

        Ok(Self {
            address,
            origin,
            endpoint,
            jar,
            client,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Absolute form of a gateway-relative URL such as `/captcha/abc.jpg`
    pub fn resolve(&self, relative: &str) -> String {
        if relative.starts_with("http://") || relative.starts_with("https://") {
            relative.to_string()
        } else if relative.starts_with('/') {
            format!("http://{}{}", self.address, relative)
        } else {
            format!("http://{}/{}", self.address, relative)
        }
    }

    /// Whether the gateway has set any cookie on this session
    pub fn has_cookies(&self) -> bool {
        self.jar.cookies(&self.origin).is_some()
    }

    /// POST a JSON body to the service endpoint and return the raw body text
    pub async fn post_json<B: serde::Serialize + ?Sized>(&self, body: &B) -> Result<String> {
        let resp = self.client.post(self.endpoint.clone()).json(body).send().await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(GatewayError::network(format!(
                "Request failed: {} - {}",
                status,
                text.chars().take(50).collect::<String>()
            )));
        }
        Ok(text)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| GatewayError::network(format!("invalid header value '{}': {}", value, e)))
}
