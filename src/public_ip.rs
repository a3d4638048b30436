//! External IP lookup through a plain-text "what is my IP" service

use crate::config::HttpConfig;
use crate::error::{GatewayError, Result};
use crate::http::build_client;
use crate::record::UNKNOWN;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::net::IpAddr;

#[async_trait]
pub trait PublicIpLookup: Send + Sync {
    async fn public_ip(&self) -> Result<IpAddr>;
}

/// Lookup against a service that answers GET with the caller's IP as text
pub struct HttpIpLookup {
    url: String,
    client: reqwest::Client,
}

impl HttpIpLookup {
    pub fn new(url: impl Into<String>, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            url: url.into(),
            client: build_client(http, HeaderMap::new(), None)?,
        })
    }
}

#[async_trait]
impl PublicIpLookup for HttpIpLookup {
    async fn public_ip(&self) -> Result<IpAddr> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(GatewayError::network(format!("HTTP error: {}", resp.status())));
        }

        let text = resp.text().await?;
        let text = text.trim();
        text.parse()
            .map_err(|_| GatewayError::network(format!("Invalid IP address: {}", text)))
    }
}

/// Best-effort lookup: any failure is logged and becomes [`UNKNOWN`]
pub async fn public_ip_or_unknown(lookup: &dyn PublicIpLookup) -> String {
    match lookup.public_ip().await {
        Ok(ip) => ip.to_string(),
        Err(e) => {
            tracing::warn!("External IP lookup failed, continuing without it: {}", e);
            UNKNOWN.to_string()
        }
    }
}
