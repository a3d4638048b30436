//! Identify gateways by their product name
//!
//! Lookups for different gateways run concurrently, each on its own
//! [`GatewaySession`]; no session state is shared between them.

use crate::config::HttpConfig;
use crate::error::{GatewayError, Result};
use crate::http::GatewaySession;
use crate::protocol::GatewayClient;
use tokio::task::JoinSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredGateway {
    pub address: String,
    pub product_name: Result<Option<String>>,
}

/// Ask every address for its product name; results keep the input order
pub async fn probe_product_names(addresses: &[String], http: &HttpConfig) -> Vec<DiscoveredGateway> {
    let mut tasks = JoinSet::new();
    for (index, address) in addresses.iter().cloned().enumerate() {
        let http = http.clone();
        tasks.spawn(async move {
            let product_name = product_name(&address, &http).await;
            (index, DiscoveredGateway { address, product_name })
        });
    }

    let mut found = Vec::with_capacity(addresses.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(entry) => found.push(entry),
            Err(e) => tracing::error!("Product name lookup task failed: {}", e),
        }
    }
    found.sort_by_key(|(index, _)| *index);
    found.into_iter().map(|(_, gateway)| gateway).collect()
}

async fn product_name(address: &str, http: &HttpConfig) -> Result<Option<String>> {
    tracing::debug!("Attempting to get product name for {}", address);
    let client = GatewayClient::new(GatewaySession::new(address, http)?);
    let name = client.product_name().await;
    match &name {
        Ok(Some(name)) => tracing::debug!("Product name for {}: {}", address, name),
        Ok(None) => tracing::debug!("{} did not report a product name", address),
        Err(GatewayError::Unauthenticated) => {
            tracing::warn!("{} requires login before reporting its product name", address)
        }
        Err(e) => tracing::warn!("Failed to get product name for {}: {}", address, e),
    }
    name
}
