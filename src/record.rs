//! Final device record and the merge that produces it

use crate::models::DdnsRecord;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MANAGEMENT_PORT: u16 = 80;
/// Shown when a best-effort lookup produced nothing
pub const UNKNOWN: &str = "Unknown";
pub const DDNS_REGISTERED: &str = "Registered";

/// A gateway profile ready to be stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub name: String,
    pub ip_address: String,
    pub management_port: u16,
    pub login_id: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddns_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddns_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_access_port: Option<u16>,
}

impl DeviceRecord {
    /// Web management console of the gateway on the LAN
    pub fn management_url(&self) -> String {
        format!("http://{}:{}/", self.ip_address, self.management_port)
    }

    /// Web management console through DDNS, when both parts are known
    pub fn remote_url(&self) -> Option<String> {
        let host = self.ddns_address.as_deref().filter(|h| *h != UNKNOWN)?;
        Some(format!("http://{}:{}/", host, self.remote_access_port?))
    }
}

/// What the user typed, as raw text
#[derive(Debug, Clone, Default)]
pub struct DeviceForm {
    pub name: String,
    pub management_port: String,
    pub external_ip_address: String,
    pub ddns_address: String,
    pub ddns_status: String,
    pub remote_access_port: String,
}

/// Address and credentials the gateway accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginInputs {
    pub ip_address: String,
    pub login_id: String,
    pub password: String,
}

/// Result of the post-login lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdnsOutcome {
    /// Public IP, or [`UNKNOWN`] when the lookup failed
    pub external_ip: String,
    /// First DDNS entry the gateway reported
    pub record: Option<DdnsRecord>,
}

impl DdnsOutcome {
    pub fn is_known(&self) -> bool {
        self.record.is_some()
    }

    pub fn ddns_address(&self) -> Option<&str> {
        self.record
            .as_ref()
            .map(|r| r.host.as_deref().filter(|h| !h.trim().is_empty()).unwrap_or(UNKNOWN))
    }
}

/// Merge login inputs, the DDNS outcome and user-typed fields.
///
/// Non-blank user text wins over looked-up values.
pub fn assemble(login: &LoginInputs, ddns: &DdnsOutcome, form: &DeviceForm) -> DeviceRecord {
    let looked_up_ip = Some(ddns.external_ip.as_str()).filter(|ip| *ip != UNKNOWN);

    DeviceRecord {
        name: form.name.trim().to_string(),
        ip_address: login.ip_address.clone(),
        management_port: parse_port(&form.management_port).unwrap_or(DEFAULT_MANAGEMENT_PORT),
        login_id: login.login_id.clone(),
        password: login.password.clone(),
        external_ip_address: non_blank(&form.external_ip_address).or(non_blank_opt(looked_up_ip)),
        ddns_address: non_blank(&form.ddns_address).or(non_blank_opt(ddns.ddns_address())),
        ddns_status: non_blank(&form.ddns_status)
            .or_else(|| ddns.is_known().then(|| DDNS_REGISTERED.to_string())),
        remote_access_port: parse_port(&form.remote_access_port),
    }
}

fn parse_port(text: &str) -> Option<u16> {
    text.trim().parse::<u16>().ok().filter(|p| *p != 0)
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn non_blank_opt(text: Option<&str>) -> Option<String> {
    text.and_then(non_blank)
}
