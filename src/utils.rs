//! Utility functions for local network checks

use anyhow::{Context, Result};
use regex::Regex;
use std::process::Command;

/// IPv4 address of the default gateway, if the host has a default route
pub fn default_gateway() -> Result<Option<String>> {
    let output = Command::new("ip")
        .args(["-4", "route", "show", "default"])
        .output()
        .context("Failed to run `ip route`")?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_default_route(&stdout))
}

/// Extract the gateway from `ip -4 route show default` output
pub fn parse_default_route(output: &str) -> Option<String> {
    let re = Regex::new(r"(?m)^default\s+via\s+(\d{1,3}(?:\.\d{1,3}){3})\b").ok()?;
    re.captures(output)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_route() {
        let output = "default via 192.168.0.1 dev wlp2s0 proto dhcp src 192.168.0.23 metric 600\n";
        assert_eq!(parse_default_route(output).as_deref(), Some("192.168.0.1"));
    }

    #[test]
    fn test_first_default_route_wins() {
        let output = "\
default via 10.0.0.1 dev eth0 proto static metric 100
default via 192.168.0.1 dev wlan0 proto dhcp metric 600
";
        assert_eq!(parse_default_route(output).as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_no_default_route() {
        assert_eq!(parse_default_route(""), None);
        assert_eq!(parse_default_route("default dev wg0 scope link\n"), None);
    }
}
