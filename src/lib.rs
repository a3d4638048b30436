//! Onboarding client for LAN gateways that speak the `/cgi/service.cgi`
//! JSON-RPC management protocol.
//!
//! The flow lives in [`workflow::LoginWorkflow`]: probe for a captcha
//! requirement, log in (with the captcha answer when asked), read DDNS
//! settings and the external IP, and assemble a [`record::DeviceRecord`]
//! for a [`store::DeviceStore`].

pub mod captcha;
pub mod config;
pub mod discovery;
pub mod error;
pub mod http;
pub mod models;
pub mod protocol;
pub mod public_ip;
pub mod record;
pub mod store;
pub mod utils;
pub mod workflow;

pub use error::GatewayError;
pub use workflow::{LoginWorkflow, WorkflowError, WorkflowState};
