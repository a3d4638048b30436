//! gwonboard - onboarding client for LAN gateways
//!
//! Logs into a gateway's management API (answering its captcha when it asks
//! for one), reads its DDNS setup and saves the result as a device record.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use gwonboard::config::Config;
use gwonboard::http::GatewaySession;
use gwonboard::protocol::{Credentials, GatewayClient};
use gwonboard::public_ip::HttpIpLookup;
use gwonboard::record::DeviceForm;
use gwonboard::store::{DeviceId, DeviceStore, JsonFileStore};
use gwonboard::{discovery, utils, LoginWorkflow, WorkflowError, WorkflowState};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gwonboard", version)]
#[command(about = "Gateway onboarding client", long_about = None)]
struct Cli {
    /// Config file path (default: gwonboard.toml, then ~/.config/gwonboard/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the product name of gateways (default: this host's default gateway)
    Discover {
        /// Gateway addresses to query
        gateways: Vec<String>,
    },
    /// Log into a gateway and save it as a device
    Add(AddArgs),
    /// List saved devices
    List,
    /// Delete a saved device
    Delete {
        id: DeviceId,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Args, Debug)]
struct AddArgs {
    /// Gateway address (default: this host's default gateway)
    #[arg(short, long)]
    gateway: Option<String>,

    /// Display name for the device (default: the gateway address)
    #[arg(short, long)]
    name: Option<String>,

    /// Management login id
    #[arg(long, default_value = "admin")]
    id: String,

    /// Management password (prompted when omitted)
    #[arg(long)]
    password: Option<String>,

    /// Management web port
    #[arg(long, default_value = "80")]
    port: String,

    /// Remote access port reachable through DDNS
    #[arg(long, default_value = "")]
    remote_port: String,

    /// DDNS address, when the gateway reports none
    #[arg(long, default_value = "")]
    ddns_address: String,

    /// DDNS status note
    #[arg(long, default_value = "")]
    ddns_status: String,

    /// External IP override
    #[arg(long, default_value = "")]
    external_ip: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let cfg = Config::load(cli.config.as_deref())?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level)),
        )
        .init();

    tracing::debug!("gwonboard v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Command::Discover { gateways } => run_discover(&cfg, gateways).await,
        Command::Add(args) => run_add(&cfg, args).await,
        Command::List => run_list(&cfg).await,
        Command::Delete { id } => run_delete(&cfg, id).await,
        Command::Config => {
            print!("{}", cfg.to_toml()?);
            Ok(())
        }
    };

    // Single place that reacts to a gateway dropping the session
    if let Err(ref e) = result {
        if let Some(WorkflowError::SessionInvalidated) = e.downcast_ref::<WorkflowError>() {
            tracing::error!("Gateway session is no longer valid");
            eprintln!("The gateway ended the session. Run `gwonboard add` again to log in.");
            std::process::exit(2);
        }
    }
    result
}

async fn run_discover(cfg: &Config, mut gateways: Vec<String>) -> Result<()> {
    if gateways.is_empty() {
        match utils::default_gateway()? {
            Some(gateway) => gateways.push(gateway),
            None => bail!("No default gateway found; pass gateway addresses explicitly"),
        }
    }

    for found in discovery::probe_product_names(&gateways, &cfg.http).await {
        match found.product_name {
            Ok(Some(name)) => println!("{:<21} {}", found.address, name),
            Ok(None) => println!("{:<21} (unnamed)", found.address),
            Err(e) => println!("{:<21} unavailable: {}", found.address, e),
        }
    }
    Ok(())
}

async fn run_add(cfg: &Config, args: AddArgs) -> Result<()> {
    let gateway = match args.gateway {
        Some(gateway) => gateway,
        None => utils::default_gateway()?
            .context("No default gateway found; pass --gateway")?,
    };
    let mut prompt = Prompt::new();
    let password = match args.password {
        Some(password) => password,
        None => prompt.ask("Password: ").await?,
    };

    let mut form = DeviceForm {
        name: args.name.unwrap_or_else(|| gateway.clone()),
        management_port: args.port,
        external_ip_address: args.external_ip,
        ddns_address: args.ddns_address,
        ddns_status: args.ddns_status,
        remote_access_port: args.remote_port,
    };

    let session = GatewaySession::new(gateway.as_str(), &cfg.http)?;
    let lookup = Arc::new(HttpIpLookup::new(cfg.public_ip.url.as_str(), &cfg.http)?);
    let mut workflow = LoginWorkflow::new(GatewayClient::new(session), lookup, form.clone());

    let captcha_url = match workflow.start(Credentials::new(args.id, password)).await? {
        WorkflowState::CaptchaPending(challenge) => Some(challenge.display_url().to_string()),
        _ => None,
    };
    if let Some(url) = captcha_url {
        println!("The gateway asks for a captcha. Open this image: {}", url);
        let answer = prompt.ask("Captcha: ").await?;
        if answer.is_empty() {
            workflow.cancel();
            bail!("No captcha answer given, onboarding cancelled");
        }
        workflow.submit(&answer).await?;
    }
    fail_on_error(workflow.state())?;

    workflow.fetch_ddns().await?;
    let done = match workflow.state() {
        WorkflowState::Ready(done) => done,
        other => {
            fail_on_error(other)?;
            bail!("Onboarding stopped while {}", other.kind());
        }
    };

    println!("External IP: {}", done.ddns.external_ip);
    let record = if !done.ddns_known() && form.ddns_address.trim().is_empty() {
        println!("The gateway has no DDNS address registered.");
        form.ddns_address = prompt.ask("DDNS address (blank to skip): ").await?;
        if form.remote_access_port.trim().is_empty() {
            form.remote_access_port = prompt.ask("Remote access port (blank to skip): ").await?;
        }
        done.reassemble(&form)
    } else {
        done.record.clone()
    };

    let store = JsonFileStore::open(&cfg.store.path)
        .await
        .with_context(|| format!("Failed to open store {}", cfg.store.path.display()))?;
    let id = store.insert(record.clone()).await.context("Failed to save device")?;

    tracing::info!("Device '{}' saved as #{}", record.name, id);
    println!("Saved '{}' as #{} ({})", record.name, id, record.management_url());
    if let Some(remote) = record.remote_url() {
        println!("Remote access: {}", remote);
    }
    Ok(())
}

fn fail_on_error(state: &WorkflowState) -> Result<()> {
    if let WorkflowState::Error(e) = state {
        bail!("Onboarding failed: {}", e);
    }
    Ok(())
}

async fn run_list(cfg: &Config) -> Result<()> {
    let store = JsonFileStore::open(&cfg.store.path).await?;
    let devices = store.list_all().await?;
    if devices.is_empty() {
        println!("No saved devices ({})", store.path().display());
        return Ok(());
    }

    for device in devices {
        let r = &device.record;
        println!(
            "#{:<4} {:<20} {:<26} ddns: {}",
            device.id,
            r.name,
            r.management_url(),
            r.ddns_address.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn run_delete(cfg: &Config, id: DeviceId) -> Result<()> {
    let store = JsonFileStore::open(&cfg.store.path).await?;
    if store.delete_by_id(id).await? {
        println!("Deleted #{}", id);
        Ok(())
    } else {
        bail!("No device with id {}", id)
    }
}

/// Line-based prompts on stdin
struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn ask(&mut self, label: &str) -> Result<String> {
        print!("{}", label);
        std::io::stdout().flush()?;
        let line = self
            .lines
            .next_line()
            .await?
            .context("stdin closed")?;
        Ok(line.trim().to_string())
    }
}
