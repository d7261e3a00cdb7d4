// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `steamctl`: a thin embedder binary over the `steamcore` library — logs
//! in one or more accounts, wires up the sample feature modules, and
//! blocks until every account's Client has stopped.

use std::sync::Arc;

use clap::Parser;

use steamcore::client;
use steamcore::config::{AccountConfig, ClientConfig};
use steamcore::connection::StaticEndpointProvider;
use steamcore::datafile::{DataFile, Prefix};
use steamcore::module;
use steamcore::ui::{NullUi, PromptKind, Ui};
use steamcore::web::ReqwestHttpClient;

#[derive(Parser)]
#[command(name = "steamctl", version, about = "Runs one or more Steam accounts against the steamcore library.")]
struct Cli {
    /// Account name(s) to log in. Each gets its own Client.
    #[arg(required = true)]
    accounts: Vec<String>,

    #[command(flatten)]
    config: ClientConfig,

    /// Never prompt for credentials; only accounts with a cached refresh
    /// token in their data file will be able to log in.
    #[arg(long)]
    headless: bool,
}

/// Reads prompts from stdin, writes output lines to stdout.
struct TerminalUi;

#[async_trait::async_trait(?Send)]
impl Ui for TerminalUi {
    fn output_text(&self, line: &str) {
        println!("{line}");
    }

    async fn request(&self, kind: PromptKind) -> Option<String> {
        let label = match kind {
            PromptKind::Password => "password",
            PromptKind::EmailGuardCode => "email guard code",
            PromptKind::DeviceGuardCode => "device guard code",
        };
        print!("{label}: ");
        use std::io::Write as _;
        std::io::stdout().flush().ok()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).ok()?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let shared_datafile = Arc::new(DataFile::open(&cli.config.state_dir, Prefix::Steam, "shared"));
    let endpoint_provider: Arc<dyn steamcore::connection::EndpointProvider> =
        Arc::new(StaticEndpointProvider {
            addr: if cli.config.cm_host.is_empty() {
                format!("cm0.steampowered.com:{}", cli.config.cm_port)
            } else {
                format!("{}:{}", cli.config.cm_host, cli.config.cm_port)
            },
        });
    let http = Arc::new(ReqwestHttpClient::new()?);

    for account_name in &cli.accounts {
        let ui: Arc<dyn Ui> = if cli.headless { Arc::new(NullUi) } else { Arc::new(TerminalUi) };
        client::launch(
            AccountConfig::new(account_name.clone()),
            cli.config.clone(),
            shared_datafile.clone(),
            endpoint_provider.clone(),
            ui,
            http.clone(),
            module::all(),
        )
        .await?;
    }

    client::wait_all().await;
    Ok(())
}
