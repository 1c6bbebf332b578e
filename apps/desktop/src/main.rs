use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use client_core::{
    settings::load_tip_settings, JsonRpcWallet, TipClient, TipClientEvent, TipClientSnapshot,
    TipDraft, TxStatus, WalletProvider,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Send tips to the TipJar contract through a local wallet")]
struct Args {
    /// Directory holding an optional tipjar.toml.
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,
    /// Overrides the wallet JSON-RPC endpoint from settings.
    #[arg(long)]
    wallet_rpc_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Request wallet access and print the connected account.
    Connect,
    /// Connect, then send one tip and wait for it to confirm.
    Tip {
        #[arg(long, default_value = "")]
        message: String,
        #[arg(long)]
        amount: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_tip_settings(&args.config_dir);
    if let Some(url) = args.wallet_rpc_url.as_deref() {
        settings.wallet_rpc_url = url.parse()?;
    }

    let explorer_tx_base = settings.explorer_tx_base.clone();
    let wallet: Arc<dyn WalletProvider> = JsonRpcWallet::new(
        settings.wallet_rpc_url.clone(),
        settings.account_poll_interval,
    );
    let client = TipClient::new(Some(wallet), settings)?;
    let mut events = client.subscribe_events();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                TipClientEvent::StateChanged(snapshot) => println!("{}", snapshot.status_text),
                TipClientEvent::Prompt(prompt) => eprintln!("{prompt}"),
            }
        }
    });

    let outcome = run(&client, args.command).await;
    // The event stream closes with the client; the printer drains it first.
    drop(client);
    let _ = printer.await;

    match outcome? {
        Some(snapshot) => report(&snapshot, &explorer_tx_base),
        None => Ok(()),
    }
}

/// Connects and, for `tip`, sends one tip. Returns the settled snapshot of a tip.
async fn run(client: &TipClient, command: Command) -> Result<Option<TipClientSnapshot>> {
    client.connect().await?;
    let connected = client.snapshot().await;
    if !connected.wallet.is_connected() {
        return Err(anyhow!("{}", connected.status_text));
    }

    let Command::Tip { message, amount } = command else {
        return Ok(None);
    };
    println!("Tipping contract {}", client.contract_address());
    let amount = amount.unwrap_or_else(|| client.settings().default_amount.clone());
    client.send_tip_with(TipDraft { message, amount }).await?;
    Ok(Some(client.snapshot().await))
}

fn report(snapshot: &TipClientSnapshot, explorer_tx_base: &str) -> Result<()> {
    if let Some(hash) = snapshot.tx_hash() {
        println!("Tx: {} ({})", hash.abbreviated(), hash.explorer_url(explorer_tx_base));
    }
    match snapshot.status() {
        TxStatus::Confirmed => Ok(()),
        _ => Err(anyhow!("{}", snapshot.status_text)),
    }
}
