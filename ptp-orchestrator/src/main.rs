//! ptp
//!
//! Command line client for the pump API and the claim flow.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ptp_common::EthAmount;
use ptp_orchestrator::{ClaimSession, HttpPumpDirectory, OrchestratorConfig, PumpDirectory, VerifyOutcome};
use ptp_prover::TemplateProver;
use ptp_verifier::{ArtifactVerifier, OnchainVerifier, SimulatedVerifier};
use ptp_wallet_state::{JsonRpcWalletProvider, WalletSession};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "ptp", about = "Create pumps and prove eligibility to join them")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List or create pumps.
    #[command(subcommand)]
    Pumps(PumpsCommand),
    /// Connect the wallet, prove the balance meets a pump's threshold and join it.
    Claim(ClaimArgs),
}

#[derive(Subcommand)]
enum PumpsCommand {
    /// Print all pumps, newest first.
    List,
    /// Create a pump owned by the connected wallet.
    Create(CreateArgs),
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long)]
    name: String,
    /// Minimum ETH balance a participant must prove, e.g. 0.01.
    #[arg(long)]
    required_eth: EthAmount,
    #[arg(long)]
    description: Option<String>,
}

#[derive(Args)]
struct ClaimArgs {
    /// Pump id.
    #[arg(long)]
    pump: Uuid,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ptp_orchestrator=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = OrchestratorConfig::from_env()?;

    match cli.command {
        Commands::Pumps(PumpsCommand::List) => list_pumps(&config).await,
        Commands::Pumps(PumpsCommand::Create(args)) => create_pump(&config, args).await,
        Commands::Claim(args) => claim(&config, args).await,
    }
}

fn build_session(config: &OrchestratorConfig) -> Result<(ClaimSession, Arc<JsonRpcWalletProvider>)> {
    let provider = Arc::new(JsonRpcWalletProvider::new(&config.rpc_url)?);
    let wallet = Arc::new(Mutex::new(WalletSession::new(provider.clone())));
    let directory = Arc::new(HttpPumpDirectory::new(config.api_url.clone())?);
    let prover = Arc::new(TemplateProver::new(config.proof_delay)?);

    let verifier: Arc<dyn ArtifactVerifier> = match config.verifier_address {
        Some(contract) => {
            info!(contract = ?contract, "using on-chain verifier");
            Arc::new(OnchainVerifier::new(&config.rpc_url, contract)?)
        }
        None => Arc::new(SimulatedVerifier::new(config.verify_delay)),
    };

    Ok((ClaimSession::new(wallet, directory, prover, verifier), provider))
}

async fn list_pumps(config: &OrchestratorConfig) -> Result<()> {
    let directory = HttpPumpDirectory::new(config.api_url.clone())?;
    let pumps = directory
        .list()
        .await
        .context("failed to list pumps")?;
    println!("{}", serde_json::to_string_pretty(&pumps)?);
    Ok(())
}

async fn create_pump(config: &OrchestratorConfig, args: CreateArgs) -> Result<()> {
    let (session, _) = build_session(config)?;
    session.connect_wallet().await.context("failed to connect wallet")?;

    let pump = session
        .create_pump(&args.name, args.description.as_deref(), args.required_eth)
        .await?;
    println!("{}", serde_json::to_string_pretty(&pump)?);
    Ok(())
}

async fn claim(config: &OrchestratorConfig, args: ClaimArgs) -> Result<()> {
    let (session, provider) = build_session(config)?;

    let wallet = session.connect_wallet().await.context("failed to connect wallet")?;
    println!(
        "connected {} with {} ETH",
        wallet.short_address().unwrap_or_default(),
        wallet.balance.unwrap_or_default()
    );

    let poller = provider.spawn_change_poller(config.poll_interval);
    let watch = WalletSession::watch(session.wallet()).await?;

    session.refresh_pumps().await?;
    let pump = session.select_pump(args.pump)?;
    println!("pump '{}' requires {} ETH", pump.name, pump.required_eth);

    let result = run_claim(&session).await;

    watch.unsubscribe();
    poller.abort();
    result
}

async fn run_claim(session: &ClaimSession) -> Result<()> {
    let Some(outcome) = session.generate_proof().await? else {
        bail!("pump selection changed during proof generation");
    };
    if !outcome.eligible {
        println!("not eligible: insufficient ETH balance");
        return Ok(());
    }
    println!("eligible, proof generated at {}", outcome.generated_at);

    match session.verify_proof().await? {
        VerifyOutcome::Registered(pump) => {
            println!(
                "proof verified; '{}' now has {} participant(s)",
                pump.name,
                pump.participants.len()
            );
            Ok(())
        }
        VerifyOutcome::Rejected => bail!("proof verification failed"),
        VerifyOutcome::Stale => bail!("pump selection changed during verification"),
    }
}
