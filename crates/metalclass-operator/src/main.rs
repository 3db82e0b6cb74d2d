//! Metalclass Operator
//!
//! Keeps MachineClass status up to date with the Machine inventory.

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use kube::CustomResourceExt;
use metalclass_operator::{
    config::{OperatorConfig, RunArgs},
    controllers::{Context, MachineClassController},
    crds::{Machine, MachineClass},
    observability,
    reconcile::ClassReconciler,
    store::KubeStore,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "metalclass-operator")]
#[command(about = "Kubernetes operator matching bare-metal machines against hardware classes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print CRD manifests to stdout
    Crds,
    /// Run the operator
    Run(RunArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Crds => print_crds(),
        Commands::Run(args) => run_operator(args.into()).await,
    }
}

fn print_crds() -> anyhow::Result<()> {
    println!("---");
    println!("{}", serde_yaml::to_string(&Machine::crd())?);
    println!("---");
    println!("{}", serde_yaml::to_string(&MachineClass::crd())?);
    Ok(())
}

async fn run_operator(config: OperatorConfig) -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    observability::init_logging(config.log_format)?;
    if let Some(addr) = config.metrics_addr {
        observability::init_metrics(addr)?;
    }

    info!(
        concurrency = config.concurrency,
        resync_secs = config.resync_interval.as_secs(),
        "Starting metalclass-operator"
    );

    let client = kube::Client::try_default().await?;
    info!("Connected to Kubernetes");

    let store = Arc::new(KubeStore::new(client.clone()));
    let reconciler = ClassReconciler::new(store, config.store_timeout);
    let ctx = Arc::new(Context::new(reconciler, config));

    MachineClassController::run(client, ctx).await;

    Ok(())
}
