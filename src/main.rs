//! LKE operator command line

use clap::{Parser, Subcommand};
use kube::CustomResourceExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lke_operator::config::ControllerConfig;
use lke_operator::crd::LkeClusterConfig;

/// LKE operator - declarative Linode Kubernetes Engine clusters
#[derive(Parser, Debug)]
#[command(name = "lke-operator", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate an LKEClusterConfig manifest without contacting any API
    Validate(ValidateArgs),
    /// Print the controller settings resolved from flags and environment
    Config(ControllerConfig),
}

/// Validate mode arguments
#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Path to the LKEClusterConfig YAML file
    #[arg(short = 'f', long = "file")]
    file: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&LkeClusterConfig::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    match cli.command {
        Some(Commands::Validate(args)) => run_validate(args).await,
        Some(Commands::Config(config)) => {
            print!("{}", render_config(&config));
            Ok(())
        }
        None => {
            anyhow::bail!(
                "no command given; use --crd to print the CRD, `validate -f <file>` to check a manifest or `config` to show controller settings"
            )
        }
    }
}

/// Parse and validate a manifest file
async fn run_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {:?}: {}", args.file, e))?;

    let cluster: LkeClusterConfig = serde_yaml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse LKEClusterConfig: {}", e))?;

    cluster
        .spec
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid LKEClusterConfig: {}", e))?;

    tracing::info!(
        pools = cluster.spec.node_pools.len(),
        region = %cluster.spec.region,
        "manifest is valid"
    );
    println!("ok");
    Ok(())
}

/// Effective controller settings, one `key: value` per line
fn render_config(config: &ControllerConfig) -> String {
    let backoff = config.backoff();
    format!(
        "requeueInterval: {}s\nresyncInterval: {}s\nwatchNamespace: {}\nbackoffInitial: {}s\nbackoffMax: {}s\n",
        config.requeue_interval().as_secs(),
        config.resync_interval().as_secs(),
        config.watch_namespace.as_deref().unwrap_or("<all>"),
        backoff.initial_delay.as_secs(),
        backoff.max_delay.as_secs(),
    )
}
