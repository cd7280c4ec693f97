use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "depot-backend", version)]
#[command(about = "Warehouse parcel lifecycle server")]
struct Args {
    /// Config file; falls back to DEPOT_CONFIG, then ./config.toml
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    backend_bootstrap::run_standalone(args.config).await
}
