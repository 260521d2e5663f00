use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod period;
mod pipeline;

#[derive(Debug, Parser)]
#[command(name = "adlens")]
#[command(about = "AdReal attribution pipeline: fetch, attribute, load")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch, attribute, and load one reporting month into the warehouse
    Run {
        /// Reporting month as YYYY-MM; defaults to the previous calendar month
        #[arg(long)]
        month: Option<String>,
        /// Stop before the warehouse load and report row counts only
        #[arg(long)]
        dry_run: bool,
    },
    /// Fetch and transform, printing a sample of the conformed table
    Preview {
        /// Reporting month as YYYY-MM; defaults to the previous calendar month
        #[arg(long)]
        month: Option<String>,
        /// Number of rows to print
        #[arg(long, default_value_t = 20)]
        rows: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = adlens_core::load_app_config()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { month, dry_run } => {
            pipeline::run(&config, month.as_deref(), dry_run).await
        }
        Commands::Preview { month, rows } => {
            pipeline::preview(&config, month.as_deref(), rows).await
        }
    }
}
