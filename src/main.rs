mod app;
mod config;
mod dispatch;
mod query;
mod report;
mod source;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use app::Sleuth;
use config::Config;
use query::{Category, Query, ValidationError, validate, validate_image};

#[derive(Parser, Debug)]
#[command(
    name = "sleuth",
    version,
    about = "Look up one identifier across several public sources"
)]
struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Indian mobile number (10-12 digits, optional +91)
    Phone { number: String },
    /// Vehicle registration plate, e.g. MH12AB1234
    Vehicle { plate: String },
    /// IPv4 address
    Ip { address: String },
    /// IFSC bank branch code
    Bank { ifsc: String },
    /// Free-text leak search (email, name, username, number)
    Leak { term: String },
    /// Image file to inspect for metadata and text
    Image { path: PathBuf },
}

impl Commands {
    async fn into_query(self) -> Result<Query, Box<dyn std::error::Error>> {
        let query = match self {
            Commands::Phone { number } => checked(&number, Category::Phone)?,
            Commands::Vehicle { plate } => checked(&plate, Category::Vehicle)?,
            Commands::Ip { address } => checked(&address, Category::Ip)?,
            Commands::Bank { ifsc } => checked(&ifsc, Category::BankCode)?,
            Commands::Leak { term } => checked(&term, Category::FreeText)?,
            Commands::Image { path } => {
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                validate_image(&name, bytes).inspect_err(log_rejection)?
            }
        };
        Ok(query)
    }
}

fn checked(raw: &str, category: Category) -> Result<Query, ValidationError> {
    validate(raw, category).inspect_err(log_rejection)
}

fn log_rejection(e: &ValidationError) {
    warn!(reason = e.reason(), "input rejected before dispatch");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sleuth=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let query = cli.command.into_query().await?;
    info!(category = %query.category, input = %query.raw, "starting lookup");

    let report = Sleuth::new(&config)?.lookup(&query).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report::format::render_text(&report));
    }
    Ok(())
}
