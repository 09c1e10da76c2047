//! Customer Sync CLI - one-shot ingestion and store inspection.
//!
//! # Usage
//!
//! ```bash
//! # Create the customers table if missing
//! cs-cli schema
//!
//! # Run one full ingestion from the configured upstream
//! cs-cli ingest
//!
//! # Inspect stored customers
//! cs-cli customers get CUST001
//! cs-cli customers list --page 2 --limit 5
//! ```
//!
//! # Commands
//!
//! - `schema` - Create the `customers` table
//! - `ingest` - Fetch, reconcile and commit one run; prints the run stats
//! - `customers get` / `customers list` - Print stored records as JSON
//!
//! Configuration comes from the same environment variables as the pipeline
//! service (`DATABASE_URL`, `UPSTREAM_URL`, `INGEST_*`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cs-cli")]
#[command(author, version, about = "Customer Sync CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the customers table if it does not exist
    Schema,
    /// Run one ingestion from the upstream source into the database
    Ingest,
    /// Inspect stored customers
    Customers {
        #[command(subcommand)]
        action: CustomersAction,
    },
}

#[derive(Subcommand)]
enum CustomersAction {
    /// Print one customer
    Get {
        /// Customer identifier
        customer_id: String,
    },
    /// Print one page of customers ordered by id
    List {
        /// 1-based page number
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,

        /// Customers per page
        #[arg(short, long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,
    },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays machine-readable JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "customer_sync_pipeline=info,cs_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Schema => commands::schema::create().await?,
        Commands::Ingest => commands::ingest::run().await?,
        Commands::Customers { action } => match action {
            CustomersAction::Get { customer_id } => commands::customers::get(&customer_id).await?,
            CustomersAction::List { page, limit } => {
                commands::customers::list(page, limit).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_list_defaults() {
        let cli = Cli::try_parse_from(["cs-cli", "customers", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Customers {
                action: CustomersAction::List { page: 1, limit: 10 }
            }
        ));
    }

    #[test]
    fn test_list_rejects_zero_limit() {
        assert!(Cli::try_parse_from(["cs-cli", "customers", "list", "--limit", "0"]).is_err());
    }

    #[test]
    fn test_get_requires_id() {
        assert!(Cli::try_parse_from(["cs-cli", "customers", "get"]).is_err());
        let cli = Cli::try_parse_from(["cs-cli", "customers", "get", "CUST001"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Customers {
                action: CustomersAction::Get { ref customer_id }
            } if customer_id == "CUST001"
        ));
    }
}
