mod config;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use warden_core::WardenError;
use warden_rbac::{GrantManager, Provisioner, RbacStore, Resolver, SqliteStore};

use config::Config;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Warden — role-based access-control administration")]
#[command(version)]
struct Cli {
    /// Path to the SQLite database (default: $WARDEN_DB or warden.db)
    #[arg(long)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the baseline permission catalog, roles, and grants
    Setup,
    /// Revoke every grant, then reseed the baseline
    Reset,
    /// Print the current catalog and grant state without mutating
    Verify,
    /// Grant a permission to a role (exact codes)
    Grant { role: String, permission: String },
    /// Revoke a permission from a role (exact codes)
    Revoke { role: String, permission: String },
    /// Resolve a role reference; optionally test a single permission
    Check {
        reference: String,
        permission: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let cli = Cli::parse();
    let db_path = cli.db.unwrap_or(config.db_path);
    let store: Arc<dyn RbacStore> = Arc::new(SqliteStore::open(&db_path)?);

    match cli.command {
        Commands::Setup => {
            let report = Provisioner::new(store).setup_complete().await?;
            println!(
                "created {} permissions, {} roles, {} grants",
                report.permissions_created, report.roles_created, report.grants_created
            );
        }
        Commands::Reset => {
            Provisioner::new(store).reset_permission_system().await?;
            println!("permission system reset to baseline");
        }
        Commands::Verify => {
            let report = Provisioner::new(store).verify().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Grant { role, permission } => {
            exit_on_not_found(GrantManager::new(store).grant(&role, &permission).await)?;
            println!("granted {} -> {}", role, permission);
        }
        Commands::Revoke { role, permission } => {
            exit_on_not_found(GrantManager::new(store).revoke(&role, &permission).await)?;
            println!("revoked {} -> {}", role, permission);
        }
        Commands::Check { reference, permission } => {
            let resolver = Resolver::new(store);
            match permission {
                Some(code) => {
                    let allowed = resolver.has_permission(&reference, &code).await?;
                    println!("{}", allowed);
                }
                None => {
                    let codes = resolver.resolve_permissions(&reference).await?;
                    for code in codes {
                        println!("{}", code);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Unknown catalog codes are an operator mistake, not a crash; report
/// them cleanly and exit non-zero.
fn exit_on_not_found(result: Result<(), WardenError>) -> Result<()> {
    match result {
        Err(e @ WardenError::NotFound { .. }) => {
            error!("{}", e);
            std::process::exit(2);
        }
        other => Ok(other?),
    }
}
