//! Warehouse connectivity and schema commands.

use clap::Subcommand;
use sqlx::PgPool;
use tgmed_core::AppConfig;

#[derive(Debug, Subcommand)]
pub(crate) enum DbCommands {
    /// Apply pending schema migrations
    Migrate,
    /// Check warehouse connectivity
    Ping,
}

/// Connect a pool with the configured limits.
pub(crate) async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool_config = tgmed_db::PoolConfig::from_app_config(config);
    let pool = tgmed_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

pub(crate) async fn run(config: &AppConfig, command: DbCommands) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    match command {
        DbCommands::Migrate => {
            let applied = tgmed_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Ping => {
            tgmed_db::health_check(&pool).await?;
            println!("warehouse reachable");
        }
    }
    Ok(())
}
