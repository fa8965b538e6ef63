mod products;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "solestock-cli")]
#[command(about = "Solestock operator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Bulk product import and export
    Products {
        #[command(subcommand)]
        command: ProductCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Load sample grade templates; existing grades are updated by name
    SeedGrades {
        /// YAML file to load instead of the configured sample file
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
enum ProductCommands {
    /// Import product rows from a JSON array file
    Import {
        #[arg(long)]
        file: PathBuf,
        /// Validate and print the row count without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Export every SKU'd product variant as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("solestock-cli: run with --help to list commands");
        return Ok(());
    };

    let config = solestock_core::load_app_config()?;
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = solestock_db::PoolConfig::from_app_config(&config);
    let pool = solestock_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                solestock_db::health_check(&pool).await?;
                println!("database ok");
            }
            DbCommands::Migrate => {
                solestock_db::run_migrations(&pool).await?;
                println!("migrations applied");
            }
            DbCommands::SeedGrades { path } => {
                let path = path.unwrap_or_else(|| config.sample_grades_path.clone());
                let file = solestock_core::load_sample_grades(&path)?;
                let seeded = solestock_db::seed_sample_grades(&pool, &file).await?;
                println!("seeded {seeded} grade(s) from {}", path.display());
            }
        },
        Commands::Products { command } => match command {
            ProductCommands::Import { file, dry_run } => {
                products::run_import(&pool, &file, dry_run).await?;
            }
            ProductCommands::Export { output } => {
                products::run_export(&pool, output.as_deref()).await?;
            }
        },
    }

    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests;
