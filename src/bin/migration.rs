use clap::{Parser, Subcommand};
use ems_api::{config, db, migrator::Migrator};
use sea_orm_migration::MigratorTrait;
use tracing::info;

/// Schema management for the employee management database
#[derive(Parser, Debug)]
#[command(name = "migration", version, about)]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations (default)
    Up {
        /// Apply at most this many migrations
        #[arg(short = 'n', long)]
        steps: Option<u32>,
    },
    /// Roll back applied migrations
    Down {
        #[arg(short = 'n', long, default_value_t = 1)]
        steps: u32,
    },
    /// Drop every table and re-apply all migrations
    Fresh,
    /// Print which migrations are applied
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let url = cli
        .database_url
        .unwrap_or_else(|| cfg.database_url().to_string());
    info!("Connecting to database");
    let pool = db::establish_connection(&url).await?;

    match cli.command.unwrap_or(Command::Up { steps: None }) {
        Command::Up { steps } => {
            Migrator::up(&pool, steps).await?;
            info!("Migrations applied");
        }
        Command::Down { steps } => {
            Migrator::down(&pool, Some(steps)).await?;
            info!(steps, "Migrations rolled back");
        }
        Command::Fresh => {
            Migrator::fresh(&pool).await?;
            info!("Database recreated");
        }
        Command::Status => {
            Migrator::status(&pool).await?;
        }
    }

    db::close_pool(pool).await?;
    Ok(())
}
