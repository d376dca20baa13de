mod client_cmds;
mod config;
mod serve_cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use padron_core::catalog::PlanCatalog;
use padron_db::pool;

use config::PadronConfig;

#[derive(Parser)]
#[command(name = "padron", about = "Client registry with hour-based plans")]
struct Cli {
    /// Database URL (overrides PADRON_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Plan catalog TOML file (overrides the config file and the built-in catalog)
    #[arg(long, global = true)]
    plans: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a padron config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/padron")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the padron database (create it if needed and migrate)
    DbInit,
    /// Run the HTTP server
    Serve {
        /// Bind address (overrides the config file; default 127.0.0.1)
        #[arg(long)]
        bind: Option<String>,
        /// Port (overrides the config file; default 8080)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the plan catalog
    Plans,
    /// Client management
    Client {
        #[command(subcommand)]
        command: client_cmds::ClientCommands,
    },
}

/// Execute the `padron init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        server: config::ServerSection::default(),
        plans: config::PlansSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  server = {}:{}", cfg.server.bind, cfg.server.port);
    println!();
    println!("Next: run `padron db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `padron db-init` command: create database and run migrations.
async fn cmd_db_init(resolved: &PadronConfig) -> anyhow::Result<()> {
    println!("Initializing padron database...");

    // 1. Create the database if it does not exist.
    pool::ensure_database_exists(&resolved.db_config).await?;

    // 2. Connect to the target database.
    let db_pool = pool::create_pool(&resolved.db_config).await?;

    // 3. Run migrations.
    pool::run_migrations(&db_pool).await?;

    // 4. Print success with the current registry size.
    let count = pool::count_clients(&db_pool).await?;
    println!("Database ready. {count} clients registered.");

    // 5. Clean shutdown.
    db_pool.close().await;

    println!("padron db-init complete.");
    Ok(())
}

/// Execute the `padron plans` command: print the resolved catalog.
fn cmd_plans(catalog: &PlanCatalog) {
    println!("{:<10} {:>8} {:>6}  {}", "PLAN", "PRICE", "HOURS", "LABEL");
    for (id, info) in catalog.iter() {
        println!(
            "{:<10} {:>8.2} {:>6}  {}",
            id, info.price, info.hours, info.label
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            let resolved =
                PadronConfig::resolve(cli.database_url.as_deref(), cli.plans.as_deref())?;
            cmd_db_init(&resolved).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved =
                PadronConfig::resolve(cli.database_url.as_deref(), cli.plans.as_deref())?;
            // The catalog must load before we accept any request; an empty
            // or malformed catalog aborts startup here.
            let catalog = resolved.load_catalog()?;
            let bind = bind.unwrap_or_else(|| resolved.server.bind.clone());
            let port = port.unwrap_or(resolved.server.port);

            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = serve_cmd::run_serve(db_pool.clone(), catalog, &bind, port).await;
            db_pool.close().await;
            result?;
        }
        Commands::Plans => {
            let resolved =
                PadronConfig::resolve(cli.database_url.as_deref(), cli.plans.as_deref())?;
            let catalog = resolved.load_catalog()?;
            cmd_plans(&catalog);
        }
        Commands::Client { command } => {
            let resolved =
                PadronConfig::resolve(cli.database_url.as_deref(), cli.plans.as_deref())?;
            let catalog = resolved.load_catalog()?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = client_cmds::run_client_command(command, &db_pool, &catalog).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
