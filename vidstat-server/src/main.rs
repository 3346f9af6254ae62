use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};
use vidstat_core::VidstatConfig;

use vidstat_server::handler::AppContext;
use vidstat_server::http::{start_http_server, HttpState};
use vidstat_server::telegram::{run_polling, TelegramClient};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "vidstat.toml")]
    config: String,

    /// Check database connectivity and schema, then exit
    #[arg(long)]
    health: bool,

    /// Load a JSON dataset into empty tables, then exit
    #[arg(long, value_name = "FILE")]
    load: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match VidstatConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level)),
        )
        .init();

    let pool = match vidstat_core::db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match vidstat_core::db::health_check(&pool).await {
            Ok(v) => println!("✅ PostgreSQL connected: {}", v),
            Err(e) => {
                println!("❌ PostgreSQL connection failed: {}", e);
                std::process::exit(1);
            }
        }

        match vidstat_core::db::missing_tables(&pool).await {
            Ok(missing) if missing.is_empty() => println!("✅ Analytics tables present"),
            Ok(missing) => {
                println!("❌ Missing tables: {}", missing.join(", "));
                std::process::exit(1);
            }
            Err(e) => {
                println!("❌ Schema check failed: {}", e);
                std::process::exit(1);
            }
        }

        println!("✅ Vidstat DB health check passed");
        return Ok(());
    }

    if let Some(file) = &args.load {
        let path = PathBuf::from(shellexpand::tilde(file).into_owned());
        match vidstat_ingest::load_file(&pool, &path, config.loader.batch_size).await {
            Ok(report) if report.was_skipped() => {
                println!("Tables already populated, nothing loaded");
            }
            Ok(report) => println!(
                "✅ Loaded {} videos and {} snapshots",
                report.videos_inserted, report.snapshots_inserted
            ),
            Err(e) => {
                println!("❌ Load failed: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    if let Some(file) = &config.loader.seed_file {
        let path = PathBuf::from(shellexpand::tilde(file).into_owned());
        if let Err(e) = vidstat_ingest::load_file(&pool, &path, config.loader.batch_size).await {
            tracing::error!(error = %e, "Seed import failed, continuing with existing data");
        }
    }

    let ctx = match AppContext::from_config(&config, pool.clone()) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Failed to initialise: {}", e);
            std::process::exit(1);
        }
    };

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let mut http_task = None;
    if config.http.enabled {
        let state = Arc::new(HttpState {
            pool: pool.clone(),
            ctx: ctx.clone(),
        });
        let http_config = config.http.clone();
        let http_shutdown = tx.subscribe();
        http_task = Some(tokio::spawn(async move {
            if let Err(e) = start_http_server(state, &http_config, http_shutdown).await {
                tracing::error!("HTTP server error: {}", e);
            }
        }));
    }

    let telegram = if config.telegram.enabled {
        match TelegramClient::from_env(&config.telegram) {
            Ok(bot) => Some(Arc::new(bot)),
            Err(e) => {
                tracing::warn!("Telegram transport disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    match telegram {
        Some(bot) => {
            run_polling(bot, ctx, config.telegram.clone(), tx.subscribe()).await;
        }
        None if http_task.is_some() => {
            let _ = tx.subscribe().recv().await;
        }
        None => {
            eprintln!("No transport enabled: set BOT_TOKEN or enable [http]");
            std::process::exit(1);
        }
    }

    if let Some(task) = http_task {
        let _ = task.await;
    }
    pool.close().await;

    Ok(())
}
