//! RNCP Tracker - certification progress from the 42 intra

mod config;
mod load;

use anyhow::Context;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rncp_engine::{build_report, ReportInput};
use rncp_gateway::{GatewayError, IntraGateway};

use config::Args;

/// Exit code when the bearer token is expired or revoked
const EXIT_CREDENTIAL_EXPIRED: i32 = 2;

/// Exit code when upstream rate-limited us
const EXIT_RATE_LIMITED: i32 = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| args.log_filter().into());
    let (json_layer, text_layer) = if args.log_json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  RNCP Tracker");
    info!("======================================");
    info!("API: {}", args.api_url);
    info!("Levels: {}", args.levels_path.display());
    info!("Catalog: {}", args.catalog_path.display());
    info!(
        "Cache: ttl {}s, cooldown {}s",
        args.cache_ttl_secs, args.cache_cooldown_secs
    );
    info!("Dispatch interval: {}ms", args.min_dispatch_interval_ms);
    info!("======================================");

    if let Err(e) = run(&args).await {
        let code = match e.downcast_ref::<GatewayError>() {
            Some(GatewayError::CredentialExpired) => {
                error!("Intra token expired, log in again: {:#}", e);
                EXIT_CREDENTIAL_EXPIRED
            }
            Some(GatewayError::RateLimited { retry_after_secs }) => {
                error!(retry_after_secs = ?retry_after_secs, "Rate limited by the intra, try again later: {:#}", e);
                EXIT_RATE_LIMITED
            }
            _ => return Err(e),
        };
        std::process::exit(code);
    }

    Ok(())
}

async fn run(args: &Args) -> anyhow::Result<()> {
    let table = load::level_table(&args.levels_path)?;
    let catalog = load::catalog(&args.catalog_path, &table)?;
    let simulation = load::simulation(args.simulation_path.as_deref())?;
    let experiences = load::experiences(args.experiences_path.as_deref())?;

    if let Some(id) = &args.certification {
        if catalog.get(id).is_none() {
            anyhow::bail!("Unknown certification: {}", id);
        }
    }

    let gateway = IntraGateway::new(args.gateway_config()).context("Failed to build HTTP client")?;

    let user_id = match args.user_id {
        Some(id) => id,
        None => {
            let me = gateway
                .get_me(&args.token)
                .await
                .context("Failed to resolve user from /me")?;
            info!(user_id = me.id, login = %me.login, "Resolved user");
            me.id
        }
    };

    loop {
        let data = gateway
            .get_user_data(user_id, &args.token, args.refresh)
            .await
            .with_context(|| format!("Failed to fetch data for user {}", user_id))?;

        let progress = data.to_progress(&table, &experiences);
        let mut report = build_report(ReportInput {
            user_id,
            table: &table,
            catalog: &catalog,
            progress: &progress,
            simulation: &simulation,
            experiences: &experiences,
        });
        if let Some(id) = &args.certification {
            report.retain_certification(id);
        }

        println!("{}", serde_json::to_string_pretty(&report)?);

        let Some(secs) = args.watch_interval_secs else {
            break;
        };
        gateway.cache().purge_expired();
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Shutting down");
                break;
            }
        }
    }

    let stats = gateway.cache().stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        hit_rate = stats.hit_rate(),
        "Done"
    );
    Ok(())
}
