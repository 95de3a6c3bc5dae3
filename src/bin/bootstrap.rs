//! Deployment bootstrap: run migrations and seed the admin account.
//!
//! Invoked once per deployment, before the API server starts. Safe to
//! re-run; the admin seed is guarded by an existence check.

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use logistics_api as api;

use api::bootstrap::{ensure_admin_user, AdminSeed, BootstrapOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "bootstrap",
    about = "One-time deployment initialization for logistics-api"
)]
struct Args {
    /// Skip running database migrations
    #[arg(long)]
    skip_migrations: bool,

    /// Admin username (overrides config)
    #[arg(long)]
    admin_username: Option<String>,

    /// Admin email (overrides config)
    #[arg(long)]
    admin_email: Option<String>,

    /// Admin password (overrides config)
    #[arg(long)]
    admin_password: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db = api::db::establish_connection_from_app_config(&cfg).await?;
    if !args.skip_migrations {
        api::db::run_migrations(&db).await?;
    }

    let Some(password) = args.admin_password.or_else(|| cfg.admin_password.clone()) else {
        bail!("admin password not configured; pass --admin-password or set APP__ADMIN_PASSWORD");
    };

    let seed = AdminSeed {
        username: args.admin_username.unwrap_or_else(|| cfg.admin_username.clone()),
        email: args.admin_email.unwrap_or_else(|| cfg.admin_email.clone()),
        password,
    };

    match ensure_admin_user(&db, &seed).await? {
        BootstrapOutcome::Created => info!("Superuser created successfully"),
        BootstrapOutcome::AlreadyExists => info!("Superuser already exists"),
    }

    Ok(())
}
