//! abiquo-inventory
//!
//! Ansible dynamic inventory for virtual machines managed by Abiquo

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use eyre::WrapErr;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use abqinv_client::AbiquoClient;
use abqinv_inventory::InventorySnapshot;

mod config;
mod inventory;

use config::{FileConfig, Settings};

/// Ansible dynamic inventory for Abiquo
#[derive(Parser, Debug)]
#[command(name = "abiquo-inventory", version, about)]
struct Args {
    /// Print the whole inventory (default)
    #[arg(long, conflicts_with = "host")]
    list: bool,

    /// Print the variables of a single host
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Ignore the cache and rebuild the inventory
    #[arg(long)]
    refresh_cache: bool,

    /// Configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn init_tracing() {
    let default = if config::process_env(config::env::DEBUG).is_some() {
        "warn,abqinv=debug,abqinv_client=debug,abqinv_inventory=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout carries the inventory, logs go to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing();

    let file = FileConfig::load_default(args.config.as_deref(), &config::process_env)?;
    let settings = Settings::resolve(&file, &config::process_env)?;
    tracing::debug!(
        api = %settings.api_url,
        auth = settings.credentials.scheme(),
        cache = settings.use_cache,
        "settings resolved"
    );

    let client = AbiquoClient::with_verify(
        &settings.api_url,
        settings.credentials.clone(),
        settings.verify_tls,
    )
    .wrap_err("failed to create API client")?;

    let cache = settings.cache_store();
    let result = inventory::load(
        Arc::new(client),
        settings.build.clone(),
        cache.as_ref(),
        args.refresh_cache,
    )
    .await;

    match result {
        Ok(snapshot) => {
            println!("{}", inventory::render(&snapshot, args.host.as_deref())?);
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to build inventory");
            println!(
                "{}",
                inventory::render(&InventorySnapshot::empty(), args.host.as_deref())?
            );
            std::process::exit(1);
        }
    }
}
