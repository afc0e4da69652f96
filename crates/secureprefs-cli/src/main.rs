mod cli;
mod config;
mod storage;

use clap::Parser;
use color_eyre::Result;
use secureprefs_bridge::EncryptedStorage;
use secureprefs_core::container::StoreError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::ConfigCommand;

/// Entry point wiring the CLI onto the storage adapter.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command {
        cli::Command::Set { key, value } => {
            let storage = storage::open_from_config(&config).await?;
            let stored = storage.set_item(&key, &value).await.map_err(to_report)?;
            println!("Stored {key} = {stored}");
        }
        cli::Command::Get { key } => {
            let storage = storage::open_from_config(&config).await?;
            match storage.get_item(&key).await.map_err(to_report)? {
                Some(value) => println!("{value}"),
                None => println!("(no value)"),
            }
        }
        cli::Command::Remove { key } => {
            let storage = storage::open_from_config(&config).await?;
            let removed = storage.remove_item(&key).await.map_err(to_report)?;
            println!("Removed {removed}");
        }
        cli::Command::Clear => {
            let storage = storage::open_from_config(&config).await?;
            storage.clear().await.map_err(to_report)?;
            println!("Cleared namespace");
        }
        cli::Command::Protected => {
            let storage = storage::open_from_config(&config).await?;
            let answer = if storage.is_device_protected() {
                "protected"
            } else {
                "unprotected"
            };
            println!("{answer}");
        }
        cli::Command::Health => run_health_check(&config).await?,
        cli::Command::Config(ConfigCommand::Init) => init_config(&config)?,
        cli::Command::Version => print_version(),
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info to avoid noisy stdout.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("secureprefs-cli {}", env!("CARGO_PKG_VERSION"));
}

fn to_report(err: StoreError) -> color_eyre::Report {
    color_eyre::eyre::eyre!(err.to_string())
}

/// Runs a quick round trip through the configured preference store.
async fn run_health_check(config: &config::Config) -> Result<()> {
    let storage = storage::open_from_config(config).await?;
    run_storage_health(&storage).await?;
    let mode = if storage.is_encrypted() {
        "encrypted"
    } else {
        "plaintext fallback"
    };
    println!("Storage: ok ({mode})");
    Ok(())
}

async fn run_storage_health(storage: &EncryptedStorage) -> Result<()> {
    let probe_key = "health/probe";
    let payload = "ok";
    storage
        .set_item(probe_key, payload)
        .await
        .map_err(to_report)?;
    let round_trip = storage.get_item(probe_key).await.map_err(to_report)?;
    storage.remove_item(probe_key).await.map_err(to_report)?;

    if round_trip.as_deref() != Some(payload) {
        color_eyre::eyre::bail!("storage round-trip failed");
    }
    Ok(())
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage;

    #[tokio::test]
    async fn health_check_with_test_storage_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = storage::test_storage(dir.path()).await;
        run_storage_health(&storage)
            .await
            .expect("health check should succeed");
    }

    #[tokio::test]
    async fn test_storage_round_trips_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = storage::test_storage(dir.path()).await;

        storage.set_item("token", "abc123").await.expect("set");
        assert_eq!(
            storage.get_item("token").await.expect("get").as_deref(),
            Some("abc123")
        );
        assert!(storage.is_encrypted());
        assert!(!storage.is_device_protected());
    }
}
