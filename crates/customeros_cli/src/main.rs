//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `customeros_core` linkage with deterministic output.
//! - When the API is configured through the environment, bootstrap the
//!   organizations collection and print its size.

use customeros_core::{
    default_log_level, init_logging_with, HttpTransport, LogTarget, RootStore, ServiceRegistry,
    StoreConfig, StoreResult, Transport,
};
use log::warn;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    println!("customeros_core ping={}", customeros_core::ping());
    println!("customeros_core version={}", customeros_core::core_version());

    let config = match StoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            println!("customeros_core api=unconfigured reason={err}");
            return ExitCode::SUCCESS;
        }
    };

    if let Err(err) = init_logging_with(default_log_level(), LogTarget::Stderr) {
        eprintln!("logging unavailable: {err}");
    }

    match bootstrap(&config).await {
        Ok(count) => {
            println!("customeros_core organizations={count}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            warn!(
                "event=cli_bootstrap module=service status=error error_code={}",
                err.code()
            );
            eprintln!("bootstrap failed: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn bootstrap(config: &StoreConfig) -> StoreResult<usize> {
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config)?);
    let root = RootStore::new(Arc::clone(&transport), config.staleness)?;
    let services = ServiceRegistry::new(transport, Arc::clone(&root), config)?;
    services.organizations()?.get_organizations().await?;
    Ok(root.organizations()?.len())
}
