//! nslogd entry point.

use clap::Parser;
use color_eyre::eyre::Result;
use nslog_netfilter::IptablesBackend;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use nslogd::Coordinator;
use nslogd::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.debug { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    for target in ["nslogd", "nslog_netfilter", "nslog_common"] {
        filter = filter.add_directive(format!("{target}={level}").parse()?);
    }
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    let config = cli.watcher_config()?;
    let backend = IptablesBackend::new(&config);

    if let Err(e) = Coordinator::new(config, backend).run().await {
        tracing::error!(error = %e, "Error processing namespaces");
        return Err(e.into());
    }
    Ok(())
}
