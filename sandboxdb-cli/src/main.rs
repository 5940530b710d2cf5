//! # sandboxdb
//!
//! Operational tool for per-tenant sandbox databases.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p sandboxdb-cli -- check acme-db
//! cargo run -p sandboxdb-cli -- provision acme alice
//! ```

use clap::Parser;
use sandboxdb_cli::cli::{run, Cli};
use sandboxdb_cli::config::Config;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr so stdout stays parseable with --json
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sandboxdb_cli=info,sandboxdb_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing::debug!(
        environment = ?config.environment,
        namespace = ?config.namespace,
        "sandboxdb v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    run(cli, config).await
}
