/// Command-line interface
///
/// ```bash
/// sandboxdb check acme-db
/// sandboxdb provision acme alice --json
/// ```
///
/// `check` exits 0 only when the database is running. `provision` exits
/// non-zero on any failure.

use crate::config::Config;
use clap::{Parser, Subcommand};
use sandboxdb_shared::auth::password::CredentialHasher;
use sandboxdb_shared::db::liveness::{check_database_instance, InstanceStatus};
use sandboxdb_shared::endpoint::resolver_for;
use sandboxdb_shared::provision::{ProvisionReport, SandboxProvisioner};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "sandboxdb", version, about = "Probe sandbox databases and provision sandbox users")]
pub struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check whether a sandbox database is reachable
    Check {
        /// Database host, e.g. `acme-db`
        host: String,
    },

    /// Create a user in a sandbox database unless it already exists
    Provision {
        /// Sandbox name
        sandbox: String,

        /// User name (also the initial credential)
        user: String,
    },
}

/// Runs the parsed command against the given configuration
pub async fn run(cli: Cli, config: Config) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Check { host } => {
            let status = check_database_instance(&config.db, &host).await;
            print_status(&status, cli.json)?;
            Ok(ExitCode::from(exit_status_for(&status)))
        }
        Command::Provision { sandbox, user } => {
            let domain = config.require_domain()?.to_string();
            let hasher = CredentialHasher::new(config.hasher)?;
            let resolver = resolver_for(config.environment, config.namespace.as_deref()).await?;
            let provisioner = SandboxProvisioner::new(resolver, config.db, hasher, domain);

            let report = provisioner.provision(&sandbox, &user).await?;
            print_report(&report, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Process exit status for a probe result
pub fn exit_status_for(status: &InstanceStatus) -> u8 {
    if status.is_running() {
        0
    } else {
        1
    }
}

fn print_status(status: &InstanceStatus, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(status)?);
    } else {
        println!("{}", status);
    }
    Ok(())
}

fn print_report(report: &ProvisionReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        println!(
            "{} ({:?} via {:?} {})",
            report.email, report.outcome, report.mode, report.endpoint
        );
    }
    Ok(())
}
