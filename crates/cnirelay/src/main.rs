//! cnirelay - relay CNI commands to a remote daemon.
//!
//! `cnirelay {add|check|del} <net> <netns>` loads the named configuration
//! list, gathers `CNI_ARGS`/`CNI_IFNAME`/`CAP_ARGS` from the environment,
//! and relays the command to cnirelayd over gRPC.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod client;
mod inputs;

use client::RelayClient;
use cnirelay_common::env::{DEFAULT_NETCONF_DIR, ENV_CAP_ARGS, ENV_CNI_ARGS, ENV_IFNAME};

/// Add, check, or remove network interfaces from a network namespace.
#[derive(Parser)]
#[command(name = "cnirelay")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Relay daemon endpoint
    #[arg(long, global = true, default_value = "http://127.0.0.1:7777")]
    endpoint: String,

    /// Directory holding network configuration lists
    #[arg(
        long,
        global = true,
        env = "NETCONFPATH",
        default_value = DEFAULT_NETCONF_DIR
    )]
    netconf_dir: PathBuf,

    /// Per-call deadline in seconds (best-effort; the plugin chain may
    /// run to completion anyway)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// The command to relay.
    #[command(subcommand)]
    command: Commands,
}

/// Relay commands.
#[derive(Subcommand)]
enum Commands {
    /// Attach the namespace to the named network
    Add {
        /// Network configuration list name
        net: String,
        /// Network namespace path
        netns: String,
    },
    /// Check the namespace's attachment to the named network
    Check {
        /// Network configuration list name
        net: String,
        /// Network namespace path
        netns: String,
    },
    /// Detach the namespace from the named network
    Del {
        /// Network configuration list name
        net: String,
        /// Network namespace path
        netns: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("cnirelay=info".parse()?))
        .init();

    let cli = Cli::parse();

    let (net, netns) = match &cli.command {
        Commands::Add { net, netns }
        | Commands::Check { net, netns }
        | Commands::Del { net, netns } => (net.clone(), netns.clone()),
    };

    let cap_args_json = std::env::var(ENV_CAP_ARGS).ok();
    let cni_args = std::env::var(ENV_CNI_ARGS).ok();
    let if_name = std::env::var(ENV_IFNAME).ok();

    // Local validation happens before any network call.
    let inputs = inputs::build(
        &net,
        &netns,
        &cli.netconf_dir,
        cap_args_json.as_deref(),
        cni_args.as_deref(),
        if_name.as_deref(),
    )?;

    let timeout = cli.timeout.map(Duration::from_secs);
    let mut client = RelayClient::connect(cli.endpoint.clone(), timeout).await?;

    match cli.command {
        Commands::Add { .. } => {
            let stdout = client.add(&inputs).await?;
            println!("{stdout}");
        }
        Commands::Check { .. } => {
            client.check(&inputs).await?;
            tracing::info!(net = %net, netns = %netns, "check succeeded");
        }
        Commands::Del { .. } => {
            client.del(&inputs).await?;
            tracing::info!(net = %net, netns = %netns, "del succeeded");
        }
    }

    Ok(())
}
