mod commands;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vpsdeck_cloud::{ProviderError, ResourceKind, user_friendly_message};

#[derive(Parser)]
#[command(name = "vpsdeck")]
#[command(about = "Provision and control VPS instances across Linode and DigitalOcean", long_about = None)]
struct Cli {
    /// Settings file (skips discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured provider accounts
    Providers,
    /// List pricing plans
    Plans {
        /// Provider id from the settings file
        provider: String,
        /// Drop the cached catalog before fetching
        #[arg(long)]
        refresh: bool,
    },
    /// List OS images
    Images {
        /// Provider id from the settings file
        provider: String,
        /// Drop the cached catalog before fetching
        #[arg(long)]
        refresh: bool,
    },
    /// List regions
    Regions {
        /// Provider id from the settings file
        provider: String,
        /// Drop the cached catalog before fetching
        #[arg(long)]
        refresh: bool,
    },
    /// List marketplace apps
    Apps {
        /// Provider id from the settings file
        provider: String,
        /// Drop the cached catalog before fetching
        #[arg(long)]
        refresh: bool,
    },
    /// List instances
    Instances {
        /// Provider id from the settings file
        provider: String,
    },
    /// Show one instance
    Instance {
        /// Provider id from the settings file
        provider: String,
        /// Vendor instance id
        id: String,
    },
    /// Run a power or lifecycle action
    Action {
        /// Provider id from the settings file
        provider: String,
        /// Vendor instance id
        id: String,
        /// boot, shutdown, power_off, reboot, power_cycle or delete
        action: String,
        /// Extra vendor parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
        /// Confirm destructive actions
        #[arg(short, long)]
        yes: bool,
    },
    /// Check a provider's API token
    Validate {
        /// Provider id from the settings file
        provider: String,
    },
    /// Show cache settings and contents
    CacheStats {
        /// Fetch every catalog of every active provider first
        #[arg(long)]
        warm: bool,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        report_error(&e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so `--json` output stays parseable
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // No settings needed
    if matches!(cli.command, Commands::Version) {
        print_version();
        return Ok(());
    }

    let (config_path, settings) = vpsdeck_config::load_settings(cli.config.as_deref())?;
    tracing::debug!("Using settings from {}", config_path.display());
    let hub = vpsdeck::build_hub(&settings)?;
    let json = cli.json;

    match cli.command {
        Commands::Providers => commands::providers::handle(&hub, &config_path, json).await?,
        Commands::Plans { provider, refresh } => {
            commands::catalog::handle(&hub, &provider, ResourceKind::Plans, refresh, json).await?
        }
        Commands::Images { provider, refresh } => {
            commands::catalog::handle(&hub, &provider, ResourceKind::Images, refresh, json).await?
        }
        Commands::Regions { provider, refresh } => {
            commands::catalog::handle(&hub, &provider, ResourceKind::Regions, refresh, json).await?
        }
        Commands::Apps { provider, refresh } => {
            commands::catalog::handle(&hub, &provider, ResourceKind::Marketplace, refresh, json)
                .await?
        }
        Commands::Instances { provider } => {
            commands::instances::handle_list(&hub, &provider, json).await?
        }
        Commands::Instance { provider, id } => {
            commands::instances::handle_show(&hub, &provider, &id, json).await?
        }
        Commands::Action {
            provider,
            id,
            action,
            params,
            yes,
        } => {
            commands::action::handle(&hub, &provider, &id, &action, params.as_deref(), yes, json)
                .await?
        }
        Commands::Validate { provider } => {
            commands::validate::handle(&hub, &provider, json).await?
        }
        Commands::CacheStats { warm } => commands::cache::handle(&hub, warm, json).await?,
        Commands::Version => print_version(),
    }

    Ok(())
}

fn print_version() {
    println!("vpsdeck {}", env!("CARGO_PKG_VERSION"));
}

fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<ProviderError>() {
        Some(provider_err) => {
            eprintln!(
                "{} {}",
                "Error:".red().bold(),
                user_friendly_message(provider_err)
            );
            eprintln!(
                "  {} {} ({})",
                provider_err.code.to_string().yellow(),
                provider_err.message,
                provider_err.provider.dimmed()
            );
            if let Some(field) = &provider_err.field {
                eprintln!("  field: {}", field.cyan());
            }
        }
        None => eprintln!("{} {:#}", "Error:".red().bold(), err),
    }
}
