use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use paralelo::currency::Currency;
use paralelo::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for paralelo::AppCommand {
    fn from(cmd: Commands) -> paralelo::AppCommand {
        match cmd {
            Commands::Rates => paralelo::AppCommand::Rates,
            Commands::Convert { from, to, amount } => {
                paralelo::AppCommand::Convert { from, to, amount }
            }
            Commands::Watch => paralelo::AppCommand::Watch,
            Commands::Serve { listen } => paralelo::AppCommand::Serve { listen },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display the parallel rate board
    Rates,
    /// Convert between supported currencies
    Convert {
        /// Source currency (ISO code, e.g. USD)
        #[arg(long)]
        from: Currency,
        /// Target currency (ISO code, e.g. BOB)
        #[arg(long)]
        to: Currency,
        /// Amount to convert
        #[arg(long, default_value_t = 100.0)]
        amount: f64,
    },
    /// Poll both sources and print every update
    Watch,
    /// Serve the JSON rate API
    Serve {
        /// Listen address, e.g. 127.0.0.1:8080
        #[arg(long)]
        listen: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => paralelo::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = paralelo::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
providers:
  binance:
    base_url: "https://p2p.binance.com"
  dolarblue:
    base_url: "https://www.dolarbluebolivia.click"

poll_interval_secs: 60

retry:
  max_retries: 3
  step_secs: 1

server:
  listen: "127.0.0.1:8080"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
