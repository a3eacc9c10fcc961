use std::sync::Arc;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    elector_gateway::{AppState, serve},
    elector_session::{Registry, detect},
};

#[derive(Parser)]
#[command(name = "elector", about = "Remote-controlled course election for the PKU portal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,

    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Custom config directory (overrides default ~/.config/elector/).
    #[arg(long, global = true, env = "ELECTOR_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the control API server (default when no subcommand is given).
    Serve,
    /// Check whether a usable browser executable can be found.
    Doctor,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as JSON.
    Show,
    /// Print the config file path in use.
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();
    init_tracing(&cli);

    if let Some(dir) = &cli.config_dir {
        elector_config::set_config_dir(dir.clone());
    }

    match cli.command.take() {
        None | Some(Commands::Serve) => run_server(&cli).await,
        Some(Commands::Doctor) => run_doctor(),
        Some(Commands::Config { action }) => run_config(&action),
    }
}

async fn run_server(cli: &Cli) -> anyhow::Result<()> {
    let mut config = elector_config::discover_and_load();
    if let Some(bind) = &cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %listener.local_addr()?, "control API listening");

    let state = AppState::new(config, Arc::new(Registry::new()));
    serve(state, listener).await
}

fn run_doctor() -> anyhow::Result<()> {
    let config = elector_config::discover_and_load();
    match detect::find_executable(config.browser.browser_path.as_deref()) {
        Some(path) => {
            println!("browser found: {}", path.display());
            Ok(())
        },
        None => {
            println!("{}", detect::install_hint());
            anyhow::bail!("no usable browser executable found");
        },
    }
}

fn run_config(action: &ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = elector_config::discover_and_load();
            println!("{}", serde_json::to_string_pretty(&config)?);
        },
        ConfigAction::Path => {
            println!("{}", elector_config::find_or_default_config_path().display());
        },
    }
    Ok(())
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
