mod cli;

use anyhow::Result;
use clap::Parser;
use myflix::api::HttpApi;
use myflix::app::App;
use myflix::config;
use myflix::notice::ConsoleNotifier;
use myflix::session::FileSessionStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "myflix", about = "Browse the myFlix movie catalog and manage favorites")]
pub struct Args {
    #[arg(short, long, help = "Run one command and exit (e.g. -c movies)")]
    pub command: Option<String>,

    #[arg(long, env = "MYFLIX_API_URL", help = "API base URL (overrides config)")]
    pub api_url: Option<String>,

    #[arg(long, env = "MYFLIX_SESSION", help = "Session file (overrides config)")]
    pub session_file: Option<PathBuf>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Debug output (HTTP requests and session changes)")]
    pub debug: bool,
}

fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.debug);

    let mut cfg = if let Some(config_path) = &args.config {
        let mut cfg = config::Config::with_defaults();
        cfg.merge(config::Config::load_from(config_path)?);
        cfg
    } else {
        config::Config::load()?
    };
    cfg.apply_overrides(args.api_url.as_deref(), args.session_file.as_deref());

    if let Err(errors) = cfg.validate() {
        let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(anyhow::anyhow!(
            "Invalid configuration:\n  {}",
            details.join("\n  ")
        ));
    }

    let session_path = cfg.session_path();
    tracing::debug!(
        base_url = cfg.base_url(),
        session = %session_path.display(),
        timeout = ?cfg.timeout(),
        "configuration loaded"
    );

    let store = Arc::new(FileSessionStore::new(&session_path));
    let api = Arc::new(HttpApi::with_timeout(
        cfg.base_url(),
        store.clone(),
        cfg.timeout(),
    ));
    let app = App::new(api, store, Arc::new(ConsoleNotifier));
    app.router.navigate("");

    let ctx = cli::Context { app };

    if let Some(command) = &args.command {
        cli::run_once(&ctx, command)
    } else {
        cli::run_repl(ctx)
    }
}
