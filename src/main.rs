use clap::Parser;
use pingora_core::server::configuration::Opt;
use std::path::PathBuf;
use kagami::config::Config;

/// Kagami - on-demand image transformation gateway built on Pingora
#[derive(Parser, Debug)]
#[command(name = "kagami")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to an optional YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Daemon mode
    #[arg(short = 'd', long)]
    daemon: bool,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,

    /// Upgrade workers gracefully
    #[arg(long)]
    upgrade: bool,
}

fn main() {
    if let Err(e) = kagami::logging::init_subscriber() {
        eprintln!("Failed to initialize logging subsystem: {}", e);
        std::process::exit(1);
    }

    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    tracing::info!(
        config_file = %args.config.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "-".to_string()),
        server_address = %config.server.address,
        server_port = config.server.port,
        allowed_domains = config.gateway.allowed_domains.len(),
        cache_backend = ?config.cache.backend,
        rate_limit_rps = config.rate_limit.requests_per_second,
        "Configuration loaded successfully"
    );

    let opt = Opt {
        daemon: args.daemon,
        test: args.test,
        upgrade: args.upgrade,
        ..Default::default()
    };

    let server = kagami::server::build_server(&config, opt).unwrap_or_else(|e| {
        eprintln!("Failed to build server: {}", e);
        std::process::exit(1);
    });

    tracing::info!("Starting Kagami image gateway");

    // Blocks until shutdown
    server.run_forever();
}
