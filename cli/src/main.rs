//! Identity service CLI
//!
//! Headless account / login service suitable for deployment as a systemd
//! service, Docker container, or standalone process.
//!
//! ```sh
//! # Run with default config (~/.config/identity-service/config.toml)
//! identity-service
//!
//! # Custom config path
//! identity-service --config /etc/identity-service/config.toml
//!
//! # Override the port
//! identity-service --api-port 8080
//!
//! # Validate config without starting
//! identity-service --check
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use identity_service::config::AppConfig;
use identity_service::server::{init_tracing, ServerHandle, ServerOptions};

/// Identity service: registration, login and bearer-token profiles.
#[derive(Parser, Debug)]
#[command(
    name = "identity-service",
    version,
    about = "Account registration and login service",
    long_about = "REST API for account registration, password login and \
                  JWT-authenticated profile lookup.\n\n\
                  Default config: ~/.config/identity-service/config.toml\n\
                  JWT_SECRET and DATABASE_URL override the file."
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "IDENTITY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Load configuration ────────────────────────────────────
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(identity_service::default_config_path);

    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => {
            let mut cfg = AppConfig::default();
            cfg.apply_env_overrides();
            (cfg, Some(e))
        }
    };

    // ── Apply CLI overrides ───────────────────────────────────
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(port) = cli.api_port {
        config.server.api_port = port;
    }

    // Tracing first, so everything below is formatted properly
    init_tracing(&config);

    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            warn!("Failed to load config from {}: {}", config_path.display(), e);
            warn!("Using default configuration.");
        }
    }
    if let Some(port) = cli.api_port {
        info!("CLI override: api_port = {}", port);
    }
    if let Some(ref level) = cli.log_level {
        info!("CLI override: log_level = {}", level);
    }

    if let Err(e) = config.validate() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    // ── Config validation mode ────────────────────────────────
    if cli.check {
        println!("Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   API address : {}", config.api_address());
        println!("   Database    : {}", config.database.connection_url());
        println!("   Token TTL   : {}h", config.security.jwt_expiration_hours);
        println!("   Log level   : {}", config.logging.level);
        println!(
            "   Welcome mail: {}",
            if config.notifications.welcome_on_register { "on" } else { "off" }
        );
        return ExitCode::SUCCESS;
    }

    // ── Start server ──────────────────────────────────────────
    let handle = match ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    })
    .await
    {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    handle.install_signal_handler();
    info!("Press Ctrl+C to shutdown gracefully.");

    handle.wait().await;
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse() {
        let cli = Cli::try_parse_from([
            "identity-service",
            "--config",
            "/tmp/identity.toml",
            "--api-port",
            "9090",
            "--log-level",
            "debug",
            "--check",
            "--no-migrate",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/identity.toml")));
        assert_eq!(cli.api_port, Some(9090));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(cli.check);
        assert!(cli.no_migrate);
    }

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
