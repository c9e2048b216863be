//! Reusable identity service runtime.
//!
//! [`ServerHandle`] owns the whole lifecycle: metrics recorder, user
//! directory (database or in-memory), migrations, REST API and graceful
//! shutdown. The CLI binary is a thin wrapper around it.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::application::ports::NotificationError;
use crate::application::AuthService;
use crate::config::{AppConfig, ConfigError};
use crate::domain::{DomainError, UserDirectory};
use crate::infrastructure::crypto::{CredentialHasher, JwtIssuer};
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::notification::MailApiNotifier;
use crate::infrastructure::{init_database, InMemoryUserDirectory, UserRepository};
use crate::interfaces::http::{create_api_router, AppState};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Failed to install metrics recorder: {0}")]
    Metrics(String),

    #[error("Failed to set up {component}: {source}")]
    Component {
        component: &'static str,
        #[source]
        source: DomainError,
    },

    #[error("Failed to build notifier: {0}")]
    Notifier(#[from] NotificationError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

// ── Options ────────────────────────────────────────────────────────

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running identity service.
///
/// ```rust,no_run
/// use identity_service::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Address the REST API is bound to (resolves port 0).
    pub local_addr: SocketAddr,
    pub auth: AuthService,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Validate the configuration, build every component and start serving.
    pub async fn start(opts: ServerOptions) -> Result<Self, ServerError> {
        let app_cfg = opts.config;
        app_cfg.validate()?;

        info!("Starting identity service...");

        let prometheus = prometheus_handle()?;

        // ── User directory ─────────────────────────────────────
        let (directory, db): (Arc<dyn UserDirectory>, Option<DatabaseConnection>) =
            if app_cfg.database.is_memory() {
                warn!("Using the in-memory user directory; accounts are lost on exit");
                (Arc::new(InMemoryUserDirectory::new()), None)
            } else {
                let db = init_database(&app_cfg.database.to_database_config()).await?;
                if opts.auto_migrate {
                    info!("Running database migrations...");
                    Migrator::up(&db, None).await?;
                    info!("Migrations completed");
                }
                (Arc::new(UserRepository::new(db.clone())), Some(db))
            };

        // ── Credentials & tokens ───────────────────────────────
        let hasher = CredentialHasher::new(app_cfg.security.hashing_params()).map_err(
            |source| ServerError::Component {
                component: "credential hasher",
                source,
            },
        )?;
        let issuer = JwtIssuer::new(app_cfg.security.jwt_config());
        info!(
            expiration_hours = app_cfg.security.jwt_expiration_hours,
            issuer = %app_cfg.security.jwt_issuer,
            "Token issuer configured"
        );

        let mut auth = AuthService::new(directory, Arc::new(hasher), Arc::new(issuer));
        if app_cfg.notifications.welcome_on_register {
            let notifier = MailApiNotifier::new(app_cfg.notifications.mail_api_config())?;
            info!(endpoint = %notifier.config().endpoint, "Welcome notifications enabled");
            auth = auth.with_welcome_notifier(Arc::new(notifier));
        }

        // ── REST API server ────────────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let router = create_api_router(AppState::new(auth.clone()), prometheus);

        let api_addr = app_cfg.api_address();
        let listener = tokio::net::TcpListener::bind(&api_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: api_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: api_addr,
            source,
        })?;
        info!("REST API listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let api_shutdown = shutdown.signal();
        let api_task = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    api_shutdown.wait().await;
                    info!("REST API received shutdown signal");
                })
                .await;
            if let Err(e) = served {
                error!(error = %e, "REST API server error");
            }
        });

        Ok(Self {
            config: app_cfg,
            local_addr,
            auth,
            db,
            shutdown,
            api_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Trigger shutdown on SIGTERM / SIGINT.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }

    /// Block until shutdown is triggered, then drain in-flight requests and
    /// close the database, bounded by `server.shutdown_timeout`.
    pub async fn wait(self) {
        let Self {
            shutdown,
            api_task,
            db,
            ..
        } = self;

        let completed = shutdown
            .shutdown_with_cleanup(|| async move {
                match api_task.await {
                    Ok(()) => info!("REST API server stopped"),
                    Err(e) => error!(error = %e, "REST API server task panicked"),
                }

                if let Some(db) = db {
                    match db.close().await {
                        Ok(()) => info!("Database connection closed"),
                        Err(e) => warn!(error = %e, "Error closing database connection"),
                    }
                }
            })
            .await;

        if !completed {
            warn!("Exiting with requests still in flight");
        }
        info!("Identity service shutdown complete");
    }

    pub async fn shutdown(self) {
        info!("Shutting down identity service...");
        self.trigger_shutdown();
        self.wait().await;
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// The global recorder can be installed once per process; later starts in
/// the same process reuse it.
fn prometheus_handle() -> Result<PrometheusHandle, ServerError> {
    static HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

    let mut slot = HANDLE
        .lock()
        .map_err(|_| ServerError::Metrics("recorder lock poisoned".into()))?;
    if let Some(handle) = slot.as_ref() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Metrics(e.to_string()))?;
    info!("Prometheus metrics recorder installed");
    *slot = Some(handle.clone());
    Ok(handle)
}

/// Initialize tracing from the application config.
///
/// `RUST_LOG` wins over `logging.level`. Call once, before
/// [`ServerHandle::start`]; later calls are ignored.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let installed = match config.logging.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init(),
    };

    if installed.is_err() {
        warn!("Tracing subscriber already installed, keeping the existing one");
    }
}
