use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use clap::Parser;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

mod cleanup;
mod config;
mod db;
mod models;
mod observability;
mod routes;

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::VigilConfig>,
    /// Storage pool. Serving without a database is refused at startup, so
    /// handlers never have to deal with a missing pool.
    pub db: Arc<db::DbPool>,
}

impl AppState {
    pub async fn new(config: config::VigilConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if config.database.is_none() {
            return Err(
                "Database is not configured. Add a [database] section to vigil.toml.".into(),
            );
        }

        let pool = db::DbPool::from_config(&config.database).await?;
        if config.database.run_migrations() {
            pool.run_migrations().await?;
        }

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(pool),
        })
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "Vigil error-tracking service", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./vigil.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the server (default)
    Serve,
    /// Run database migrations and exit
    ///
    /// Useful for Kubernetes init containers or CI/CD pipelines.
    /// Connects to the database, runs any pending migrations, and exits.
    Migrate,
    /// Create a starter organization, project, and DSN key
    ///
    /// Safe to run repeatedly: rows that already exist are reused.
    Bootstrap {
        /// Organization slug to create or reuse
        #[arg(long, default_value = "default")]
        organization: String,
        /// Project slug to create or reuse
        #[arg(long, default_value = "internal")]
        project: String,
        /// Also seed one sample group and inbox row
        #[arg(long)]
        with_sample_data: bool,
    },
    /// Show enabled compile-time features
    Features,
}

fn resolve_config_path(explicit_path: Option<&str>) -> Result<PathBuf, String> {
    // If explicit path is provided, use it
    if let Some(path) = explicit_path {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(format!("Config file not found: {}", path.display()));
        }
        return Ok(path);
    }

    // Check for vigil.toml in current directory
    let cwd_config = PathBuf::from("vigil.toml");
    if cwd_config.exists() {
        return Ok(cwd_config);
    }

    Err("No config file found. Pass --config or create ./vigil.toml.".to_string())
}

pub fn build_app(config: &config::VigilConfig, state: AppState) -> Router {
    let mut app = Router::new()
        // Health check endpoints
        .route("/health", get(routes::health::health_check))
        .route("/health/live", get(routes::health::liveness))
        .route("/health/ready", get(routes::health::readiness));

    // Add Prometheus metrics endpoint if enabled
    if config.observability.metrics.enabled {
        app = app.route("/metrics", get(routes::health::metrics));
    }

    app = app.nest("/api/0", routes::inbox_routes());

    // The embed debug view only exists when a debug project is configured
    if config.debug.is_some() {
        app = app.route(
            "/debug/embed/error-page",
            get(routes::debug::error_page_embed),
        );
    }

    app.layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::Migrate) => {
            run_migrate(args.config.as_deref()).await;
        }
        Some(Command::Bootstrap {
            organization,
            project,
            with_sample_data,
        }) => {
            run_bootstrap(args.config.as_deref(), organization, project, with_sample_data).await;
        }
        Some(Command::Features) => {
            run_features();
        }
        Some(Command::Serve) | None => {
            run_server(args.config.as_deref()).await;
        }
    }
}

/// Run the vigil server
async fn run_server(explicit_config_path: Option<&str>) {
    let config_path = match resolve_config_path(explicit_config_path) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let config = match config::VigilConfig::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!(
                "Failed to load config from {}: {}",
                config_path.display(),
                e
            );
            std::process::exit(1);
        }
    };

    // Initialize observability (tracing, metrics)
    observability::init_tracing(&config.observability).expect("Failed to initialize tracing");

    if let Err(e) = observability::metrics::init_metrics(&config.observability.metrics) {
        tracing::warn!(error = %e, "Failed to initialize metrics: {e}");
    }

    tracing::info!(
        config_file = %config_path.display(),
        "Starting vigil"
    );

    let state = AppState::new(config.clone())
        .await
        .expect("Failed to initialize application state");

    // Background tasks drain through the tracker at shutdown; the token
    // stops the cleanup worker between runs.
    let task_tracker = TaskTracker::new();
    let shutdown_token = CancellationToken::new();

    {
        let db = state.db.clone();
        let cleanup_config = config.cleanup.clone();
        let worker_shutdown = shutdown_token.clone();
        task_tracker.spawn(async move {
            cleanup::start_cleanup_worker(db, cleanup_config, worker_shutdown).await;
        });
    }

    let app = build_app(&config, state);

    let bind_addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on http://{}", bind_addr);

    // Graceful shutdown: wait for SIGINT/SIGTERM, then wait for background tasks
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(task_tracker, shutdown_token))
        .await
        .unwrap();
}

async fn shutdown_signal(task_tracker: TaskTracker, shutdown_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, waiting for background tasks to complete...");

    // Stop the cleanup worker and prevent new tasks from being spawned
    shutdown_token.cancel();
    task_tracker.close();

    // Wait for all in-flight tasks to complete (with timeout)
    let wait_result =
        tokio::time::timeout(std::time::Duration::from_secs(30), task_tracker.wait()).await;

    match wait_result {
        Ok(()) => tracing::info!("All background tasks completed"),
        Err(_) => {
            tracing::warn!("Timeout waiting for background tasks, some may not have completed")
        }
    }

    tracing::info!("Shutdown complete");
}

/// Run database migrations and exit.
async fn run_migrate(explicit_config_path: Option<&str>) {
    let config_path = match resolve_config_path(explicit_config_path) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let config = match config::VigilConfig::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!(
                "Failed to load config from {}: {}",
                config_path.display(),
                e
            );
            std::process::exit(1);
        }
    };

    // Minimal observability for migration logging
    observability::init_tracing(&config.observability).expect("Failed to initialize tracing");

    tracing::info!(
        config_file = %config_path.display(),
        "Running database migrations"
    );

    if config.database.is_none() {
        eprintln!("Error: Database is not configured. Nothing to migrate.");
        std::process::exit(1);
    }

    match db::DbPool::from_config(&config.database).await {
        Ok(pool) => match pool.run_migrations().await {
            Ok(()) => {
                tracing::info!("Database migrations completed successfully");
                std::process::exit(0);
            }
            Err(e) => {
                tracing::error!(error = %e, "Database migrations failed");
                eprintln!("Error: Database migrations failed: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            eprintln!("Error: Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    }
}

/// Create the starter organization, project, and DSN key, then exit.
async fn run_bootstrap(
    explicit_config_path: Option<&str>,
    organization: String,
    project: String,
    with_sample_data: bool,
) {
    let config_path = match resolve_config_path(explicit_config_path) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let config = match config::VigilConfig::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!(
                "Failed to load config from {}: {}",
                config_path.display(),
                e
            );
            std::process::exit(1);
        }
    };

    observability::init_tracing(&config.observability).expect("Failed to initialize tracing");

    if config.database.is_none() {
        eprintln!("Error: Database is not configured. Nothing to bootstrap.");
        std::process::exit(1);
    }

    match bootstrap(&config, &organization, &project, with_sample_data).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: Bootstrap failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Idempotent seeding: rows that already exist are reused, the rest created.
async fn bootstrap(
    config: &config::VigilConfig,
    org_slug: &str,
    project_slug: &str,
    with_sample_data: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = db::DbPool::from_config(&config.database).await?;
    if config.database.run_migrations() {
        pool.run_migrations().await?;
    }

    let org = match pool.organizations().get_by_slug(org_slug).await? {
        Some(org) => org,
        None => {
            pool.organizations()
                .create(models::CreateOrganization {
                    slug: org_slug.to_string(),
                    name: org_slug.to_string(),
                })
                .await?
        }
    };

    let project = match pool.projects().get_by_slug(org.id, project_slug).await? {
        Some(project) => project,
        None => {
            pool.projects()
                .create(models::CreateProject {
                    organization_id: org.id,
                    slug: project_slug.to_string(),
                    name: project_slug.to_string(),
                    platform: None,
                })
                .await?
        }
    };

    let key = match pool.projects().first_key(project.id).await? {
        Some(key) => key,
        None => {
            pool.projects()
                .create_key(models::CreateProjectKey {
                    project_id: project.id,
                    label: Some("default".to_string()),
                })
                .await?
        }
    };

    if with_sample_data {
        let group = pool
            .groups()
            .create(models::CreateGroup {
                project_id: project.id,
                title: "ZeroDivisionError: division by zero".to_string(),
                culprit: Some("vigil.samples in render".to_string()),
                level: None,
            })
            .await?;
        pool.group_inbox()
            .add(models::AddGroupInbox {
                group_id: group.id,
                project_id: project.id,
                reason: models::InboxReason::New,
                reason_details: None,
                date_added: chrono::Utc::now(),
            })
            .await?;
    }

    // The DSN host comes from the debug config when present, otherwise from
    // the bind address.
    let base_url = match &config.debug {
        Some(debug) => debug.public_base_url.clone(),
        None => url::Url::parse(&format!("http://{}", config.server.bind_addr()))?,
    };

    println!("Organization: {} ({})", org.slug, org.id);
    println!("Project:      {} ({})", project.slug, project.id);
    match key.dsn(&base_url) {
        Some(dsn) => println!("DSN:          {}", dsn),
        None => println!("DSN:          (unavailable for base URL {})", base_url),
    }
    let inbox_rows = pool.group_inbox().count().await?;
    println!("Inbox rows:   {}", inbox_rows);

    Ok(())
}

fn run_features() {
    let version = env!("CARGO_PKG_VERSION");

    // Check each feature at compile time
    let features: &[(&str, &str, bool)] = &[
        // Databases
        (
            "database-sqlite",
            "Databases",
            cfg!(feature = "database-sqlite"),
        ),
        (
            "database-postgres",
            "Databases",
            cfg!(feature = "database-postgres"),
        ),
        // Observability
        ("prometheus", "Observability", cfg!(feature = "prometheus")),
    ];

    println!("Vigil v{version}\n");
    println!("Compile-time features:");

    let mut current_group = "";
    for &(name, group, enabled) in features {
        if group != current_group {
            if !current_group.is_empty() {
                println!();
            }
            println!("  {group}:");
            current_group = group;
        }
        let status = if enabled { "enabled" } else { "disabled" };
        println!("    {name:<32} {status}");
    }
}
