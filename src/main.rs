//! Technify - a small personal blog

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use technify::{
    api::{self, AppState, PageSettings},
    config::Config,
    db::{
        self,
        repositories::{SqlxContactRepository, SqlxPostRepository, SqlxSessionRepository},
    },
    services::{
        hash_password, notifier_from_config, AuthService, ContactService, ImageStore,
        NotificationQueue, PostService,
    },
    theme::{SiteVars, ThemeEngine},
};

/// How often expired admin sessions are purged
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// How long pending notifications may take to flush on shutdown
const NOTIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> Result<()> {
    // `technify hash-password <password>` prints a value for admin.password_hash
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("hash-password") {
        let password = args
            .get(2)
            .context("usage: technify hash-password <password>")?;
        println!("{}", hash_password(password)?);
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "technify=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Technify...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!(
        "Database connected: {:?} ({})",
        config.database.driver,
        if config.database.local_server { "local" } else { "production" }
    );

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Notification worker
    let notifier = notifier_from_config(&config.mail)?;
    if !config.mail.is_enabled() {
        tracing::warn!("mail.host is not set; contact notifications will only be logged");
    }
    let (queue, notification_worker) =
        NotificationQueue::spawn(notifier, config.mail.queue_capacity);

    // Services
    let auth_service = Arc::new(AuthService::new(
        SqlxSessionRepository::boxed(pool.clone()),
        config.admin.clone(),
    ));
    let post_service = Arc::new(PostService::new(
        SqlxPostRepository::boxed(pool.clone()),
        ImageStore::new(&config.upload.path, config.upload.max_file_size),
        config.blog.posts_per_page,
        config.blog.max_content_length,
    ));
    let contact_service = Arc::new(ContactService::new(
        SqlxContactRepository::boxed(pool.clone()),
        queue,
        config.blog.site_name.clone(),
    ));

    // Initialize theme engine
    let theme = ThemeEngine::new(config.theme.path.as_deref(), SiteVars::from_config(&config))?;
    tracing::info!(
        "Theme engine initialized{}",
        config
            .theme
            .path
            .as_ref()
            .map(|p| format!(" with overrides from {}", p.display()))
            .unwrap_or_default()
    );

    // Purge expired sessions periodically
    {
        let auth_service = auth_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                match auth_service.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!("Removed {} expired sessions", n),
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                }
            }
        });
    }

    let state = AppState {
        auth_service,
        post_service,
        contact_service,
        theme: Arc::new(theme),
        settings: Arc::new(PageSettings {
            max_content_length: config.blog.max_content_length,
            session_ttl_hours: config.admin.session_ttl_hours,
            cookie_secure: config.server.cookie_secure,
        }),
    };

    // Build router
    let app = api::build_router(state, &config.server, &config.upload);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last queue handle; let the worker flush what is left
    if tokio::time::timeout(NOTIFICATION_DRAIN_TIMEOUT, notification_worker)
        .await
        .is_err()
    {
        tracing::warn!("Gave up waiting for pending notifications");
    }

    pool.close().await;
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
