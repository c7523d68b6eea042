//! Beacon bot entry point.

mod polling;
mod webhook;

use std::net::SocketAddr;
use std::sync::Arc;

use beacon_common::{Config, TransportMode};
use beacon_core::{BotApi, BotService, BotSettings, Directory, TelegramClient};
use beacon_db::repositories::RecipientRepository;
use beacon_db::{QueryExecutor, RetryPolicy};
use beacon_queue::{AssetCache, Dispatcher, Lane, Messenger, WorkerConfig};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting beacon...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = beacon_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    beacon_db::migrate(&db).await?;
    info!("Migrations completed");

    let executor = QueryExecutor::new(Arc::new(db), RetryPolicy::from(&config.dispatch));
    let directory: Arc<dyn Directory> = Arc::new(RecipientRepository::new(executor));

    // Bot API client
    let client = Arc::new(TelegramClient::from_config(&config.bot)?);
    let me = client.get_me().await?;
    let bot_username = me.username.unwrap_or_else(|| me.first_name.clone());
    info!(bot_id = me.id, bot_username = %bot_username, "Authenticated with Bot API");

    // Outbound dispatch
    let assets = AssetCache::open(&config.bot.media_path, &config.bot.asset_cache_path).await;
    if !config.bot.media_path.exists() {
        warn!(path = %config.bot.media_path.display(), "Welcome animation not found");
    }
    let dispatcher = Dispatcher::new(
        Arc::clone(&client) as Arc<dyn Messenger>,
        Arc::new(assets),
        WorkerConfig::from(&config.dispatch),
    );

    let service = BotService::new(
        Arc::clone(&client) as Arc<dyn BotApi>,
        directory,
        dispatcher.clone(),
        BotSettings::from_config(&config.bot, bot_username),
    );

    match config.transport.mode {
        TransportMode::Polling => {
            info!("Receiving updates by long polling");
            tokio::select! {
                () = polling::run(&client, &service, config.transport.poll_timeout_secs) => {},
                () = shutdown_signal() => {},
            }
        }
        TransportMode::Webhook => {
            let url = config
                .transport
                .webhook_url
                .as_deref()
                .ok_or("transport.webhook_url is required in webhook mode")?;
            client
                .set_webhook(url, config.transport.webhook_secret.as_deref())
                .await?;
            info!(url, "Webhook registered");

            let app = webhook::router(service, config.transport.webhook_secret.clone());
            let addr: SocketAddr =
                format!("{}:{}", config.transport.host, config.transport.port).parse()?;
            info!("Listening on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    let interactive = dispatcher.pending(Lane::Interactive);
    let bulk = dispatcher.pending(Lane::Bulk);
    if interactive + bulk > 0 {
        warn!(interactive, bulk, "Dropping undelivered messages on shutdown");
    }

    info!("Shutdown complete");
    Ok(())
}
