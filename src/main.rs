use clap::Parser;
use dotenvy::dotenv;
use memoir_backend::config::AppConfig;
use memoir_backend::infrastructure::{database, storage};
use memoir_backend::services::dedup::{DedupStore, InMemoryDedupStore};
use memoir_backend::services::entry_service::EntryService;
use memoir_backend::services::media_repository;
use memoir_backend::services::storage::StorageService;
use memoir_backend::services::worker::DedupSweeper;
use memoir_backend::{AppState, create_app};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Memoir journaling backend")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Address to bind
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1")]
    host: std::net::IpAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memoir_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Memoir Backend...");

    // Setup Infrastructure
    let db = database::setup_database().await?;
    let storage_service: Arc<dyn StorageService> = storage::setup_storage().await?;

    let config = AppConfig::from_env();
    info!(
        "🛡️  Config: Max Request={}MB, Quota={} bytes ({}), Submission Window={}s",
        config.max_request_size / 1024 / 1024,
        config.storage_quota_bytes,
        config.storage_plan,
        config.submission_window_secs
    );

    let schema = database::detect_media_schema(&db).await;
    info!("🗂️  Media schema: {}", schema.as_str());
    let media_repo = media_repository::for_schema(db.clone(), schema);

    let dedup: Arc<dyn DedupStore> = Arc::new(InMemoryDedupStore::new());

    let entry_service = Arc::new(EntryService::new(
        db.clone(),
        storage_service.clone(),
        media_repo,
        dedup.clone(),
        config.clone(),
    ));

    let state = AppState {
        db: db.clone(),
        storage: storage_service,
        entry_service,
        config: config.clone(),
    };

    // Setup Shutdown Channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // Start Background Worker
    let sweeper = DedupSweeper::new(
        dedup,
        config.submission_window(),
        std::time::Duration::from_secs(config.dedup_sweep_interval_secs),
        shutdown_rx,
    );
    let sweeper_handle = tokio::spawn(sweeper.run());

    let app = create_app(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            ),
    );

    let addr = SocketAddr::new(args.host, args.port);
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Err(e) = sweeper_handle.await {
        tracing::warn!("Sweeper task ended abnormally: {}", e);
    }

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
