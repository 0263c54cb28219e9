use clap::Parser;
use embedb_core::config;
use embedb_core::{LogStore, StoreOptions, VectorService};
use embedb_server::api::create_router;
use embedb_server::api::handlers::AppState;
use embedb_server::api::metrics;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "embedb", about = "A simple vector database")]
struct Args {
    /// Directory to store the data
    #[arg(long, env = "DATA_DIR", default_value = config::DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Host and port to listen on
    #[arg(long, env = "HOST", default_value = config::DEFAULT_HOST)]
    host: String,

    /// Worker threads decoding records during the startup index rebuild
    #[arg(long, env = "REBUILD_WORKERS", default_value_t = config::DEFAULT_REBUILD_WORKERS)]
    rebuild_workers: usize,

    /// Memory report interval in seconds (0 = disabled)
    #[arg(long, default_value_t = config::MEMORY_REPORT_INTERVAL_SECS)]
    memory_report_interval: u64,

    /// Snapshot the store and truncate its log on shutdown
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    compact_on_shutdown: bool,

    /// Fail startup if store log replay encounters errors (strict mode)
    #[arg(long, default_value_t = false)]
    store_strict: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("embedb_server=info,embedb_core=info"));
    tracing_subscriber::fmt().json().with_env_filter(filter).init();

    let args = Args::parse();

    if args.data_dir.exists() && !args.data_dir.is_dir() {
        eprintln!(
            "Error: data_dir '{}' exists but is not a directory",
            args.data_dir.display()
        );
        std::process::exit(1);
    }
    if args.rebuild_workers == 0 {
        eprintln!("Error: rebuild_workers must be > 0");
        std::process::exit(1);
    }

    let options = StoreOptions {
        strict: args.store_strict,
        ..StoreOptions::default()
    };
    let store = match LogStore::open_with(&args.data_dir, options) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, path = %args.data_dir.display(), "Failed to open store");
            std::process::exit(1);
        }
    };
    tracing::info!(path = %args.data_dir.display(), "Database opened");

    let service = Arc::new(VectorService::new(store));
    tracing::info!(workers = args.rebuild_workers, "Restoring index...");
    let restore_service = service.clone();
    let workers = args.rebuild_workers;
    let restored = tokio::task::spawn_blocking(move || restore_service.restore(workers)).await?;
    match restored {
        Ok(stats) => tracing::info!(
            elapsed_ms = stats.elapsed.as_millis() as u64,
            records = stats.records,
            "Index restored"
        ),
        Err(e) => {
            tracing::error!(error = %e, "Index restore failed, refusing to serve");
            std::process::exit(1);
        }
    }

    let prometheus_handle =
        metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
    metrics::update_index_metrics(&service);

    if args.memory_report_interval > 0 {
        let report_service = service.clone();
        let period = Duration::from_secs(args.memory_report_interval);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let (vectors, index_bytes, log_bytes) =
                    metrics::update_index_metrics(&report_service);
                tracing::info!(
                    vectors,
                    index_mib = index_bytes / (1024 * 1024),
                    store_log_bytes = log_bytes,
                    "Memory usage"
                );
            }
        });
    }

    let state = AppState {
        service: service.clone(),
        prometheus_handle,
        start_time: Instant::now(),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&args.host).await?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %args.host,
        data_dir = %args.data_dir.display(),
        vectors = service.len(),
        "Starting server"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    if args.compact_on_shutdown {
        let store = service.store().clone();
        match tokio::task::spawn_blocking(move || store.compact()).await? {
            Ok(()) => tracing::info!("Store compacted on shutdown"),
            Err(e) => tracing::error!("Store compaction on shutdown failed, log preserved: {}", e),
        }
    }

    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }

    tracing::info!("Shutting down gracefully, draining in-flight requests...");
}
