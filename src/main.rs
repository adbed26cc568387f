use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use clipstream::core::config::AppConfig;
use clipstream::core::shutdown::{ShutdownCoordinator, HTTP_DRAIN_TIMEOUT_SECS, SHUTDOWN_TIMEOUT_SECS};
use clipstream::delivery::router::{self, AppState};
use clipstream::observability::metrics as obs_metrics;
use clipstream::storage::StoreBackend;

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration (layered: default.toml → {env}.toml → env vars)
    let config = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    // Install the Prometheus recorder before anything records a metric.
    let metrics_handle = if config.observability.metrics_enabled {
        match obs_metrics::install_prometheus_recorder() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "failed to install metrics recorder, metrics disabled");
                obs_metrics::detached_prometheus_handle()
            }
        }
    } else {
        obs_metrics::detached_prometheus_handle()
    };
    obs_metrics::describe_all_metrics();

    // Log panics with a backtrace and count them.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        obs_metrics::inc_panic_total();
        let backtrace = std::backtrace::Backtrace::force_capture();
        error!(panic = %info, %backtrace, "panic");
        default_hook(info);
    }));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        categories = ?config.ingest.categories,
        "clipstream starting"
    );

    let shutdown = ShutdownCoordinator::new();

    let store = match StoreBackend::from_config(&config.storage, &config.cache).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(error = %e, "failed to initialize storage backend");
            return ExitCode::FAILURE;
        }
    };

    let app_state = AppState::new(store.clone(), config.clone(), metrics_handle);
    let start_time = app_state.start_time;
    let app = router::build_router(app_state);

    // Uptime gauge
    let uptime_cancel = shutdown.token();
    tokio::spawn(async move {
        obs_metrics::run_uptime_task(start_time, uptime_cancel).await;
    });

    let http_addr: SocketAddr = match format!("{}:{}", config.server.host, config.server.port).parse()
    {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, host = %config.server.host, "invalid HTTP bind address");
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(http_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%http_addr, error = %e, "failed to bind HTTP listener");
            return ExitCode::FAILURE;
        }
    };

    info!(%http_addr, backend = store.name(), "HTTP server listening");

    let shutdown_token = shutdown.token();
    let mut server: JoinHandle<std::io::Result<()>> = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_token.cancelled().await;
            })
            .await
    });

    // Run until a signal arrives or the server stops on its own.
    let server_exited_early = tokio::select! {
        _ = shutdown.wait_for_signal_and_shutdown() => false,
        result = &mut server => {
            match result {
                Ok(Ok(())) => warn!("HTTP server exited unexpectedly"),
                Ok(Err(e)) => error!(error = %e, "HTTP server error"),
                Err(e) => error!(error = %e, "HTTP server task failed"),
            }
            shutdown.trigger_shutdown();
            true
        }
    };

    obs_metrics::set_shutdown_in_progress(true);
    info!("initiating graceful shutdown sequence");

    let drain = async {
        if !server_exited_early {
            drain_http(server).await;
        }
        store.shutdown().await;
    };

    match tokio::time::timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS), drain).await {
        Ok(()) if !server_exited_early => {
            info!("graceful shutdown completed");
            ExitCode::SUCCESS
        }
        Ok(()) => ExitCode::FAILURE,
        Err(_) => {
            error!("shutdown timed out after {}s, forcing exit", SHUTDOWN_TIMEOUT_SECS);
            ExitCode::FAILURE
        }
    }
}

/// Wait for in-flight responses to finish after the listener stopped.
async fn drain_http(server: JoinHandle<std::io::Result<()>>) {
    info!("draining HTTP connections ({}s timeout)", HTTP_DRAIN_TIMEOUT_SECS);
    match tokio::time::timeout(Duration::from_secs(HTTP_DRAIN_TIMEOUT_SECS), server).await {
        Ok(Ok(Ok(()))) => info!("HTTP server drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "HTTP server error during drain"),
        Ok(Err(e)) => error!(error = %e, "HTTP server task failed during drain"),
        Err(_) => warn!("HTTP drain timed out, dropping remaining connections"),
    }
}

fn init_tracing(log_level: &str, log_format: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    match log_format {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
