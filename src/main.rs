use anyhow::anyhow;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tray::app::notifications::{NotificationStore, PgNotificationStore};
use tray::client::{HttpTransport, TerminalSurface, TrayRuntime};
use tray::config::{self, AppConfig, ClientConfig};
use tray::infra::db::Db;
use tray::jobs::retention::{self, RetentionPolicy};
use tray::{http, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_mode = config::app_mode();
    if app_mode == "client" {
        return run_client(ClientConfig::from_env()?).await;
    }

    let config = AppConfig::from_env()?;

    let db = Db::connect(&config).await?;
    db.migrate().await?;
    let store: Arc<dyn NotificationStore> = Arc::new(PgNotificationStore::new(db));

    match app_mode.as_str() {
        "api" => {
            let state = AppState::new(store, &config);
            let app: Router = http::router(state).layer(TraceLayer::new_for_http());
            let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
            tracing::info!("listening on {}", config.http_addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        "worker" => {
            let Some(days) = config.read_retention_days else {
                tracing::info!("READ_RETENTION_DAYS not set, retention worker idle");
                shutdown_signal().await;
                return Ok(());
            };
            let policy = RetentionPolicy::from_days(days, config.retention_interval_seconds);
            tokio::select! {
                result = retention::run(store, policy) => {
                    result?;
                }
                _ = shutdown_signal() => {}
            }
        }
        other => return Err(anyhow!("unknown APP_MODE: {}", other)),
    }

    Ok(())
}

async fn run_client(config: ClientConfig) -> anyhow::Result<()> {
    let transport = HttpTransport::connect(&config.base_url, config.bearer_token).await?;
    let (runtime, clicks) = TrayRuntime::new(transport, TerminalSurface);

    // Each line on stdin is a click on that notification id. A plain thread
    // so a pending read never holds up process exit.
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            match line.trim().parse::<i64>() {
                Ok(id) => {
                    if !clicks.click(id) {
                        break;
                    }
                }
                Err(_) => tracing::warn!(input = %line.trim(), "expected a notification id"),
            }
        }
    });

    let outcomes = tokio::select! {
        outcomes = runtime.run() => outcomes?,
        _ = shutdown_signal() => return Ok(()),
    };
    let failed = outcomes.iter().filter(|outcome| outcome.result.is_err()).count();
    tracing::info!(dismissed = outcomes.len(), failed, "client finished");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
