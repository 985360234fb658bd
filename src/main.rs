use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;

use notification_router::config::Settings;
use notification_router::server::{create_app, AppState};
use notification_router::telemetry::init_telemetry;
use notification_router::triggers::RedisSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing; the guard flushes spans on exit
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");

    // Create application state
    let state = AppState::new(settings.clone()).await?;

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Start Redis subscriber in background
    let redis_handle = if settings.redis.enabled {
        let subscriber = Arc::new(RedisSubscriber::new(
            settings.redis.clone(),
            state.dispatcher.clone(),
        ));
        let subscriber_shutdown = subscriber.shutdown_signal();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let _ = shutdown_rx.recv().await;
            let _ = subscriber_shutdown.send(());
        });

        Some(tokio::spawn(async move {
            if let Err(e) = subscriber.start().await {
                tracing::error!(error = %e, "Redis subscriber failed");
            }
        }))
    } else {
        tracing::info!("Redis trigger disabled");
        None
    };

    let postgres = state.postgres.clone();

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    // Wait for background tasks to finish
    if let Some(handle) = redis_handle {
        tracing::info!("Waiting for Redis subscriber to finish...");
        let _ = handle.await;
    }

    if let Some(pool) = postgres {
        pool.close().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Propagate to background tasks
    let _ = shutdown_tx.send(());
}
