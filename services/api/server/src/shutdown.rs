use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::signal;
use tokio::sync::{Mutex, Notify};
use tokio::time::Duration;
use tracing::{info, warn};

pub struct ShutdownCoordinator {
    notify: Arc<Notify>,
    shutting_down: AtomicBool,
    db_pool: Mutex<Option<postgres_models::connection::Pool>>,
}

impl ShutdownCoordinator {
    /// `db_pool` is `None` when there is no real pool to drain, e.g. in
    /// tests running against a mocked store.
    pub fn new(db_pool: Option<postgres_models::connection::Pool>) -> Self {
        Self {
            notify: Arc::new(Notify::new()),
            shutting_down: AtomicBool::new(false),
            db_pool: Mutex::new(db_pool),
        }
    }

    pub async fn wait_for_shutdown(&self) {
        self.notify.notified().await;
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Relaxed)
    }

    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Relaxed);
        info!("Initiating graceful shutdown sequence");

        let pool = self.db_pool.lock().await.take();

        // Notify all waiting tasks
        self.notify.notify_waiters();

        if let Some(pool) = pool {
            let shutdown_timeout = Duration::from_secs(10);
            match tokio::time::timeout(
                shutdown_timeout,
                postgres_models::connection::shutdown_pool_with_timeout(
                    pool.into(),
                    shutdown_timeout,
                ),
            )
            .await
            {
                Ok(Ok(_)) => info!("Database pool shutdown completed"),
                Ok(Err(e)) => {
                    warn!("Database pool shutdown error: {:?}", e)
                }
                Err(_) => warn!("Database pool shutdown timed out"),
            }
        }

        info!("Graceful shutdown sequence complete");
    }
}

pub async fn listen_for_shutdown_signals() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("signal received, starting graceful shutdown");
}
