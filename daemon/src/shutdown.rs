// Graceful shutdown discipline. `ctrl_c()` races the service tasks; on trip the
// token is cancelled and every task's own `run(cancel)` loop drains its
// in-flight batch before returning, so joining the handles here is
// itself the "flush before close" step.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const SHUTDOWN_GRACE_PERIOD: std::time::Duration = std::time::Duration::from_secs(30);

pub async fn run_until_shutdown(tasks: Vec<JoinHandle<()>>, cancel: CancellationToken) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("shutdown signal received, draining in-flight work");
        }
        _ = cancel.cancelled() => {
            log::warn!("shutdown triggered internally");
        }
    }

    cancel.cancel();

    let join_all = futures::future::join_all(tasks);
    match tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, join_all).await {
        Ok(results) => {
            for result in results {
                if let Err(err) = result {
                    log::error!("task panicked during shutdown: {err}");
                }
            }
        }
        Err(_) => {
            log::error!("shutdown grace period elapsed with tasks still running");
        }
    }

    log::info!("shutdown complete");
}
