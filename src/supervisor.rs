//! Process lifecycle: initial fetch, background jobs, HTTP server and the
//! shutdown sequence that ties them together.

use std::future::Future;

use tokio::net::TcpListener;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::app::create_app;
use crate::config::AppConfig;
use crate::jobs::{price_fetch_job, retention_job};
use crate::services::job_scheduler_service::{JobContext, JobSchedulerService};
use crate::state::AppState;

/// Run the service until `shutdown` resolves.
///
/// One fetch cycle runs to completion before the listener starts serving, so
/// the API has data from the first request on. After `shutdown` fires the
/// single cancellation token is tripped, the HTTP server gets
/// `http_shutdown_timeout` to drain, and the jobs get
/// `worker_shutdown_timeout` to stop. Missing either deadline is logged and
/// the function still returns `Ok`.
pub async fn run<S>(
    config: &AppConfig,
    listener: TcpListener,
    context: JobContext,
    shutdown: S,
) -> anyhow::Result<()>
where
    S: Future<Output = ()>,
{
    let token = CancellationToken::new();
    let mut scheduler = JobSchedulerService::new(context.clone(), token.clone());

    info!("Fetching initial coin prices...");
    scheduler
        .run_job_now("fetch_prices", price_fetch_job::fetch_all_prices)
        .await;

    scheduler.schedule_job(
        "fetch_prices",
        config.fetch_interval,
        false,
        price_fetch_job::fetch_all_prices,
    );
    scheduler.schedule_job(
        "cleanup_prices",
        config.cleanup_interval,
        true,
        retention_job::purge_expired_prices,
    );
    info!("Started {} background jobs", scheduler.job_count());

    let app = create_app(AppState {
        store: context.store.clone(),
        query_window: config.query_window,
    });
    let addr = listener.local_addr()?;
    let server_token = token.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_token.cancelled_owned())
            .await
    });
    info!("🚀 dexlite backend running at http://{}/", addr);

    let early_exit = tokio::select! {
        _ = shutdown => {
            info!("Shutdown signal received, initiating graceful shutdown...");
            None
        }
        result = &mut server => Some(result),
    };

    token.cancel();

    match early_exit {
        Some(result) => {
            error!("HTTP server exited before shutdown was requested");
            log_server_exit(result);
        }
        None => match tokio::time::timeout(config.http_shutdown_timeout, &mut server).await {
            Ok(result) => log_server_exit(result),
            Err(_) => {
                warn!(
                    "HTTP server did not drain within {}s, aborting open connections",
                    config.http_shutdown_timeout.as_secs()
                );
                server.abort();
            }
        },
    }

    scheduler
        .wait_for_shutdown(config.worker_shutdown_timeout)
        .await;

    info!("Application shutdown complete");
    Ok(())
}

fn log_server_exit(result: Result<std::io::Result<()>, JoinError>) {
    match result {
        Ok(Ok(())) => info!("HTTP server stopped successfully"),
        Ok(Err(e)) => error!("HTTP server error: {}", e),
        Err(e) => error!("HTTP server task failed: {}", e),
    }
}
