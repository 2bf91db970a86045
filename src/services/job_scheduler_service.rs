use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::external::price_provider::PriceProvider;
use crate::store::PriceStore;

// Context passed to job functions
#[derive(Clone)]
pub struct JobContext {
    pub store: Arc<dyn PriceStore>,
    pub price_provider: Arc<dyn PriceProvider>,
    pub tracked_coins: Arc<[String]>,
    pub retention: chrono::Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobResult {
    pub items_processed: i32,
    pub items_failed: i32,
}

/// Runs background jobs on fixed periods until the shared shutdown token is
/// cancelled.
///
/// A job is never interrupted mid-run: cancellation is only observed while a
/// job task is waiting for its next tick.
pub struct JobSchedulerService {
    context: JobContext,
    shutdown: CancellationToken,
    jobs: Vec<(&'static str, JoinHandle<()>)>,
}

impl JobSchedulerService {
    pub fn new(context: JobContext, shutdown: CancellationToken) -> Self {
        Self {
            context,
            shutdown,
            jobs: Vec::new(),
        }
    }

    /// Run a job once on the caller's task, outside any schedule.
    pub async fn run_job_now<F, Fut>(&self, job_name: &'static str, job_fn: F) -> Option<JobResult>
    where
        F: Fn(JobContext) -> Fut,
        Fut: Future<Output = Result<JobResult, AppError>>,
    {
        execute_job_with_tracking(job_name, self.context.clone(), &job_fn).await
    }

    /// Start a job on its own task, repeating every `period`.
    ///
    /// With `run_on_start` the first run happens immediately, otherwise one
    /// full period after scheduling.
    pub fn schedule_job<F, Fut>(
        &mut self,
        job_name: &'static str,
        period: Duration,
        run_on_start: bool,
        job_fn: F,
    ) where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JobResult, AppError>> + Send + 'static,
    {
        let context = self.context.clone();
        let shutdown = self.shutdown.clone();

        let handle = tokio::spawn(async move {
            let start = if run_on_start { Instant::now() } else { Instant::now() + period };
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        info!("🛑 {} shutting down", job_name);
                        break;
                    }
                    _ = ticker.tick() => {
                        execute_job_with_tracking(job_name, context.clone(), &job_fn).await;
                    }
                }
            }
        });

        info!(
            "📅 Scheduled: {} every {}s{}",
            job_name,
            period.as_secs(),
            if run_on_start { " (running now)" } else { "" }
        );
        self.jobs.push((job_name, handle));
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Wait for every scheduled job task to exit, up to `timeout`.
    ///
    /// The shutdown token must already be cancelled. Returns `false` if the
    /// deadline passed with jobs still running; those tasks are left detached.
    pub async fn wait_for_shutdown(self, timeout: Duration) -> bool {
        let joins = self.jobs.into_iter().map(|(job_name, handle)| async move {
            if let Err(e) = handle.await {
                error!("Job task {} ended abnormally: {}", job_name, e);
            }
        });

        match tokio::time::timeout(timeout, futures::future::join_all(joins)).await {
            Ok(_) => {
                info!("✅ All jobs stopped");
                true
            }
            Err(_) => {
                warn!(
                    "Timeout waiting for jobs to stop after {}s, forcing shutdown",
                    timeout.as_secs()
                );
                false
            }
        }
    }
}

// Job tracking wrapper
async fn execute_job_with_tracking<F, Fut>(
    job_name: &str,
    context: JobContext,
    job_fn: &F,
) -> Option<JobResult>
where
    F: Fn(JobContext) -> Fut,
    Fut: Future<Output = Result<JobResult, AppError>>,
{
    info!("🏃 Starting job: {}", job_name);
    let started_at = Utc::now();

    let result = job_fn(context).await;

    let duration_ms = (Utc::now() - started_at).num_milliseconds();

    match result {
        Ok(job_result) => {
            info!(
                "✅ Job completed: {} (processed: {}, failed: {}, duration: {}ms)",
                job_name, job_result.items_processed, job_result.items_failed, duration_ms
            );
            Some(job_result)
        }
        Err(e) => {
            error!("❌ Job failed: {} - {} (duration: {}ms)", job_name, e, duration_ms);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::price_provider::PriceProviderError;
    use crate::store::InMemoryPriceStore;
    use async_trait::async_trait;
    use bigdecimal::BigDecimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoopProvider;

    #[async_trait]
    impl PriceProvider for NoopProvider {
        async fn fetch_mid_price(&self, coin: &str) -> Result<BigDecimal, PriceProviderError> {
            Err(PriceProviderError::Network(format!("no upstream for {}", coin)))
        }
    }

    fn test_context() -> JobContext {
        JobContext {
            store: Arc::new(InMemoryPriceStore::new()),
            price_provider: Arc::new(NoopProvider),
            tracked_coins: Arc::from(vec!["BTC".to_string()]),
            retention: chrono::Duration::days(2),
        }
    }

    fn counting_job(
        counter: Arc<AtomicUsize>,
    ) -> impl Fn(JobContext) -> futures::future::Ready<Result<JobResult, AppError>> + Send + Sync + 'static
    {
        move |_ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok(JobResult::default()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_run_waits_one_period() {
        let counter = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let mut scheduler = JobSchedulerService::new(test_context(), token.clone());

        scheduler.schedule_job("count", Duration::from_secs(3600), false, counting_job(counter.clone()));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        token.cancel();
        assert!(scheduler.wait_for_shutdown(Duration::from_secs(30)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_on_start_runs_immediately_then_periodically() {
        let counter = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let mut scheduler = JobSchedulerService::new(test_context(), token.clone());

        scheduler.schedule_job("count", Duration::from_secs(3600), true, counting_job(counter.clone()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(2 * 3600)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        token.cancel();
        assert!(scheduler.wait_for_shutdown(Duration::from_secs(30)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_run_finishes_before_stop() {
        let finished = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let mut scheduler = JobSchedulerService::new(test_context(), token.clone());

        let done = finished.clone();
        scheduler.schedule_job("slow", Duration::from_secs(3600), true, move |_ctx| {
            let done = done.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(JobResult::default())
            }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();

        assert!(scheduler.wait_for_shutdown(Duration::from_secs(30)).await);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_job_hits_shutdown_deadline() {
        let token = CancellationToken::new();
        let mut scheduler = JobSchedulerService::new(test_context(), token.clone());

        scheduler.schedule_job("stuck", Duration::from_secs(3600), true, |_ctx| async {
            futures::future::pending::<()>().await;
            Ok(JobResult::default())
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();

        assert!(!scheduler.wait_for_shutdown(Duration::from_secs(30)).await);
    }

    #[tokio::test]
    async fn test_failed_run_is_reported_not_propagated() {
        let scheduler = JobSchedulerService::new(test_context(), CancellationToken::new());

        let result = scheduler
            .run_job_now("failing", |_ctx| async {
                Err(AppError::Validation("boom".to_string()))
            })
            .await;

        assert!(result.is_none());
        assert_eq!(scheduler.job_count(), 0);
    }
}
