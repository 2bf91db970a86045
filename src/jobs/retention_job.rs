use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::errors::AppError;
use crate::services::job_scheduler_service::{JobContext, JobResult};

/// Soft-delete every observation older than the retention window.
pub async fn purge_expired_prices(ctx: JobContext) -> Result<JobResult, AppError> {
    purge_older_than(&ctx, Utc::now()).await
}

/// One retention pass with an explicit clock.
///
/// Already soft-deleted rows are not touched again, so a second pass with no
/// new data in between reports zero rows.
pub async fn purge_older_than(ctx: &JobContext, now: DateTime<Utc>) -> Result<JobResult, AppError> {
    let cutoff = now - ctx.retention;
    info!("🧹 Starting cleanup of coin prices created before {}", cutoff.to_rfc3339());

    let deleted = ctx.store.soft_delete_before(cutoff).await.map_err(|e| {
        error!("Error during cleanup: {}", e);
        AppError::Db(e)
    })?;

    info!(
        "Cleanup completed. Deleted {} records older than {}",
        deleted,
        cutoff.to_rfc3339()
    );

    Ok(JobResult {
        items_processed: i32::try_from(deleted).unwrap_or(i32::MAX),
        items_failed: 0,
    })
}
