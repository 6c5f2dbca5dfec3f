use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::app::notifications::NotificationStore;

#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// How long a read, retained notification is kept after it was read.
    pub keep_read_for: Duration,
    pub interval: Duration,
}

impl RetentionPolicy {
    pub fn from_days(days: u64, interval_seconds: u64) -> Self {
        Self {
            keep_read_for: Duration::from_secs(days.saturating_mul(24 * 60 * 60)),
            interval: Duration::from_secs(interval_seconds.max(1)),
        }
    }
}

/// Delete read notifications that are past the retention window.
pub async fn purge_once(
    store: &dyn NotificationStore,
    policy: RetentionPolicy,
    now: OffsetDateTime,
) -> Result<u64> {
    let cutoff = time::Duration::try_from(policy.keep_read_for)
        .ok()
        .and_then(|keep| now.checked_sub(keep));
    let Some(cutoff) = cutoff else {
        debug!(
            keep_read_for_secs = policy.keep_read_for.as_secs(),
            "retention window reaches past the earliest date, nothing to purge"
        );
        return Ok(0);
    };

    let purged = store.purge_read(cutoff).await?;
    if purged > 0 {
        info!(purged, cutoff = %cutoff, "purged read notifications");
    }
    Ok(purged)
}

pub async fn run(store: Arc<dyn NotificationStore>, policy: RetentionPolicy) -> Result<()> {
    info!(
        keep_read_for_secs = policy.keep_read_for.as_secs(),
        interval_secs = policy.interval.as_secs(),
        "retention worker started"
    );
    let mut ticker = tokio::time::interval(policy.interval);
    loop {
        ticker.tick().await;
        if let Err(err) = purge_once(store.as_ref(), policy, OffsetDateTime::now_utc()).await {
            warn!(error = ?err, "retention pass failed, retrying next interval");
        }
    }
}
