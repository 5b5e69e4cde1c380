//! Periodic driver for the delivery pipeline, plus the daily ledger prune.
//!
//! At most one tick runs at a time: the timer and the admin force-trigger
//! both go through `run_once`, which takes the gate with `try_lock` and
//! turns an overlapping trigger into a no-op.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::db::Repository;
use crate::error::Result;
use crate::models::TickSummary;
use crate::pipeline::DeliveryPipeline;

const PRUNE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy)]
pub enum TickOutcome {
    Ran(TickSummary),
    /// A tick was already in flight; the trigger was dropped.
    Skipped,
}

struct SchedulerInner {
    pipeline: DeliveryPipeline,
    repo: Repository,
    gate: Mutex<()>,
    prune_after_days: u32,
}

pub struct Scheduler {
    inner: Arc<SchedulerInner>,
    post_interval: Duration,
}

/// Cloneable force-trigger surface handed to the admin layer.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Arc<SchedulerInner>,
}

impl SchedulerHandle {
    /// Out-of-band trigger. No-op when a tick is already running.
    pub async fn force(&self) -> Result<TickOutcome> {
        run_once(&self.inner).await
    }
}

impl Scheduler {
    pub fn new(
        pipeline: DeliveryPipeline,
        repo: Repository,
        post_interval_minutes: u32,
        prune_after_days: u32,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                pipeline,
                repo,
                gate: Mutex::new(()),
                prune_after_days,
            }),
            post_interval: Duration::from_secs(u64::from(post_interval_minutes) * 60),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Main loop. Tick and prune failures are logged and retried on their
    /// next firing; nothing here is fatal to the process.
    pub async fn run(self) {
        let mut post = interval_at(Instant::now() + self.post_interval, self.post_interval);
        post.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut prune = interval_at(Instant::now() + PRUNE_INTERVAL, PRUNE_INTERVAL);
        prune.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Scheduler started: posting every {:?}, pruning daily",
            self.post_interval
        );

        loop {
            tokio::select! {
                _ = post.tick() => {
                    match run_once(&self.inner).await {
                        Ok(TickOutcome::Ran(summary)) => {
                            tracing::debug!(
                                "Scheduled tick: {} delivered, {} feeds failed",
                                summary.delivered,
                                summary.feeds_failed
                            );
                        }
                        Ok(TickOutcome::Skipped) => {}
                        Err(e) => tracing::error!("Scheduled tick failed: {}", e),
                    }
                }
                _ = prune.tick() => {
                    match self.inner.repo
                        .prune_fingerprints_older_than(self.inner.prune_after_days)
                        .await
                    {
                        Ok(removed) => tracing::info!("Pruned {} old delivery records", removed),
                        Err(e) => tracing::error!("Prune failed: {}", e),
                    }
                }
            }
        }
    }
}

async fn run_once(inner: &SchedulerInner) -> Result<TickOutcome> {
    let Ok(_guard) = inner.gate.try_lock() else {
        tracing::debug!("Tick already in flight, ignoring trigger");
        return Ok(TickOutcome::Skipped);
    };
    let summary = inner.pipeline.run_tick().await?;
    Ok(TickOutcome::Ran(summary))
}
