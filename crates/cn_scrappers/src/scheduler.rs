use std::sync::Arc;
use std::time::Duration;

use cn_core::Logger;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::manager::PipelineManager;

/// Drives [`PipelineManager::run_cycle`] on a fixed period in a background task.
pub struct Scheduler;

impl Scheduler {
    /// The first cycle starts immediately. Dropping the handle also stops the task
    /// once the cycle in flight finishes.
    pub fn spawn(pipeline: Arc<PipelineManager>, period: Duration, logger: Logger) -> SchedulerHandle {
        let period = period.max(Duration::from_millis(1));
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            logger.info(&format!("⏰ Scheduler started, running every {:?}", period));
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {}
                }

                let report = pipeline.run_cycle().await;
                logger.debug(&format!("📊 Scheduled cycle finished: {:?}", report));

                if *stop_rx.borrow() {
                    break;
                }
            }
            logger.info("🛑 Scheduler stopped");
        });

        SchedulerHandle { stop_tx, task }
    }
}

pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signal the task and wait for the cycle in flight to complete.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("❌ Scheduler task ended abnormally: {}", e);
        }
    }
}
