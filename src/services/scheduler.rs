use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::tasks::SearchTasks;
use crate::config::SchedulerConfig;
use crate::domain::events::SearchEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    CurrentSearch,
    Backlog,
    Propers,
}

impl TaskKind {
    pub const ALL: [Self; 3] = [Self::CurrentSearch, Self::Backlog, Self::Propers];

    #[must_use]
    pub const fn job_name(self) -> &'static str {
        match self {
            Self::CurrentSearch => "current_search",
            Self::Backlog => "backlog_search",
            Self::Propers => "proper_search",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::CurrentSearch => 0,
            Self::Backlog => 1,
            Self::Propers => 2,
        }
    }
}

/// Clears a task's running flag when the run ends, even by panic.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs the search tasks on their intervals or cron schedules.
///
/// Each task runs at most once at a time; a tick that arrives while the
/// previous run is still going is skipped.
pub struct Scheduler {
    tasks: Arc<SearchTasks>,
    config: SchedulerConfig,
    cancel: CancellationToken,
    events: Option<broadcast::Sender<SearchEvent>>,
    running: [AtomicBool; 3],
}

impl Scheduler {
    #[must_use]
    pub fn new(tasks: Arc<SearchTasks>, config: SchedulerConfig, cancel: CancellationToken) -> Self {
        Self {
            tasks,
            config,
            cancel,
            events: None,
            running: [AtomicBool::new(false), AtomicBool::new(false), AtomicBool::new(false)],
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: broadcast::Sender<SearchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: SearchEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    /// Runs `kind` now unless it is already running. Returns how many results were snatched.
    pub async fn run_task(&self, kind: TaskKind) -> Option<usize> {
        let flag = &self.running[kind.index()];
        if flag.swap(true, Ordering::AcqRel) {
            info!(event = "job_skipped", job_name = kind.job_name(), "Task is still running, skipping this run");
            self.emit(SearchEvent::TaskSkipped {
                task: kind.job_name().to_string(),
            });
            return None;
        }
        let _guard = RunningGuard(flag);

        let start = std::time::Instant::now();
        info!(event = "job_started", job_name = kind.job_name(), "Starting scheduled task");
        self.emit(SearchEvent::TaskStarted {
            task: kind.job_name().to_string(),
        });

        let snatched = match kind {
            TaskKind::CurrentSearch => self.tasks.current_search(&self.cancel).await,
            TaskKind::Backlog => self.tasks.backlog_search(&self.cancel).await,
            TaskKind::Propers => self.tasks.proper_search(&self.cancel).await,
        };

        info!(
            event = "job_finished",
            job_name = kind.job_name(),
            snatched,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Scheduled task finished"
        );
        self.emit(SearchEvent::TaskFinished {
            task: kind.job_name().to_string(),
            snatched,
        });
        Some(snatched)
    }

    /// Runs until the cancellation token fires.
    pub async fn start(self: Arc<Self>) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        info!("Starting search scheduler");

        let mut cron_jobs = Vec::new();
        let mut interval_jobs = JoinSet::new();

        for kind in TaskKind::ALL {
            if let Some(cron_expr) = self.config.cron_for(kind) {
                info!(job_name = kind.job_name(), cron = %cron_expr, "Task scheduled with cron");
                cron_jobs.push(self.cron_job(kind, cron_expr)?);
            } else {
                let minutes = self.config.interval_minutes(kind).max(1);
                info!(job_name = kind.job_name(), minutes, "Task scheduled on an interval");
                interval_jobs.spawn(Arc::clone(&self).run_every(kind, Duration::from_secs(minutes * 60)));
            }
        }

        let mut sched = None;
        if !cron_jobs.is_empty() {
            let cron_sched = JobScheduler::new().await?;
            for job in cron_jobs {
                cron_sched.add(job).await?;
            }
            cron_sched.start().await?;
            sched = Some(cron_sched);
        }

        self.cancel.cancelled().await;
        info!("Stopping scheduler...");

        while let Some(joined) = interval_jobs.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Scheduled task panicked");
            }
        }
        if let Some(mut cron_sched) = sched {
            cron_sched.shutdown().await?;
        }
        Ok(())
    }

    fn cron_job(self: &Arc<Self>, kind: TaskKind, cron_expr: &str) -> Result<Job> {
        let scheduler = Arc::clone(self);
        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let scheduler = Arc::clone(&scheduler);
            Box::pin(async move {
                if scheduler.cancel.is_cancelled() {
                    return;
                }
                scheduler.run_task(kind).await;
            })
        })?;
        Ok(job)
    }

    async fn run_every(self: Arc<Self>, kind: TaskKind, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if !self.config.run_on_start {
            // The first tick of an interval fires immediately.
            ticker.tick().await;
        }

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_task(kind).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_names() {
        let names: Vec<_> = TaskKind::ALL.iter().map(|k| k.job_name()).collect();
        assert_eq!(names, ["current_search", "backlog_search", "proper_search"]);
    }

    #[test]
    fn test_running_guard_clears_flag() {
        let flag = AtomicBool::new(true);
        {
            let _guard = RunningGuard(&flag);
        }
        assert!(!flag.load(Ordering::Acquire));
    }
}
