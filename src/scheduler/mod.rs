use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;
use uuid::Uuid;

pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Wrapper around tokio-cron-scheduler for background tasks
pub struct Scheduler {
    inner: JobScheduler,
}

impl Scheduler {
    /// Create a new scheduler
    pub async fn new() -> Result<Self> {
        let inner = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;
        Ok(Self { inner })
    }

    /// Add a recurring cron job (six fields, seconds first, UTC)
    pub async fn add_cron_job<F>(&self, cron_expr: &str, name: &str, task: F) -> Result<Uuid>
    where
        F: Fn() -> TaskFuture + Send + Sync + 'static,
    {
        let job_name = name.to_string();
        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let name = job_name.clone();
            let fut = task();
            Box::pin(async move {
                info!("Running scheduled task: {}", name);
                fut.await;
            })
        })
        .with_context(|| format!("Failed to create cron job: {}", name))?;

        let id = self
            .inner
            .add(job)
            .await
            .with_context(|| format!("Failed to add job: {}", name))?;

        info!("Scheduled task '{}' with cron: {}", name, cron_expr);
        Ok(id)
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<()> {
        self.inner
            .start()
            .await
            .context("Failed to start scheduler")?;
        info!("Scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner
            .shutdown()
            .await
            .context("Failed to shutdown scheduler")?;
        info!("Scheduler stopped");
        Ok(())
    }
}

/// A single recurring job that is armed at most once per process, no matter
/// how often `arm` is called (the gateway re-sends ready on every reconnect).
pub struct DailyJob {
    cron_expr: String,
    name: String,
    armed: Mutex<Option<(Scheduler, Uuid)>>,
}

impl DailyJob {
    pub fn new(cron_expr: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cron_expr: cron_expr.into(),
            name: name.into(),
            armed: Mutex::new(None),
        }
    }

    /// Schedule `task` unless already scheduled. Returns the job id when this
    /// call armed it, `None` when a job was already running.
    pub async fn arm<F>(&self, task: F) -> Result<Option<Uuid>>
    where
        F: Fn() -> TaskFuture + Send + Sync + 'static,
    {
        let mut armed = self.armed.lock().await;
        if let Some((_, id)) = armed.as_ref() {
            info!("Job '{}' already scheduled ({}), not re-arming", self.name, id);
            return Ok(None);
        }

        let scheduler = Scheduler::new().await?;
        let id = scheduler
            .add_cron_job(&self.cron_expr, &self.name, task)
            .await?;
        scheduler.start().await?;
        *armed = Some((scheduler, id));
        Ok(Some(id))
    }

    #[allow(dead_code)]
    pub async fn job_id(&self) -> Option<Uuid> {
        self.armed.lock().await.as_ref().map(|(_, id)| *id)
    }

    pub async fn shutdown(&self) -> Result<()> {
        if let Some((mut scheduler, id)) = self.armed.lock().await.take() {
            info!("Stopping job '{}' ({})", self.name, id);
            scheduler.shutdown().await?;
        }
        Ok(())
    }
}
