//! Background refresh scheduling
//!
//! Each registered component (the two recommenders and the stats aggregator)
//! is rebuilt on its own cadence by an independently cancellable task. A
//! failed rebuild is logged and reported, never fatal: the component keeps
//! serving its previous state. Rebuilds of one component are serialized by a
//! per-component async mutex that queries never touch; different components
//! may rebuild concurrently.

use crate::errors::{RecoError, Result};
use crate::metrics::{REBUILD_DURATION, REBUILD_TOTAL};
use crate::recommender::Refreshable;
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Lifecycle of one component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    /// No rebuild has succeeded yet; queries fail closed or report unknown IDs
    Uninitialized,
    /// At least one rebuild succeeded
    Ready,
}

/// Introspection snapshot for one component
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub state: ComponentState,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub rebuild_count: u64,
    pub failure_count: u64,
}

struct ScheduledComponent {
    task: Arc<dyn Refreshable>,
    /// Serializes rebuilds of this component; never held during queries
    rebuild_lock: Mutex<()>,
    health: RwLock<ComponentHealth>,
}

/// Outcome of one component within a forced refresh
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub component: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Per-component outcomes of [`RefreshScheduler::force_refresh_all`]
#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub reports: Vec<RefreshReport>,
}

impl RefreshSummary {
    pub fn all_succeeded(&self) -> bool {
        self.reports.iter().all(|r| r.success)
    }

    /// First failed component, in registration order
    pub fn first_failure(&self) -> Option<&RefreshReport> {
        self.reports.iter().find(|r| !r.success)
    }
}

/// Owns the refreshable components and their rebuild cadence
pub struct RefreshScheduler {
    components: Vec<Arc<ScheduledComponent>>,
    rebuild_timeout: Option<Duration>,
}

impl RefreshScheduler {
    pub fn new(rebuild_timeout: Option<Duration>) -> Self {
        Self {
            components: Vec::new(),
            rebuild_timeout,
        }
    }

    pub fn register(&mut self, task: Arc<dyn Refreshable>) {
        let health = ComponentHealth {
            name: task.name().to_string(),
            state: ComponentState::Uninitialized,
            last_success: None,
            last_error: None,
            rebuild_count: 0,
            failure_count: 0,
        };
        self.components.push(Arc::new(ScheduledComponent {
            task,
            rebuild_lock: Mutex::new(()),
            health: RwLock::new(health),
        }));
    }

    pub fn component_names(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.task.name()).collect()
    }

    fn find(&self, name: &str) -> Result<&Arc<ScheduledComponent>> {
        self.components
            .iter()
            .find(|c| c.task.name() == name)
            .ok_or_else(|| RecoError::Internal(anyhow!("unknown component '{name}'")))
    }

    async fn run_rebuild(
        component: &ScheduledComponent,
        rebuild_timeout: Option<Duration>,
    ) -> Result<()> {
        let name = component.task.name();
        let _guard = component.rebuild_lock.lock().await;

        let timer = REBUILD_DURATION.with_label_values(&[name]).start_timer();
        let result = match rebuild_timeout {
            Some(limit) => match tokio::time::timeout(limit, component.task.rebuild()).await {
                Ok(result) => result,
                // the abandoned build never reaches its snapshot swap
                Err(_) => Err(RecoError::RebuildTimeout {
                    component: name.to_string(),
                    waited_secs: limit.as_secs(),
                }),
            },
            None => component.task.rebuild().await,
        };
        timer.observe_duration();

        let mut health = component.health.write();
        match &result {
            Ok(()) => {
                REBUILD_TOTAL.with_label_values(&[name, "success"]).inc();
                health.state = ComponentState::Ready;
                health.last_success = Some(Utc::now());
                health.last_error = None;
                health.rebuild_count += 1;
            }
            Err(e) => {
                REBUILD_TOTAL.with_label_values(&[name, "error"]).inc();
                health.failure_count += 1;
                health.last_error = Some(e.to_string());
                error!("❌ Refresh of '{name}' failed, previous state stays live: {e}");
            }
        }
        result
    }

    /// Rebuild one component immediately
    pub async fn refresh_once(&self, name: &str) -> Result<()> {
        let component = self.find(name)?;
        Self::run_rebuild(component, self.rebuild_timeout).await
    }

    /// Rebuild every component concurrently and report each outcome
    pub async fn force_refresh_all(&self) -> RefreshSummary {
        info!("🔄 Forcing refresh of {} component(s)", self.components.len());
        let reports = join_all(self.components.iter().map(|component| async {
            let started = Instant::now();
            let result = Self::run_rebuild(component, self.rebuild_timeout).await;
            RefreshReport {
                component: component.task.name().to_string(),
                success: result.is_ok(),
                error: result.err().map(|e| e.to_string()),
                duration_ms: started.elapsed().as_millis() as u64,
            }
        }))
        .await;
        RefreshSummary { reports }
    }

    /// Spawn the periodic refresh loop for one component
    ///
    /// The loop refreshes first and sleeps after, so a fresh process starts
    /// serving as soon as the first rebuild lands. Abort the returned handle
    /// to cancel.
    pub fn spawn_periodic(&self, name: &str, interval: Duration) -> Result<JoinHandle<()>> {
        let component = self.find(name)?.clone();
        let rebuild_timeout = self.rebuild_timeout;
        info!("⏱️ Scheduling '{name}' refresh every {interval:?}");
        Ok(tokio::spawn(async move {
            loop {
                let _ = Self::run_rebuild(&component, rebuild_timeout).await;
                tokio::time::sleep(interval).await;
            }
        }))
    }

    /// Health snapshot of every component, in registration order
    pub fn status(&self) -> Vec<ComponentHealth> {
        self.components
            .iter()
            .map(|c| c.health.read().clone())
            .collect()
    }
}
