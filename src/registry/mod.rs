//! Loop registry and scheduler.
//!
//! The registry owns every registered [`ControlLoop`], spawns one timer task
//! per loop on [`Registry::start`], and stops them all on [`Registry::stop`].
//! Loops are isolated: each task has its own interval and its own cycle lock,
//! so a slow action in one loop never delays another.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info};

use crate::audit::AuditLogger;
use crate::domain::{LoopSpec, Outcome};
use crate::error::{Result, WardenError};
use crate::id::{Clock, SystemClock};
use crate::runner::{ControlLoop, LoopStatus, Policy};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Lifecycle {
    Created,
    Running,
    Stopped,
}

/// Owns the control loops and their timer tasks.
pub struct Registry {
    loops: HashMap<String, Arc<ControlLoop>>,
    handles: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
    lifecycle: Lifecycle,
    audit: Arc<AuditLogger>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("loops", &self.loops.keys().collect::<Vec<_>>())
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Create an empty registry writing audit entries through `audit`.
    pub fn new(audit: Arc<AuditLogger>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            loops: HashMap::new(),
            handles: Vec::new(),
            shutdown,
            lifecycle: Lifecycle::Created,
            audit,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used by every loop registered after this call.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register `policy` under `spec`.
    ///
    /// Rejects invalid specs and duplicate ids. Registration is only
    /// allowed before [`Registry::start`]; the loop set is fixed while
    /// the scheduler runs.
    pub fn register(&mut self, spec: LoopSpec, policy: Arc<dyn Policy>) -> Result<()> {
        if self.lifecycle != Lifecycle::Created {
            return Err(WardenError::InvalidState(
                "loops must be registered before the registry starts".to_string(),
            ));
        }
        spec.validate()?;
        if self.loops.contains_key(&spec.id) {
            return Err(WardenError::DuplicateLoop(spec.id.clone()));
        }
        let id = spec.id.clone();
        let control_loop =
            ControlLoop::new(spec, policy, Arc::clone(&self.audit)).with_clock(Arc::clone(&self.clock));
        self.loops.insert(id.clone(), Arc::new(control_loop));
        debug!(loop_id = %id, "loop registered");
        Ok(())
    }

    /// Spawn one timer task per registered loop.
    ///
    /// Each loop first fires one full poll interval after this call, then
    /// on every interval boundary. A tick that lands while the previous
    /// cycle is still running is skipped, not queued.
    pub fn start(&mut self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Running => {
                return Err(WardenError::InvalidState("registry already started".to_string()));
            }
            Lifecycle::Stopped => {
                return Err(WardenError::InvalidState("registry already stopped".to_string()));
            }
            Lifecycle::Created => {}
        }
        self.lifecycle = Lifecycle::Running;

        for control_loop in self.loops.values() {
            let control_loop = Arc::clone(control_loop);
            let mut shutdown = self.shutdown.subscribe();
            let handle = tokio::spawn(async move {
                let period = control_loop.spec().poll_interval;
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    // Biased so a pending tick never outraces the shutdown
                    // signal once an in-flight cycle finishes.
                    tokio::select! {
                        biased;
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                break;
                            }
                        }
                        _ = ticker.tick() => {
                            if let Some(Err(err)) = control_loop.run_scheduled().await {
                                error!(
                                    loop_id = %control_loop.id(),
                                    error = %err,
                                    "scheduled cycle failed"
                                );
                            }
                        }
                    }
                }
                debug!(loop_id = %control_loop.id(), "loop task stopped");
            });
            self.handles.push(handle);
        }

        info!(loops = self.loops.len(), "registry started");
        Ok(())
    }

    /// Stop all timer tasks and wait for them to finish.
    ///
    /// A cycle that is already executing completes before its task exits;
    /// no new cycles begin. Safe to call more than once.
    pub async fn stop(&mut self) {
        if self.lifecycle != Lifecycle::Running {
            return;
        }
        self.lifecycle = Lifecycle::Stopped;
        let _ = self.shutdown.send(true);
        join_all(self.handles.drain(..)).await;
        info!("registry stopped");
    }

    /// Run one cycle of `loop_id` now, outside its schedule.
    ///
    /// Takes the same per-loop lock as the scheduler, so the manual cycle
    /// waits for any in-flight scheduled cycle instead of racing it. `hint`
    /// is passed to the policy's evaluation.
    pub async fn trigger_manually(&self, loop_id: &str, hint: Option<Value>) -> Result<Outcome> {
        if self.lifecycle == Lifecycle::Stopped {
            return Err(WardenError::InvalidState(
                "registry is stopped; manual triggers are no longer accepted".to_string(),
            ));
        }
        let control_loop = self
            .loops
            .get(loop_id)
            .ok_or_else(|| WardenError::LoopNotFound(loop_id.to_string()))?;
        info!(loop_id = %loop_id, "manual trigger");
        control_loop.trigger(hint).await
    }

    /// Registered loop ids, sorted.
    pub fn loop_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.loops.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Status snapshot of every loop, sorted by id.
    pub fn status(&self) -> Vec<LoopStatus> {
        let mut statuses: Vec<LoopStatus> =
            self.loops.values().map(|l| l.status()).collect();
        statuses.sort_by(|a, b| a.id.cmp(&b.id));
        statuses
    }

    /// Direct handle to one loop, for introspection.
    pub fn get(&self, loop_id: &str) -> Option<Arc<ControlLoop>> {
        self.loops.get(loop_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }
}
