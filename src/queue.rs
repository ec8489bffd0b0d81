//! Admission Queue
//!
//! Holds pending calls until their constraints are satisfied. Calls are only
//! ever admitted from [`AdmissionQueue::run`], which an external trigger
//! invokes; enqueueing never evaluates, so a call enqueued while its
//! constraint already holds waits for the next trigger to confirm it.

use crate::constraint::Constraint;
use crate::environment::{Environment, EnvironmentSnapshot, NetworkMonitor};
use crate::error::QueueError;
use crate::sensor::SensorSession;
use crate::types::CallId;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for the admission queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of pending calls
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

fn default_max_pending() -> usize {
    10_000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_pending: default_max_pending(),
        }
    }
}

impl QueueConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_pending == 0 {
            return Err("max_pending must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// A call waiting for admission
#[derive(Debug)]
pub struct PendingCall<P> {
    id: CallId,
    constraint: Arc<Constraint>,
    payload: P,
    enqueued_at: DateTime<Utc>,
}

impl<P> PendingCall<P> {
    pub fn new(constraint: Constraint, payload: P) -> Self {
        Self::with_id(CallId::next(), constraint, payload)
    }

    /// Use a caller-managed identity.
    pub fn with_id(id: CallId, constraint: Constraint, payload: P) -> Self {
        Self {
            id,
            constraint: Arc::new(constraint),
            payload,
            enqueued_at: Utc::now(),
        }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    pub fn into_payload(self) -> P {
        self.payload
    }
}

/// Receives admitted calls. This is the boundary to whatever actually runs them.
pub trait CallExecutor<P>: Send + Sync {
    fn execute(&self, call: PendingCall<P>);
}

impl<P, F> CallExecutor<P> for F
where
    F: Fn(PendingCall<P>) + Send + Sync,
{
    fn execute(&self, call: PendingCall<P>) {
        self(call)
    }
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Number of pending calls
    pub pending: usize,
    /// Calls handed to the executor
    pub admitted: u64,
    /// Calls removed by cancel
    pub cancelled: u64,
    /// Completed evaluation passes
    pub runs: u64,
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Outcome of one evaluation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub evaluated: usize,
    pub admitted: Vec<CallId>,
    pub held: usize,
}

type DrainHook = Arc<dyn Fn() + Send + Sync>;

/// Pending calls gated by constraints
pub struct AdmissionQueue<P> {
    pending: Mutex<BTreeMap<CallId, PendingCall<P>>>,
    session: Arc<SensorSession>,
    network: Arc<dyn NetworkMonitor>,
    executor: Arc<dyn CallExecutor<P>>,
    config: QueueConfig,
    stats: RwLock<QueueStats>,
    drain_hooks: RwLock<Vec<DrainHook>>,
}

impl<P: Send + 'static> AdmissionQueue<P> {
    pub fn new(
        session: Arc<SensorSession>,
        network: Arc<dyn NetworkMonitor>,
        executor: Arc<dyn CallExecutor<P>>,
        config: QueueConfig,
    ) -> Self {
        Self {
            pending: Mutex::new(BTreeMap::new()),
            session,
            network,
            executor,
            config,
            stats: RwLock::new(QueueStats::default()),
            drain_hooks: RwLock::new(Vec::new()),
        }
    }

    pub fn session(&self) -> &Arc<SensorSession> {
        &self.session
    }

    /// Register a hook invoked whenever admission or cancellation empties the queue.
    pub fn on_drained<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.drain_hooks.write().push(Arc::new(hook));
    }

    /// Activate the call's constraint and store it. Never evaluates.
    pub fn enqueue(&self, call: PendingCall<P>) -> Result<CallId, QueueError> {
        let id = call.id;
        self.check_capacity(id)?;

        call.constraint.activate(&self.session);

        let mut pending = self.pending.lock();
        if let Err(e) = Self::check_insert(&pending, id, self.config.max_pending) {
            drop(pending);
            warn!(call_id = %id, error = %e, "Enqueue lost a race, undoing activation");
            call.constraint.deactivate(&self.session);
            return Err(e);
        }
        debug!(call_id = %id, constraint = %call.constraint, "Enqueued call");
        pending.insert(id, call);
        let queue_size = pending.len();
        drop(pending);

        debug!(call_id = %id, queue_size, "Call waiting for trigger");
        Ok(id)
    }

    /// Evaluate every pending call against a fresh snapshot and admit those
    /// whose constraint holds.
    pub fn run(&self) -> RunSummary {
        let snapshot = EnvironmentSnapshot::sample(self.network.as_ref());
        let candidates: Vec<(CallId, Arc<Constraint>)> = self
            .pending
            .lock()
            .iter()
            .map(|(id, call)| (*id, call.constraint.clone()))
            .collect();

        debug!(
            pending = candidates.len(),
            network = snapshot.network.as_str(),
            roaming = snapshot.roaming,
            "Evaluating pending calls"
        );

        let env = Environment::new(snapshot, &self.session);
        let mut summary = RunSummary {
            evaluated: candidates.len(),
            ..RunSummary::default()
        };
        let mut drained = false;

        for (id, constraint) in candidates {
            if !constraint.evaluate(&env) {
                summary.held += 1;
                continue;
            }

            // Removal decides between admission, cancellation and concurrent runs.
            let call = {
                let mut pending = self.pending.lock();
                let call = pending.remove(&id);
                if call.is_some() && pending.is_empty() {
                    drained = true;
                }
                call
            };
            let Some(call) = call else {
                debug!(call_id = %id, "Call already admitted or cancelled");
                continue;
            };

            call.constraint.deactivate(&self.session);
            info!(call_id = %id, constraint = %call.constraint, "Admitting call");
            summary.admitted.push(id);
            self.stats.write().admitted += 1;
            self.executor.execute(call);
        }

        {
            let mut stats = self.stats.write();
            stats.runs += 1;
            stats.last_run_at = Some(Utc::now());
        }

        debug!(
            evaluated = summary.evaluated,
            admitted = summary.admitted.len(),
            held = summary.held,
            "Evaluation pass complete"
        );

        if drained {
            self.signal_drained();
        }
        summary
    }

    /// Remove a call without running it. Returns `None` if it was already
    /// admitted or cancelled.
    pub fn cancel(&self, id: CallId) -> Option<PendingCall<P>> {
        let (call, drained) = {
            let mut pending = self.pending.lock();
            let call = pending.remove(&id);
            let drained = call.is_some() && pending.is_empty();
            (call, drained)
        };
        let Some(call) = call else {
            debug!(call_id = %id, "Cancel: call not pending");
            return None;
        };

        call.constraint.deactivate(&self.session);
        self.stats.write().cancelled += 1;
        info!(call_id = %id, "Cancelled call");

        if drained {
            self.signal_drained();
        }
        Some(call)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    pub fn contains(&self, id: CallId) -> bool {
        self.pending.lock().contains_key(&id)
    }

    /// Pending ids in enqueue order.
    pub fn pending_ids(&self) -> Vec<CallId> {
        self.pending.lock().keys().copied().collect()
    }

    pub fn stats(&self) -> QueueStats {
        let mut stats = self.stats.read().clone();
        stats.pending = self.len();
        stats
    }

    fn check_capacity(&self, id: CallId) -> Result<(), QueueError> {
        let pending = self.pending.lock();
        Self::check_insert(&pending, id, self.config.max_pending).map_err(|e| {
            warn!(call_id = %id, error = %e, "Rejected call");
            e
        })
    }

    fn check_insert(
        pending: &BTreeMap<CallId, PendingCall<P>>,
        id: CallId,
        max_pending: usize,
    ) -> Result<(), QueueError> {
        if pending.contains_key(&id) {
            return Err(QueueError::AlreadyQueued(id));
        }
        if pending.len() >= max_pending {
            return Err(QueueError::QueueFull { max_pending });
        }
        Ok(())
    }

    fn signal_drained(&self) {
        let hooks: Vec<DrainHook> = self.drain_hooks.read().clone();
        info!(hooks = hooks.len(), "No pending calls remain");
        for hook in hooks {
            hook();
        }
    }
}
