//! Trigger channel
//!
//! Every external event that might change a constraint's outcome maps to a
//! single [`AdmissionQueue::run`]. The queue-drained signal instead tears the
//! shared sensor session down.

use crate::queue::AdmissionQueue;
use crate::sensor::{SensorSession, Transition};
use crate::types::{GeofenceId, Point};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Callback installed on the sensor session for provider-originated events.
pub type TriggerListener = Arc<dyn Fn(TriggerEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerEvent {
    ConnectivityChanged,
    LocationChanged(Point),
    GeofenceTransition {
        ids: Vec<GeofenceId>,
        transition: Transition,
    },
    /// Explicit request from the application to re-evaluate.
    AppAction,
    /// No pending calls remain.
    QueueDrained,
}

impl TriggerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TriggerEvent::ConnectivityChanged => "connectivity_changed",
            TriggerEvent::LocationChanged(_) => "location_changed",
            TriggerEvent::GeofenceTransition { .. } => "geofence_transition",
            TriggerEvent::AppAction => "app_action",
            TriggerEvent::QueueDrained => "queue_drained",
        }
    }
}

/// Routes trigger events to the queue and the session.
pub struct EventRouter<P> {
    queue: Arc<AdmissionQueue<P>>,
    session: Arc<SensorSession>,
}

impl<P: Send + 'static> EventRouter<P> {
    pub fn new(queue: Arc<AdmissionQueue<P>>, session: Arc<SensorSession>) -> Self {
        Self { queue, session }
    }

    /// Build a router and wire it up: provider callbacks on the session and
    /// the queue's drain signal both dispatch through it. The hooks hold weak
    /// references, so dropping the returned router disables them.
    pub fn install(queue: Arc<AdmissionQueue<P>>, session: Arc<SensorSession>) -> Arc<Self> {
        let router = Arc::new(Self::new(queue.clone(), session.clone()));

        let weak: Weak<Self> = Arc::downgrade(&router);
        session.set_trigger_listener(Arc::new(move |event| {
            if let Some(router) = weak.upgrade() {
                router.dispatch(event);
            }
        }));

        let weak: Weak<Self> = Arc::downgrade(&router);
        queue.on_drained(move || {
            if let Some(router) = weak.upgrade() {
                router.dispatch(TriggerEvent::QueueDrained);
            }
        });

        router
    }

    pub fn queue(&self) -> &Arc<AdmissionQueue<P>> {
        &self.queue
    }

    pub fn session(&self) -> &Arc<SensorSession> {
        &self.session
    }

    pub fn dispatch(&self, event: TriggerEvent) {
        debug!(event = event.name(), "Dispatching trigger");
        match event {
            TriggerEvent::QueueDrained => {
                if self.queue.is_empty() {
                    self.session.teardown();
                } else {
                    debug!(pending = self.queue.len(), "Queue refilled before teardown");
                }
            }
            _ => {
                self.queue.run();
            }
        }
    }
}
