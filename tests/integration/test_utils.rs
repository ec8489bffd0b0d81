//! Shared test utilities for integration tests
//!
//! Builds a simulated provider, network and session, plus a queue whose
//! executor records every admitted payload.

use callgate::queue::{AdmissionQueue, PendingCall, QueueConfig};
use callgate::sensor::{LocationProvider, SensorSession, SessionConfig};
use callgate::sim::{ConnectBehavior, SimulatedNetwork, SimulatedProvider};
use callgate::types::NetworkClass;
use parking_lot::Mutex;
use std::sync::Arc;

pub type Executed = Arc<Mutex<Vec<&'static str>>>;

pub struct Harness {
    pub provider: Arc<SimulatedProvider>,
    pub network: Arc<SimulatedNetwork>,
    pub session: Arc<SensorSession>,
    pub queue: Arc<AdmissionQueue<&'static str>>,
    pub executed: Executed,
}

/// Session timeouts short enough to keep failure paths fast.
pub fn fast_session_config() -> SessionConfig {
    SessionConfig {
        connect_timeout_ms: 500,
        location_timeout_ms: 500,
        ..SessionConfig::default()
    }
}

impl Harness {
    pub fn new(behavior: ConnectBehavior, network: NetworkClass) -> Self {
        let provider = Arc::new(SimulatedProvider::new(behavior));
        Self::with_provider(provider.clone(), provider, network)
    }

    /// Build the session over `session_provider`, which forwards to
    /// `provider` for the counters the tests read.
    pub fn with_provider(
        provider: Arc<SimulatedProvider>,
        session_provider: Arc<dyn LocationProvider>,
        network: NetworkClass,
    ) -> Self {
        let network = Arc::new(SimulatedNetwork::new(network));
        let session = SensorSession::new(session_provider, fast_session_config());
        let executed: Executed = Arc::new(Mutex::new(Vec::new()));
        let sink = executed.clone();
        let queue: Arc<AdmissionQueue<&'static str>> = Arc::new(AdmissionQueue::new(
            session.clone(),
            network.clone(),
            Arc::new(move |call: PendingCall<&'static str>| {
                sink.lock().push(call.into_payload())
            }),
            QueueConfig::default(),
        ));
        Self {
            provider,
            network,
            session,
            queue,
            executed,
        }
    }

    pub fn executed(&self) -> Vec<&'static str> {
        self.executed.lock().clone()
    }
}
