//! CLI route: single route table and run context.

use crate::cli::output::{format_check_json, format_check_text, CheckReport};
use crate::cli::parse::{Commands, ConfigFormat};
use crate::config::{ConfigLoader, GateConfig};
use crate::constraint::{Constraint, NetworkKind};
use crate::error::{GateError, GeometryError};
use crate::geometry;
use crate::queue::{AdmissionQueue, PendingCall};
use crate::sensor::{Expiry, Placement, SensorSession};
use crate::sim::{SimulatedNetwork, SimulatedProvider};
use crate::trigger::{EventRouter, TriggerEvent};
use crate::types::{CallId, NetworkClass, Point};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

const CIRCLE_ID: &str = "cli-circle";
const REGION_ID: &str = "cli-region";

/// Exit code returned when `check` holds the call.
pub const EXIT_HELD: i32 = 2;

/// Text to print and the process exit code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub exit_code: i32,
}

impl CommandOutput {
    fn ok(text: String) -> Self {
        Self { text, exit_code: 0 }
    }
}

/// Runtime context for CLI execution: the effective configuration.
pub struct RunContext {
    config: GateConfig,
}

impl RunContext {
    /// Load configuration through [`ConfigLoader`], layering `config_path`
    /// over the global file when given.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, GateError> {
        let config = ConfigLoader::load(config_path.as_deref())?;
        Ok(Self { config })
    }

    pub fn from_config(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, GateError> {
        match command {
            Commands::Distance { from, to } => {
                let meters = geometry::distance_meters(*from, *to);
                Ok(CommandOutput::ok(format!("{:.1} m", meters)))
            }
            Commands::Check {
                at,
                network,
                roaming,
                require,
                allow_roaming,
                circle,
                radius,
                polygon,
                outside,
                json,
            } => {
                let placement = if *outside {
                    Placement::Outside
                } else {
                    Placement::Inside
                };
                let polygon = polygon.as_deref().map(parse_polygon).transpose()?;
                let circle = match (circle, radius) {
                    (Some(center), Some(radius)) => Some((*center, *radius)),
                    _ => None,
                };
                let constraint = build_constraint(
                    *require,
                    *allow_roaming,
                    circle,
                    polygon.clone(),
                    placement,
                )?;

                let admitted = self.check(&constraint, *at, *network, *roaming)?;
                let report = CheckReport {
                    admitted,
                    constraint: constraint.to_string(),
                    location: *at,
                    network: *network,
                    roaming: *roaming,
                    distance_to_center_meters: circle
                        .map(|(center, _)| geometry::distance_meters(*at, center)),
                    inside_polygon: polygon
                        .as_deref()
                        .map(|vertices| geometry::point_in_polygon(*at, vertices)),
                };
                let text = if *json {
                    format_check_json(&report)?
                } else {
                    format_check_text(&report)
                };
                Ok(CommandOutput {
                    text,
                    exit_code: if admitted { 0 } else { EXIT_HELD },
                })
            }
            Commands::Config { format } => {
                let text = match format {
                    ConfigFormat::Toml => toml::to_string_pretty(&self.config).map_err(|e| {
                        GateError::ConfigError(format!("Failed to encode config: {}", e))
                    })?,
                    ConfigFormat::Json => {
                        serde_json::to_string_pretty(&self.config).map_err(|e| {
                            GateError::ConfigError(format!("Failed to encode config: {}", e))
                        })?
                    }
                };
                Ok(CommandOutput::ok(text))
            }
        }
    }

    /// Enqueue one call behind `constraint` on a simulated device and fire a
    /// single app-action trigger. Returns whether the call was admitted.
    fn check(
        &self,
        constraint: &Constraint,
        at: Point,
        network: NetworkClass,
        roaming: bool,
    ) -> Result<bool, GateError> {
        let provider = Arc::new(SimulatedProvider::at(at));
        let monitor = Arc::new(SimulatedNetwork::new(network));
        monitor.set_roaming(roaming);

        let session = SensorSession::new(provider, self.config.session.clone());
        let admitted: Arc<Mutex<Vec<CallId>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = admitted.clone();
        let queue: Arc<AdmissionQueue<&'static str>> = Arc::new(AdmissionQueue::new(
            session.clone(),
            monitor,
            Arc::new(move |call: PendingCall<&'static str>| {
                debug!(call_id = %call.id(), payload = call.payload(), "Executing call");
                sink.lock().push(call.id());
            }),
            self.config.queue.clone(),
        ));
        let router = EventRouter::install(queue.clone(), session);

        let id = queue.enqueue(PendingCall::new(constraint.clone(), "check"))?;
        router.dispatch(TriggerEvent::AppAction);

        let was_admitted = admitted.lock().contains(&id);
        if !was_admitted {
            info!(call_id = %id, "Call held, cancelling");
            queue.cancel(id);
        }
        Ok(was_admitted)
    }
}

/// Parse `"lat, lng; lat, lng; ..."` into vertices.
fn parse_polygon(input: &str) -> Result<Vec<Point>, GeometryError> {
    input
        .split(';')
        .map(str::trim)
        .filter(|vertex| !vertex.is_empty())
        .map(|vertex| vertex.parse::<Point>())
        .collect()
}

fn build_constraint(
    require: Option<NetworkKind>,
    allow_roaming: bool,
    circle: Option<(Point, f64)>,
    polygon: Option<Vec<Point>>,
    placement: Placement,
) -> Result<Constraint, GateError> {
    let mut children = Vec::new();
    if let Some(kind) = require {
        children.push(Constraint::network(kind, allow_roaming));
    }
    if let Some((center, radius)) = circle {
        children.push(Constraint::geo_circle(
            CIRCLE_ID,
            center,
            radius,
            placement,
            Expiry::Never,
        )?);
    }
    if let Some(vertices) = polygon {
        children.push(Constraint::geo_region(REGION_ID, vertices, placement)?);
    }
    Ok(match children.len() {
        0 => Constraint::always_allow(),
        1 => children.remove(0),
        _ => Constraint::all(children),
    })
}
