//! CLI output: error mapping and report formatting.

use crate::error::GateError;
use crate::types::{NetworkClass, Point};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &GateError) -> String {
    match e {
        GateError::ConfigError(msg) => format!("configuration error: {}", msg),
        other => other.to_string(),
    }
}

/// Result of a `check` invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub admitted: bool,
    pub constraint: String,
    pub location: Point,
    pub network: NetworkClass,
    pub roaming: bool,
    /// Distance from the device to the circle center, when a circle was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_to_center_meters: Option<f64>,
    /// Whether the device lies inside the polygon, when one was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inside_polygon: Option<bool>,
}

pub fn format_check_text(report: &CheckReport) -> String {
    let verdict = if report.admitted {
        format!("{}", "ADMITTED".green().bold())
    } else {
        format!("{}", "HELD".yellow().bold())
    };

    let mut lines = vec![
        format!("{} {}", verdict, report.constraint),
        format!("  location: {}", report.location),
        format!(
            "  network:  {}{}",
            report.network.as_str(),
            if report.roaming { " (roaming)" } else { "" }
        ),
    ];
    if let Some(distance) = report.distance_to_center_meters {
        lines.push(format!("  distance to center: {:.1} m", distance));
    }
    if let Some(inside) = report.inside_polygon {
        lines.push(format!(
            "  polygon: {}",
            if inside { "inside" } else { "outside" }
        ));
    }
    lines.join("\n")
}

pub fn format_check_json(report: &CheckReport) -> Result<String, GateError> {
    serde_json::to_string_pretty(report)
        .map_err(|e| GateError::ConfigError(format!("Failed to encode report: {}", e)))
}
