//! CLI parse: clap types for callgate. No behavior; definitions only.

use crate::constraint::NetworkKind;
use crate::types::{NetworkClass, Point};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// callgate - defer calls until network and location constraints hold
#[derive(Debug, Parser)]
#[command(name = "callgate")]
#[command(about = "Evaluate network and geofence admission constraints")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Disable logging
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Great-circle distance in meters between two "lat, lng" points
    Distance {
        #[arg(allow_hyphen_values = true)]
        from: Point,
        #[arg(allow_hyphen_values = true)]
        to: Point,
    },
    /// Evaluate a constraint against a simulated device state
    Check {
        /// Device location, "lat, lng"
        #[arg(long, allow_hyphen_values = true)]
        at: Point,

        /// Active network class (none, wwan, wifi)
        #[arg(long, default_value = "none")]
        network: NetworkClass,

        /// Device is roaming
        #[arg(long)]
        roaming: bool,

        /// Required network kind (wifi, wwan, mobile)
        #[arg(long)]
        require: Option<NetworkKind>,

        /// Accept a roaming connection for wwan/mobile requirements
        #[arg(long, requires = "require")]
        allow_roaming: bool,

        /// Circle center, "lat, lng"
        #[arg(long, requires = "radius", allow_hyphen_values = true)]
        circle: Option<Point>,

        /// Circle radius in meters
        #[arg(long, requires = "circle")]
        radius: Option<f64>,

        /// Polygon vertices, "lat, lng; lat, lng; lat, lng"
        #[arg(long, allow_hyphen_values = true)]
        polygon: Option<String>,

        /// Admit when outside the circle/polygon instead of inside
        #[arg(long)]
        outside: bool,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config {
        #[arg(long, value_enum, default_value_t = ConfigFormat::Toml)]
        format: ConfigFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Json,
}
