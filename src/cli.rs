//! CLI domain: parse, route and output only.
//! No domain orchestration beyond wiring a simulated session for `check`.

mod output;
mod parse;
mod route;

pub use output::{format_check_json, format_check_text, map_error, CheckReport};
pub use parse::{Cli, Commands, ConfigFormat};
pub use route::{CommandOutput, RunContext};
