//! Integration tests for the callgate admission system

mod admission_queue;
mod config_loading;
mod constraint_lifecycle;
mod test_utils;
mod trigger_routing;
