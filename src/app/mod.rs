//! Application orchestration module

pub mod execution;
pub mod initialization;

pub use execution::{discover, run_discovery, run_summary};
pub use initialization::{configure_logging, create_colour_manager, load_configuration, resolve_settings, RunSettings};
