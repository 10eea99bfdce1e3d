//! Terminal output helpers
//!
//! Colour handling that honours `--no-color` and `NO_COLOR`, plus the compact
//! table layout used by the candidate summary.

pub mod colours;
pub mod table;

pub use colours::ColourManager;
pub use table::{format_compact_table, TableBuilder};
