//! Output of a generation run.
//!
//! - [`json`] - The resource graph as JSON
//! - [`csv`] - Subnet rows
//! - [`terminal`] - Terminal output with colors

mod csv;
mod json;
mod terminal;

pub use csv::{subnet_row, subnet_rows, SUBNET_HEADER};
pub use json::{graph_json, write_graph};
pub use terminal::{format_field, print_summary, topology_heading};
