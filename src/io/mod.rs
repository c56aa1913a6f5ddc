pub mod csv;
pub mod json;

pub use csv::{write_paths, write_trajectory};
pub use json::{write_summary, FlightSummary, MissionSummary};
