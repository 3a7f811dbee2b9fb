pub mod config;
pub mod error;
pub mod report;

pub use crate::config::PulseConfig;
pub use error::{PulseError, PulseResult};
pub use report::{RawRow, ReportRow, RunReportResponse};
