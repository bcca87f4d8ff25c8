//! Daily MagangHub report automation.
//!
//! [`engine`] drives the portal form; [`brain`] writes the report text,
//! [`hands`] owns the browser and [`face`] serves the confirmation UI.

pub mod brain;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod face;
pub mod hands;
pub mod notify;
pub mod page;
pub mod presensi;
pub mod selectors;
pub mod service;
pub mod types;
pub mod workflow;

pub use engine::flow::{FlowFailure, FlowResult, ReportEngine};
pub use error::{ConfigError, ContentError, PresensiError, StageError};
pub use types::{Report, Thresholds};
