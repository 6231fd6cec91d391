pub mod dashboard;
pub mod engine;
pub mod filter;
pub mod report;

pub use engine::{compute_alerts, compute_alerts_with, AlertPolicy, VelocityBasis};
pub use filter::{apply_filters, AlertFilter, AlertFilterParams, AlertView, LevelFilter};
