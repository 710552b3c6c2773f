//! HTTP API Module
//!
//! The trigger surface: liveness, distribution, metrics and, in gateway
//! mode, a small index page.

mod index;
mod metrics;
mod routes;

pub use metrics::Metrics;
pub use routes::{run_api_server, ApiState};
