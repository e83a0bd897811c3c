//! HTTP dispatcher for the FHIR terminology server (spec §4.8): routing,
//! content negotiation, per-request operation context, and the ambient
//! config/logging/error stack around it.

pub mod background;
pub mod config;
pub mod content_negotiation;
pub mod error;
pub mod html;
pub mod logging;
pub mod middleware;
pub mod params;
pub mod resource_formatter;
pub mod router;
pub mod routes;
pub mod search;
pub mod state;
pub mod stats;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
