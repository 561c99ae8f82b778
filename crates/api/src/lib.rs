//! HAL HTTP surface over the vista read-model.
//!
//! Handlers translate requests into `vista_digest::Database` and
//! `vista_builder::Builder` calls and render HAL resources with
//! navigational links. Every cacheable GET goes through one pipeline:
//! cache lookup, per-key request coalescing on miss, then a best-effort
//! cache write with a TTL chosen by response completeness. Every failure
//! funnels through one problem-document renderer so the wire shape never
//! diverges.

pub mod cached;
pub mod error;
pub mod flight;
pub mod hal;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod state;

pub use cached::{TTL_LONG, TTL_SHORT};
pub use routes::create_router;
pub use error::{ApiError, ApiResult};
pub use flight::Flights;
pub use hal::{Hal, HalLink};
pub use metrics::ApiMetrics;
pub use server::{create_server, run_server, start_background_server, ApiConfig};
pub use state::{ApiState, SendFn, SendItem};

/// Content type of every successful response.
pub const HAL_CONTENT_TYPE: &str = "application/hal+json";
/// Content type of every problem document.
pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";
/// Header carrying the wire-encoding hint for the embedded payload.
pub const ENCODER_HINT_HEADER: &str = "x-vista-encoder";
/// The only encoding this build speaks.
pub const ENCODER_HINT: &str = "json-v1";
