mod auth;
mod error_handler;
mod gate;
mod rate_limit;

pub use auth::require_session;
pub use error_handler::log_errors;
pub use gate::{GateDecision, gate, gate_pages};
pub use rate_limit::{RateLimiter, client_ip, rate_limit};
