//! API module - HTTP surface for the assistant

pub mod assistant_api;

// Re-export API handlers
pub use assistant_api::{ask, home, AskRequest, AskResponse, ErrorResponse};
