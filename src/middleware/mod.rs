pub mod auth;
pub mod response;

pub use auth::{require_admin, require_session, BearerToken};
pub use response::{ApiResponse, ApiResult};
