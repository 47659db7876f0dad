pub mod auth;
pub mod request_id;

pub use auth::ProfileAuth;
pub use request_id::{RequestId, RequestIdMiddleware};
