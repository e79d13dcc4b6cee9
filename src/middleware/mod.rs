// Middleware modules
pub mod jwt_auth;
pub mod logging;

pub use jwt_auth::{jwt_auth_middleware, UserIdentity};
pub use logging::logging_middleware;
