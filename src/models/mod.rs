// Request/Response models
pub mod auth;
pub mod commitment;
pub mod common;
pub mod iap;
pub mod subscription;
