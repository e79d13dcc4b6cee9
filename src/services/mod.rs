// Service modules
pub mod commitment_service;
pub mod iap_service;
pub mod jwt_service;
pub mod subscription_service;

pub use commitment_service::CommitmentService;
pub use iap_service::IAPService;
pub use jwt_service::JWTService;
pub use subscription_service::SubscriptionService;
