use crate::{
    config::Config,
    services::{CommitmentService, IAPService, JWTService, SubscriptionService},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub iap_service: Arc<IAPService>,
    pub subscription_service: Arc<SubscriptionService>,
    pub commitment_service: Arc<CommitmentService>,
    pub jwt_service: Arc<JWTService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let db = sea_orm::Database::connect(&config.database.url).await?;
        Ok(Self::from_parts(db, config))
    }

    /// Wire services around an existing connection
    pub fn from_parts(db: DatabaseConnection, config: Config) -> Self {
        let db = Arc::new(db);
        let iap_service = Arc::new(IAPService::new(&config.iap));
        let subscription_service = Arc::new(SubscriptionService::new(db.clone()));
        let commitment_service = Arc::new(CommitmentService::new(db.clone()));
        let jwt_service = Arc::new(JWTService::new(Arc::new(config.auth.clone())));

        Self {
            db,
            iap_service,
            subscription_service,
            commitment_service,
            jwt_service,
            config: Arc::new(config),
        }
    }
}
