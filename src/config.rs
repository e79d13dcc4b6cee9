use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub iap: IAPConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub sentry: SentryConfig,
    pub purchase_flow: PurchaseFlowConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default)]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IAPConfig {
    pub apple_shared_secret: String,
    pub apple_environment: String,
    /// Store SKU prefix, e.g. `app.commit.subscription` → `app.commit.subscription.monthly`
    pub product_id_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_expiration_minutes: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SentryConfig {
    #[serde(default)]
    pub dsn: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f32,
}

/// Client-side purchase confirmation settings
///
/// The poll and retry constants are product decisions and are expected to be tuned.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseFlowConfig {
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
    pub commitment_retry_attempts: u32,
    pub commitment_retry_base_delay_ms: u64,
    pub staging_dir: String,
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_sample_rate() -> f32 {
    1.0
}

fn default_locale() -> String {
    "en".to_string()
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for environment variable overrides)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(
                config::Environment::with_prefix("COMMIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
