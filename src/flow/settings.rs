use std::path::PathBuf;
use std::time::Duration;

use super::messages::Locale;
use super::poll::PollPolicy;
use super::retry::RetryPolicy;
use crate::config::Config;

/// Tunables for the client purchase flow, resolved from [`Config`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSettings {
    pub api_base_url: String,
    pub product_id_prefix: String,
    pub poll: PollPolicy,
    pub retry: RetryPolicy,
    pub staging_dir: PathBuf,
    pub locale: Locale,
}

impl FlowSettings {
    pub fn from_config(config: &Config) -> Self {
        let flow = &config.purchase_flow;
        Self {
            api_base_url: flow.api_base_url.clone(),
            product_id_prefix: config.iap.product_id_prefix.clone(),
            poll: PollPolicy {
                interval: Duration::from_millis(flow.poll_interval_ms),
                max_attempts: flow.poll_max_attempts,
            },
            retry: RetryPolicy {
                max_attempts: flow.commitment_retry_attempts,
                base_delay: Duration::from_millis(flow.commitment_retry_base_delay_ms),
            },
            staging_dir: PathBuf::from(&flow.staging_dir),
            locale: Locale::from_tag(&flow.locale),
        }
    }
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            product_id_prefix: "app.commit.subscription".to_string(),
            poll: PollPolicy::default(),
            retry: RetryPolicy::default(),
            staging_dir: PathBuf::from(".staging"),
            locale: Locale::En,
        }
    }
}
