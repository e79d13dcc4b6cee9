use serde::{Deserialize, Serialize};

pub use entity::sea_orm_active_enums::SubscriptionStatus;

/// Standard `{ success, data }` envelope for JSON responses
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Error response structure (paired with non-2xx HTTP status codes)
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub success: bool,
    pub error: ErrorObject,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorObject {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

/// IAP Platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IAPPlatform {
    #[default]
    Apple,
    Google,
}

impl IAPPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apple => "apple",
            Self::Google => "google",
        }
    }
}

/// Subscription plan offered during onboarding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Yearly,
    Monthly,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yearly => "yearly",
            Self::Monthly => "monthly",
        }
    }

    /// Store SKU for this plan under the configured prefix
    pub fn product_id(&self, prefix: &str) -> String {
        format!("{}.{}", prefix, self.as_str())
    }

    /// Resolve a store SKU back to a plan
    pub fn from_product_id(prefix: &str, product_id: &str) -> Option<Self> {
        let suffix = product_id.strip_prefix(prefix)?.strip_prefix('.')?;
        match suffix {
            "yearly" => Some(Self::Yearly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

/// Pledge currencies accepted for commitments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Jpy,
    Usd,
    Eur,
    Gbp,
    Krw,
}

impl Currency {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "JPY" => Some(Self::Jpy),
            "USD" => Some(Self::Usd),
            "EUR" => Some(Self::Eur),
            "GBP" => Some(Self::Gbp),
            "KRW" => Some(Self::Krw),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Jpy => "JPY",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Krw => "KRW",
        }
    }

    /// Inclusive pledge bounds in whole currency units
    pub fn pledge_bounds(&self) -> (i32, i32) {
        match self {
            Self::Jpy => (1_000, 50_000),
            Self::Usd | Self::Eur | Self::Gbp => (10, 500),
            Self::Krw => (10_000, 500_000),
        }
    }

    pub fn accepts_pledge(&self, amount: i32) -> bool {
        let (min, max) = self.pledge_bounds();
        (min..=max).contains(&amount)
    }
}
