//! User-facing text for purchase and commitment outcomes.

use crate::models::commitment::CommitmentErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Ja,
}

impl Locale {
    /// Parse a language tag such as `ja`, `ja-JP` or `en_US`; unknown tags fall back to English
    pub fn from_tag(tag: &str) -> Self {
        let lang = tag
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match lang.as_str() {
            "ja" => Self::Ja,
            _ => Self::En,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    PlatformNotSupported,
    StoreUnavailable,
    ProductNotFound,
    PurchaseFailed,
    ReceiptInvalid,
    ConfirmationTimeout,
    MissingData,
    CommitmentMissingFields,
    CommitmentInvalidBook,
    CommitmentInvalidDeadline,
    CommitmentInvalidPledgeAmount,
    CommitmentUnsupportedCurrency,
    CommitmentInvalidTargetPages,
    CommitmentSubscriptionRequired,
    CommitmentCreationFailed,
    NetworkError,
    Generic,
}

impl MessageKey {
    pub fn for_commitment_error(code: CommitmentErrorCode) -> Self {
        match code {
            CommitmentErrorCode::MissingFields => Self::CommitmentMissingFields,
            CommitmentErrorCode::InvalidBook => Self::CommitmentInvalidBook,
            CommitmentErrorCode::InvalidDeadline => Self::CommitmentInvalidDeadline,
            CommitmentErrorCode::InvalidPledgeAmount => Self::CommitmentInvalidPledgeAmount,
            CommitmentErrorCode::UnsupportedCurrency => Self::CommitmentUnsupportedCurrency,
            CommitmentErrorCode::InvalidTargetPages => Self::CommitmentInvalidTargetPages,
            CommitmentErrorCode::SubscriptionRequired => Self::CommitmentSubscriptionRequired,
        }
    }
}

/// A localized alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    pub key: MessageKey,
    pub title: &'static str,
    pub body: &'static str,
}

/// Alert shown when the subscription could not be confirmed in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutPrompt {
    pub message: UserMessage,
    pub retry_label: &'static str,
    pub cancel_label: &'static str,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Messages {
    locale: Locale,
}

impl Messages {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn get(&self, key: MessageKey) -> UserMessage {
        let (title, body) = match self.locale {
            Locale::En => english(key),
            Locale::Ja => japanese(key),
        };
        UserMessage { key, title, body }
    }

    pub fn timeout_prompt(&self) -> TimeoutPrompt {
        let (retry_label, cancel_label) = match self.locale {
            Locale::En => ("Retry", "Cancel"),
            Locale::Ja => ("再試行", "キャンセル"),
        };
        TimeoutPrompt {
            message: self.get(MessageKey::ConfirmationTimeout),
            retry_label,
            cancel_label,
        }
    }
}

fn english(key: MessageKey) -> (&'static str, &'static str) {
    match key {
        MessageKey::PlatformNotSupported => (
            "Not available",
            "Subscriptions can only be purchased on iOS.",
        ),
        MessageKey::StoreUnavailable => (
            "Store unavailable",
            "Could not connect to the App Store. Please try again.",
        ),
        MessageKey::ProductNotFound => (
            "Plan unavailable",
            "This plan is not available right now. Please try again later.",
        ),
        MessageKey::PurchaseFailed => (
            "Purchase failed",
            "The purchase could not be completed. Please try again.",
        ),
        MessageKey::ReceiptInvalid => (
            "Verification failed",
            "We could not verify your purchase receipt. Please try again or contact support.",
        ),
        MessageKey::ConfirmationTimeout => (
            "Still confirming",
            "Your purchase is taking longer than usual to confirm. Retry to check again.",
        ),
        MessageKey::MissingData => (
            "Missing information",
            "Some commitment details are missing. Please go back and complete them.",
        ),
        MessageKey::CommitmentMissingFields => (
            "Missing information",
            "Please fill in every commitment detail.",
        ),
        MessageKey::CommitmentInvalidBook => (
            "Invalid book",
            "The selected book could not be used. Please choose it again.",
        ),
        MessageKey::CommitmentInvalidDeadline => (
            "Invalid deadline",
            "Please choose a deadline in the future, within one year.",
        ),
        MessageKey::CommitmentInvalidPledgeAmount => (
            "Invalid pledge",
            "The pledge amount is outside the allowed range.",
        ),
        MessageKey::CommitmentUnsupportedCurrency => (
            "Unsupported currency",
            "This currency is not supported for pledges.",
        ),
        MessageKey::CommitmentInvalidTargetPages => (
            "Invalid page count",
            "The target page count must be between 1 and the book's length.",
        ),
        MessageKey::CommitmentSubscriptionRequired => (
            "Subscription required",
            "An active subscription is required to create a commitment.",
        ),
        MessageKey::CommitmentCreationFailed => (
            "Could not create commitment",
            "Something went wrong while creating your commitment. Please try again.",
        ),
        MessageKey::NetworkError => (
            "Connection problem",
            "Please check your internet connection and try again.",
        ),
        MessageKey::Generic => ("Error", "Something went wrong. Please try again."),
    }
}

fn japanese(key: MessageKey) -> (&'static str, &'static str) {
    match key {
        MessageKey::PlatformNotSupported => (
            "ご利用いただけません",
            "サブスクリプションはiOSでのみ購入できます。",
        ),
        MessageKey::StoreUnavailable => (
            "ストアに接続できません",
            "App Storeに接続できませんでした。もう一度お試しください。",
        ),
        MessageKey::ProductNotFound => (
            "プランが見つかりません",
            "このプランは現在ご利用いただけません。時間をおいてお試しください。",
        ),
        MessageKey::PurchaseFailed => (
            "購入に失敗しました",
            "購入を完了できませんでした。もう一度お試しください。",
        ),
        MessageKey::ReceiptInvalid => (
            "購入の確認に失敗しました",
            "レシートを確認できませんでした。再度お試しいただくか、サポートにお問い合わせください。",
        ),
        MessageKey::ConfirmationTimeout => (
            "確認に時間がかかっています",
            "購入の確認に通常より時間がかかっています。再試行してください。",
        ),
        MessageKey::MissingData => (
            "情報が不足しています",
            "コミットメントの情報が不足しています。前の画面に戻って入力してください。",
        ),
        MessageKey::CommitmentMissingFields => (
            "情報が不足しています",
            "すべての項目を入力してください。",
        ),
        MessageKey::CommitmentInvalidBook => (
            "本の情報が無効です",
            "選択した本を使用できません。もう一度選択してください。",
        ),
        MessageKey::CommitmentInvalidDeadline => (
            "期限が無効です",
            "1年以内の未来の日付を選択してください。",
        ),
        MessageKey::CommitmentInvalidPledgeAmount => (
            "金額が無効です",
            "設定できる金額の範囲外です。",
        ),
        MessageKey::CommitmentUnsupportedCurrency => (
            "通貨に対応していません",
            "この通貨はご利用いただけません。",
        ),
        MessageKey::CommitmentInvalidTargetPages => (
            "ページ数が無効です",
            "目標ページ数は1から本のページ数までの範囲で指定してください。",
        ),
        MessageKey::CommitmentSubscriptionRequired => (
            "サブスクリプションが必要です",
            "コミットメントを作成するには有効なサブスクリプションが必要です。",
        ),
        MessageKey::CommitmentCreationFailed => (
            "コミットメントを作成できませんでした",
            "コミットメントの作成中にエラーが発生しました。もう一度お試しください。",
        ),
        MessageKey::NetworkError => (
            "通信エラー",
            "インターネット接続を確認して、もう一度お試しください。",
        ),
        MessageKey::Generic => ("エラー", "問題が発生しました。もう一度お試しください。"),
    }
}
