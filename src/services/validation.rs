//! Deal request validation
//!
//! Pure checks over an untrusted [`DealRequest`]. Rules run in a fixed order
//! and the first violation wins, so a request with several defects always
//! reports the same reason.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::deal::DealRequest;

lazy_static! {
    static ref CURRENCY_CODE_REGEX: Regex = Regex::new(r"^[A-Z]{3}$").unwrap();
}

/// ISO 4217 codes accepted when no override is configured
pub const DEFAULT_CURRENCIES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD", "CNY", "INR", "BRL", "ZAR", "SGD", "NZD",
    "MXN", "HKD", "NOK", "SEK", "DKK", "PLN", "TRY", "RUB", "KRW", "IDR", "MYR",
];

/// Longest `dealUniqueId` the `deals` table holds
pub const MAX_DEAL_ID_LENGTH: usize = 100;

/// Amount bounds matching the `decimal(19, 4)` column
pub const MAX_AMOUNT_SCALE: u32 = 4;
pub const MAX_AMOUNT_INTEGER_DIGITS: u32 = 15;

/// Reason a deal request was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("dealUniqueId is required")]
    MissingDealId,
    #[error("dealUniqueId cannot be longer than {0} characters")]
    DealIdTooLong(usize),
    #[error("fromCurrency is required")]
    MissingFromCurrency,
    #[error("toCurrency is required")]
    MissingToCurrency,
    #[error("dealAmount is required")]
    MissingAmount,
    #[error("dealAmount must be greater than 0")]
    AmountNotPositive,
    #[error("dealAmount cannot have more than {0} decimal places")]
    AmountScaleTooLarge(u32),
    #[error("dealAmount cannot have more than {0} integer digits")]
    AmountTooLarge(u32),
    #[error("dealTimestamp is required")]
    MissingTimestamp,
    #[error("Invalid fromCurrency: {0}")]
    InvalidFromCurrency(String),
    #[error("Invalid toCurrency: {0}")]
    InvalidToCurrency(String),
    #[error("dealTimestamp cannot be more than {0} days in the past")]
    TimestampTooOld(i64),
    #[error("dealTimestamp cannot be more than {0} days in the future")]
    TimestampInFuture(i64),
}

impl ValidationError {
    /// Stable machine-readable reason
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingDealId => "MISSING_DEAL_ID",
            ValidationError::DealIdTooLong(_) => "DEAL_ID_TOO_LONG",
            ValidationError::MissingFromCurrency => "MISSING_FROM_CURRENCY",
            ValidationError::MissingToCurrency => "MISSING_TO_CURRENCY",
            ValidationError::MissingAmount => "MISSING_AMOUNT",
            ValidationError::AmountNotPositive => "AMOUNT_NOT_POSITIVE",
            ValidationError::AmountScaleTooLarge(_) => "AMOUNT_SCALE_TOO_LARGE",
            ValidationError::AmountTooLarge(_) => "AMOUNT_TOO_LARGE",
            ValidationError::MissingTimestamp => "MISSING_TIMESTAMP",
            ValidationError::InvalidFromCurrency(_) => "INVALID_FROM_CURRENCY",
            ValidationError::InvalidToCurrency(_) => "INVALID_TO_CURRENCY",
            ValidationError::TimestampTooOld(_) => "TIMESTAMP_TOO_OLD",
            ValidationError::TimestampInFuture(_) => "TIMESTAMP_IN_FUTURE",
        }
    }
}

/// Set of currency codes the validator recognizes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyAllowList {
    codes: BTreeSet<String>,
}

impl CurrencyAllowList {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// A code is accepted only if it is three upper-case letters AND listed
    pub fn accepts(&self, code: &str) -> bool {
        CURRENCY_CODE_REGEX.is_match(code) && self.codes.contains(code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for CurrencyAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_CURRENCIES.iter().copied())
    }
}

/// Optional acceptance window for `dealTimestamp`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampWindow {
    pub max_age_days: i64,
    pub max_future_days: i64,
}

impl Default for TimestampWindow {
    fn default() -> Self {
        Self {
            max_age_days: 30,
            max_future_days: 1,
        }
    }
}

/// A request that passed every rule, with all fields present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeal {
    pub deal_unique_id: String,
    pub from_currency: String,
    pub to_currency: String,
    pub deal_amount: Decimal,
    pub deal_timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct DealValidator {
    currencies: CurrencyAllowList,
    timestamp_window: Option<TimestampWindow>,
}

impl DealValidator {
    pub fn new(currencies: CurrencyAllowList) -> Self {
        Self {
            currencies,
            timestamp_window: None,
        }
    }

    /// Enable the timestamp window rule
    pub fn with_timestamp_window(mut self, window: TimestampWindow) -> Self {
        self.timestamp_window = Some(window);
        self
    }

    pub fn timestamp_window(&self) -> Option<TimestampWindow> {
        self.timestamp_window
    }

    pub fn validate(&self, request: &DealRequest) -> Result<NewDeal, ValidationError> {
        self.validate_at(request, Utc::now().naive_utc())
    }

    /// Validate against an explicit "now" (only the timestamp window reads it)
    pub fn validate_at(
        &self,
        request: &DealRequest,
        now: NaiveDateTime,
    ) -> Result<NewDeal, ValidationError> {
        let deal_unique_id = non_blank(&request.deal_unique_id)
            .ok_or(ValidationError::MissingDealId)?
            .trim();
        if deal_unique_id.chars().count() > MAX_DEAL_ID_LENGTH {
            return Err(ValidationError::DealIdTooLong(MAX_DEAL_ID_LENGTH));
        }
        let from_currency =
            non_blank(&request.from_currency).ok_or(ValidationError::MissingFromCurrency)?;
        let to_currency =
            non_blank(&request.to_currency).ok_or(ValidationError::MissingToCurrency)?;

        let deal_amount = request.deal_amount.ok_or(ValidationError::MissingAmount)?;
        if deal_amount <= Decimal::ZERO {
            return Err(ValidationError::AmountNotPositive);
        }
        // Trailing zeros do not count: 1.50000 stores as 1.5000
        if deal_amount.normalize().scale() > MAX_AMOUNT_SCALE {
            return Err(ValidationError::AmountScaleTooLarge(MAX_AMOUNT_SCALE));
        }
        if deal_amount.trunc() >= Decimal::from(10i64.pow(MAX_AMOUNT_INTEGER_DIGITS)) {
            return Err(ValidationError::AmountTooLarge(MAX_AMOUNT_INTEGER_DIGITS));
        }

        let deal_timestamp = request
            .deal_timestamp
            .ok_or(ValidationError::MissingTimestamp)?;

        // Currency codes are checked as sent; " usd" is not USD
        if !self.currencies.accepts(from_currency) {
            return Err(ValidationError::InvalidFromCurrency(from_currency.to_string()));
        }
        if !self.currencies.accepts(to_currency) {
            return Err(ValidationError::InvalidToCurrency(to_currency.to_string()));
        }

        if let Some(window) = self.timestamp_window {
            if deal_timestamp < now - Duration::days(window.max_age_days) {
                return Err(ValidationError::TimestampTooOld(window.max_age_days));
            }
            if deal_timestamp > now + Duration::days(window.max_future_days) {
                return Err(ValidationError::TimestampInFuture(window.max_future_days));
            }
        }

        Ok(NewDeal {
            deal_unique_id: deal_unique_id.to_string(),
            from_currency: from_currency.to_string(),
            to_currency: to_currency.to_string(),
            deal_amount,
            deal_timestamp,
        })
    }
}

/// Returns the value if it holds anything besides whitespace
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
