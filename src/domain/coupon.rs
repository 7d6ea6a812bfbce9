use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

/// How a coupon's `value` is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponKind {
    /// `value` is a percentage of the amount
    Percentage,
    /// `value` is subtracted from the amount
    Fixed,
}

impl AsRef<str> for CouponKind {
    fn as_ref(&self) -> &str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

impl FromStr for CouponKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            other => Err(format!("{} is not a coupon type", other)),
        }
    }
}

impl TryFrom<String> for CouponKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for CouponKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CouponError {
    #[error("Coupon is not active")]
    Inactive,
    #[error("Coupon has expired")]
    Expired,
    #[error("Invalid amount")]
    InvalidAmount,
}

/// The parts of a coupon that decide a discount
#[derive(Debug, Clone, PartialEq)]
pub struct CouponTerms {
    pub kind: CouponKind,
    pub value: f64,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of applying a coupon to an amount, rounded to cents
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub discounted_amount: f64,
    pub discount_applied: f64,
}

impl CouponTerms {
    /// Compute the discount on `amount` as of `now`, without touching coupon state
    pub fn apply(&self, amount: f64, now: DateTime<Utc>) -> Result<Discount, CouponError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(CouponError::InvalidAmount);
        }
        if !self.active {
            return Err(CouponError::Inactive);
        }
        if self.expires_at.is_some_and(|expires_at| expires_at < now) {
            return Err(CouponError::Expired);
        }

        let discount = match self.kind {
            CouponKind::Percentage => amount * self.value / 100.0,
            CouponKind::Fixed => self.value,
        };
        // A discount can never take more than the whole amount
        let discount = discount.clamp(0.0, amount);
        let discounted_amount = (amount - discount).max(0.0);

        Ok(Discount {
            discounted_amount: round_cents(discounted_amount),
            discount_applied: round_cents(discount),
        })
    }
}

/// Round a currency amount to 2 decimal places
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Coupon codes are matched case-insensitively and stored upper-case
pub fn normalize_code(code: &str) -> Option<String> {
    let code = code.trim();
    if code.is_empty() || code.len() > 64 || code.contains(char::is_whitespace) {
        None
    } else {
        Some(code.to_uppercase())
    }
}
