//! Custom field validators for `#[validate(custom(function = ...))]`

use rust_decimal::Decimal;
use validator::ValidationError;

pub use crate::core::field::{validate_phone, validate_vin};

/// Largest single amount (rate, price, fee or tender) accepted from a request
pub fn max_amount() -> Decimal {
    Decimal::new(10_000_000, 2)
}

/// Money amount must be strictly positive with at most two decimal places
pub fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(ValidationError::new("positive_amount").with_message("must be greater than zero".into()));
    }
    within_limit(amount)?;
    cents_only(amount)
}

/// Money amount may be zero but not negative
pub fn non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ValidationError::new("non_negative_amount").with_message("must not be negative".into()));
    }
    within_limit(amount)?;
    cents_only(amount)
}

fn within_limit(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount > max_amount() {
        Err(ValidationError::new("max_amount")
            .with_message(format!("must not exceed {}", max_amount()).into()))
    } else {
        Ok(())
    }
}

fn cents_only(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.normalize().scale() > 2 {
        Err(ValidationError::new("cents").with_message("at most two decimal places".into()))
    } else {
        Ok(())
    }
}

/// Service codes are 2-16 characters of letters, digits, dash or underscore
pub fn service_code(code: &str) -> Result<(), ValidationError> {
    let code = code.trim();
    let ok = (2..=16).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("service_code")
            .with_message("2-16 letters, digits, '-' or '_'".into()))
    }
}
