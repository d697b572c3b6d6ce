//! Field value types and format validation

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

/// A polymorphic field value used for search and filtering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<Utc>),
    Null,
}

impl FieldValue {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            FieldValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Compare against a raw query string.
    ///
    /// Strings match case-insensitively; every other variant is compared on
    /// its canonical text form.
    pub fn matches_str(&self, needle: &str) -> bool {
        match self {
            FieldValue::String(s) => s.eq_ignore_ascii_case(needle),
            FieldValue::Integer(i) => needle.parse::<i64>().is_ok_and(|n| n == *i),
            FieldValue::Decimal(d) => needle.parse::<Decimal>().is_ok_and(|n| n == *d),
            FieldValue::Boolean(b) => needle.parse::<bool>().is_ok_and(|n| n == *b),
            FieldValue::Uuid(u) => Uuid::parse_str(needle).is_ok_and(|n| n == *u),
            FieldValue::Date(d) => d.to_string() == needle,
            FieldValue::Time(t) => needle.parse::<NaiveTime>().is_ok_and(|n| n == *t),
            FieldValue::DateTime(dt) => dt.to_rfc3339() == needle,
            FieldValue::Null => needle.is_empty() || needle == "null",
        }
    }
}

/// Conversion used by `impl_data_entity!` to expose struct fields for search
pub trait IntoFieldValue {
    fn to_field_value(&self) -> FieldValue;
}

impl IntoFieldValue for String {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::String(self.clone())
    }
}

impl IntoFieldValue for i32 {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Integer(i64::from(*self))
    }
}

impl IntoFieldValue for u32 {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Integer(i64::from(*self))
    }
}

impl IntoFieldValue for i64 {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Integer(*self)
    }
}

impl IntoFieldValue for bool {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Boolean(*self)
    }
}

impl IntoFieldValue for Decimal {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Decimal(*self)
    }
}

impl IntoFieldValue for Uuid {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Uuid(*self)
    }
}

impl IntoFieldValue for NaiveDate {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Date(*self)
    }
}

impl IntoFieldValue for NaiveTime {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Time(*self)
    }
}

impl IntoFieldValue for DateTime<Utc> {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::DateTime(*self)
    }
}

impl<T: IntoFieldValue> IntoFieldValue for Option<T> {
    fn to_field_value(&self) -> FieldValue {
        match self {
            Some(v) => v.to_field_value(),
            None => FieldValue::Null,
        }
    }
}

/// Collections expose their length
impl<T> IntoFieldValue for Vec<T> {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Integer(self.len() as i64)
    }
}

/// Field format validators
#[derive(Debug, Clone)]
pub enum FieldFormat {
    Email,
    Phone,
    /// 17-character vehicle identification number
    Vin,
    Custom(Regex),
}

impl FieldFormat {
    /// Validate a raw string against this format
    pub fn validate_str(&self, value: &str) -> bool {
        match self {
            FieldFormat::Email => email_regex().is_match(value),
            FieldFormat::Phone => phone_regex().is_match(value),
            FieldFormat::Vin => vin_regex().is_match(value),
            FieldFormat::Custom(regex) => regex.is_match(value),
        }
    }

    /// Validate a field value against this format
    pub fn validate(&self, value: &FieldValue) -> bool {
        value.as_string().is_some_and(|s| self.validate_str(s))
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap())
}

fn phone_regex() -> &'static Regex {
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    // North American numbers, digits only after normalisation: 10 digits, optional leading 1
    PHONE_REGEX.get_or_init(|| Regex::new(r"^1?[2-9]\d{9}$").unwrap())
}

fn vin_regex() -> &'static Regex {
    static VIN_REGEX: OnceLock<Regex> = OnceLock::new();
    // I, O and Q never appear in a VIN
    VIN_REGEX.get_or_init(|| Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").unwrap())
}

/// `validator` custom hook for phone numbers
pub fn validate_phone(phone: &str) -> Result<(), validator::ValidationError> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if FieldFormat::Phone.validate_str(&digits) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("phone").with_message("invalid phone number".into()))
    }
}

/// `validator` custom hook for VINs
pub fn validate_vin(vin: &str) -> Result<(), validator::ValidationError> {
    if FieldFormat::Vin.validate_str(&vin.trim().to_uppercase()) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("vin")
            .with_message("VIN must be 17 characters without I, O or Q".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_str_case_insensitive_string() {
        let value = FieldValue::String("Smith".to_string());
        assert!(value.matches_str("smith"));
        assert!(!value.matches_str("smyth"));
    }

    #[test]
    fn test_matches_str_decimal_and_uuid() {
        assert!(FieldValue::Decimal(Decimal::new(350, 2)).matches_str("3.5"));
        let id = Uuid::new_v4();
        assert!(FieldValue::Uuid(id).matches_str(&id.to_string()));
    }

    #[test]
    fn test_option_into_field_value() {
        let none: Option<String> = None;
        assert!(none.to_field_value().is_null());
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(Some(date).to_field_value(), FieldValue::Date(date));
    }

    #[test]
    fn test_time_field_value_matches_clock_text() {
        let start = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        let value = start.to_field_value();
        assert_eq!(value, FieldValue::Time(start));
        assert!(value.matches_str("09:30:00"));
        assert!(!value.matches_str("10:00:00"));
    }

    #[test]
    fn test_email_format() {
        let format = FieldFormat::Email;
        assert!(format.validate_str("office@interlock.example"));
        assert!(!format.validate_str("not-an-email"));
    }

    #[test]
    fn test_phone_validation_normalises_punctuation() {
        assert!(validate_phone("(609) 555-0142").is_ok());
        assert!(validate_phone("1-609-555-0142").is_ok());
        assert!(validate_phone("555-0142").is_err());
    }

    #[test]
    fn test_vin_rejects_forbidden_letters() {
        assert!(validate_vin("1HGCM82633A004352").is_ok());
        assert!(validate_vin("1HGCM82633A00435O").is_err());
        assert!(validate_vin("SHORT").is_err());
    }

    #[test]
    fn test_custom_format() {
        let format = FieldFormat::Custom(Regex::new(r"^IID-\d{5}$").unwrap());
        assert!(format.validate(&FieldValue::String("IID-00042".to_string())));
        assert!(!format.validate(&FieldValue::Integer(42)));
    }
}
