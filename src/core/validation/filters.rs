//! Reusable input filters
//!
//! These transform free-text values before they are stored, so lookups and
//! duplicate checks see one canonical form.

/// Trim surrounding whitespace
pub fn trim(value: &str) -> String {
    value.trim().to_string()
}

/// Trim, and turn blank strings into `None`
pub fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trimmed uppercase with inner whitespace removed (VINs, plates, service codes)
pub fn uppercase(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Keep only ASCII digits (phone numbers)
pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Lowercased, trimmed email address
pub fn email(value: &str) -> String {
    value.trim().to_lowercase()
}
