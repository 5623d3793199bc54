//! Normalization of reference codes and free-text fields shared by entities.

use brokerdesk_core::{AppError, AppResult, NonEmptyString};
use rust_decimal::Decimal;

/// Trims optional text, mapping blank values to `None`.
#[must_use]
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Validates required text of bounded length.
pub fn bounded_text(field: &str, value: impl Into<String>, max_chars: usize) -> AppResult<String> {
    let value = NonEmptyString::for_field(field, value)?;
    if value.as_str().chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "{field} must not exceed {max_chars} characters"
        )));
    }

    Ok(value.into())
}

/// Normalizes an ISO 3166-1 alpha-2 country code.
pub fn country_code(field: &str, value: &str) -> AppResult<String> {
    alpha_code(field, value, 2)
}

/// Normalizes an ISO 4217 currency code.
pub fn currency_code(field: &str, value: &str) -> AppResult<String> {
    alpha_code(field, value, 3)
}

fn alpha_code(field: &str, value: &str, length: usize) -> AppResult<String> {
    let normalized = value.trim().to_ascii_uppercase();
    if normalized.len() != length || !normalized.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::Validation(format!(
            "{field} must be a {length}-letter code, got '{value}'"
        )));
    }

    Ok(normalized)
}

/// Normalizes an ISIN: two-letter country prefix, nine alphanumerics and a check digit.
pub fn isin(value: &str) -> AppResult<String> {
    let normalized = value.trim().to_ascii_uppercase();
    let bytes = normalized.as_bytes();
    let valid = bytes.len() == 12
        && bytes[..2].iter().all(u8::is_ascii_alphabetic)
        && bytes[2..11].iter().all(u8::is_ascii_alphanumeric)
        && bytes[11].is_ascii_digit();

    if !valid {
        return Err(AppError::Validation(format!("isin '{value}' is malformed")));
    }

    Ok(normalized)
}

/// Requires a strictly positive decimal.
pub fn positive_decimal(field: &str, value: Decimal) -> AppResult<Decimal> {
    if value <= Decimal::ZERO {
        return Err(AppError::Validation(format!("{field} must be greater than zero")));
    }

    Ok(value.normalize())
}

/// Requires a non-negative decimal when present.
pub fn non_negative_decimal(field: &str, value: Option<Decimal>) -> AppResult<Option<Decimal>> {
    match value {
        Some(value) if value < Decimal::ZERO => Err(AppError::Validation(format!(
            "{field} must not be negative"
        ))),
        other => Ok(other.map(|value| value.normalize())),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{country_code, currency_code, isin, optional_text, positive_decimal};

    #[test]
    fn codes_are_uppercased() {
        assert_eq!(country_code("country", " ch ").ok().as_deref(), Some("CH"));
        assert_eq!(currency_code("currency", "usd").ok().as_deref(), Some("USD"));
    }

    #[test]
    fn wrong_length_code_is_rejected() {
        assert!(currency_code("currency", "US").is_err());
        assert!(country_code("country", "C1").is_err());
    }

    #[test]
    fn isin_shape_is_checked() {
        assert!(isin("us0378331005").is_ok());
        assert!(isin("US03783310").is_err());
        assert!(isin("1S0378331005").is_err());
    }

    #[test]
    fn blank_optional_text_is_none() {
        assert_eq!(optional_text(Some("   ".to_owned())), None);
        assert_eq!(optional_text(Some(" x ".to_owned())).as_deref(), Some("x"));
    }

    #[test]
    fn positive_decimal_is_normalized() {
        let value = positive_decimal("price", Decimal::new(1050, 2));
        assert_eq!(value.ok().map(|value| value.to_string()).as_deref(), Some("10.5"));
        assert!(positive_decimal("price", Decimal::ZERO).is_err());
    }
}
