//! Small input-normalisation helpers used by the create/update operations.

use crate::errors::{Error, Result};

/// Trims `value` and rejects it when empty.
pub fn required_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::bad_request(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Trims an optional value, mapping blank strings to `None`.
#[must_use]
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Accepts strictly positive, finite amounts.
pub fn positive_amount(amount: f64) -> Result<f64> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(Error::InvalidAmount { amount })
    }
}

/// Accepts `None` or a non-negative, finite amount.
pub fn optional_cost(cost: Option<f64>) -> Result<Option<f64>> {
    match cost {
        Some(amount) if !amount.is_finite() || amount < 0.0 => Err(Error::InvalidAmount { amount }),
        other => Ok(other),
    }
}

/// Accepts `#rgb` / `#rrggbb` colour strings.
pub fn hex_color(value: Option<String>) -> Result<Option<String>> {
    let Some(color) = optional_text(value) else {
        return Ok(None);
    };
    let digits = color.strip_prefix('#').unwrap_or_default();
    let valid = matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(Some(color.to_ascii_lowercase()))
    } else {
        Err(Error::bad_request(format!("Invalid colour: {color}")))
    }
}
