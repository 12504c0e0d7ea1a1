use std::time::Duration;

use crate::error::TranslateError;

/// Parses the `<integer><unit>` duration syntax used by configuration blobs.
///
/// Accepted units are `s`, `m` and `h`; anything else (including an empty
/// amount, signs or fractional values) is rejected.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let unit = value
        .chars()
        .last()
        .ok_or_else(|| "empty duration".to_string())?;
    let amount = &value[..value.len() - unit.len_utf8()];

    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid duration format: {}", value));
    }

    let amount: u64 = amount
        .parse()
        .map_err(|_| format!("invalid duration amount: {}", amount))?;

    let secs = match unit {
        's' => Some(amount),
        'm' => amount.checked_mul(60),
        'h' => amount.checked_mul(3600),
        _ => return Err(format!("invalid duration format: {}", value)),
    };

    secs.map(Duration::from_secs)
        .ok_or_else(|| format!("duration out of range: {}", value))
}

/// Parses a duration and attributes a failure to `field`.
pub(crate) fn field_duration(field: &str, value: &str) -> Result<Duration, TranslateError> {
    parse_duration(value).map_err(|reason| TranslateError::InvalidDuration {
        field: field.to_string(),
        value: value.to_string(),
        reason,
    })
}
