// Utility functions for filter compilation
use crate::error::{KwildError, Result};
use chrono::Duration;

/// Parse a duration such as "90s", "15m", "2h", "7d" or "1h30m".
///
/// Every number needs a unit (`s`, `m`, `h`, `d`); "0" alone is accepted.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim().to_ascii_lowercase();
    let invalid = |message: &str| KwildError::invalid_syntax("duration", input, message);

    if s.is_empty() {
        return Err(invalid("duration is empty"));
    }
    if s == "0" {
        return Ok(Duration::zero());
    }

    let mut total = Duration::zero();
    let mut digits = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if digits.is_empty() {
            return Err(invalid("expected a number before each unit"));
        }
        let n: i64 = digits
            .parse()
            .map_err(|_| invalid("number is out of range"))?;
        digits.clear();

        let part = match c {
            's' => Duration::try_seconds(n),
            'm' => Duration::try_minutes(n),
            'h' => Duration::try_hours(n),
            'd' => Duration::try_days(n),
            _ => return Err(invalid("unknown unit; use s, m, h or d")),
        }
        .ok_or_else(|| invalid("duration is out of range"))?;
        total = total
            .checked_add(&part)
            .ok_or_else(|| invalid("duration is out of range"))?;
    }

    if !digits.is_empty() {
        return Err(invalid("missing unit after number"));
    }

    Ok(total)
}

/// Case-insensitive membership test
pub fn contains_ignore_case(haystack: &[String], needle: &str) -> bool {
    haystack.iter().any(|h| h.eq_ignore_ascii_case(needle))
}
