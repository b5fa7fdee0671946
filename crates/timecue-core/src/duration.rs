//! Compact duration strings such as `"1h30m"` or `"45m"`.
//!
//! Grammar: a run of `(digits)(unit)` pairs with `unit` one of `h` / `m`.
//! Anything else is skipped silently, so `"1 h 30 m"` still reads as 90.
//! There is no upper bound and no duplicate-unit check: `"1h1h"` is 120.

/// Parse a duration string into whole minutes.
///
/// Returns `None` for an empty string. A non-empty string without any
/// complete pair returns `Some(0)`, which callers treat the same as `None`.
pub fn parse_duration(input: &str) -> Option<u32> {
    if input.is_empty() {
        return None;
    }

    let mut total: u32 = 0;
    let mut pending: Option<u32> = None;

    for ch in input.chars() {
        if let Some(digit) = ch.to_digit(10) {
            let acc = pending.unwrap_or(0);
            pending = Some(acc.saturating_mul(10).saturating_add(digit));
            continue;
        }

        let factor = match ch {
            'h' => 60,
            'm' => 1,
            _ => continue,
        };
        // A unit without digits contributes nothing.
        if let Some(value) = pending.take() {
            total = total.saturating_add(value.saturating_mul(factor));
        }
    }

    Some(total)
}
