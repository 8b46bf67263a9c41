//! Timeout interval encoding.
//!
//! RPC deadlines travel as a compact header value: up to eight decimal
//! digits followed by a one-letter unit, for example `500m` or `2H`.
//!
//! ```text
//! interval = digits suffix
//! digits   = 1*8 DIGIT
//! suffix   = "H" / "M" / "S" / "m" / "u" / "n"
//! ```
//!
//! Suffixes are hours, minutes, seconds, milliseconds, microseconds, and
//! nanoseconds. `n` is accepted on decode only; sub-microsecond precision
//! is floored away.

use std::sync::LazyLock;

use regex::Regex;
use wirerpc_core::WireError;

/// Largest amount the eight-digit field can carry.
pub const MAX_INTERVAL_AMOUNT: u64 = 99_999_999;

/// Encodable suffixes with their microsecond weights, coarsest first.
/// Encoding scans in this order and settles on the first exact divisor,
/// so an hour-aligned value is always `1H`, never `60M`.
const SUFFIXES: [(char, u64); 5] = [
    ('H', 3_600_000_000),
    ('M', 60_000_000),
    ('S', 1_000_000),
    ('m', 1_000),
    ('u', 1),
];

/// Fine-to-coarse ladder factors: u -> m -> S -> M -> H.
const LADDER: [u64; 4] = [1000, 1000, 60, 60];

static INTERVAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,8})(H|M|S|m|u|n)$").expect("interval regex is valid"));

/// Encode a microsecond count as an interval string.
///
/// The string uses the coarsest suffix whose weight divides `micros`
/// exactly. When even that amount overflows eight digits, the value is
/// floored down the unit ladder into hours; an hours figure that still
/// overflows is an out-of-range error. `n` is never produced.
///
/// # Example
///
/// ```
/// use wirerpc::interval::micros_to_interval;
///
/// assert_eq!(micros_to_interval(1_000_000).unwrap(), "1S");
/// assert_eq!(micros_to_interval(1).unwrap(), "1u");
/// ```
pub fn micros_to_interval(micros: u64) -> Result<String, WireError> {
    for (i, &(suffix, weight)) in SUFFIXES.iter().enumerate() {
        if micros % weight != 0 {
            continue;
        }
        let amount = micros / weight;
        if amount <= MAX_INTERVAL_AMOUNT {
            return Ok(format!("{}{}", amount, suffix));
        }

        // No suffix can hold the exact amount once the coarsest divisor
        // overflows. Collapse into hours, flooring at each ladder step.
        let mut hours = amount;
        for &step in &LADDER[LADDER.len().saturating_sub(i + 1)..] {
            hours /= step;
        }
        if hours > MAX_INTERVAL_AMOUNT {
            return Err(WireError::OutOfRange(format!(
                "interval of {}us does not fit in eight digits",
                micros
            )));
        }
        return Ok(format!("{}H", hours));
    }

    // The microsecond suffix has weight 1 and divides everything.
    unreachable!("interval suffix scan always terminates at 'u'")
}

/// Decode an interval string into microseconds.
///
/// Nanosecond amounts are floored to whole microseconds. A string outside
/// the grammar is an out-of-range error.
///
/// # Example
///
/// ```
/// use wirerpc::interval::interval_to_micros;
///
/// assert_eq!(interval_to_micros("500m").unwrap(), 500_000);
/// assert_eq!(interval_to_micros("1000n").unwrap(), 1);
/// ```
pub fn interval_to_micros(value: &str) -> Result<u64, WireError> {
    let caps = INTERVAL_REGEX.captures(value).ok_or_else(|| {
        WireError::OutOfRange(format!("{:?} is not a valid interval", value))
    })?;
    let amount: u64 = caps[1]
        .parse()
        .map_err(|_| WireError::OutOfRange(format!("{:?} is not a valid interval", value)))?;

    let micros = match &caps[2] {
        "H" => amount * 3_600_000_000,
        "M" => amount * 60_000_000,
        "S" => amount * 1_000_000,
        "m" => amount * 1_000,
        "u" => amount,
        "n" => amount / 1_000,
        _ => unreachable!("suffix constrained by the grammar"),
    };
    Ok(micros)
}

/// Whether a string is a well-formed interval.
pub fn is_interval(value: &str) -> bool {
    INTERVAL_REGEX.is_match(value)
}
