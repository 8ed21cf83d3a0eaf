use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// HumanDuration
// ---------------------------------------------------------------------------

/// A duration parsed from a human-readable string like `"30s"`, `"5m"`, `"1h"`, `"2d"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(Duration);

impl HumanDuration {
    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl From<HumanDuration> for Duration {
    fn from(hd: HumanDuration) -> Self {
        hd.0
    }
}

impl From<Duration> for HumanDuration {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

impl FromStr for HumanDuration {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            anyhow::bail!("empty duration string");
        }

        let (num_part, suffix) = split_number_suffix(s)?;
        let value: u64 = num_part
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid number in duration: {s:?}"))?;

        let secs = match suffix {
            "s" => value,
            "m" => value * 60,
            "h" => value * 3600,
            "d" => value * 86400,
            _ => {
                anyhow::bail!("unsupported duration suffix {suffix:?} in {s:?} (expected s/m/h/d)")
            }
        };

        Ok(Self(Duration::from_secs(secs)))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();
        if secs == 0 {
            return write!(f, "0s");
        }
        if secs.is_multiple_of(86400) {
            write!(f, "{}d", secs / 86400)
        } else if secs.is_multiple_of(3600) {
            write!(f, "{}h", secs / 3600)
        } else if secs.is_multiple_of(60) {
            write!(f, "{}m", secs / 60)
        } else {
            write!(f, "{secs}s")
        }
    }
}

impl Serialize for HumanDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// WindowAmount
// ---------------------------------------------------------------------------

const MILLIS_PER_SECOND: i64 = 1000;
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;

/// A window storage or slide amount: either a tuple count (`"10"`) or a
/// duration with a single trailing `s`/`m`/`h` unit (`"10s"`, `"5m"`).
///
/// Whitespace anywhere in the raw string is ignored and units are
/// case-insensitive. A unit letter anywhere but the final position is an
/// error, as is a negative or non-numeric amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAmount {
    Tuples(i64),
    Millis(i64),
}

impl WindowAmount {
    /// The raw number: a tuple count or a duration in milliseconds.
    pub fn value(&self) -> i64 {
        match self {
            Self::Tuples(n) | Self::Millis(n) => *n,
        }
    }

    pub fn is_count_based(&self) -> bool {
        matches!(self, Self::Tuples(_))
    }
}

impl FromStr for WindowAmount {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> anyhow::Result<Self> {
        let s: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        if s.is_empty() {
            anyhow::bail!("empty window amount");
        }

        let multiplier = match s.as_bytes()[s.len() - 1] {
            b's' => Some(MILLIS_PER_SECOND),
            b'm' => Some(MILLIS_PER_MINUTE),
            b'h' => Some(MILLIS_PER_HOUR),
            _ => None,
        };

        match multiplier {
            Some(mult) => {
                let value = parse_non_negative(&s[..s.len() - 1], raw)?;
                let millis = value
                    .checked_mul(mult)
                    .ok_or_else(|| anyhow::anyhow!("window amount overflows: {raw:?}"))?;
                Ok(Self::Millis(millis))
            }
            None => {
                if s.contains(['s', 'm', 'h']) {
                    anyhow::bail!("time unit must be the last character in {raw:?}");
                }
                Ok(Self::Tuples(parse_non_negative(&s, raw)?))
            }
        }
    }
}

impl fmt::Display for WindowAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Tuples(n) => write!(f, "{n}"),
            Self::Millis(0) => write!(f, "0s"),
            Self::Millis(ms) if ms % MILLIS_PER_HOUR == 0 => write!(f, "{}h", ms / MILLIS_PER_HOUR),
            Self::Millis(ms) if ms % MILLIS_PER_MINUTE == 0 => {
                write!(f, "{}m", ms / MILLIS_PER_MINUTE)
            }
            Self::Millis(ms) if ms % MILLIS_PER_SECOND == 0 => {
                write!(f, "{}s", ms / MILLIS_PER_SECOND)
            }
            Self::Millis(ms) => write!(f, "{ms}ms"),
        }
    }
}

impl<'de> Deserialize<'de> for WindowAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

/// Split a string like `"30s"` into `("30", "s")`.
/// Returns an error if the string is all-digits or all-letters.
fn split_number_suffix(s: &str) -> anyhow::Result<(&str, &str)> {
    let idx = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| anyhow::anyhow!("missing suffix in {s:?}"))?;
    if idx == 0 {
        anyhow::bail!("missing numeric part in {s:?}");
    }
    Ok((&s[..idx], &s[idx..]))
}

fn parse_non_negative(digits: &str, raw: &str) -> anyhow::Result<i64> {
    let value: i64 = digits
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid number in window amount: {raw:?}"))?;
    if value < 0 {
        anyhow::bail!("window amount must not be negative: {raw:?}");
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- HumanDuration --

    #[test]
    fn duration_seconds() {
        let d: HumanDuration = "30s".parse().unwrap();
        assert_eq!(d.as_duration(), Duration::from_secs(30));
        assert_eq!(d.to_string(), "30s");
    }

    #[test]
    fn duration_hours_render_as_days() {
        let d: HumanDuration = "48h".parse().unwrap();
        assert_eq!(d.as_duration(), Duration::from_secs(48 * 3600));
        assert_eq!(d.to_string(), "2d");
    }

    #[test]
    fn duration_error_no_suffix() {
        assert!("30".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn duration_error_invalid_suffix() {
        assert!("30x".parse::<HumanDuration>().is_err());
    }

    // -- WindowAmount --

    #[test]
    fn amount_tuple_count() {
        assert_eq!("10".parse::<WindowAmount>().unwrap(), WindowAmount::Tuples(10));
    }

    #[test]
    fn amount_units() {
        assert_eq!("5s".parse::<WindowAmount>().unwrap(), WindowAmount::Millis(5_000));
        assert_eq!("5m".parse::<WindowAmount>().unwrap(), WindowAmount::Millis(300_000));
        assert_eq!("5h".parse::<WindowAmount>().unwrap(), WindowAmount::Millis(18_000_000));
    }

    #[test]
    fn amount_ignores_spaces_and_case() {
        assert_eq!(" 1 0 S ".parse::<WindowAmount>().unwrap(), WindowAmount::Millis(10_000));
    }

    #[test]
    fn amount_unit_not_last_rejected() {
        assert!("5s0".parse::<WindowAmount>().is_err());
        assert!("5ms".parse::<WindowAmount>().is_err());
        assert!("h5".parse::<WindowAmount>().is_err());
    }

    #[test]
    fn amount_garbage_rejected() {
        assert!("".parse::<WindowAmount>().is_err());
        assert!("abc".parse::<WindowAmount>().is_err());
        assert!("5d".parse::<WindowAmount>().is_err());
        assert!("s".parse::<WindowAmount>().is_err());
        assert!("-5".parse::<WindowAmount>().is_err());
    }

    #[test]
    fn amount_display() {
        assert_eq!(WindowAmount::Tuples(7).to_string(), "7");
        assert_eq!(WindowAmount::Millis(120_000).to_string(), "2m");
        assert_eq!(WindowAmount::Millis(1_500).to_string(), "1500ms");
    }

    #[test]
    fn serde_duration_from_json() {
        let d: HumanDuration = serde_json::from_str("\"30s\"").unwrap();
        assert_eq!(d.as_duration(), Duration::from_secs(30));
        assert_eq!(serde_json::to_string(&d).unwrap(), "\"30s\"");
    }
}
