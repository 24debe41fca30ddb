use std::fmt;
use std::str::FromStr;
use tokio::time::Duration;

/// TimeValue is a duration written the way cluster APIs take them: `"30s"`, `"500ms"`, `"0s"`.
/// A bare number is milliseconds. The number may have a fraction (`"1.5s"`); anything below a
/// millisecond is truncated.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct TimeValue(Duration);

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TimeValueParseError {
    #[error("empty time value")]
    Empty,
    #[error("negative time value {0:?} is not allowed here")]
    Negative(String),
    #[error("failed to parse time value {0:?}")]
    Malformed(String),
    #[error("unknown time unit in {0:?}, expected one of ms, s, m, h, d")]
    UnknownUnit(String),
}

const UNITS: [(&str, u64); 5] = [("ms", 1), ("s", 1_000), ("m", 60_000), ("h", 3_600_000), ("d", 86_400_000)];

impl TimeValue {
    pub fn parse(input: &str) -> Result<Self, TimeValueParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TimeValueParseError::Empty);
        }
        if trimmed.starts_with('-') {
            return Err(TimeValueParseError::Negative(input.to_string()));
        }

        let split = trimmed
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or_else(|| trimmed.len());
        let (number, unit) = trimmed.split_at(split);
        let malformed = || TimeValueParseError::Malformed(input.to_string());

        let (whole, fraction) = match number.find('.') {
            Some(dot) => (&number[..dot], &number[dot + 1..]),
            None => (number, ""),
        };
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return Err(malformed());
        }
        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| malformed())?
        };
        // Nine fraction digits are already finer than a millisecond of a day.
        let fraction = &fraction[..fraction.len().min(9)];
        let fraction_scale = 10u64.pow(fraction.len() as u32);
        let fraction: u64 = if fraction.is_empty() {
            0
        } else {
            fraction.parse().map_err(|_| malformed())?
        };

        let unit = unit.trim().to_ascii_lowercase();
        let millis_per_unit = if unit.is_empty() {
            1
        } else {
            UNITS
                .iter()
                .find(|(name, _)| *name == unit)
                .map(|(_, millis)| *millis)
                .ok_or_else(|| TimeValueParseError::UnknownUnit(input.to_string()))?
        };

        // Fractions of a millisecond are truncated.
        let millis = whole
            .checked_mul(millis_per_unit)
            .and_then(|millis| millis.checked_add(fraction * millis_per_unit / fraction_scale))
            .ok_or_else(malformed)?;
        Ok(TimeValue(Duration::from_millis(millis)))
    }

    pub fn from_duration(duration: Duration) -> Self {
        TimeValue(duration)
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl FromStr for TimeValue {
    type Err = TimeValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeValue::parse(s)
    }
}

impl From<TimeValue> for Duration {
    fn from(value: TimeValue) -> Self {
        value.0
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.0.as_millis();
        // Largest unit that divides evenly.
        for (name, per_unit) in UNITS.iter().rev() {
            let per_unit = *per_unit as u128;
            if millis != 0 && millis % per_unit == 0 {
                return write!(f, "{}{}", millis / per_unit, name);
            }
        }
        write!(f, "{}ms", millis)
    }
}
