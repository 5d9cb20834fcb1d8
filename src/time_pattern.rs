//=====================================================
// File: time_pattern.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Recurring time-of-day predicate used by WAIT
// Objective: Parse "HH:MM" patterns with wildcards, combine them, and find
//            the next minute that satisfies them
//=====================================================

//! Time patterns.
//!
//! A pattern is written `HH:MM`. Any of the four digit positions may be `*`,
//! a whole field may be `*`, and the hour may be a single digit. `1*:*5`
//! therefore matches 10:05, 10:15, ... 19:55. Patterns can be combined with
//! [`TimePattern::union`]; the union matches if any of its members match.

use std::fmt;

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimePatternError {
    #[error("time pattern \"{0}\" must have the form HH:MM")]
    Shape(String),
    #[error("time pattern \"{0}\" is out of range")]
    Range(String),
}

/// One `HH:MM` alternative. `None` is a wildcard digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Spec {
    digits: [Option<u8>; 4],
}

impl Spec {
    fn parse(text: &str) -> Result<Self, TimePatternError> {
        let shape = || TimePatternError::Shape(text.to_string());
        let (hours, minutes) = text.trim().split_once(':').ok_or_else(shape)?;
        let [h0, h1] = parse_field(hours, true).ok_or_else(shape)?;
        let [m0, m1] = parse_field(minutes, false).ok_or_else(shape)?;
        let spec = Spec {
            digits: [h0, h1, m0, m1],
        };
        if spec.in_range() {
            Ok(spec)
        } else {
            Err(TimePatternError::Range(text.to_string()))
        }
    }

    fn in_range(&self) -> bool {
        let [h0, h1, m0, m1] = self.digits;
        let hour_ok = match (h0, h1) {
            (Some(tens), _) if tens > 2 => false,
            (Some(2), Some(ones)) => ones <= 3,
            _ => true,
        };
        let minute_ok = m0.map_or(true, |tens| tens <= 5);
        let digits_ok = [h1, m1].iter().flatten().all(|digit| *digit <= 9);
        hour_ok && minute_ok && digits_ok
    }

    fn matches(&self, hour: u32, minute: u32) -> bool {
        let actual = [hour / 10, hour % 10, minute / 10, minute % 10];
        self.digits
            .iter()
            .zip(actual)
            .all(|(expected, actual)| expected.map_or(true, |digit| u32::from(digit) == actual))
    }
}

fn parse_field(field: &str, is_hour: bool) -> Option<[Option<u8>; 2]> {
    let chars: Vec<char> = field.chars().collect();
    let digit = |c: char| -> Option<Option<u8>> {
        match c {
            '*' => Some(None),
            '0'..='9' => Some(Some(c as u8 - b'0')),
            _ => None,
        }
    };
    match chars.as_slice() {
        ['*'] => Some([None, None]),
        [single] if is_hour => match digit(*single)? {
            Some(ones) => Some([Some(0), Some(ones)]),
            None => Some([None, None]),
        },
        [tens, ones] => Some([digit(*tens)?, digit(*ones)?]),
        _ => None,
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: String = self
            .digits
            .iter()
            .map(|digit| digit.map_or('*', |d| char::from(b'0' + d)))
            .collect();
        write!(f, "{}:{}", &text[..2], &text[2..])
    }
}

/// A recurring hour:minute predicate, possibly a union of several patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimePattern {
    specs: Vec<Spec>,
}

impl TimePattern {
    pub fn from_pattern_text(text: &str) -> Result<Self, TimePatternError> {
        Ok(Self {
            specs: vec![Spec::parse(text)?],
        })
    }

    /// Merges `other` into this pattern so that either one matching suffices.
    pub fn union(&mut self, other: &TimePattern) {
        for spec in &other.specs {
            if !self.specs.contains(spec) {
                self.specs.push(*spec);
            }
        }
    }

    pub fn matches<T: Timelike>(&self, time: &T) -> bool {
        self.specs
            .iter()
            .any(|spec| spec.matches(time.hour(), time.minute()))
    }

    /// First whole minute strictly after `after` that satisfies the pattern.
    /// Every valid pattern matches at least once a day, so `None` only comes
    /// back for an empty union.
    pub fn next_match(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let start = after.with_second(0)?.with_nanosecond(0)? + Duration::minutes(1);
        (0..MINUTES_PER_DAY)
            .map(|offset| start + Duration::minutes(offset))
            .find(|candidate| self.matches(candidate))
    }
}

impl fmt::Display for TimePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, spec) in self.specs.iter().enumerate() {
            if index > 0 {
                f.write_str(" or ")?;
            }
            write!(f, "{spec}")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for TimePattern {
    type Error = TimePatternError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        let mut parts = text.split(" or ");
        let first = parts
            .next()
            .ok_or_else(|| TimePatternError::Shape(text.clone()))?;
        let mut pattern = TimePattern::from_pattern_text(first)?;
        for part in parts {
            pattern.union(&TimePattern::from_pattern_text(part)?);
        }
        Ok(pattern)
    }
}

impl From<TimePattern> for String {
    fn from(pattern: TimePattern) -> Self {
        pattern.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
    }

    #[test]
    fn literal_pattern_matches_one_minute() {
        let pattern = TimePattern::from_pattern_text("10:15").expect("pattern");
        assert!(pattern.matches(&at(10, 15)));
        assert!(!pattern.matches(&at(10, 16)));
        assert!(!pattern.matches(&at(22, 15)));
    }

    #[test]
    fn digit_wildcards() {
        let pattern = TimePattern::from_pattern_text("1*:*5").expect("pattern");
        assert!(pattern.matches(&at(10, 5)));
        assert!(pattern.matches(&at(19, 55)));
        assert!(!pattern.matches(&at(20, 5)));
        assert!(!pattern.matches(&at(12, 50)));
    }

    #[test]
    fn full_field_wildcards_and_single_digit_hours() {
        let every_hour = TimePattern::from_pattern_text("*:30").expect("pattern");
        assert!(every_hour.matches(&at(0, 30)));
        assert!(every_hour.matches(&at(23, 30)));
        let early = TimePattern::from_pattern_text("8:00").expect("pattern");
        assert!(early.matches(&at(8, 0)));
        assert!(!early.matches(&at(18, 0)));
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(matches!(
            TimePattern::from_pattern_text("1015"),
            Err(TimePatternError::Shape(_))
        ));
        assert!(matches!(
            TimePattern::from_pattern_text("24:00"),
            Err(TimePatternError::Range(_))
        ));
        assert!(matches!(
            TimePattern::from_pattern_text("10:75"),
            Err(TimePatternError::Range(_))
        ));
        assert!(TimePattern::from_pattern_text("1x:00").is_err());
    }

    #[test]
    fn union_matches_either_member() {
        let mut pattern = TimePattern::from_pattern_text("08:00").expect("pattern");
        pattern.union(&TimePattern::from_pattern_text("20:*0").expect("pattern"));
        assert!(pattern.matches(&at(8, 0)));
        assert!(pattern.matches(&at(20, 40)));
        assert!(!pattern.matches(&at(9, 0)));
        assert_eq!(pattern.to_string(), "08:00 or 20:*0");
    }

    #[test]
    fn next_match_is_strictly_later() {
        let pattern = TimePattern::from_pattern_text("*:*0").expect("pattern");
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(10, 10, 30))
            .expect("valid datetime");
        let next = pattern.next_match(now).expect("match");
        assert_eq!((next.hour(), next.minute()), (10, 20));
    }

    #[test]
    fn next_match_rolls_over_midnight() {
        let pattern = TimePattern::from_pattern_text("06:00").expect("pattern");
        let now = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(23, 0, 0))
            .expect("valid datetime");
        let next = pattern.next_match(now).expect("match");
        assert_eq!(next.date(), NaiveDate::from_ymd_opt(2024, 3, 2).expect("date"));
        assert_eq!((next.hour(), next.minute()), (6, 0));
    }
}

//=====================================================
// End of file
//=====================================================
