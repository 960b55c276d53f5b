//! The `YYYY-MM-DDThh:mm:ss[.fraction][Z]` literal shared by both languages

use serde::{Deserialize, Serialize};
use std::fmt;

const TEMPLATE: &[u8] = b"dddd-dd-ddTdd:dd:dd";
const DATE_LEN: usize = 10;
const MAX_FRACTION_DIGITS: usize = 9;

/// How far a piece of text is from being a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// no continuation can make this a timestamp
    Invalid,
    /// could still become one
    Prefix,
    /// a timestamp as it stands, it might still be extended
    Complete,
}

/// Tokenizers call this after every appended character to decide whether
/// to keep scanning a timestamp or fall back to plain text.
pub fn classify(text: &str) -> Shape {
    let bytes = text.as_bytes();
    let head = bytes.len().min(TEMPLATE.len());
    let head_matches = bytes[..head]
        .iter()
        .zip(TEMPLATE)
        .all(|(&c, &t)| if t == b'd' { c.is_ascii_digit() } else { c == t });
    if !head_matches {
        return Shape::Invalid;
    }
    if bytes.len() < TEMPLATE.len() {
        return if bytes.len() == DATE_LEN {
            Shape::Complete
        } else {
            Shape::Prefix
        };
    }
    match &bytes[TEMPLATE.len()..] {
        [] | [b'Z'] => Shape::Complete,
        [b'.', fraction @ ..] => {
            let digits = fraction.iter().take_while(|c| c.is_ascii_digit()).count();
            if digits > MAX_FRACTION_DIGITS {
                return Shape::Invalid;
            }
            match &fraction[digits..] {
                [] if digits == 0 => Shape::Prefix,
                [] | [b'Z'] if digits > 0 => Shape::Complete,
                _ => Shape::Invalid,
            }
        }
        _ => Shape::Invalid,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub nanos: u32,
}

impl Timestamp {
    /// Parses a complete timestamp and checks that every field is in range.
    /// A date without a time part is midnight.
    pub fn parse(text: &str) -> Option<Self> {
        if classify(text) != Shape::Complete {
            return None;
        }
        let field = |from: usize, to: usize| text[from..to].parse::<u32>().ok();
        let year = field(0, 4)?;
        let month = field(5, 7)?;
        let day = field(8, 10)?;
        let (hour, minute, second, nanos) = if text.len() > DATE_LEN {
            let fraction = text.get(20..).unwrap_or("").trim_end_matches('Z');
            let nanos = if fraction.is_empty() {
                0
            } else {
                fraction.parse::<u32>().ok()?
                    * 10u32.pow((MAX_FRACTION_DIGITS - fraction.len()) as u32)
            };
            (field(11, 13)?, field(14, 16)?, field(17, 19)?, nanos)
        } else {
            (0, 0, 0, 0)
        };

        let valid = (1..=12).contains(&month)
            && day >= 1
            && day <= days_in_month(year, month)
            && hour < 24
            && minute < 60
            && second < 60;
        valid.then_some(Self {
            year: year as u16,
            month: month as u8,
            day: day as u8,
            hour: hour as u8,
            minute: minute as u8,
            second: second as u8,
            nanos,
        })
    }
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        if self.nanos > 0 {
            let fraction = format!("{:09}", self.nanos);
            write!(f, ".{}", fraction.trim_end_matches('0'))?;
        }
        Ok(())
    }
}
