//! Human-readable sale numbers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const PREFIX: &str = "SALE-";
const YEAR_DIGITS: usize = 4;
const SEQUENCE_WIDTH: usize = 4;

/// Error returned when a string is not a well-formed sale number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid sale number: {0}")]
pub struct InvalidSaleNumber(pub String);

/// Year-scoped sequential identifier, e.g. `SALE-20250007`.
///
/// The sequence is zero-padded to four digits and simply grows wider past
/// 9999. Once assigned to a sale it never changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SaleNumber {
    year: i32,
    sequence: u32,
}

impl SaleNumber {
    /// Creates the number for `sequence` within `year`.
    pub fn new(year: i32, sequence: u32) -> Self {
        Self { year, sequence }
    }

    /// The first number of a year.
    pub fn first_for_year(year: i32) -> Self {
        Self::new(year, 1)
    }

    /// Returns the prefix shared by every number of `year` (`SALE-2025`).
    pub fn year_prefix(year: i32) -> String {
        format!("{PREFIX}{year:04}")
    }

    /// Computes the number that follows `last` within `year`.
    ///
    /// Starts at 1 when nothing was issued for the year yet, or when `last`
    /// belongs to a different year.
    pub fn next_after(year: i32, last: Option<&SaleNumber>) -> Self {
        match last {
            Some(last) if last.year == year => Self::new(year, last.sequence + 1),
            _ => Self::first_for_year(year),
        }
    }

    /// Picks the highest number issued for `year` out of `numbers` and returns
    /// its successor.
    pub fn next_in<'a>(year: i32, numbers: impl IntoIterator<Item = &'a SaleNumber>) -> Self {
        let last = numbers
            .into_iter()
            .filter(|n| n.year == year)
            .max_by_key(|n| n.sequence);
        Self::next_after(year, last)
    }

    /// Parses `SALE-<yyyy><sequence>`.
    ///
    /// Only the canonical form is accepted, so extra leading zeros in the
    /// sequence are rejected.
    pub fn parse(value: &str) -> Result<Self, InvalidSaleNumber> {
        let invalid = || InvalidSaleNumber(value.to_string());

        let rest = value.strip_prefix(PREFIX).ok_or_else(invalid)?;
        if rest.len() <= YEAR_DIGITS || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let (year, sequence) = rest.split_at(YEAR_DIGITS);
        let year = year.parse().map_err(|_| invalid())?;
        let sequence = sequence.parse().map_err(|_| invalid())?;

        let number = Self::new(year, sequence);
        if number.to_string() != value {
            return Err(invalid());
        }
        Ok(number)
    }

    /// Returns the calendar year the number was issued in.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Returns the sequence within the year.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl std::fmt::Display for SaleNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{:0width$}",
            Self::year_prefix(self.year),
            self.sequence,
            width = SEQUENCE_WIDTH
        )
    }
}

impl std::str::FromStr for SaleNumber {
    type Err = InvalidSaleNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SaleNumber {
    type Error = InvalidSaleNumber;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SaleNumber> for String {
    fn from(number: SaleNumber) -> Self {
        number.to_string()
    }
}
