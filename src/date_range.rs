use crate::error::QueryError;
use crate::models::YearMonth;
use chrono::{Datelike, Months, NaiveDate};

/// Inclusive year-month window. Construction rejects inverted ranges
/// instead of swapping the ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: YearMonth,
    end: YearMonth,
}

impl DateRange {
    pub fn new(start: YearMonth, end: YearMonth) -> Result<Self, QueryError> {
        if start > end {
            return Err(QueryError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse a pair of `"YYYY-MM"` strings into a validated range.
    pub fn parse(date_i: &str, date_f: &str) -> Result<Self, QueryError> {
        Self::new(parse_year_month(date_i)?, parse_year_month(date_f)?)
    }

    pub fn start(&self) -> YearMonth {
        self.start
    }

    pub fn end(&self) -> YearMonth {
        self.end
    }

    /// Number of monthly tokens the range covers.
    pub fn len(&self) -> usize {
        let months = (self.end.year - self.start.year) * 12
            + (self.end.month as i32 - self.start.month as i32)
            + 1;
        months as usize
    }

    /// Fresh iterator over the range's tokens in ascending order. Stepping
    /// is iterative, so multi-year ranges cost no call-stack depth.
    pub fn months(&self) -> MonthRange {
        MonthRange {
            next: first_of_month(self.start),
            last: first_of_month(self.end),
        }
    }
}

/// Iterator yielding one [`YearMonth`] per calendar month, both ends
/// inclusive. Month 12 rolls over to January of the following year.
#[derive(Debug, Clone)]
pub struct MonthRange {
    next: Option<NaiveDate>,
    last: Option<NaiveDate>,
}

impl Iterator for MonthRange {
    type Item = YearMonth;

    fn next(&mut self) -> Option<YearMonth> {
        let current = self.next?;
        let last = self.last?;
        let token = YearMonth::new(current.year(), current.month());
        self.next = current
            .checked_add_months(Months::new(1))
            .filter(|d| *d <= last);
        Some(token)
    }
}

fn first_of_month(token: YearMonth) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(token.year, token.month, 1)
}

/// Parse `"YYYY-MM"` into a token. Exactly two dash-separated integer
/// fields, month in 1-12.
pub fn parse_year_month(input: &str) -> Result<YearMonth, QueryError> {
    let bad = || QueryError::BadDateFormat(input.to_string());

    let mut parts = input.trim().splitn(3, '-');
    let year_part = parts.next().ok_or_else(bad)?;
    let month_part = parts.next().ok_or_else(bad)?;
    if parts.next().is_some() {
        return Err(bad());
    }

    let year: i32 = year_part.parse().map_err(|_| bad())?;
    let month: u32 = month_part.parse().map_err(|_| bad())?;
    if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
        return Err(bad());
    }
    Ok(YearMonth::new(year, month))
}
