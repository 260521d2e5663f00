//! Reporting-period math for the AdReal API.
//!
//! A scheduled run reports on the previous calendar month. The API wants
//! the same month in two encodings: a period label (`month_20250801`) for
//! the taxonomy endpoints and a range string (`20250801,20250831,month`)
//! for the stats endpoint. The warehouse stamps rows with the first day of
//! the month.

use chrono::{Datelike, Months, NaiveDate};

/// One calendar reporting month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingMonth {
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
}

impl ReportingMonth {
    /// The month containing `day`.
    #[must_use]
    pub fn containing(day: NaiveDate) -> Self {
        let first_day = NaiveDate::from_ymd_opt(day.year(), day.month(), 1).unwrap_or(day);
        let last_day = first_day
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())
            .unwrap_or(first_day);
        Self {
            first_day,
            last_day,
        }
    }

    /// The month before the one containing `today`: what a scheduled run
    /// reports on.
    #[must_use]
    pub fn previous(today: NaiveDate) -> Self {
        let first_of_current = Self::containing(today).first_day;
        let last_of_previous = first_of_current.pred_opt().unwrap_or(first_of_current);
        Self::containing(last_of_previous)
    }

    /// AdReal period label, e.g. `month_20250801`.
    #[must_use]
    pub fn period_label(&self) -> String {
        format!("month_{}", self.first_day.format("%Y%m%d"))
    }

    /// AdReal stats range string, e.g. `20250801,20250831,month`.
    #[must_use]
    pub fn periods_range(&self) -> String {
        format!(
            "{},{},month",
            self.first_day.format("%Y%m%d"),
            self.last_day.format("%Y%m%d")
        )
    }

    /// The date stamped onto every output row of the run.
    #[must_use]
    pub fn report_date(&self) -> NaiveDate {
        self.first_day
    }
}

/// Parses a `YYYY-MM` month selector (the `--month` flag).
#[must_use]
pub fn parse_month(raw: &str) -> Option<ReportingMonth> {
    let (year, month) = raw.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1).map(ReportingMonth::containing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn previous_month_mid_month() {
        let month = ReportingMonth::previous(date(2025, 9, 15));
        assert_eq!(month.first_day, date(2025, 8, 1));
        assert_eq!(month.last_day, date(2025, 8, 31));
    }

    #[test]
    fn previous_month_across_year_boundary() {
        let month = ReportingMonth::previous(date(2025, 1, 3));
        assert_eq!(month.first_day, date(2024, 12, 1));
        assert_eq!(month.last_day, date(2024, 12, 31));
    }

    #[test]
    fn february_leap_year_last_day() {
        let month = ReportingMonth::containing(date(2024, 2, 10));
        assert_eq!(month.last_day, date(2024, 2, 29));
    }

    #[test]
    fn period_label_format() {
        let month = ReportingMonth::containing(date(2025, 8, 20));
        assert_eq!(month.period_label(), "month_20250801");
    }

    #[test]
    fn periods_range_format() {
        let month = ReportingMonth::containing(date(2025, 8, 20));
        assert_eq!(month.periods_range(), "20250801,20250831,month");
    }

    #[test]
    fn report_date_is_first_day() {
        let month = ReportingMonth::containing(date(2025, 8, 20));
        assert_eq!(month.report_date(), date(2025, 8, 1));
    }

    #[test]
    fn parse_month_valid() {
        let month = parse_month("2025-08").unwrap();
        assert_eq!(month.first_day, date(2025, 8, 1));
    }

    #[test]
    fn parse_month_invalid() {
        assert!(parse_month("2025").is_none());
        assert!(parse_month("2025-13").is_none());
        assert!(parse_month("august").is_none());
    }
}
