use chrono::{Days, NaiveDate};

/// Date range requested from the history endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl HistoryWindow {
    /// The window for a run on `today`: `[today - 8 days, today - 1 day]`.
    pub fn ending_before(today: NaiveDate) -> Self {
        // Subtracting a handful of days only underflows at NaiveDate::MIN.
        let back = |n| today.checked_sub_days(Days::new(n)).unwrap_or(NaiveDate::MIN);
        Self {
            from: back(8),
            to: back(1),
        }
    }

    /// `fromDate` / `toDate` query parameters as ISO dates.
    pub(crate) fn query(&self) -> [(&'static str, String); 2] {
        [
            ("fromDate", self.from.format("%Y-%m-%d").to_string()),
            ("toDate", self.to.format("%Y-%m-%d").to_string()),
        ]
    }
}
