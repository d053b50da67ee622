use chrono::{Days, NaiveDate};

/// Fixed lunch deduction applied to the office-hours window.
pub const LUNCH_BREAK_MINUTES: u32 = 60;

/// A daily working window expressed in whole hours, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfficeHours {
    start: u32,
    end: u32,
}

impl OfficeHours {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub const fn contains_hour(&self, hour: u32) -> bool {
        hour >= self.start && hour < self.end
    }

    /// Full length of the window in minutes.
    pub const fn theoretical_minutes(&self) -> u32 {
        self.end.saturating_sub(self.start) * 60
    }

    /// Window length minus the fixed lunch break, floored at zero.
    pub const fn effective_minutes(&self) -> u32 {
        self.theoretical_minutes().saturating_sub(LUNCH_BREAK_MINUTES)
    }
}

/// The set of days a utilization query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSpan {
    /// The last `n` days ending at the reference date, oldest first.
    LastDays(u32),
    /// An inclusive date range.
    Range(NaiveDate, NaiveDate),
}

impl DateSpan {
    /// Expands the span into concrete dates, oldest first.
    /// `today` anchors `LastDays`; `Range` ignores it.
    pub fn dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
        match self {
            Self::LastDays(days) => (0..*days)
                .rev()
                .filter_map(|back| today.checked_sub_days(Days::new(back as u64)))
                .collect(),
            Self::Range(start, end) => {
                let mut dates = Vec::new();
                let mut current = *start;
                while current <= *end {
                    dates.push(current);
                    current = match current.checked_add_days(Days::new(1)) {
                        Some(next) => next,
                        None => break,
                    };
                }
                dates
            }
        }
    }
}

/// Formats whole minutes as `HH:MM`.
pub fn format_duration(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

#[test]
fn office_hours_window_test() {
    let hours = OfficeHours::new(8, 17);
    assert!(hours.contains_hour(8));
    assert!(hours.contains_hour(16));
    assert!(!hours.contains_hour(17));
    assert!(!hours.contains_hour(7));
}

#[test]
fn office_hours_minutes_test() {
    let hours = OfficeHours::new(8, 17);
    assert_eq!(hours.theoretical_minutes(), 540);
    assert_eq!(hours.effective_minutes(), 480);
}

#[test]
fn office_hours_degenerate_test() {
    let hours = OfficeHours::new(9, 9);
    assert_eq!(hours.theoretical_minutes(), 0);
    assert_eq!(hours.effective_minutes(), 0);
}

#[test]
fn last_days_test() {
    let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let dates = DateSpan::LastDays(3).dates(today);
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2025, 3, 8).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        ]
    );
}

#[test]
fn range_test() {
    let start = NaiveDate::from_ymd_opt(2025, 2, 27).unwrap();
    let end = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let dates = DateSpan::Range(start, end).dates(today);
    assert_eq!(dates.len(), 3);
    assert_eq!(dates[0], start);
    assert_eq!(dates[2], end);
}

#[test]
fn empty_range_test() {
    let start = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
    let end = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    assert!(DateSpan::Range(start, end).dates(today).is_empty());
}

#[test]
fn format_duration_test_1() {
    assert_eq!(format_duration(0), "00:00");
}

#[test]
fn format_duration_test_2() {
    assert_eq!(format_duration(6), "00:06");
}

#[test]
fn format_duration_test_3() {
    assert_eq!(format_duration(125), "02:05");
}

#[test]
fn format_duration_negative_test() {
    assert_eq!(format_duration(-5), "00:00");
}
