use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::error::{AppError, AppResult};

const WEEKDAY_LABELS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

/// The tracked date window. Every per-row series is indexed by position in
/// `dates`; date strings are only a display form.
#[derive(Debug, Clone, Serialize)]
pub struct Calendar {
    dates: Vec<NaiveDate>,
    weekdays: Vec<&'static str>,
    today: NaiveDate,
}

impl Calendar {
    pub fn build(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> AppResult<Self> {
        if start > end {
            return Err(AppError::Validation(format!(
                "Calendar start {} is after end {}",
                start, end
            )));
        }

        let mut dates = Vec::new();
        let mut current = start;
        while current <= end {
            dates.push(current);
            current += Duration::days(1);
        }
        let weekdays = dates.iter().map(|d| weekday_label(*d)).collect();

        Ok(Self {
            dates,
            weekdays,
            today,
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        self.dates.get(index).copied()
    }

    pub fn date_string(&self, index: usize) -> String {
        self.dates
            .get(index)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    pub fn weekday(&self, index: usize) -> &'static str {
        self.weekdays.get(index).copied().unwrap_or("")
    }

    pub fn is_weekend(&self, index: usize) -> bool {
        matches!(self.weekday(index), "Sa" | "Su")
    }

    /// Whether the date at `index` is strictly before today.
    pub fn is_elapsed(&self, index: usize) -> bool {
        self.dates.get(index).is_some_and(|d| *d < self.today)
    }

    pub fn check_index(&self, index: usize) -> AppResult<()> {
        if index >= self.dates.len() {
            return Err(AppError::Validation(format!(
                "Date index {} is out of range (0..{})",
                index,
                self.dates.len()
            )));
        }
        Ok(())
    }

    /// Positions whose date falls in `from..=to`.
    pub fn indices_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<usize> {
        self.dates
            .iter()
            .enumerate()
            .filter(|(_, d)| **d >= from && **d <= to)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn date_strings(&self) -> Vec<String> {
        (0..self.dates.len()).map(|i| self.date_string(i)).collect()
    }

    pub fn weekdays(&self) -> &[&'static str] {
        &self.weekdays
    }
}

pub fn weekday_label(date: NaiveDate) -> &'static str {
    WEEKDAY_LABELS[date.weekday().num_days_from_sunday() as usize]
}

pub fn parse_date(s: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", s)))
}

/// Trait for query params that select a window with presets and navigation.
#[allow(clippy::wrong_self_convention)]
pub trait DateFilterable {
    fn from_date(&self) -> Option<&String>;
    fn to_date(&self) -> Option<&String>;
    fn preset(&self) -> Option<&String>;

    fn nav(&self) -> Option<&String> {
        None
    }

    /// Explicit dates win over a preset; with neither, the operator's
    /// default `upcoming` view is used.
    fn resolve_date_range(&self, calendar: &Calendar) -> AppResult<DateRange> {
        let base_range = match (self.from_date(), self.to_date()) {
            (Some(from), Some(to)) => DateRange::from_dates(parse_date(from)?, parse_date(to)?),
            _ => {
                let preset = match self.preset() {
                    Some(raw) => raw.parse::<DatePreset>().map_err(|_| {
                        AppError::Validation(format!("Unknown date preset '{}'", raw))
                    })?,
                    None => DatePreset::Upcoming,
                };
                DateRange::from_preset(preset, calendar)
            }
        };

        match self.nav().map(|s| s.as_str()) {
            Some("prev") => base_range.prev(),
            Some("next") => base_range.next(),
            _ => Ok(base_range),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePreset {
    Upcoming,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    All,
}

impl FromStr for DatePreset {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(Self::Upcoming),
            "this_week" => Ok(Self::ThisWeek),
            "last_week" => Ok(Self::LastWeek),
            "this_month" => Ok(Self::ThisMonth),
            "last_month" => Ok(Self::LastMonth),
            "all" => Ok(Self::All),
            _ => Err(()),
        }
    }
}

impl DatePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::ThisWeek => "this_week",
            Self::LastWeek => "last_week",
            Self::ThisMonth => "this_month",
            Self::LastMonth => "last_month",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub preset: Option<DatePreset>,
}

impl DateRange {
    /// Presets are anchored on the calendar's simulated today, not the wall clock.
    pub fn from_preset(preset: DatePreset, calendar: &Calendar) -> Self {
        let today = calendar.today();
        let (from, to) = match preset {
            DatePreset::Upcoming => (today - Duration::days(7), today + Duration::days(14)),
            DatePreset::ThisWeek => (week_start(today), week_end(today)),
            DatePreset::LastWeek => {
                let last_week = today - Duration::days(7);
                (week_start(last_week), week_end(last_week))
            }
            DatePreset::ThisMonth => (month_start(today), month_end(today)),
            DatePreset::LastMonth => {
                let last_month = today - Duration::days(today.day() as i64);
                (month_start(last_month), month_end(last_month))
            }
            DatePreset::All => (
                calendar.first().unwrap_or(today),
                calendar.last().unwrap_or(today),
            ),
        };
        Self {
            from,
            to,
            preset: Some(preset),
        }
    }

    pub fn from_dates(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from,
            to,
            preset: None,
        }
    }

    /// Shift back by the window's own length.
    pub fn prev(&self) -> AppResult<Self> {
        self.shift(-(self.span()))
    }

    pub fn next(&self) -> AppResult<Self> {
        self.shift(self.span())
    }

    fn span(&self) -> Duration {
        self.to - self.from + Duration::days(1)
    }

    fn shift(&self, by: Duration) -> AppResult<Self> {
        match (
            self.from.checked_add_signed(by),
            self.to.checked_add_signed(by),
        ) {
            (Some(from), Some(to)) => Ok(Self::from_dates(from, to)),
            _ => Err(AppError::Validation(format!(
                "Cannot move the window {} .. {} any further",
                self.from_str(),
                self.to_str()
            ))),
        }
    }

    pub fn from_str(&self) -> String {
        self.from.format("%Y-%m-%d").to_string()
    }

    pub fn to_str(&self) -> String {
        self.to.format("%Y-%m-%d").to_string()
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    let days_from_monday = date.weekday().num_days_from_monday();
    date - Duration::days(days_from_monday as i64)
}

fn week_end(date: NaiveDate) -> NaiveDate {
    week_start(date) + Duration::days(6)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn month_end(date: NaiveDate) -> NaiveDate {
    let next_month = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    next_month.map_or(date, |d| d - Duration::days(1))
}
