use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use minidesk_storage::{keys, StorageKey};
use minidesk_table::{
    new_row_id, ColumnConfig, FieldConfig, FieldError, FieldValue, TableCommand, TableRecord,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::expenses::last_day_of_month;
use crate::reducer::{command_action, hydrate, Reducer, StoreEvent};
use crate::rows;

const TIME_FORMAT: &str = "%H:%M";

static CLOCK_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("valid regex"));

static FIELDS: Lazy<Arc<[FieldConfig]>> = Lazy::new(|| {
    Arc::from(vec![
        FieldConfig::text("title", "Title").required(),
        FieldConfig::date("date", "Date").required(),
        FieldConfig::text("time", "Time").with_regex(CLOCK_TIME.clone(), "must look like 14:30"),
        FieldConfig::text("notes", "Notes"),
    ])
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    /// `None` for all-day events.
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub notes: String,
}

impl CalendarEvent {
    pub fn fields() -> Arc<[FieldConfig]> {
        Arc::clone(&FIELDS)
    }

    pub fn columns() -> Vec<ColumnConfig<Self>> {
        vec![
            ColumnConfig::new("date", "Date", 96.0),
            ColumnConfig::new("time", "Time", 60.0),
            ColumnConfig::new("title", "Title", 200.0),
            ColumnConfig::new("notes", "Notes", 220.0),
        ]
    }

    /// Parses a clock time as typed by the user; blank means all day.
    pub fn parse_time(raw: &str) -> Result<Option<NaiveTime>, chrono::ParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        NaiveTime::parse_from_str(raw, TIME_FORMAT).map(Some)
    }
}

impl TableRecord for CalendarEvent {
    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "title" => Some(self.title.as_str().into()),
            "date" => Some(self.date.into()),
            "time" => self
                .time
                .map(|time| FieldValue::Text(time.format(TIME_FORMAT).to_string())),
            "notes" => Some(self.notes.as_str().into()),
            _ => None,
        }
    }

    fn set_field(&mut self, key: &str, value: FieldValue) -> Result<(), FieldError> {
        let mismatch = |expected| FieldError::TypeMismatch {
            key: key.to_string(),
            expected,
        };
        match (key, value) {
            ("title", FieldValue::Text(title)) => self.title = title,
            ("notes", FieldValue::Text(notes)) => self.notes = notes,
            ("date", FieldValue::Date(date)) => self.date = date,
            ("time", FieldValue::Text(raw)) => {
                self.time = Self::parse_time(&raw).map_err(|_| mismatch("a time like 14:30"))?;
            }
            ("date", _) => return Err(mismatch("a date")),
            ("title" | "notes" | "time", _) => return Err(mismatch("text")),
            _ => return Err(FieldError::UnknownField(key.to_string())),
        }
        Ok(())
    }

    fn display_name(&self) -> String {
        self.title.clone()
    }
}

/// One cell of a month grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthDay {
    pub date: NaiveDate,
    /// False for the leading and trailing days borrowed from neighbouring months.
    pub in_month: bool,
    pub event_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarState {
    #[serde(default)]
    pub events: Vec<CalendarEvent>,
    #[serde(skip)]
    loaded: bool,
}

impl CalendarState {
    /// Events on `date`; all-day events first, then by time.
    pub fn events_on(&self, date: NaiveDate) -> Vec<&CalendarEvent> {
        let mut events: Vec<_> = self.events.iter().filter(|event| event.date == date).collect();
        events.sort_by_key(|event| event.time);
        events
    }

    /// The next `limit` events on or after `from`, in chronological order.
    pub fn upcoming(&self, from: NaiveDate, limit: usize) -> Vec<&CalendarEvent> {
        let mut events: Vec<_> = self.events.iter().filter(|event| event.date >= from).collect();
        events.sort_by_key(|event| (event.date, event.time));
        events.truncate(limit);
        events
    }

    /// Monday-first grid of whole weeks covering the month. Empty for an invalid month.
    /// 以週一為首、涵蓋整個月份的日曆格；月份無效時回傳空集合。
    pub fn month_days(&self, year: i32, month: u32) -> Vec<MonthDay> {
        let Some(last_day) = last_day_of_month(year, month) else {
            return Vec::new();
        };
        let (Some(first), Some(last)) = (
            NaiveDate::from_ymd_opt(year, month, 1),
            NaiveDate::from_ymd_opt(year, month, last_day),
        ) else {
            return Vec::new();
        };
        let lead = u64::from(first.weekday().num_days_from_monday());
        let trail = u64::from(6 - last.weekday().num_days_from_monday());
        let (Some(start), Some(end)) = (
            first.checked_sub_days(Days::new(lead)),
            last.checked_add_days(Days::new(trail)),
        ) else {
            return Vec::new();
        };
        start
            .iter_days()
            .take_while(|date| *date <= end)
            .map(|date| MonthDay {
                date,
                in_month: date.month() == month,
                event_count: self.events.iter().filter(|event| event.date == date).count(),
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub enum CalendarAction {
    Add {
        title: String,
        date: NaiveDate,
        time: Option<NaiveTime>,
        notes: String,
    },
    Update(CalendarEvent),
    Remove(String),
    Hydrate(CalendarState),
}

impl CalendarAction {
    pub fn from_command(command: TableCommand<CalendarEvent>) -> Option<Self> {
        command_action(command, CalendarAction::Update, CalendarAction::Remove)
    }
}

impl Reducer for CalendarState {
    type Action = CalendarAction;

    const KEY: StorageKey = keys::CALENDAR;

    fn reduce(&self, action: CalendarAction) -> (Self, StoreEvent) {
        debug!(?action, "calendar action");
        let install = |state: &mut Self, events| state.events = events;
        match action {
            CalendarAction::Add {
                title,
                date,
                time,
                notes,
            } => {
                let event = CalendarEvent {
                    id: new_row_id(),
                    title: title.trim().to_string(),
                    date,
                    time,
                    notes,
                };
                let result = rows::insert(&self.events, event, &FIELDS).map(Some);
                rows::settle(self, result, install)
            }
            CalendarAction::Update(event) => {
                let result = rows::replace(&self.events, event, &FIELDS);
                rows::settle(self, result, install)
            }
            CalendarAction::Remove(id) => {
                rows::settle(self, Ok(rows::remove(&self.events, &id)), install)
            }
            CalendarAction::Hydrate(persisted) => hydrate(self, persisted),
        }
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    fn hydrate_action(persisted: Self) -> CalendarAction {
        CalendarAction::Hydrate(persisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn add(state: &CalendarState, title: &str, day: NaiveDate, time: &str) -> CalendarState {
        let (next, event) = state.reduce(CalendarAction::Add {
            title: title.into(),
            date: day,
            time: CalendarEvent::parse_time(time).unwrap(),
            notes: String::new(),
        });
        assert_eq!(event, StoreEvent::Changed);
        next
    }

    fn sample() -> CalendarState {
        let state = add(&CalendarState::default(), "Dentist", date(2024, 3, 12), "15:00");
        let state = add(&state, "Standup", date(2024, 3, 12), "09:30");
        let state = add(&state, "Holiday", date(2024, 3, 12), "");
        add(&state, "Trip", date(2024, 4, 2), "")
    }

    #[test]
    fn events_on_a_day_are_ordered_by_time() {
        let state = sample();
        let titles: Vec<_> = state
            .events_on(date(2024, 3, 12))
            .iter()
            .map(|event| event.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Holiday", "Standup", "Dentist"]);
    }

    #[test]
    fn upcoming_is_chronological_and_limited() {
        let state = sample();
        let titles: Vec<_> = state
            .upcoming(date(2024, 3, 13), 5)
            .iter()
            .map(|event| event.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Trip"]);
        assert_eq!(state.upcoming(date(2024, 1, 1), 2).len(), 2);
    }

    #[test]
    fn month_grid_covers_whole_weeks() {
        let state = sample();
        // March 2024 starts on a Friday and ends on a Sunday.
        let days = state.month_days(2024, 3);
        assert_eq!(days.len(), 35);
        assert_eq!(days[0].date, date(2024, 2, 26));
        assert!(!days[0].in_month);
        assert_eq!(days.last().map(|day| day.date), Some(date(2024, 3, 31)));
        let twelfth = days.iter().find(|day| day.date == date(2024, 3, 12)).unwrap();
        assert_eq!(twelfth.event_count, 3);
        assert!(state.month_days(2024, 0).is_empty());
    }

    #[test]
    fn time_field_accepts_clock_times_only() {
        let mut event = sample().events[0].clone();
        event.set_field("time", "08:15".into()).unwrap();
        assert_eq!(event.time, NaiveTime::from_hms_opt(8, 15, 0));
        assert!(event.set_field("time", "quarter past".into()).is_err());
        event.set_field("time", "".into()).unwrap();
        assert_eq!(event.time, None);
    }
}
