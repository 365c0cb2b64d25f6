use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, trace};

use crate::datetime::CalendarDay;

/// Event titles keyed by calendar day, in insertion order per day.
///
/// A day is present only while it has at least one title, so "no entry" and
/// "empty list" are the same observable state.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    by_day: BTreeMap<CalendarDay, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayEvents<'a> {
    pub day: CalendarDay,
    pub events: &'a [String],
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, day: CalendarDay) -> &[String] {
        self.by_day.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Appends `title` under `day`. Blank titles are dropped and `false` is
    /// returned.
    #[tracing::instrument(skip(self, title), fields(day = %day))]
    pub fn append(&mut self, day: CalendarDay, title: &str) -> bool {
        if title.trim().is_empty() {
            trace!("ignoring blank event title");
            return false;
        }

        let list = self.by_day.entry(day).or_default();
        list.push(title.to_string());
        debug!(count = list.len(), "event appended");
        true
    }

    pub fn count(&self, day: CalendarDay) -> usize {
        self.get(day).len()
    }

    pub fn has_events(&self, day: CalendarDay) -> bool {
        self.count(day) > 0
    }

    /// Days that carry events, oldest first.
    pub fn days(&self) -> impl Iterator<Item = CalendarDay> + '_ {
        self.by_day.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = DayEvents<'_>> + '_ {
        self.by_day.iter().map(|(day, events)| DayEvents {
            day: *day,
            events: events.as_slice(),
        })
    }

    pub fn len(&self) -> usize {
        self.by_day.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_day.is_empty()
    }
}
