use anyhow::anyhow;
use chrono::Weekday;
use tracing::{debug, info};

use crate::datetime::CalendarDay;
use crate::events::EventStore;
use crate::grid::MonthGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Browsing,
    Entering { day: CalendarDay },
}

/// What happened when an entry form was saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Added { day: CalendarDay },
    Ignored { day: CalendarDay },
}

/// Selected day plus the entry-form state machine.
///
/// Only [`CalendarState::tap_day`] opens the entry form. Month navigation and
/// jumps move the selection without prompting.
#[derive(Debug, Clone)]
pub struct CalendarState {
    selected: CalendarDay,
    entry: EntryState,
    week_start: Weekday,
}

impl CalendarState {
    pub fn new(selected: CalendarDay, week_start: Weekday) -> Self {
        Self {
            selected,
            entry: EntryState::Browsing,
            week_start,
        }
    }

    pub fn selected(&self) -> CalendarDay {
        self.selected
    }

    pub fn entry(&self) -> EntryState {
        self.entry
    }

    pub fn is_entering(&self) -> bool {
        matches!(self.entry, EntryState::Entering { .. })
    }

    pub fn week_start(&self) -> Weekday {
        self.week_start
    }

    pub fn grid(&self) -> MonthGrid {
        MonthGrid::build(self.selected, self.week_start)
    }

    /// Explicit tap on day `day` of the visible month. Selects it and opens
    /// the entry form for it.
    #[tracing::instrument(skip(self), fields(month = %self.selected.format_month()))]
    pub fn tap_day(&mut self, day: u32) -> anyhow::Result<CalendarDay> {
        let target = self.selected.with_day(day).ok_or_else(|| {
            anyhow!(
                "{} has no day {day} (valid: 1-{})",
                self.selected.format_month(),
                self.selected.days_in_month()
            )
        })?;

        self.selected = target;
        self.entry = EntryState::Entering { day: target };
        info!(day = %target, "entry form opened");
        Ok(target)
    }

    /// Moves the selection without opening the entry form.
    pub fn select(&mut self, day: CalendarDay) {
        debug!(from = %self.selected, to = %day, "selection moved");
        self.selected = day;
    }

    pub fn navigate_months(&mut self, months: i32) -> CalendarDay {
        let target = self.selected.shift_months(months);
        self.select(target);
        target
    }

    #[tracing::instrument(skip(self, title, store))]
    pub fn save_entry(&mut self, title: &str, store: &mut EventStore) -> anyhow::Result<SaveOutcome> {
        let EntryState::Entering { day } = self.entry else {
            return Err(anyhow!("no entry form is open; tap a day first"));
        };

        self.entry = EntryState::Browsing;
        if store.append(day, title) {
            info!(day = %day, "event saved");
            Ok(SaveOutcome::Added { day })
        } else {
            debug!(day = %day, "entry form closed without a title");
            Ok(SaveOutcome::Ignored { day })
        }
    }

    pub fn dismiss_entry(&mut self) -> bool {
        let was_open = self.is_entering();
        self.entry = EntryState::Browsing;
        was_open
    }
}
