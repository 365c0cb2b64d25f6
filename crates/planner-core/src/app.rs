use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info};

use crate::calendar::{CalendarState, SaveOutcome};
use crate::config::Config;
use crate::datetime::{self, CalendarDay};
use crate::events::{DayEvents, EventStore};
use crate::pomodoro::{PomodoroSettings, PomodoroTimer};
use crate::techbyte::TechBytes;
use crate::todo::{TodoItem, TodoList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Calendar,
    Todo,
    TechByte,
    Pomodoro,
}

impl Screen {
    pub const MENU_ENTRIES: [Screen; 4] = [
        Screen::Calendar,
        Screen::Todo,
        Screen::TechByte,
        Screen::Pomodoro,
    ];
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match self {
            Screen::Menu => "Menu",
            Screen::Calendar => "Calendar",
            Screen::Todo => "To-Do List",
            Screen::TechByte => "Daily TechByte",
            Screen::Pomodoro => "Pomodoro",
        };
        f.write_str(title)
    }
}

impl FromStr for Screen {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "menu" | "home" => Ok(Screen::Menu),
            "calendar" | "cal" => Ok(Screen::Calendar),
            "todo" | "todos" | "to-do" => Ok(Screen::Todo),
            "techbyte" | "fact" | "tech" => Ok(Screen::TechByte),
            "pomodoro" | "pomo" | "timer" => Ok(Screen::Pomodoro),
            other => Err(anyhow!(
                "unknown screen: {other} (expected calendar, todo, techbyte or pomodoro)"
            )),
        }
    }
}

/// The whole in-memory state tree. Created once per process and owned by the
/// front-end loop; every mutation goes through a named method.
#[derive(Debug, Clone)]
pub struct App {
    screen: Screen,
    tz: Tz,
    pub calendar: CalendarState,
    pub events: EventStore,
    pub todos: TodoList,
    pub pomodoro: PomodoroTimer,
    pub techbytes: TechBytes,
}

#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub selected: CalendarDay,
    pub events: Vec<DayEvents<'a>>,
    pub todos: &'a [TodoItem],
}

impl App {
    #[tracing::instrument(skip(cfg))]
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let tz = datetime::resolve_timezone(cfg)?;
        let today = datetime::today(&tz);
        let week_start = cfg.week_start()?;
        let pomodoro = PomodoroSettings::from_config(cfg)?;
        let techbytes = TechBytes::from_config(cfg)?;

        info!(%today, ?week_start, timezone = %tz.name(), "app state initialized");
        Ok(Self::new(tz, today, week_start, pomodoro, techbytes))
    }

    pub fn new(
        tz: Tz,
        selected: CalendarDay,
        week_start: chrono::Weekday,
        pomodoro: PomodoroSettings,
        techbytes: TechBytes,
    ) -> Self {
        Self {
            screen: Screen::Menu,
            tz,
            calendar: CalendarState::new(selected, week_start),
            events: EventStore::new(),
            todos: TodoList::new(),
            pomodoro: PomodoroTimer::new(pomodoro),
            techbytes,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn today(&self) -> CalendarDay {
        datetime::today(&self.tz)
    }

    pub fn normalize(&self, instant: DateTime<Utc>) -> CalendarDay {
        datetime::normalize(instant, &self.tz)
    }

    pub fn open(&mut self, screen: Screen) {
        if self.screen != screen {
            debug!(from = %self.screen, to = %screen, "screen change");
        }
        if screen != Screen::Calendar {
            self.calendar.dismiss_entry();
        }
        self.screen = screen;
    }

    /// Selects today in the configured zone. Never opens the entry form.
    pub fn go_today(&mut self) -> CalendarDay {
        let today = self.today();
        self.open(Screen::Calendar);
        self.calendar.select(today);
        today
    }

    pub fn back(&mut self) {
        self.open(Screen::Menu);
    }

    pub fn tap_day(&mut self, day: u32) -> anyhow::Result<CalendarDay> {
        self.open(Screen::Calendar);
        self.calendar.tap_day(day)
    }

    pub fn save_entry(&mut self, title: &str) -> anyhow::Result<SaveOutcome> {
        self.calendar.save_entry(title, &mut self.events)
    }

    pub fn dismiss_entry(&mut self) -> bool {
        self.calendar.dismiss_entry()
    }

    pub fn events_for(&self, day: CalendarDay) -> &[String] {
        self.events.get(day)
    }

    pub fn selected_events(&self) -> &[String] {
        self.events.get(self.calendar.selected())
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            selected: self.calendar.selected(),
            events: self.events.iter().collect(),
            todos: self.todos.items(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc, Weekday};

    use super::{App, Screen};
    use crate::datetime::CalendarDay;
    use crate::pomodoro::PomodoroSettings;
    use crate::techbyte::TechBytes;

    fn app_on(day: CalendarDay) -> App {
        App::new(
            chrono_tz::UTC,
            day,
            Weekday::Sun,
            PomodoroSettings::default(),
            TechBytes::default(),
        )
    }

    fn day(y: i32, m: u32, d: u32) -> CalendarDay {
        CalendarDay::from_ymd(y, m, d).expect("valid date")
    }

    #[test]
    fn starts_on_menu_and_navigates_back() {
        let mut app = app_on(day(2024, 8, 1));
        assert_eq!(app.screen(), Screen::Menu);
        app.open(Screen::Todo);
        assert_eq!(app.screen(), Screen::Todo);
        app.back();
        assert_eq!(app.screen(), Screen::Menu);
    }

    #[test]
    fn tapped_entry_lands_under_normalized_day() {
        let mut app = app_on(day(2024, 8, 1));
        app.tap_day(20).expect("tap");
        assert_eq!(app.screen(), Screen::Calendar);
        app.save_entry("Concert").expect("save");

        let evening = Utc
            .with_ymd_and_hms(2024, 8, 20, 21, 30, 0)
            .single()
            .expect("valid evening");
        let key = app.normalize(evening);
        assert_eq!(app.events_for(key), ["Concert".to_string()]);
        assert_eq!(app.selected_events(), ["Concert".to_string()]);
    }

    #[test]
    fn leaving_calendar_closes_entry_form() {
        let mut app = app_on(day(2024, 8, 1));
        app.tap_day(2).expect("tap");
        app.open(Screen::Pomodoro);
        assert!(!app.calendar.is_entering());
    }

    #[test]
    fn go_today_selects_without_prompting() {
        let mut app = app_on(day(1999, 12, 31));
        let today = app.go_today();
        assert_eq!(app.calendar.selected(), today);
        assert_eq!(app.screen(), Screen::Calendar);
        assert!(!app.calendar.is_entering());
    }

    #[test]
    fn parses_screen_names() {
        assert_eq!("cal".parse::<Screen>().expect("screen"), Screen::Calendar);
        assert_eq!("Pomodoro".parse::<Screen>().expect("screen"), Screen::Pomodoro);
        assert!("settings".parse::<Screen>().is_err());
    }
}
