use std::fmt;

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Work => "Focus",
            Phase::ShortBreak => "Short break",
            Phase::LongBreak => "Long break",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PomodoroSettings {
    pub work: Duration,
    pub short_break: Duration,
    pub long_break: Duration,
    /// Work sessions before a long break.
    pub cycles: u32,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            work: Duration::minutes(25),
            short_break: Duration::minutes(5),
            long_break: Duration::minutes(15),
            cycles: 4,
        }
    }
}

impl PomodoroSettings {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let minutes = |key: &str, fallback: Duration| -> anyhow::Result<Duration> {
            match cfg.get_u32(key)? {
                Some(0) => Err(anyhow!("{key} must be at least 1 minute")),
                Some(value) => Ok(Duration::minutes(i64::from(value))),
                None => Ok(fallback),
            }
        };

        let cycles = match cfg.get_u32("pomodoro.cycles")? {
            Some(0) => return Err(anyhow!("pomodoro.cycles must be at least 1")),
            Some(value) => value,
            None => defaults.cycles,
        };

        Ok(Self {
            work: minutes("pomodoro.work", defaults.work)?,
            short_break: minutes("pomodoro.short", defaults.short_break)?,
            long_break: minutes("pomodoro.long", defaults.long_break)?,
            cycles,
        })
    }

    fn duration_of(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Work => self.work,
            Phase::ShortBreak => self.short_break,
            Phase::LongBreak => self.long_break,
        }
    }
}

/// Focus/break timer driven by explicit timestamps. Nothing ticks in the
/// background; elapsed time is applied when the timer is observed.
#[derive(Debug, Clone)]
pub struct PomodoroTimer {
    settings: PomodoroSettings,
    phase: Phase,
    completed_work: u32,
    /// Remaining time as of `running_since`, or as of the pause.
    remaining: Duration,
    running_since: Option<DateTime<Utc>>,
}

impl PomodoroTimer {
    pub fn new(settings: PomodoroSettings) -> Self {
        Self {
            settings,
            phase: Phase::Work,
            completed_work: 0,
            remaining: settings.work,
            running_since: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn completed_work(&self) -> u32 {
        self.completed_work
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn settings(&self) -> &PomodoroSettings {
        &self.settings
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        match self.running_since {
            Some(since) => {
                let elapsed = (now - since).max(Duration::zero());
                (self.remaining - elapsed).max(Duration::zero())
            }
            None => self.remaining,
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_running() {
            return false;
        }
        self.running_since = Some(now);
        info!(phase = ?self.phase, "pomodoro started");
        true
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        self.observe(now);
        if !self.is_running() {
            return false;
        }
        self.remaining = self.remaining(now);
        self.running_since = None;
        info!(phase = ?self.phase, "pomodoro paused");
        true
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.settings);
        debug!("pomodoro reset");
    }

    /// Ends the current phase early. A running timer keeps running in the
    /// next phase.
    pub fn skip(&mut self, now: DateTime<Utc>) -> Phase {
        self.observe(now);
        self.advance();
        if self.is_running() {
            self.running_since = Some(now);
        }
        self.phase
    }

    /// Applies elapsed time, rolling over every phase that finished since the
    /// last observation. Returns the number of phase changes.
    #[tracing::instrument(skip(self, now))]
    pub fn observe(&mut self, now: DateTime<Utc>) -> u32 {
        let mut transitions = 0;
        while let Some(since) = self.running_since {
            let elapsed = now - since;
            if elapsed < self.remaining {
                break;
            }
            let phase_end = since + self.remaining;
            self.advance();
            self.running_since = Some(phase_end);
            transitions += 1;
        }
        if transitions > 0 {
            debug!(transitions, phase = ?self.phase, "pomodoro phases elapsed");
        }
        transitions
    }

    fn advance(&mut self) {
        self.phase = match self.phase {
            Phase::Work => {
                self.completed_work += 1;
                if self.completed_work % self.settings.cycles == 0 {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                }
            }
            Phase::ShortBreak | Phase::LongBreak => Phase::Work,
        };
        self.remaining = self.settings.duration_of(self.phase);
    }
}

/// `MM:SS`, minutes not capped at 59.
pub fn format_clock(remaining: Duration) -> String {
    let secs = remaining.num_seconds().max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{Phase, PomodoroSettings, PomodoroTimer, format_clock};
    use crate::config::Config;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 9, 0, 0)
            .single()
            .expect("valid start")
    }

    #[test]
    fn counts_down_only_while_running() {
        let mut timer = PomodoroTimer::new(PomodoroSettings::default());
        assert_eq!(timer.remaining(t0() + Duration::minutes(10)), Duration::minutes(25));

        timer.start(t0());
        assert_eq!(timer.remaining(t0() + Duration::minutes(10)), Duration::minutes(15));

        assert!(timer.pause(t0() + Duration::minutes(10)));
        assert_eq!(timer.remaining(t0() + Duration::hours(3)), Duration::minutes(15));
        assert_eq!(format_clock(timer.remaining(t0())), "15:00");
    }

    #[test]
    fn long_break_follows_configured_cycles() {
        let settings = PomodoroSettings {
            cycles: 2,
            ..PomodoroSettings::default()
        };
        let mut timer = PomodoroTimer::new(settings);
        let now = t0();

        assert_eq!(timer.skip(now), Phase::ShortBreak);
        assert_eq!(timer.skip(now), Phase::Work);
        assert_eq!(timer.skip(now), Phase::LongBreak);
        assert_eq!(timer.completed_work(), 2);
    }

    #[test]
    fn observe_rolls_over_elapsed_phases() {
        let mut timer = PomodoroTimer::new(PomodoroSettings::default());
        timer.start(t0());

        // 25 work + 5 break, then 2 minutes into the next focus session.
        let later = t0() + Duration::minutes(32);
        assert_eq!(timer.observe(later), 2);
        assert_eq!(timer.phase(), Phase::Work);
        assert_eq!(timer.remaining(later), Duration::minutes(23));
        assert!(timer.is_running());
    }

    #[test]
    fn reset_returns_to_first_focus_session() {
        let mut timer = PomodoroTimer::new(PomodoroSettings::default());
        timer.start(t0());
        timer.skip(t0());
        timer.reset();
        assert_eq!(timer.phase(), Phase::Work);
        assert!(!timer.is_running());
        assert_eq!(timer.completed_work(), 0);
    }

    #[test]
    fn settings_reject_zero_minutes() {
        let mut cfg = Config::default();
        cfg.apply_overrides([("pomodoro.short".to_string(), "0".to_string())]);
        assert!(PomodoroSettings::from_config(&cfg).is_err());

        let cfg = Config::default();
        let settings = PomodoroSettings::from_config(&cfg).expect("defaults");
        assert_eq!(settings, PomodoroSettings::default());
    }
}
