use std::fmt;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  TimeZone,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::{
  Deserialize,
  Serialize
};

use crate::config::Config;

const TIMEZONE_ENV_VAR: &str =
  "PLANNER_TIMEZONE";

/// A timestamp truncated to its
/// calendar day. Every lookup into the
/// event store goes through this key.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize
)]
#[serde(transparent)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
  pub fn from_ymd(
    year: i32,
    month: u32,
    day: u32
  ) -> Option<Self> {
    NaiveDate::from_ymd_opt(
      year, month, day
    )
    .map(Self)
  }

  pub fn from_datetime<Z: TimeZone>(
    dt: &DateTime<Z>
  ) -> Self {
    Self(dt.date_naive())
  }

  #[must_use]
  pub fn date(&self) -> NaiveDate {
    self.0
  }

  pub fn year(&self) -> i32 {
    self.0.year()
  }

  pub fn month(&self) -> u32 {
    self.0.month()
  }

  pub fn day(&self) -> u32 {
    self.0.day()
  }

  pub fn weekday(&self) -> Weekday {
    self.0.weekday()
  }

  /// `August 1, 2024`
  pub fn format_long(&self) -> String {
    self
      .0
      .format("%B %-d, %Y")
      .to_string()
  }

  /// `August 2024`
  pub fn format_month(
    &self
  ) -> String {
    self.0.format("%B %Y").to_string()
  }

  pub fn first_of_month(&self) -> Self {
    Self(first_day_of_month(
      self.year(),
      self.month()
    ))
  }

  pub fn days_in_month(&self) -> u32 {
    days_in_month(
      self.year(),
      self.month()
    )
  }

  /// Same month, different day number.
  /// `None` when the month is shorter.
  pub fn with_day(
    &self,
    day: u32
  ) -> Option<Self> {
    self.0.with_day(day).map(Self)
  }

  pub fn add_days(
    &self,
    days: i64
  ) -> Self {
    Self(add_days(self.0, days))
  }

  pub fn shift_months(
    &self,
    months: i32
  ) -> Self {
    Self(shift_months(self.0, months))
  }

  /// `None` past the representable
  /// date range.
  pub fn checked_add_days(
    &self,
    days: i64
  ) -> Option<Self> {
    checked_add_days(self.0, days)
      .map(Self)
  }

  pub fn checked_shift_months(
    &self,
    months: i64
  ) -> Option<Self> {
    checked_shift_months(
      self.0, months
    )
    .map(Self)
  }
}

impl From<NaiveDate> for CalendarDay {
  fn from(date: NaiveDate) -> Self {
    Self(date)
  }
}

impl fmt::Display for CalendarDay {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{}",
      self.0.format("%Y-%m-%d")
    )
  }
}

/// Collapses `instant` to the calendar
/// day it falls on in `tz`.
#[must_use]
pub fn normalize(
  instant: DateTime<Utc>,
  tz: &Tz
) -> CalendarDay {
  CalendarDay::from_datetime(
    &instant.with_timezone(tz)
  )
}

pub fn today(tz: &Tz) -> CalendarDay {
  normalize(Utc::now(), tz)
}

pub fn resolve_timezone(
  cfg: &Config
) -> anyhow::Result<Tz> {
  resolve_timezone_from(
    std::env::var(TIMEZONE_ENV_VAR)
      .ok(),
    cfg
  )
}

/// `PLANNER_TIMEZONE`, then config
/// `timezone`, then UTC.
fn resolve_timezone_from(
  env_value: Option<String>,
  cfg: &Config
) -> anyhow::Result<Tz> {
  if let Some(raw) = env_value
    && !raw.trim().is_empty()
  {
    return parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    );
  }

  if let Some(raw) = cfg.get("timezone")
  {
    return parse_timezone(
      &raw,
      "config:timezone"
    );
  }

  tracing::warn!(
    "no timezone configured; \
     normalizing days in UTC"
  );
  Ok(chrono_tz::UTC)
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> anyhow::Result<Tz> {
  let trimmed = raw.trim();
  let tz =
    trimmed.parse::<Tz>().map_err(
      |err| {
        anyhow!(
          "invalid timezone \
           {trimmed:?} from \
           {source}: {err}"
        )
      }
    )?;
  tracing::info!(
    source,
    timezone = %trimmed,
    "configured timezone"
  );
  Ok(tz)
}

#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_day_expr(
  input: &str,
  today: CalendarDay
) -> anyhow::Result<CalendarDay> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  let out_of_range = || {
    anyhow!(
      "day expression out of range: \
       {token}"
    )
  };

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return today
        .checked_add_days(1)
        .ok_or_else(out_of_range);
    }
    | "yesterday" => {
      return today
        .checked_add_days(-1)
        .ok_or_else(out_of_range);
    }
    | _ => {}
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(CalendarDay(
      next_weekday_date(
        today.date(),
        target_weekday
      )
    ));
  }

  if let Some(target_month) =
    parse_month_name(&lower)
  {
    return CalendarDay::from_ymd(
      today.year(),
      target_month,
      1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid month value: \
         {target_month}"
      )
    });
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dwm])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let negative = caps
      .name("sign")
      .is_some_and(|m| m.as_str() == "-");
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let num =
      if negative { -num } else { num };
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;

    let shifted = match unit {
      | "d" => today.checked_add_days(num),
      | "w" => num
        .checked_mul(7)
        .and_then(|days| {
          today.checked_add_days(days)
        }),
      | "m" => {
        today.checked_shift_months(num)
      }
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };
    return shifted
      .ok_or_else(out_of_range);
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(CalendarDay(date));
  }

  let month_re = Regex::new(
    r"^(?P<year>\d{4})-(?P<month>\d{1,2})$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;
  if let Some(caps) =
    month_re.captures(token)
  {
    let year: i32 = caps["year"]
      .parse()
      .context("invalid year")?;
    let month: u32 = caps["month"]
      .parse()
      .context("invalid month")?;
    return CalendarDay::from_ymd(
      year, month, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid year-month: {token}"
      )
    });
  }

  Err(anyhow!(
    "unrecognized day expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     month names (e.g. march), \
     +Nd/-Nd/+Nw/+Nm, YYYY-MM-DD, \
     YYYY-MM"
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  add_days(from, delta)
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}

/// Stays on `date` when the target
/// month is not representable.
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  checked_shift_months(
    date,
    i64::from(months)
  )
  .unwrap_or(date)
}

/// Moves by whole months, clamping the
/// day to the target month's length.
pub fn checked_shift_months(
  date: NaiveDate,
  months: i64
) -> Option<NaiveDate> {
  let index = i64::from(date.year())
    .checked_mul(12)?
    .checked_add(
      i64::from(date.month0())
    )?
    .checked_add(months)?;
  let year = i32::try_from(
    index.div_euclid(12)
  )
  .ok()?;
  let month =
    index.rem_euclid(12) as u32 + 1;

  let first = NaiveDate::from_ymd_opt(
    year, month, 1
  )?;
  let day = date
    .day()
    .min(days_in_month(year, month));
  first.with_day(day)
}

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  (28..=31)
    .rev()
    .find(|day| {
      NaiveDate::from_ymd_opt(
        year, month, *day
      )
      .is_some()
    })
    .unwrap_or(28)
}

pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  checked_add_days(date, days)
    .unwrap_or(date)
}

pub fn checked_add_days(
  date: NaiveDate,
  days: i64
) -> Option<NaiveDate> {
  date.checked_add_signed(
    Duration::try_days(days)?
  )
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::{
    CalendarDay,
    days_in_month,
    normalize,
    parse_day_expr,
    resolve_timezone_from
  };
  use crate::config::Config;

  fn day(
    y: i32,
    m: u32,
    d: u32
  ) -> CalendarDay {
    CalendarDay::from_ymd(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn same_calendar_day_normalizes_equal(
  ) {
    let tz = chrono_tz::UTC;
    let morning = Utc
      .with_ymd_and_hms(
        2024, 8, 1, 0, 0, 1
      )
      .single()
      .expect("valid morning");
    let night = Utc
      .with_ymd_and_hms(
        2024, 8, 1, 23, 59, 59
      )
      .single()
      .expect("valid night");

    assert_eq!(
      normalize(morning, &tz),
      normalize(night, &tz)
    );
    assert_eq!(
      normalize(morning, &tz),
      day(2024, 8, 1)
    );
  }

  #[test]
  fn normalizes_in_configured_timezone(
  ) {
    let tz: chrono_tz::Tz =
      "America/Los_Angeles"
        .parse()
        .expect("valid tz");
    let instant = Utc
      .with_ymd_and_hms(
        2024, 8, 2, 3, 0, 0
      )
      .single()
      .expect("valid instant");

    assert_eq!(
      normalize(instant, &tz),
      day(2024, 8, 1)
    );
  }

  #[test]
  fn month_lengths_cover_leap_years() {
    assert_eq!(days_in_month(2024, 2), 29);
    assert_eq!(days_in_month(2023, 2), 28);
    assert_eq!(days_in_month(2000, 2), 29);
    assert_eq!(days_in_month(1900, 2), 28);
    assert_eq!(days_in_month(2024, 4), 30);
    assert_eq!(
      days_in_month(2024, 12),
      31
    );
  }

  #[test]
  fn shifting_months_clamps_day() {
    assert_eq!(
      day(2024, 1, 31).shift_months(1),
      day(2024, 2, 29)
    );
    assert_eq!(
      day(2023, 1, 31).shift_months(1),
      day(2023, 2, 28)
    );
    assert_eq!(
      day(2024, 1, 15)
        .shift_months(-1),
      day(2023, 12, 15)
    );
  }

  #[test]
  fn parses_relative_and_named_days() {
    // 2024-08-01 is a Thursday
    let today = day(2024, 8, 1);

    assert_eq!(
      parse_day_expr("tomorrow", today)
        .expect("tomorrow"),
      day(2024, 8, 2)
    );
    assert_eq!(
      parse_day_expr("thursday", today)
        .expect("weekday"),
      day(2024, 8, 8)
    );
    assert_eq!(
      parse_day_expr("-3d", today)
        .expect("relative days"),
      day(2024, 7, 29)
    );
    assert_eq!(
      parse_day_expr("+2w", today)
        .expect("relative weeks"),
      day(2024, 8, 15)
    );
    assert_eq!(
      parse_day_expr("feb", today)
        .expect("month name"),
      day(2024, 2, 1)
    );
  }

  #[test]
  fn parses_absolute_days_and_months() {
    let today = day(2024, 8, 1);

    assert_eq!(
      parse_day_expr(
        "2023-02-14",
        today
      )
      .expect("iso day"),
      day(2023, 2, 14)
    );
    assert_eq!(
      parse_day_expr("2024-02", today)
        .expect("year-month"),
      day(2024, 2, 1)
    );
    assert!(
      parse_day_expr("2024-13", today)
        .is_err()
    );
    assert!(
      parse_day_expr("someday", today)
        .is_err()
    );
  }

  #[test]
  fn huge_offsets_are_errors() {
    let today = day(2024, 8, 1);

    for expr in [
      "+99999999999999d",
      "-99999999999999d",
      "+9999999999999999w",
      "+2147483647m",
      "-9223372036854775807m",
      "+99999999999999999999d"
    ] {
      assert!(
        parse_day_expr(expr, today)
          .is_err(),
        "{expr} should be rejected"
      );
    }

    assert_eq!(
      parse_day_expr("+1200m", today)
        .expect("a century ahead"),
      day(2124, 8, 1)
    );
    assert_eq!(
      parse_day_expr("-13m", today)
        .expect("back a year"),
      day(2023, 7, 1)
    );
  }

  #[test]
  fn shifting_past_the_date_range_stays_put(
  ) {
    let last = CalendarDay::from(
      chrono::NaiveDate::MAX
    );
    assert_eq!(
      last.shift_months(1),
      last
    );
    assert!(
      last
        .checked_add_days(1)
        .is_none()
    );
  }

  #[test]
  fn timezone_precedence_env_then_config_then_utc(
  ) {
    let mut cfg = Config::default();
    assert_eq!(
      resolve_timezone_from(None, &cfg)
        .expect("utc fallback"),
      chrono_tz::UTC
    );

    cfg.apply_overrides([(
      "timezone".to_string(),
      "Asia/Tokyo".to_string()
    )]);
    assert_eq!(
      resolve_timezone_from(None, &cfg)
        .expect("config zone"),
      chrono_tz::Asia::Tokyo
    );
    assert_eq!(
      resolve_timezone_from(
        Some("Europe/Berlin".to_string()),
        &cfg
      )
      .expect("env zone"),
      chrono_tz::Europe::Berlin
    );
    assert_eq!(
      resolve_timezone_from(
        Some("  ".to_string()),
        &cfg
      )
      .expect("blank env ignored"),
      chrono_tz::Asia::Tokyo
    );
  }

  #[test]
  fn invalid_timezone_names_are_rejected(
  ) {
    let mut cfg = Config::default();
    cfg.apply_overrides([(
      "timezone".to_string(),
      "Mars/Olympus_Mons".to_string()
    )]);
    let err =
      resolve_timezone_from(None, &cfg)
        .expect_err("bad config zone");
    assert!(
      err
        .to_string()
        .contains("config:timezone")
    );

    assert!(
      resolve_timezone_from(
        Some("Nowhere/Else".to_string()),
        &Config::default()
      )
      .is_err()
    );
  }

  #[test]
  fn formats_long_style() {
    assert_eq!(
      day(2024, 8, 1).format_long(),
      "August 1, 2024"
    );
    assert_eq!(
      day(2024, 8, 1).format_month(),
      "August 2024"
    );
    assert_eq!(
      day(2024, 8, 1).to_string(),
      "2024-08-01"
    );
  }
}
