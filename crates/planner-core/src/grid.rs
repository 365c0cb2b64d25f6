use chrono::Weekday;

use crate::datetime::CalendarDay;

pub const WEEK_LEN: usize = 7;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum GridCell {
  Blank,
  Day(u32)
}

impl GridCell {
  pub fn day(self) -> Option<u32> {
    match self {
      | GridCell::Day(n) => Some(n),
      | GridCell::Blank => None
    }
  }
}

/// One visible month laid out in rows
/// of seven cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
  pub month:          CalendarDay,
  pub week_start:     Weekday,
  pub leading_blanks: usize,
  pub days_in_month:  u32,
  pub rows:           Vec<[GridCell; WEEK_LEN]>
}

impl MonthGrid {
  #[tracing::instrument(skip_all, fields(reference = %reference))]
  pub fn build(
    reference: CalendarDay,
    week_start: Weekday
  ) -> Self {
    let first = reference.first_of_month();
    let days_in_month =
      reference.days_in_month();
    let leading_blanks =
      leading_blanks(
        first.weekday(),
        week_start
      );

    let total = leading_blanks
      + days_in_month as usize;
    let row_count =
      total.div_ceil(WEEK_LEN);

    let mut rows =
      Vec::with_capacity(row_count);
    for row in 0..row_count {
      let mut cells =
        [GridCell::Blank; WEEK_LEN];
      for (column, cell) in
        cells.iter_mut().enumerate()
      {
        let slot =
          row * WEEK_LEN + column;
        if slot < leading_blanks {
          continue;
        }
        let day_number =
          (slot - leading_blanks) + 1;
        if day_number
          <= days_in_month as usize
        {
          *cell = GridCell::Day(
            day_number as u32
          );
        }
      }
      rows.push(cells);
    }

    tracing::trace!(
      leading_blanks,
      days_in_month,
      rows = rows.len(),
      "built month grid"
    );

    Self {
      month: first,
      week_start,
      leading_blanks,
      days_in_month,
      rows
    }
  }

  pub fn row_count(&self) -> usize {
    self.rows.len()
  }

  pub fn cells(
    &self
  ) -> impl Iterator<Item = GridCell> + '_
  {
    self
      .rows
      .iter()
      .flat_map(|row| row.iter().copied())
  }
}

/// Blank cells before the 1st. With a
/// Sunday start this is the 1-based
/// weekday index of the 1st minus one.
pub fn leading_blanks(
  first_weekday: Weekday,
  week_start: Weekday
) -> usize {
  let day_idx = first_weekday
    .num_days_from_monday()
    as usize;
  let start_idx = week_start
    .num_days_from_monday()
    as usize;
  (WEEK_LEN + day_idx - start_idx)
    % WEEK_LEN
}

pub fn weekday_labels(
  week_start: Weekday
) -> Vec<&'static str> {
  let mut day = week_start;
  let mut labels =
    Vec::with_capacity(WEEK_LEN);
  for _ in 0..WEEK_LEN {
    labels.push(short_weekday(day));
    day = day.succ();
  }
  labels
}

fn short_weekday(
  day: Weekday
) -> &'static str {
  match day {
    | Weekday::Mon => "Mon",
    | Weekday::Tue => "Tue",
    | Weekday::Wed => "Wed",
    | Weekday::Thu => "Thu",
    | Weekday::Fri => "Fri",
    | Weekday::Sat => "Sat",
    | Weekday::Sun => "Sun"
  }
}

#[cfg(test)]
mod tests {
  use chrono::Weekday;

  use super::{
    GridCell,
    MonthGrid,
    WEEK_LEN,
    weekday_labels
  };
  use crate::datetime::CalendarDay;

  fn day(
    y: i32,
    m: u32,
    d: u32
  ) -> CalendarDay {
    CalendarDay::from_ymd(y, m, d)
      .expect("valid date")
  }

  fn assert_well_formed(
    grid: &MonthGrid
  ) {
    let expected_rows = (grid
      .leading_blanks
      + grid.days_in_month as usize)
      .div_ceil(WEEK_LEN);
    assert_eq!(
      grid.row_count(),
      expected_rows
    );

    let cells: Vec<GridCell> =
      grid.cells().collect();
    assert_eq!(
      cells.len(),
      expected_rows * WEEK_LEN
    );

    let days: Vec<u32> = cells
      .iter()
      .filter_map(|c| c.day())
      .collect();
    let expected: Vec<u32> =
      (1..=grid.days_in_month).collect();
    assert_eq!(days, expected);

    assert!(
      cells[..grid.leading_blanks]
        .iter()
        .all(|c| *c == GridCell::Blank)
    );
    let after_last = grid
      .leading_blanks
      + grid.days_in_month as usize;
    assert!(
      cells[after_last..]
        .iter()
        .all(|c| *c == GridCell::Blank)
    );
  }

  #[test]
  fn every_month_of_several_years_is_well_formed(
  ) {
    for year in 2019..=2028 {
      for month in 1..=12 {
        for week_start in
          [Weekday::Sun, Weekday::Mon]
        {
          let grid = MonthGrid::build(
            day(year, month, 15),
            week_start
          );
          assert_well_formed(&grid);
        }
      }
    }
  }

  #[test]
  fn leading_blanks_cover_all_first_weekdays(
  ) {
    // First-of-month weekdays in 2024:
    // Sep=Sun, Jul=Mon, Oct=Tue,
    // May=Wed, Feb=Thu, Mar=Fri, Jun=Sat
    let cases = [
      (9, 0),
      (7, 1),
      (10, 2),
      (5, 3),
      (2, 4),
      (3, 5),
      (6, 6)
    ];
    for (month, blanks) in cases {
      let grid = MonthGrid::build(
        day(2024, month, 1),
        Weekday::Sun
      );
      assert_eq!(
        grid.leading_blanks, blanks,
        "month {month}"
      );
    }
  }

  #[test]
  fn leap_february_has_29_days() {
    let leap = MonthGrid::build(
      day(2024, 2, 10),
      Weekday::Sun
    );
    assert_eq!(
      leap
        .cells()
        .filter(|c| c.day().is_some())
        .count(),
      29
    );

    let common = MonthGrid::build(
      day(2023, 2, 10),
      Weekday::Sun
    );
    assert_eq!(
      common
        .cells()
        .filter(|c| c.day().is_some())
        .count(),
      28
    );
  }

  #[test]
  fn february_starting_sunday_fills_four_rows(
  ) {
    // 2015-02-01 was a Sunday
    let grid = MonthGrid::build(
      day(2015, 2, 1),
      Weekday::Sun
    );
    assert_eq!(grid.leading_blanks, 0);
    assert_eq!(grid.row_count(), 4);
  }

  #[test]
  fn long_month_late_start_needs_six_rows(
  ) {
    // 2024-03-01 is a Friday
    let grid = MonthGrid::build(
      day(2024, 3, 31),
      Weekday::Sun
    );
    assert_eq!(grid.row_count(), 6);
    assert_eq!(
      grid.rows[5][0],
      GridCell::Day(31)
    );
    assert_eq!(
      grid.rows[5][1],
      GridCell::Blank
    );
  }

  #[test]
  fn monday_start_shifts_columns() {
    // 2024-09-01 is a Sunday
    let grid = MonthGrid::build(
      day(2024, 9, 1),
      Weekday::Mon
    );
    assert_eq!(grid.leading_blanks, 6);
    assert_eq!(
      weekday_labels(Weekday::Mon)[0],
      "Mon"
    );
    assert_eq!(
      weekday_labels(Weekday::Sun),
      vec![
        "Sun", "Mon", "Tue", "Wed",
        "Thu", "Fri", "Sat"
      ]
    );
  }
}
