use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  Weekday
};
use chrono_tz::Tz;
use serde::Serialize;

use crate::item::CalendarItem;

/// 6 weeks x 7 days.
pub const GRID_CELLS: usize = 42;

/// One slot in the month-view
/// matrix. Padding cells (leading or
/// trailing days of adjacent months)
/// carry neither a day number nor a
/// date, and never carry items.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq
)]
pub struct GridCell {
  pub day:  Option<u32>,
  pub date: Option<NaiveDate>
}

impl GridCell {
  fn padding() -> Self {
    Self {
      day:  None,
      date: None
    }
  }

  pub fn is_padding(&self) -> bool {
    self.day.is_none()
  }
}

/// Inclusive span of days the month
/// grid makes visible, including the
/// padding days borrowed from
/// adjacent months. This is the
/// payload handed to the backing
/// data fetch.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize
)]
pub struct DateRange {
  #[serde(rename = "startDate")]
  pub start: NaiveDate,
  #[serde(rename = "endDate")]
  pub end:   NaiveDate
}

impl DateRange {
  pub fn contains(
    &self,
    day: NaiveDate
  ) -> bool {
    day >= self.start
      && day <= self.end
  }
}

/// Build the 42-cell month grid for
/// the month containing `reference`.
/// Total over all valid dates; only
/// year and month are read.
pub fn month_grid(
  reference: NaiveDate,
  week_start: Weekday
) -> Vec<GridCell> {
  let year = reference.year();
  let month = reference.month();
  let first =
    first_day_of_month(year, month);
  let last =
    last_day_of_month(year, month);

  let leading =
    weekday_offset(first, week_start)
      as usize;

  let mut cells =
    Vec::with_capacity(GRID_CELLS);
  for _ in 0..leading {
    cells.push(GridCell::padding());
  }
  for day in 1..=last.day() {
    cells.push(GridCell {
      day:  Some(day),
      date: NaiveDate::from_ymd_opt(
        year, month, day
      )
    });
  }
  while cells.len() < GRID_CELLS {
    cells.push(GridCell::padding());
  }

  cells
}

/// The 7 dates of the week
/// containing `reference`, in order
/// from the configured week start.
pub fn week_days(
  reference: NaiveDate,
  week_start: Weekday
) -> [NaiveDate; 7] {
  let start = start_of_week(
    reference, week_start
  );
  std::array::from_fn(|offset| {
    add_days(start, offset as i64)
  })
}

/// Inclusive [start, end] covering
/// the full visible month grid:
/// first-of-month pulled back to the
/// week start, last-of-month pushed
/// forward to the week end.
pub fn visible_range(
  reference: NaiveDate,
  week_start: Weekday
) -> DateRange {
  let first = first_day_of_month(
    reference.year(),
    reference.month()
  );
  let last = last_day_of_month(
    reference.year(),
    reference.month()
  );

  let lead =
    weekday_offset(first, week_start)
      as i64;
  let tail = 6
    - weekday_offset(last, week_start)
      as i64;

  DateRange {
    start: add_days(first, -lead),
    end:   add_days(last, tail)
  }
}

/// Items landing on `date` in the
/// project timezone, input order
/// preserved. `None` (a padding
/// cell) yields an empty vec.
pub fn items_for_date<'a>(
  date: Option<NaiveDate>,
  items: &'a [CalendarItem],
  tz: Tz
) -> Vec<&'a CalendarItem> {
  let Some(day) = date else {
    return Vec::new();
  };

  items
    .iter()
    .filter(|item| {
      item.local_date(tz) == day
    })
    .collect()
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

pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let diff = weekday_offset(
    day, week_start
  ) as i64;
  add_days(day, -diff)
}

/// Offset of `day` from the start of
/// its week: 0 = first day of week.
fn weekday_offset(
  day: NaiveDate,
  week_start: Weekday
) -> u32 {
  let day_idx = day
    .weekday()
    .num_days_from_monday();
  let start_idx = week_start
    .num_days_from_monday();
  (7 + day_idx - start_idx) % 7
}

#[cfg(test)]
mod tests {
  use chrono::{
    Datelike,
    NaiveDate,
    TimeZone,
    Utc,
    Weekday
  };
  use chrono_tz::UTC;

  use super::*;
  use crate::item::{
    CalendarItem,
    ItemKind
  };

  fn date(
    year: i32,
    month: u32,
    day: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(
      year, month, day
    )
    .expect("valid date")
  }

  fn item_at(
    year: i32,
    month: u32,
    day: u32,
    hour: u32
  ) -> CalendarItem {
    let start = Utc
      .with_ymd_and_hms(
        year, month, day, hour, 15, 0
      )
      .single()
      .expect("valid start");
    CalendarItem::new(
      format!(
        "it-{year}{month}{day}{hour}"
      ),
      ItemKind::Meeting,
      "sample".to_string(),
      start,
      UTC
    )
  }

  #[test]
  fn month_grid_is_always_42_cells() {
    for reference in [
      date(2026, 2, 1),
      date(2024, 2, 29),
      date(2026, 7, 15),
      date(2026, 12, 31),
    ] {
      let cells = month_grid(
        reference,
        Weekday::Sun
      );
      assert_eq!(
        cells.len(),
        GRID_CELLS
      );
    }
  }

  #[test]
  fn month_grid_days_run_one_to_n() {
    let cells = month_grid(
      date(2024, 2, 10),
      Weekday::Sun
    );
    let days: Vec<u32> = cells
      .iter()
      .filter_map(|cell| cell.day)
      .collect();
    assert_eq!(
      days,
      (1..=29).collect::<Vec<u32>>()
    );

    for cell in &cells {
      assert_eq!(
        cell.day.is_some(),
        cell.date.is_some()
      );
    }
  }

  #[test]
  fn month_grid_leading_padding_matches_week_start(
  ) {
    // 2026-07-01 is a Wednesday.
    let sunday_cells = month_grid(
      date(2026, 7, 1),
      Weekday::Sun
    );
    let lead_sun = sunday_cells
      .iter()
      .take_while(|cell| {
        cell.is_padding()
      })
      .count();
    assert_eq!(lead_sun, 3);

    let monday_cells = month_grid(
      date(2026, 7, 1),
      Weekday::Mon
    );
    let lead_mon = monday_cells
      .iter()
      .take_while(|cell| {
        cell.is_padding()
      })
      .count();
    assert_eq!(lead_mon, 2);
  }

  #[test]
  fn month_grid_is_idempotent() {
    let a = month_grid(
      date(2026, 7, 4),
      Weekday::Sun
    );
    let b = month_grid(
      date(2026, 7, 4),
      Weekday::Sun
    );
    assert_eq!(a, b);
  }

  #[test]
  fn week_days_are_consecutive() {
    let days = week_days(
      date(2026, 2, 18),
      Weekday::Mon
    );
    assert_eq!(
      days[0],
      date(2026, 2, 16)
    );
    assert_eq!(
      days[0].weekday(),
      Weekday::Mon
    );
    for pair in days.windows(2) {
      assert_eq!(
        add_days(pair[0], 1),
        pair[1]
      );
    }
  }

  #[test]
  fn visible_range_spans_whole_grid()
  {
    // July 2026: the 1st is a
    // Wednesday, the 31st a Friday.
    let range = visible_range(
      date(2026, 7, 15),
      Weekday::Sun
    );
    assert_eq!(
      range.start,
      date(2026, 6, 28)
    );
    assert_eq!(
      range.end,
      date(2026, 8, 1)
    );
    assert_eq!(
      range.start.weekday(),
      Weekday::Sun
    );
    assert_eq!(
      range.end.weekday(),
      Weekday::Sat
    );
  }

  #[test]
  fn date_range_serializes_as_calendar_dates(
  ) {
    let range = visible_range(
      date(2026, 7, 15),
      Weekday::Sun
    );
    let json =
      serde_json::to_string(&range)
        .expect("serialize range");
    assert_eq!(
      json,
      "{\"startDate\":\"2026-06-28\",\
       \"endDate\":\"2026-08-01\"}"
    );
  }

  #[test]
  fn items_for_none_date_is_empty() {
    let items =
      vec![item_at(2026, 7, 4, 9)];
    assert!(
      items_for_date(
        None, &items, UTC
      )
      .is_empty()
    );
  }

  #[test]
  fn items_match_on_calendar_day_only(
  ) {
    let items = vec![
      item_at(2026, 7, 4, 0),
      item_at(2026, 7, 4, 23),
      item_at(2026, 7, 5, 0),
    ];

    let matched = items_for_date(
      Some(date(2026, 7, 4)),
      &items,
      UTC
    );
    assert_eq!(matched.len(), 2);
    assert_eq!(
      matched[0].id,
      items[0].id
    );
    assert_eq!(
      matched[1].id,
      items[1].id
    );
  }
}
