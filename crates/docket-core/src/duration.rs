use anyhow::anyhow;

use crate::datetime::parse_clock_time;

/// Minutes between two time-of-day
/// strings on the same day. Returns
/// `None` when `end` is not strictly
/// after `start` (overnight spans do
/// not wrap). Malformed input is an
/// error, not a silent zero.
pub fn minutes_between(
  start: &str,
  end: &str
) -> anyhow::Result<Option<i64>> {
  let (start_hour, start_min) =
    parse_clock_time(start)
      .ok_or_else(|| {
        anyhow!(
          "invalid start time: \
           {start}"
        )
      })?;
  let (end_hour, end_min) =
    parse_clock_time(end).ok_or_else(
      || {
        anyhow!(
          "invalid end time: {end}"
        )
      }
    )?;

  let start_minutes =
    i64::from(start_hour) * 60
      + i64::from(start_min);
  let end_minutes =
    i64::from(end_hour) * 60
      + i64::from(end_min);

  if end_minutes > start_minutes {
    Ok(Some(
      end_minutes - start_minutes
    ))
  } else {
    Ok(None)
  }
}

#[must_use]
pub fn format_minutes(
  minutes: i64
) -> String {
  let hours = minutes / 60;
  let rest = minutes % 60;
  if hours == 0 {
    format!("{rest}m")
  } else if rest == 0 {
    format!("{hours}h")
  } else {
    format!("{hours}h {rest}m")
  }
}

#[cfg(test)]
mod tests {
  use super::{
    format_minutes,
    minutes_between
  };

  #[test]
  fn computes_simple_duration() {
    let minutes = minutes_between(
      "09:00", "10:30"
    )
    .expect("parse times");
    assert_eq!(minutes, Some(90));
  }

  #[test]
  fn end_not_after_start_is_unset() {
    let minutes = minutes_between(
      "14:00", "13:00"
    )
    .expect("parse times");
    assert_eq!(minutes, None);

    let equal = minutes_between(
      "14:00", "14:00"
    )
    .expect("parse times");
    assert_eq!(equal, None);
  }

  #[test]
  fn accepts_meridiem_times() {
    let minutes = minutes_between(
      "9:00am", "1:30pm"
    )
    .expect("parse times");
    assert_eq!(minutes, Some(270));
  }

  #[test]
  fn rejects_malformed_times() {
    assert!(
      minutes_between(
        "9 o'clock", "10:00"
      )
      .is_err()
    );
    assert!(
      minutes_between(
        "09:00", "25:99"
      )
      .is_err()
    );
  }

  #[test]
  fn formats_minute_totals() {
    assert_eq!(
      format_minutes(90),
      "1h 30m"
    );
    assert_eq!(
      format_minutes(45),
      "45m"
    );
    assert_eq!(
      format_minutes(120),
      "2h"
    );
  }
}
