use anyhow::anyhow;
use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use tracing::trace;

use crate::datetime::{
  parse_datetime_expr,
  to_local_date
};
use crate::item::{
  CalendarItem,
  ItemKind,
  Priority
};

#[derive(Debug, Clone)]
pub enum Pred {
  KindEq(ItemKind),
  PriorityEq(Priority),
  On(NaiveDate),
  Before(DateTime<Utc>),
  After(DateTime<Utc>),
  MatterContains(String),
  TextContains(String)
}

/// Conjunction of predicates parsed
/// from free-form CLI terms. Every
/// predicate must match.
#[derive(Debug, Clone, Default)]
pub struct Filter {
  preds: Vec<Pred>
}

impl Filter {
  #[tracing::instrument(skip(
    terms, now, tz
  ))]
  pub fn parse(
    terms: &[String],
    now: DateTime<Utc>,
    tz: Tz
  ) -> anyhow::Result<Self> {
    let mut preds =
      Vec::with_capacity(terms.len());
    for term in terms {
      let token = term.trim();
      if token.is_empty() {
        continue;
      }
      preds.push(parse_atom(
        token, now, tz
      )?);
    }

    Ok(Self {
      preds
    })
  }

  pub fn is_empty(&self) -> bool {
    self.preds.is_empty()
  }

  #[tracing::instrument(skip(
    self, item, tz
  ))]
  pub fn matches(
    &self,
    item: &CalendarItem,
    tz: Tz
  ) -> bool {
    self.preds.iter().all(|pred| {
      let ok =
        eval_pred(pred, item, tz);
      trace!(
        ?pred,
        id = %item.id,
        ok,
        "evaluated predicate"
      );
      ok
    })
  }
}

fn parse_atom(
  token: &str,
  now: DateTime<Utc>,
  tz: Tz
) -> anyhow::Result<Pred> {
  if let Some(rest) =
    token.strip_prefix("kind:")
  {
    let kind = ItemKind::parse(rest)
      .ok_or_else(|| {
        anyhow!(
          "unknown item kind: {rest}"
        )
      })?;
    return Ok(Pred::KindEq(kind));
  }

  for prefix in
    ["priority:", "pri:"]
  {
    if let Some(rest) =
      token.strip_prefix(prefix)
    {
      let priority =
        Priority::parse(rest)
          .ok_or_else(|| {
            anyhow!(
              "unknown priority: \
               {rest}"
            )
          })?;
      return Ok(Pred::PriorityEq(
        priority
      ));
    }
  }

  if let Some(rest) =
    token.strip_prefix("on:")
  {
    let parsed = parse_datetime_expr(
      rest, now, tz
    )?;
    return Ok(Pred::On(
      to_local_date(parsed, tz)
    ));
  }

  if let Some(rest) =
    token.strip_prefix("before:")
  {
    return Ok(Pred::Before(
      parse_datetime_expr(
        rest, now, tz
      )?
    ));
  }

  if let Some(rest) =
    token.strip_prefix("after:")
  {
    return Ok(Pred::After(
      parse_datetime_expr(
        rest, now, tz
      )?
    ));
  }

  if let Some(rest) =
    token.strip_prefix("matter:")
  {
    return Ok(Pred::MatterContains(
      rest.to_ascii_lowercase()
    ));
  }

  Ok(Pred::TextContains(
    token.to_ascii_lowercase()
  ))
}

fn eval_pred(
  pred: &Pred,
  item: &CalendarItem,
  tz: Tz
) -> bool {
  match pred {
    | Pred::KindEq(kind) => {
      item.kind == *kind
    }
    | Pred::PriorityEq(priority) => {
      item.priority == *priority
    }
    | Pred::On(day) => {
      item.local_date(tz) == *day
    }
    | Pred::Before(dt) => {
      item.start < *dt
    }
    | Pred::After(dt) => {
      item.start > *dt
    }
    | Pred::MatterContains(needle) => {
      let matter_hit = item
        .matter
        .as_deref()
        .map(|matter| {
          matter
            .to_ascii_lowercase()
            .contains(needle)
        })
        .unwrap_or(false);
      let number_hit = item
        .matter_number
        .as_deref()
        .map(|number| {
          number
            .to_ascii_lowercase()
            .contains(needle)
        })
        .unwrap_or(false);
      matter_hit || number_hit
    }
    | Pred::TextContains(needle) => {
      item
        .title
        .to_ascii_lowercase()
        .contains(needle)
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };
  use chrono_tz::UTC;

  use super::Filter;
  use crate::item::{
    CalendarItem,
    ItemKind,
    Priority
  };

  fn sample() -> CalendarItem {
    let start = Utc
      .with_ymd_and_hms(
        2026, 7, 4, 9, 30, 0
      )
      .single()
      .expect("valid start");
    let mut item = CalendarItem::new(
      "e1".to_string(),
      ItemKind::Court,
      "Initial hearing".to_string(),
      start,
      UTC
    );
    item.priority = Priority::High;
    item.matter = Some(
      "Rahman v. Coastal".to_string()
    );
    item
  }

  fn terms(
    raw: &[&str]
  ) -> Vec<String> {
    raw
      .iter()
      .map(|s| s.to_string())
      .collect()
  }

  #[test]
  fn matches_kind_and_text() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 7, 1, 0, 0, 0
      )
      .single()
      .expect("valid now");
    let filter = Filter::parse(
      &terms(&[
        "kind:court",
        "hearing"
      ]),
      now,
      UTC
    )
    .expect("parse filter");

    assert!(
      filter.matches(&sample(), UTC)
    );

    let miss = Filter::parse(
      &terms(&["kind:filing"]),
      now,
      UTC
    )
    .expect("parse filter");
    assert!(
      !miss.matches(&sample(), UTC)
    );
  }

  #[test]
  fn matches_on_day_ignoring_time() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 7, 1, 0, 0, 0
      )
      .single()
      .expect("valid now");
    let filter = Filter::parse(
      &terms(&["on:2026-07-04"]),
      now,
      UTC
    )
    .expect("parse filter");

    assert!(
      filter.matches(&sample(), UTC)
    );
  }

  #[test]
  fn matches_priority_and_matter() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 7, 1, 0, 0, 0
      )
      .single()
      .expect("valid now");
    let filter = Filter::parse(
      &terms(&[
        "priority:high",
        "matter:coastal"
      ]),
      now,
      UTC
    )
    .expect("parse filter");

    assert!(
      filter.matches(&sample(), UTC)
    );
  }

  #[test]
  fn rejects_unknown_kind() {
    let now = Utc
      .with_ymd_and_hms(
        2026, 7, 1, 0, 0, 0
      )
      .single()
      .expect("valid now");
    assert!(
      Filter::parse(
        &terms(&["kind:picnic"]),
        now,
        UTC
      )
      .is_err()
    );
  }
}
