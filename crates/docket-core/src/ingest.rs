use anyhow::Context;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::datetime::format_display_time;
use crate::item::{CalendarItem, ItemKind, Priority};

/// Response shape of the backing schedule fetch: three parallel
/// collections keyed by the visible date range. Field names follow the
/// upstream API, hence camelCase.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFeed {
    #[serde(default)]
    pub events: Vec<FeedEvent>,
    #[serde(default)]
    pub tasks: Vec<FeedTask>,
    #[serde(default)]
    pub reminders: Vec<FeedReminder>,
}

#[derive(Debug, Clone, Deserialize)]
struct FeedEnvelope {
    data: ScheduleFeed,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEvent {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, alias = "subject")]
    pub title: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub case_name: Option<String>,
    #[serde(default)]
    pub case_number: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub participants: Vec<FeedParticipant>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedTask {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, alias = "subject")]
    pub title: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub case_name: Option<String>,
    #[serde(default)]
    pub case_number: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedReminder {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reminder_time: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

/// Person records arrive with overlapping optional name fields; the
/// display name is resolved once here, never at render sites.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedParticipant {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl FeedParticipant {
    pub fn display_name(&self) -> Option<String> {
        if let Some(full) = non_empty(self.full_name.as_deref()) {
            return Some(full);
        }
        if let Some(name) = non_empty(self.name.as_deref()) {
            return Some(name);
        }

        let first = non_empty(self.first_name.as_deref());
        let last = non_empty(self.last_name.as_deref());
        match (first, last) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first),
            (None, Some(last)) => Some(last),
            (None, None) => None,
        }
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[tracing::instrument(skip(raw))]
pub fn parse_feed(raw: &str) -> anyhow::Result<ScheduleFeed> {
    if let Ok(envelope) = serde_json::from_str::<FeedEnvelope>(raw) {
        return Ok(envelope.data);
    }

    serde_json::from_str::<ScheduleFeed>(raw).context("failed parsing schedule feed json")
}

/// Flatten a feed into display-ready items: records without a start
/// timestamp are dropped, kinds and priorities are normalized, and the
/// result is sorted chronologically. This order is the stable input
/// order the day matcher preserves.
#[tracing::instrument(skip(feed, tz))]
pub fn build_items(feed: ScheduleFeed, tz: Tz) -> Vec<CalendarItem> {
    let mut items = Vec::new();
    let mut dropped = 0_usize;

    for event in feed.events {
        let Some(start) = event.start_date else {
            dropped += 1;
            continue;
        };
        let kind = event
            .event_type
            .as_deref()
            .and_then(ItemKind::parse)
            .unwrap_or(ItemKind::Meeting);
        let participants: Vec<String> = event
            .participants
            .iter()
            .filter_map(FeedParticipant::display_name)
            .collect();

        items.push(CalendarItem {
            id: opaque_id(event.id.as_ref(), "evt"),
            kind,
            title: event.title.unwrap_or_else(|| "(untitled event)".to_string()),
            start,
            time: format_display_time(start, tz),
            priority: Priority::parse_lossy(event.priority.as_deref()),
            matter: event.case_name,
            matter_number: event.case_number,
            location: event.location,
            participants,
            duration_minutes: None,
        });
    }

    for task in feed.tasks {
        let Some(start) = task.start_date else {
            dropped += 1;
            continue;
        };

        items.push(CalendarItem {
            id: opaque_id(task.id.as_ref(), "tsk"),
            kind: ItemKind::Deadline,
            title: task.title.unwrap_or_else(|| "(untitled task)".to_string()),
            start,
            time: format_display_time(start, tz),
            priority: Priority::parse_lossy(task.priority.as_deref()),
            matter: task.case_name,
            matter_number: task.case_number,
            location: None,
            participants: vec![],
            duration_minutes: None,
        });
    }

    for reminder in feed.reminders {
        let Some(start) = reminder.start_date else {
            dropped += 1;
            continue;
        };
        let time = reminder
            .reminder_time
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| format_display_time(start, tz));

        items.push(CalendarItem {
            id: opaque_id(reminder.id.as_ref(), "rem"),
            kind: ItemKind::Deadline,
            title: reminder
                .title
                .unwrap_or_else(|| "(untitled reminder)".to_string()),
            start,
            time,
            priority: Priority::parse_lossy(reminder.priority.as_deref()),
            matter: None,
            matter_number: None,
            location: None,
            participants: vec![],
            duration_minutes: None,
        });
    }

    items.sort_by_key(|item| item.start);

    debug!(
        kept = items.len(),
        dropped, "built calendar items from schedule feed"
    );
    items
}

/// Feed ids are opaque and may arrive as strings or numbers; records
/// without one get a synthetic batch-local id.
fn opaque_id(raw: Option<&Value>, prefix: &str) -> String {
    match raw {
        Some(Value::String(text)) if !text.trim().is_empty() => text.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        _ => format!("{prefix}-{}", uuid::Uuid::new_v4().simple()),
    }
}

#[cfg(test)]
mod tests {
    use chrono_tz::UTC;

    use super::*;
    use crate::item::{ItemKind, Priority};

    #[test]
    fn drops_records_without_start_date() {
        let feed = parse_feed(
            r#"{
                "events": [
                    {"id": "e1", "title": "Initial hearing", "eventType": "hearing",
                     "startDate": "2026-07-04T09:15:00Z"},
                    {"id": "e2", "title": "No date yet"}
                ],
                "tasks": [
                    {"id": "t1", "title": "File brief", "startDate": "2026-07-05T08:00:00Z"},
                    {"id": "t2", "title": "Orphan task"}
                ]
            }"#,
        )
        .expect("parse feed");

        let items = build_items(feed, UTC);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.id == "e1" || item.id == "t1"));
    }

    #[test]
    fn maps_event_types_onto_kinds() {
        let feed = parse_feed(
            r#"{
                "events": [
                    {"id": "e1", "title": "Hearing", "eventType": "hearing",
                     "startDate": "2026-07-04T09:00:00Z"},
                    {"id": "e2", "title": "Mystery", "eventType": "workshop",
                     "startDate": "2026-07-04T10:00:00Z"}
                ],
                "reminders": [
                    {"id": "r1", "title": "Statute of limitations",
                     "startDate": "2026-07-06T00:00:00Z"}
                ]
            }"#,
        )
        .expect("parse feed");

        let items = build_items(feed, UTC);
        assert_eq!(items[0].kind, ItemKind::Court);
        assert_eq!(items[1].kind, ItemKind::Meeting);
        assert_eq!(items[2].kind, ItemKind::Deadline);
    }

    #[test]
    fn reminder_time_overrides_derived_display_time() {
        let feed = parse_feed(
            r#"{
                "reminders": [
                    {"id": "r1", "title": "Call client", "reminderTime": "08:45",
                     "startDate": "2026-07-06T11:30:00Z"},
                    {"id": "r2", "title": "Renewal", "startDate": "2026-07-06T11:30:00Z"}
                ]
            }"#,
        )
        .expect("parse feed");

        let items = build_items(feed, UTC);
        assert_eq!(items[0].time, "08:45");
        assert_eq!(items[1].time, "11:30");
    }

    #[test]
    fn accepts_data_envelope_and_medium_priority() {
        let feed = parse_feed(
            r#"{"data": {"events": [
                {"id": 7, "title": "Case review", "priority": "medium",
                 "startDate": "2026-07-04T09:00:00Z"}
            ]}}"#,
        )
        .expect("parse enveloped feed");

        let items = build_items(feed, UTC);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "7");
        assert_eq!(items[0].priority, Priority::Normal);
    }

    #[test]
    fn resolves_participant_display_names_once() {
        let participant = |raw: &str| -> FeedParticipant {
            serde_json::from_str(raw).expect("parse participant")
        };

        assert_eq!(
            participant(r#"{"fullName": "Amal Haddad", "firstName": "A"}"#).display_name(),
            Some("Amal Haddad".to_string())
        );
        assert_eq!(
            participant(r#"{"name": "N. Rahman"}"#).display_name(),
            Some("N. Rahman".to_string())
        );
        assert_eq!(
            participant(r#"{"firstName": "Sara", "lastName": "Iqbal"}"#).display_name(),
            Some("Sara Iqbal".to_string())
        );
        assert_eq!(participant(r#"{"fullName": "  "}"#).display_name(), None);
    }

    #[test]
    fn feed_items_sort_chronologically() {
        let feed = parse_feed(
            r#"{
                "events": [
                    {"id": "late", "title": "Afternoon", "startDate": "2026-07-04T15:00:00Z"}
                ],
                "tasks": [
                    {"id": "early", "title": "Morning", "startDate": "2026-07-04T08:00:00Z"}
                ]
            }"#,
        )
        .expect("parse feed");

        let items = build_items(feed, UTC);
        assert_eq!(items[0].id, "early");
        assert_eq!(items[1].id, "late");
    }
}
