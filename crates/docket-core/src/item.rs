use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::datetime::compact_date_serde;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Court,
    Deadline,
    Meeting,
    Filing,
}

impl ItemKind {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "court" | "hearing" => Some(Self::Court),
            "deadline" => Some(Self::Deadline),
            "meeting" => Some(Self::Meeting),
            "filing" => Some(Self::Filing),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Court => "court",
            Self::Deadline => "deadline",
            Self::Meeting => "meeting",
            Self::Filing => "filing",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            // the activity forms upstream say "medium", the calendar says "normal"
            "normal" | "medium" => Some(Self::Normal),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn parse_lossy(token: Option<&str>) -> Self {
        token.and_then(Self::parse).unwrap_or(Self::Normal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

/// A display-ready schedule entry placed on a specific day. Items are
/// rebuilt from the backing records on every refresh, never mutated in
/// place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarItem {
    pub id: String,

    pub kind: ItemKind,

    pub title: String,

    #[serde(with = "compact_date_serde")]
    pub start: DateTime<Utc>,

    /// Pre-formatted time-of-day label shown next to the title.
    pub time: String,

    pub priority: Priority,

    #[serde(default)]
    pub matter: Option<String>,

    #[serde(default)]
    pub matter_number: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub participants: Vec<String>,

    #[serde(default)]
    pub duration_minutes: Option<i64>,
}

impl CalendarItem {
    pub fn new(id: String, kind: ItemKind, title: String, start: DateTime<Utc>, tz: Tz) -> Self {
        Self {
            id,
            kind,
            title,
            start,
            time: crate::datetime::format_display_time(start, tz),
            priority: Priority::Normal,
            matter: None,
            matter_number: None,
            location: None,
            participants: vec![],
            duration_minutes: None,
        }
    }

    /// Calendar day this item lands on, in the project timezone. All
    /// day-equality checks go through here so time-of-day never leaks
    /// into placement.
    pub fn local_date(&self, tz: Tz) -> NaiveDate {
        self.start.with_timezone(&tz).date_naive()
    }
}
