use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{NaiveDate, Weekday};
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::duration::format_minutes;
use crate::grid::{self, GridCell};
use crate::item::{CalendarItem, ItemKind, Priority};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    /// 6x7 month view: day numbers with per-day item counts, padding
    /// cells blank, today highlighted.
    #[tracing::instrument(skip(self, items, tz))]
    pub fn print_month(
        &mut self,
        focus: NaiveDate,
        week_start: Weekday,
        items: &[CalendarItem],
        tz: Tz,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "{}", focus.format("%B %Y"))?;

        let labels = weekday_labels(week_start);
        let header = labels
            .iter()
            .map(|label| format!("{label:<6}"))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{}", header.trim_end())?;

        let cells = grid::month_grid(focus, week_start);
        for week in cells.chunks(7) {
            let row = week
                .iter()
                .map(|cell| self.month_cell(cell, items, tz, today))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(out, "{}", row.trim_end())?;
        }

        let range = grid::visible_range(focus, week_start);
        let in_view = items
            .iter()
            .filter(|item| range.contains(item.local_date(tz)))
            .count();
        writeln!(out, "{} items in view ({} .. {})", in_view, range.start, range.end)?;

        Ok(())
    }

    fn month_cell(
        &self,
        cell: &GridCell,
        items: &[CalendarItem],
        tz: Tz,
        today: NaiveDate,
    ) -> String {
        let Some(day) = cell.day else {
            return " ".repeat(6);
        };

        let count = grid::items_for_date(cell.date, items, tz).len();
        let marker = if count > 0 {
            format!("+{count}")
        } else {
            String::new()
        };
        let text = format!("{day:>2} {marker:<3}");

        if cell.date == Some(today) {
            self.paint(&text, "7;36")
        } else if count > 0 {
            self.paint(&text, "36")
        } else {
            text
        }
    }

    /// Week strip: one heading per day with that day's items indented
    /// beneath it.
    #[tracing::instrument(skip(self, items, tz))]
    pub fn print_week(
        &mut self,
        days: &[NaiveDate; 7],
        items: &[CalendarItem],
        tz: Tz,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        for day in days {
            let mut heading = format!("{} {}", day.format("%a"), day.format("%Y-%m-%d"));
            if *day == today {
                heading = self.paint(&heading, "7;36");
            }
            writeln!(out, "{heading}")?;

            let day_items = grid::items_for_date(Some(*day), items, tz);
            if day_items.is_empty() {
                writeln!(out, "  -")?;
                continue;
            }

            for item in day_items {
                // fixed-width kind column; painting would skew the padding
                writeln!(out, "  {}  {:<9} {}", item.time, item.kind.as_str(), item.title)?;
            }
        }

        Ok(())
    }

    /// Per-day agenda table. `items` must already be filtered to the
    /// day (stable order preserved from the caller).
    #[tracing::instrument(skip(self, items))]
    pub fn print_agenda(&mut self, date: NaiveDate, items: &[&CalendarItem]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "{}", date.format("%A, %Y-%m-%d"))?;
        if items.is_empty() {
            writeln!(out, "No items scheduled.")?;
            return Ok(());
        }

        let headers = vec![
            "Time".to_string(),
            "Len".to_string(),
            "Kind".to_string(),
            "Pri".to_string(),
            "Title".to_string(),
            "Matter".to_string(),
            "Where".to_string(),
        ];

        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            rows.push(vec![
                item.time.clone(),
                item.duration_minutes.map(format_minutes).unwrap_or_default(),
                self.paint_kind(item.kind),
                self.paint_priority(item.priority),
                item.title.clone(),
                matter_label(item),
                item.location.clone().unwrap_or_default(),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    /// Flat list across days, for `list` and filtered views.
    #[tracing::instrument(skip(self, items, tz))]
    pub fn print_items(&mut self, items: &[&CalendarItem], tz: Tz) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "Date".to_string(),
            "Time".to_string(),
            "Kind".to_string(),
            "Pri".to_string(),
            "Title".to_string(),
            "Matter".to_string(),
        ];

        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            rows.push(vec![
                item.local_date(tz).to_string(),
                item.time.clone(),
                self.paint_kind(item.kind),
                self.paint_priority(item.priority),
                item.title.clone(),
                matter_label(item),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    fn paint_kind(&self, kind: ItemKind) -> String {
        match kind {
            ItemKind::Court => self.paint(kind.as_str(), "33"),
            ItemKind::Deadline => self.paint(kind.as_str(), "35"),
            ItemKind::Meeting | ItemKind::Filing => kind.as_str().to_string(),
        }
    }

    fn paint_priority(&self, priority: Priority) -> String {
        match priority {
            Priority::High => self.paint(priority.as_str(), "31"),
            Priority::Normal | Priority::Low => priority.as_str().to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn matter_label(item: &CalendarItem) -> String {
    match (&item.matter, &item.matter_number) {
        (Some(matter), Some(number)) => format!("{matter} ({number})"),
        (Some(matter), None) => matter.clone(),
        (None, Some(number)) => number.clone(),
        (None, None) => String::new(),
    }
}

fn weekday_labels(week_start: Weekday) -> [&'static str; 7] {
    let mut day = week_start;
    std::array::from_fn(|_| {
        let label = match day {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
            Weekday::Sun => "Sun",
        };
        day = day.succ();
        label
    })
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::weekday_labels;

    #[test]
    fn weekday_labels_rotate_with_week_start() {
        assert_eq!(
            weekday_labels(Weekday::Sun),
            ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]
        );
        assert_eq!(
            weekday_labels(Weekday::Mon),
            ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
        );
    }
}
