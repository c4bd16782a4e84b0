use std::io::{self, Read};

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use tracing::{debug, info, instrument, warn};

use crate::cli::Invocation;
use crate::config::Config;
use crate::datastore::DataStore;
use crate::datetime::{self, parse_datetime_expr, to_local_date};
use crate::duration::minutes_between;
use crate::filter::Filter;
use crate::grid;
use crate::ingest;
use crate::item::{CalendarItem, ItemKind, Priority};
use crate::render::Renderer;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "month",
        "week",
        "agenda",
        "range",
        "add",
        "list",
        "import",
        "export",
        "_commands",
        "_show",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &mut DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let tz = datetime::resolve_timezone(cfg.get("calendar.timezone").as_deref());
    let week_start = cfg.week_start();
    let command = inv.command.as_str();

    debug!(
        command,
        filter = ?inv.filter_terms,
        args = ?inv.command_args,
        timezone = %tz,
        "dispatching command"
    );

    match command {
        "month" => cmd_month(
            store,
            renderer,
            &inv.filter_terms,
            &inv.command_args,
            now,
            tz,
            week_start,
        ),
        "week" => cmd_week(
            store,
            renderer,
            &inv.filter_terms,
            &inv.command_args,
            now,
            tz,
            week_start,
        ),
        "agenda" => cmd_agenda(
            store,
            renderer,
            &inv.filter_terms,
            &inv.command_args,
            now,
            tz,
        ),
        "range" => cmd_range(&inv.command_args, now, tz, week_start),
        "add" => cmd_add(store, &inv.command_args, now, tz),
        "list" => cmd_list(
            store,
            renderer,
            &inv.filter_terms,
            &inv.command_args,
            now,
            tz,
        ),
        "import" => cmd_import(store, tz),
        "export" => cmd_export(store, &inv.filter_terms, &inv.command_args, now, tz),
        "_commands" => cmd_commands(),
        "_show" => cmd_show(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(store, renderer, filter_terms, args, now, tz))]
fn cmd_month(
    store: &mut DataStore,
    renderer: &mut Renderer,
    filter_terms: &[String],
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
    week_start: Weekday,
) -> anyhow::Result<()> {
    info!("command month");

    let focus = resolve_focus_date(args, now, tz)?;
    let items = load_filtered(store, filter_terms, now, tz)?;
    let today = to_local_date(now, tz);

    renderer.print_month(focus, week_start, &items, tz, today)
}

#[instrument(skip(store, renderer, filter_terms, args, now, tz))]
fn cmd_week(
    store: &mut DataStore,
    renderer: &mut Renderer,
    filter_terms: &[String],
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
    week_start: Weekday,
) -> anyhow::Result<()> {
    info!("command week");

    let focus = resolve_focus_date(args, now, tz)?;
    let items = load_filtered(store, filter_terms, now, tz)?;
    let today = to_local_date(now, tz);
    let days = grid::week_days(focus, week_start);

    renderer.print_week(&days, &items, tz, today)
}

#[instrument(skip(store, renderer, filter_terms, args, now, tz))]
fn cmd_agenda(
    store: &mut DataStore,
    renderer: &mut Renderer,
    filter_terms: &[String],
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
) -> anyhow::Result<()> {
    info!("command agenda");

    let focus = resolve_focus_date(args, now, tz)?;
    let items = load_filtered(store, filter_terms, now, tz)?;
    let day_items = grid::items_for_date(Some(focus), &items, tz);

    renderer.print_agenda(focus, &day_items)
}

#[instrument(skip(args, now, tz))]
fn cmd_range(
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
    week_start: Weekday,
) -> anyhow::Result<()> {
    info!("command range");

    let focus = resolve_focus_date(args, now, tz)?;
    let range = grid::visible_range(focus, week_start);

    let out = serde_json::to_string(&range)?;
    println!("{out}");
    Ok(())
}

#[instrument(skip(store, args, now, tz))]
fn cmd_add(
    store: &mut DataStore,
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
) -> anyhow::Result<()> {
    info!("command add");

    let Some(kind_raw) = args.first() else {
        return Err(anyhow!(
            "usage: docket add KIND TITLE WHEN [priority:P] [matter:M] [number:N] \
             [location:L] [end:HH:MM]"
        ));
    };
    let kind = ItemKind::parse(kind_raw)
        .ok_or_else(|| anyhow!("unknown item kind: {kind_raw} (court, deadline, meeting, filing)"))?;

    let mut words: Vec<&str> = Vec::new();
    let mut priority: Option<Priority> = None;
    let mut matter: Option<String> = None;
    let mut matter_number: Option<String> = None;
    let mut location: Option<String> = None;
    let mut end_time: Option<String> = None;

    for token in &args[1..] {
        if let Some(rest) = token.strip_prefix("priority:").or_else(|| token.strip_prefix("pri:")) {
            priority =
                Some(Priority::parse(rest).ok_or_else(|| anyhow!("unknown priority: {rest}"))?);
        } else if let Some(rest) = token.strip_prefix("matter:") {
            matter = Some(rest.to_string());
        } else if let Some(rest) = token.strip_prefix("number:") {
            matter_number = Some(rest.to_string());
        } else if let Some(rest) = token.strip_prefix("location:") {
            location = Some(rest.to_string());
        } else if let Some(rest) = token.strip_prefix("end:") {
            end_time = Some(rest.to_string());
        } else {
            words.push(token.as_str());
        }
    }

    if words.len() < 2 {
        return Err(anyhow!("add requires a title and a date/time expression"));
    }

    let when_raw = words[words.len() - 1];
    let title = words[..words.len() - 1].join(" ");
    let start = parse_datetime_expr(when_raw, now, tz)
        .with_context(|| format!("invalid date/time expression: {when_raw}"))?;

    let mut item = CalendarItem::new(
        uuid::Uuid::new_v4().to_string(),
        kind,
        title,
        start,
        tz,
    );
    if let Some(priority) = priority {
        item.priority = priority;
    }
    item.matter = matter;
    item.matter_number = matter_number;
    item.location = location;

    if let Some(end_raw) = end_time {
        match minutes_between(&item.time, &end_raw)? {
            Some(minutes) => item.duration_minutes = Some(minutes),
            None => warn!(
                start = %item.time,
                end = %end_raw,
                "end time not after start; duration left unset"
            ),
        }
    }

    let items = store.load()?;
    store.add_item(items, item.clone())?;

    println!(
        "Scheduled {} \"{}\" for {} {}.",
        kind.as_str(),
        item.title,
        datetime::format_date(item.start, tz),
        item.time
    );
    Ok(())
}

#[instrument(skip(store, renderer, filter_terms, args, now, tz))]
fn cmd_list(
    store: &mut DataStore,
    renderer: &mut Renderer,
    filter_terms: &[String],
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
) -> anyhow::Result<()> {
    info!("command list");

    let mut terms = filter_terms.to_vec();
    terms.extend(args.iter().cloned());

    let items = load_filtered(store, &terms, now, tz)?;
    if items.is_empty() {
        println!("No matching items.");
        return Ok(());
    }

    let refs: Vec<&CalendarItem> = items.iter().collect();
    renderer.print_items(&refs, tz)
}

#[instrument(skip(store, tz))]
fn cmd_import(store: &mut DataStore, tz: Tz) -> anyhow::Result<()> {
    info!("command import");

    let mut stdin = String::new();
    io::stdin()
        .read_to_string(&mut stdin)
        .context("failed reading stdin")?;

    let trimmed = stdin.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("import: empty input"));
    }

    let feed = ingest::parse_feed(trimmed)?;
    let items = ingest::build_items(feed, tz);
    let (added, updated) = store.upsert_items(items)?;

    println!("Imported {added} new item(s), updated {updated}.");
    Ok(())
}

#[instrument(skip(store, filter_terms, args, now, tz))]
fn cmd_export(
    store: &mut DataStore,
    filter_terms: &[String],
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
) -> anyhow::Result<()> {
    info!("command export");

    let mut terms = filter_terms.to_vec();
    terms.extend(args.iter().cloned());

    let items = load_filtered(store, &terms, now, tz)?;
    let out = serde_json::to_string(&items)?;
    println!("{out}");
    Ok(())
}

fn cmd_commands() -> anyhow::Result<()> {
    for name in known_command_names() {
        println!("{name}");
    }
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    let mut entries: Vec<(&String, &String)> = cfg.iter().collect();
    entries.sort_by_key(|(key, _)| key.clone());
    for (key, value) in entries {
        println!("{key}={value}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("usage: docket [FILTER...] COMMAND [ARGS...]");
    println!();
    println!("  month [DATE|YYYY-MM]   42-cell month grid with item counts");
    println!("  week [DATE]            7-day strip for the week containing DATE");
    println!("  agenda [DATE]          per-day agenda table (default today)");
    println!("  range [DATE|YYYY-MM]   visible grid range as fetch payload json");
    println!("  add KIND TITLE WHEN    schedule an item (court, deadline, meeting, filing)");
    println!("  list [FILTER...]       flat listing across days");
    println!("  import                 merge a schedule feed (json on stdin)");
    println!("  export [FILTER...]     filtered items as json");
    println!();
    println!("filters: kind:K priority:P on:DATE before:DATE after:DATE matter:TEXT WORD");
    Ok(())
}

/// Load the store and keep only items matching the given filter terms.
/// Store order (chronological) is preserved.
fn load_filtered(
    store: &mut DataStore,
    terms: &[String],
    now: DateTime<Utc>,
    tz: Tz,
) -> anyhow::Result<Vec<CalendarItem>> {
    let items = store.load()?;
    let filter = Filter::parse(terms, now, tz)?;
    if filter.is_empty() {
        return Ok(items);
    }

    Ok(items
        .into_iter()
        .filter(|item| filter.matches(item, tz))
        .collect())
}

/// First positional arg as a focus day: bare `YYYY-MM` means the first
/// of that month, otherwise any date expression; empty means today.
fn resolve_focus_date(
    args: &[String],
    now: DateTime<Utc>,
    tz: Tz,
) -> anyhow::Result<NaiveDate> {
    let Some(raw) = args.first() else {
        return Ok(to_local_date(now, tz));
    };

    if let Ok(date) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
        return Ok(date);
    }

    let parsed = parse_datetime_expr(raw, now, tz)
        .with_context(|| format!("invalid focus date: {raw}"))?;
    Ok(to_local_date(parsed, tz))
}

#[cfg(test)]
mod tests {
    use super::{expand_command_abbrev, known_command_names};

    #[test]
    fn expands_unambiguous_prefixes() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("mo", &known), Some("month"));
        assert_eq!(expand_command_abbrev("ag", &known), Some("agenda"));
        assert_eq!(expand_command_abbrev("im", &known), Some("import"));
    }

    #[test]
    fn ambiguous_or_unknown_prefixes_do_not_expand() {
        let known = known_command_names();
        // "a" is add/agenda.
        assert_eq!(expand_command_abbrev("a", &known), None);
        assert_eq!(expand_command_abbrev("zz", &known), None);
    }
}
