use chrono::{NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::UTC;
use docket_core::datastore::DataStore;
use docket_core::filter::Filter;
use docket_core::grid;
use docket_core::ingest;
use docket_core::item::{CalendarItem, ItemKind, Priority};
use tempfile::tempdir;

#[test]
fn datastore_roundtrip_and_filtering() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");

    let start = Utc
        .with_ymd_and_hms(2026, 7, 4, 9, 15, 0)
        .single()
        .expect("valid start");
    let mut item = CalendarItem::new(
        "local-1".to_string(),
        ItemKind::Court,
        "Initial hearing".to_string(),
        start,
        UTC,
    );
    item.priority = Priority::High;
    item.matter = Some("Rahman v. Coastal".to_string());

    store.add_item(vec![], item.clone()).expect("add item should succeed");

    let loaded = store.load().expect("load schedule");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].time, "09:15");

    let now = Utc
        .with_ymd_and_hms(2026, 7, 1, 0, 0, 0)
        .single()
        .expect("valid now");
    let filter = Filter::parse(
        &["kind:court".to_string(), "on:2026-07-04".to_string()],
        now,
        UTC,
    )
    .expect("parse filter");
    assert!(filter.matches(&loaded[0], UTC));

    let duplicate = store.load().expect("reload schedule");
    assert!(store.add_item(duplicate, item).is_err());
}

#[test]
fn imported_feed_lands_on_the_month_grid() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");

    let raw = r#"{
        "data": {
            "events": [
                {"id": "e1", "title": "Initial hearing", "eventType": "hearing",
                 "startDate": "2026-07-04T09:15:00Z", "caseName": "Rahman v. Coastal"}
            ],
            "tasks": [
                {"id": "t1", "title": "File brief", "startDate": "2026-07-06T08:00:00Z"},
                {"id": "t2", "title": "No start date yet"}
            ]
        }
    }"#;

    let feed = ingest::parse_feed(raw).expect("parse feed");
    let items = ingest::build_items(feed, UTC);
    assert_eq!(items.len(), 2);

    let (added, updated) = store.upsert_items(items.clone()).expect("first import");
    assert_eq!((added, updated), (2, 0));

    let (added, updated) = store.upsert_items(items).expect("second import");
    assert_eq!((added, updated), (0, 2));

    let loaded = store.load().expect("load schedule");
    let focus = NaiveDate::from_ymd_opt(2026, 7, 15).expect("valid focus");

    let cells = grid::month_grid(focus, Weekday::Sun);
    let day_cell = cells
        .iter()
        .find(|cell| cell.day == Some(4))
        .expect("cell for the 4th");
    let on_day = grid::items_for_date(day_cell.date, &loaded, UTC);
    assert_eq!(on_day.len(), 1);
    assert_eq!(on_day[0].id, "e1");

    let range = grid::visible_range(focus, Weekday::Sun);
    assert!(
        loaded
            .iter()
            .all(|item| range.contains(item.local_date(UTC)))
    );
}
