use chrono::{NaiveDate, TimeZone, Utc};
use depot_types::Stamp;

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn parse_rfc3339_utc() {
    let s = Stamp::parse("2024-05-01T10:20:30Z").unwrap();
    assert_eq!(s.as_datetime(), Utc.with_ymd_and_hms(2024, 5, 1, 10, 20, 30).unwrap());
}

#[test]
fn parse_rfc3339_with_offset_normalizes_to_utc() {
    let s = Stamp::parse("2024-05-01T12:20:30+02:00").unwrap();
    assert_eq!(s, Stamp::parse("2024-05-01T10:20:30Z").unwrap());
}

#[test]
fn parse_space_separated_with_offset() {
    let s = Stamp::parse("2024-05-01 10:20:30+00:00").unwrap();
    assert_eq!(s, Stamp::parse("2024-05-01T10:20:30Z").unwrap());
}

#[test]
fn parse_naive_is_utc() {
    let s = Stamp::parse("2024-05-01 10:20:30").unwrap();
    assert_eq!(s, Stamp::parse("2024-05-01T10:20:30Z").unwrap());
    let frac = Stamp::parse("2024-05-01T10:20:30.250").unwrap();
    assert_eq!(frac.as_datetime().timestamp_subsec_millis(), 250);
}

#[test]
fn parse_bare_date_is_midnight() {
    let s = Stamp::parse("2024-05-01").unwrap();
    assert_eq!(s, Stamp::start_of_day(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()));
}

#[test]
fn parse_rejects_garbage() {
    assert!(Stamp::parse("yesterday").is_err());
    assert!(Stamp::parse("").is_err());
}

// ── Storage form ─────────────────────────────────────────────────

#[test]
fn storage_string_is_fixed_width() {
    let a = Stamp::parse("2024-05-01T10:20:30Z").unwrap().to_storage_string();
    let b = Stamp::parse("2024-05-01T10:20:30.5Z").unwrap().to_storage_string();
    assert_eq!(a, "2024-05-01T10:20:30.000000Z");
    assert_eq!(b, "2024-05-01T10:20:30.500000Z");
    assert_eq!(a.len(), b.len());
}

#[test]
fn storage_string_sorts_chronologically() {
    let stamps = [
        Stamp::from_unix_secs(100),
        Stamp::parse("2001-01-01T00:00:00.000001Z").unwrap(),
        Stamp::parse("2001-01-01T00:00:00.1Z").unwrap(),
        Stamp::parse("2024-12-31T23:59:59Z").unwrap(),
    ];
    for pair in stamps.windows(2) {
        assert!(pair[0] < pair[1]);
        assert!(pair[0].to_storage_string() < pair[1].to_storage_string());
    }
}

#[test]
fn storage_string_parses_back() {
    let s = Stamp::now();
    assert_eq!(Stamp::parse(&s.to_storage_string()).unwrap(), s);
}

#[test]
fn now_is_truncated_to_micros() {
    let s = Stamp::now();
    assert_eq!(s.as_datetime().timestamp_subsec_nanos() % 1_000, 0);
}

// ── Ordering helpers ─────────────────────────────────────────────

#[test]
fn before_and_after() {
    let a = Stamp::from_unix_secs(100);
    let b = Stamp::from_unix_secs(200);
    assert!(a.is_before(&b));
    assert!(b.is_after(&a));
    assert!(!a.is_before(&a));
}

#[test]
fn days_ago_is_in_the_past() {
    let now = Stamp::now();
    let week = Stamp::days_ago(7);
    assert!(week < now);
    let delta = now.as_datetime() - week.as_datetime();
    assert!(delta.num_days() >= 6 && delta.num_days() <= 7);
}

// ── Serde ────────────────────────────────────────────────────────

#[test]
fn serializes_as_string() {
    let s = Stamp::from_unix_secs(0);
    assert_eq!(serde_json::to_string(&s).unwrap(), r#""1970-01-01T00:00:00.000000Z""#);
}

#[test]
fn deserializes_any_accepted_form() {
    let s: Stamp = serde_json::from_str(r#""1970-01-01 00:01:40""#).unwrap();
    assert_eq!(s, Stamp::from_unix_secs(100));
    assert!(serde_json::from_str::<Stamp>(r#""nope""#).is_err());
}
