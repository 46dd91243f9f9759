use std::fs;
use std::path::PathBuf;

use vlr_client::{
    parse_health, parse_live, parse_upcoming, FetchError, HEALTH_AGGREGATOR_KEY, HEALTH_ORIGIN_KEY,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_live_score_fixture() {
    let segments = parse_live(&read_fixture("live_score.json")).expect("fixture should parse");
    assert_eq!(segments.len(), 2);

    let first = &segments[0];
    assert_eq!(first.team1, "LOUD");
    assert_eq!(first.score1, "1");
    assert_eq!(first.map_number, "2");
    assert_eq!(first.current_map, "Haven");
    assert_eq!(first.match_page, "https://www.vlr.gg/12345/loud-vs-drx");

    // malformed round figure and sentinel map number survive decoding as-is
    let second = &segments[1];
    assert_eq!(second.team1_round_ct, "N/A");
    assert_eq!(second.map_number, "Unknown");
    assert_eq!(second.current_map, "TBD");
}

#[test]
fn parses_upcoming_fixture() {
    let segments = parse_upcoming(&read_fixture("upcoming.json")).expect("fixture should parse");
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].time_until_match, "1h 23m");
    assert!(segments[0].match_event.contains("VCT"));
    assert!(!segments[1].match_event.contains("VCT"));
}

#[test]
fn parses_health_fixture() {
    let health = parse_health(&read_fixture("health.json")).expect("fixture should parse");
    assert_eq!(health[HEALTH_AGGREGATOR_KEY].status, "Healthy");
    assert_eq!(health[HEALTH_ORIGIN_KEY].status, "Degraded");
}

#[test]
fn decode_failure_keeps_the_raw_payload() {
    let raw = "<html>Service Unavailable</html>";
    match parse_live(raw) {
        Err(FetchError::Decode { raw: kept, .. }) => assert_eq!(kept, raw),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[test]
fn missing_fields_default_to_empty() {
    let raw = r#"{"data":{"segments":[{"team1":"Solo"}]}}"#;
    let segments = parse_live(raw).expect("partial segment should parse");
    assert_eq!(segments[0].team1, "Solo");
    assert_eq!(segments[0].match_page, "");
    assert_eq!(segments[0].map_number, "");
}
