use std::collections::HashSet;
use std::str::FromStr;
use trellis_types::{ClientId, RecordId};

// ── ClientId ──────────────────────────────────────────────────────

#[test]
fn client_id_formats_with_prefix() {
    let id = ClientId::new(0);
    assert_eq!(id.as_str(), "c-0");
    let id = ClientId::new(41);
    assert_eq!(id.as_str(), "c-41");
}

#[test]
fn client_id_display_and_parse() {
    let id = ClientId::new(7);
    let s = id.to_string();
    let parsed = ClientId::parse(&s).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn client_id_from_str() {
    let parsed: ClientId = ClientId::from_str("c-12").unwrap();
    assert_eq!(parsed, ClientId::new(12));
}

#[test]
fn client_id_parse_rejects_missing_prefix() {
    assert!(ClientId::parse("12").is_err());
    assert!(ClientId::parse("x-12").is_err());
}

#[test]
fn client_id_parse_rejects_bad_suffix() {
    assert!(ClientId::parse("c-").is_err());
    assert!(ClientId::parse("c-12x").is_err());
    assert!(ClientId::parse("c-1 2").is_err());
}

#[test]
fn client_id_matches_pattern() {
    assert!(ClientId::matches("c-0"));
    assert!(ClientId::matches("c-123456"));
    assert!(!ClientId::matches("c-"));
    assert!(!ClientId::matches("server-9"));
    assert!(!ClientId::matches(""));
}

#[test]
fn client_id_hash_and_eq() {
    let id = ClientId::new(3);
    let mut set = HashSet::new();
    set.insert(id.clone());
    set.insert(id);
    assert_eq!(set.len(), 1);
}

#[test]
fn client_id_serialization_roundtrip() {
    let id = ClientId::new(9);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"c-9\"");
    let parsed: ClientId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, parsed);
}

// ── RecordId ──────────────────────────────────────────────────────

#[test]
fn record_id_wraps_any_string() {
    let id = RecordId::new("order-17");
    assert_eq!(id.as_str(), "order-17");
    assert_eq!(id.to_string(), "order-17");
}

#[test]
fn record_id_parse_rejects_empty() {
    assert!(RecordId::parse("").is_err());
    assert!(RecordId::from_str("").is_err());
}

#[test]
fn record_id_client_format_probe() {
    assert!(RecordId::new("c-4").is_client_format());
    assert!(!RecordId::new("4").is_client_format());
    assert!(!RecordId::new("uuid-like").is_client_format());
}

#[test]
fn record_id_from_client_id() {
    let cid = ClientId::new(5);
    let rid: RecordId = cid.clone().into();
    assert_eq!(rid.as_str(), "c-5");
    assert!(rid.is_client_format());
    assert_eq!(cid.to_record_id(), rid);
}

#[test]
fn record_id_from_str_conversions() {
    let a: RecordId = "abc".into();
    let b: RecordId = String::from("abc").into();
    assert_eq!(a, b);
}

#[test]
fn record_id_serialization_roundtrip() {
    let id = RecordId::new("srv-1");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"srv-1\"");
    let parsed: RecordId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, parsed);
}
