use super::*;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;

#[test]
fn test_from_primitives() {
    assert_eq!(CallArgument::from(42), CallArgument::Number(Number::Int(42)));
    assert_eq!(CallArgument::from(7u16), CallArgument::Number(Number::UInt(7)));
    assert_eq!(CallArgument::from(1.5), CallArgument::Number(Number::Float(1.5)));
    assert_eq!(CallArgument::from(0.1f32), CallArgument::Number(Number::Float32(0.1)));
    assert_eq!(CallArgument::from(true), CallArgument::Boolean(true));
    assert_eq!(CallArgument::from("abc"), CallArgument::String("abc".into()));
}

#[test]
fn test_marker_text_stays_a_string_on_typed_path() {
    let arg = CallArgument::from(NULL_MARKER_TEXT);
    assert!(!arg.is_null());
    assert!(NULL_MARKER.is_null());
}

#[test]
fn test_zoned_timestamp_keeps_local_wall_clock() {
    let naive = NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(17, 5, 0)
        .unwrap();
    let zoned = Utc.from_utc_datetime(&naive);
    assert_eq!(CallArgument::from(zoned), CallArgument::Timestamp(naive));
}

#[test]
fn test_non_finite_numbers() {
    assert!(Number::Int(1).is_finite());
    assert!(Number::Float(0.25).is_finite());
    assert!(!Number::Float(f64::NAN).is_finite());
    assert!(!Number::Float(f64::INFINITY).is_finite());
    assert!(!Number::Float32(f32::NAN).is_finite());
}

#[test]
fn test_raw_from_json_shapes() {
    assert_eq!(RawArgument::from(json!(null)), RawArgument::Null);
    assert_eq!(
        RawArgument::from(json!(12)),
        RawArgument::Value(CallArgument::Number(Number::Int(12)))
    );
    assert_eq!(
        RawArgument::from(json!(u64::MAX)),
        RawArgument::Value(CallArgument::Number(Number::UInt(u64::MAX)))
    );
    assert_eq!(
        RawArgument::from(json!(2.5)),
        RawArgument::Value(CallArgument::Number(Number::Float(2.5)))
    );
    assert!(matches!(RawArgument::from(json!([1, 2])), RawArgument::Array(items) if items.len() == 2));
    assert!(matches!(RawArgument::from(json!({"a": 1})), RawArgument::Object(_)));
}

#[test]
fn test_raw_recognizes_marker_text() {
    assert_eq!(
        RawArgument::from(json!(NULL_MARKER_TEXT)),
        RawArgument::Value(CallArgument::Null)
    );
}

#[test]
fn test_raw_missing_value_is_undefined() {
    assert_eq!(RawArgument::from(None), RawArgument::Undefined);
    assert_eq!(
        RawArgument::from(Some(json!("x"))),
        RawArgument::Value(CallArgument::String("x".into()))
    );
}

#[test]
fn test_display() {
    assert_eq!(CallArgument::from("O'Brien").to_string(), "\"O'Brien\"");
    assert_eq!(NULL_MARKER.to_string(), "NULL");
    assert_eq!(RawArgument::Undefined.to_string(), "undefined");
    assert_eq!(RawArgument::from(json!({"a": 1})).to_string(), "{\"a\":1}");
}
