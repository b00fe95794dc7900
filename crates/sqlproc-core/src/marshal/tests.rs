use super::*;
use crate::{NULL_MARKER, Number};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;

/// Undo `quote_string`: strip the quotes and drop each escaping backslash.
fn unquote(literal: &str) -> String {
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[test]
fn test_scenario_get_user() {
    let args: [CallArgument; 3] = [42.into(), true.into(), "O'Brien".into()];
    assert_eq!(marshal("GetUser", &args).unwrap(), r#"42,1,"O\'Brien""#);
}

#[test]
fn test_call_statement() {
    let args: [CallArgument; 2] = [42.into(), "x".into()];
    assert_eq!(
        call_statement("GetUser", &args).unwrap(),
        r#"CALL GetUser(42,"x")"#
    );
    assert_eq!(call_statement("NoArgs", &[]).unwrap(), "CALL NoArgs()");
}

#[test]
fn test_escapes_every_occurrence() {
    let literal = quote_string(r#"a"b"c'd'e`f`g´h´"#);
    assert_eq!(literal, r#""a\"b\"c\'d\'e\`f\`g\´h\´""#);
}

#[test]
fn test_escapes_backslash() {
    assert_eq!(quote_string(r"C:\dir\"), r#""C:\\dir\\""#);
}

#[test]
fn test_escaped_strings_round_trip() {
    let samples = [
        "",
        "plain",
        "O'Brien",
        r#"say "hi""#,
        "``nested``",
        "´´´",
        r"trailing\",
        r#"mix ' " ` ´ \ all"#,
        "unicode ✓ ü 名前",
        r#"'); DROP TABLE users; --"#,
    ];
    for sample in samples {
        let literal = quote_string(sample);
        assert!(literal.starts_with('"') && literal.ends_with('"'));
        assert_eq!(unquote(&literal), sample);
    }
}

#[test]
fn test_numbers_and_booleans() {
    let args = [
        CallArgument::from(0),
        CallArgument::from(-17i64),
        CallArgument::from(u64::MAX),
        CallArgument::from(3.25),
        CallArgument::from(true),
        CallArgument::from(false),
    ];
    assert_eq!(
        marshal("P", &args).unwrap(),
        "0,-17,18446744073709551615,3.25,1,0"
    );
}

#[test]
fn test_single_precision_float_keeps_its_decimal_form() {
    let args = [CallArgument::from(0.1f32), CallArgument::from(-2.75f32)];
    assert_eq!(marshal("P", &args).unwrap(), "0.1,-2.75");

    let err = marshal("P", &[CallArgument::from(f32::INFINITY)]).unwrap_err();
    assert!(matches!(err.kind, MarshalErrorKind::Unsupported(_)));
}

#[test]
fn test_timestamp_literal() {
    let ts = NaiveDate::from_ymd_opt(2023, 1, 5)
        .unwrap()
        .and_hms_opt(8, 30, 9)
        .unwrap();
    assert_eq!(
        marshal("P", &[CallArgument::Timestamp(ts)]).unwrap(),
        r#""2023-01-05 08:30:09""#
    );
}

#[test]
fn test_null_marker_literal() {
    assert_eq!(marshal("SetFlag", &[NULL_MARKER]).unwrap(), "null");
    assert_eq!(
        marshal("SetFlag", &[1.into(), NULL_MARKER, "a".into()]).unwrap(),
        r#"1,null,"a""#
    );
}

#[test]
fn test_non_finite_number_is_unsupported() {
    let err = marshal("P", &[CallArgument::Number(Number::Float(f64::NAN))]).unwrap_err();
    assert!(matches!(err.kind, MarshalErrorKind::Unsupported(_)));
    assert_eq!(err.position, 1);
}

#[test]
fn test_undefined_fails_at_any_position() {
    for position in 0..4 {
        let mut args: Vec<RawArgument> = vec![
            CallArgument::from(1).into(),
            CallArgument::from("a").into(),
            CallArgument::from(true).into(),
        ];
        args.insert(position, RawArgument::Undefined);

        let err = marshal_raw("Proc", &args).unwrap_err();
        assert_eq!(err.kind, MarshalErrorKind::Undefined);
        assert_eq!(err.position, position + 1);
        assert_eq!(err.procedure, "Proc");
        assert!(err.to_string().contains("undefined value"));
    }
}

#[test]
fn test_native_null_fails_but_marker_succeeds() {
    for position in 0..3 {
        let mut args: Vec<RawArgument> = vec![
            CallArgument::from(5).into(),
            CallArgument::from("b").into(),
        ];
        args.insert(position, RawArgument::Null);
        let err = marshal_raw("SetFlag", &args).unwrap_err();
        assert_eq!(err.kind, MarshalErrorKind::Null);
        assert!(err.to_string().contains("null value"));

        args[position] = NULL_MARKER.into();
        let literal = marshal_raw("SetFlag", &args).unwrap();
        assert_eq!(literal.split(',').nth(position), Some("null"));
    }
}

#[test]
fn test_marker_text_from_json_is_null() {
    let args: Vec<RawArgument> = vec![json!(crate::NULL_MARKER_TEXT).into()];
    assert_eq!(marshal_raw("SetFlag", &args).unwrap(), "null");
}

#[test]
fn test_object_array_and_opaque_rejected() {
    let err = marshal_raw("P", &[json!({"id": 1}).into()]).unwrap_err();
    assert_eq!(err.kind, MarshalErrorKind::Object);
    assert!(err.to_string().contains("object value"));

    let err = marshal_raw("P", &[json!([1, 2]).into()]).unwrap_err();
    assert_eq!(err.kind, MarshalErrorKind::Array);
    assert!(err.to_string().contains("array value"));

    let err = marshal_raw("P", &[RawArgument::Opaque("function".into())]).unwrap_err();
    assert_eq!(err.kind, MarshalErrorKind::Unsupported("function".into()));
    assert!(err.to_string().contains("unsupported value"));
}

#[test]
fn test_failure_discards_valid_prefix_and_lists_every_argument() {
    let args: Vec<RawArgument> = vec![
        CallArgument::from("first").into(),
        RawArgument::Null,
        CallArgument::from(99).into(),
    ];
    let err = marshal_raw("DoThing", &args).unwrap_err();
    let message = err.to_string();

    assert_eq!(err.position, 2);
    assert!(message.contains("procedure \"DoThing\""));
    assert_eq!(err.arguments, r#"["first", null, 99]"#);
    assert!(call_statement_raw("DoThing", &args).is_err());
}

#[test]
fn test_empty_argument_list() {
    assert_eq!(marshal("P", &[]).unwrap(), "");
    assert_eq!(marshal_raw("P", &[]).unwrap(), "");
}
