//! Result type normalization
//!
//! Drivers hand every undecoded column value to a [`TypeCaster`] before it
//! reaches the caller. The caster walks its [`ColumnCastRule`]s in order and
//! applies the first one whose matcher accepts the column; columns no rule
//! claims go through the driver's own decoding.
//!
//! The rule set is fixed when the caster is built and shared by every query on
//! the connection, procedure calls and raw queries alike.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::Value;

/// Driver-reported column type names the standard rules match on
pub mod column_type {
    pub const LONGLONG: &str = "LONGLONG";
    pub const BIT: &str = "BIT";
    pub const NEWDECIMAL: &str = "NEWDECIMAL";
    /// Substring shared by DATE, DATETIME and NEWDATE
    pub const DATE_FAMILY: &str = "DATE";
}

/// Column metadata reported by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    /// Upper-case type name, e.g. `LONGLONG` or `DATETIME`
    pub type_name: String,
    /// Display width, when the driver reports one
    pub length: Option<u32>,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, length: Option<u32>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            length,
        }
    }
}

/// An undecoded column value. `bytes` is `None` for SQL `NULL`.
#[derive(Debug, Clone, Copy)]
pub struct RawField<'a> {
    pub info: &'a FieldInfo,
    pub bytes: Option<&'a [u8]>,
}

impl<'a> RawField<'a> {
    pub fn new(info: &'a FieldInfo, bytes: Option<&'a [u8]>) -> Self {
        Self { info, bytes }
    }

    /// Textual form of the value
    pub fn string(&self) -> Option<Cow<'a, str>> {
        self.bytes.map(String::from_utf8_lossy)
    }

    /// Raw bytes of the value
    pub fn buffer(&self) -> Option<&'a [u8]> {
        self.bytes
    }
}

pub type MatchFn = fn(&FieldInfo) -> bool;
pub type CastFn = fn(&RawField<'_>) -> Value;

/// Maps a kind of column to the function that normalizes its values
#[derive(Clone, Copy)]
pub struct ColumnCastRule {
    name: &'static str,
    matcher: MatchFn,
    cast: CastFn,
}

impl ColumnCastRule {
    pub const fn new(name: &'static str, matcher: MatchFn, cast: CastFn) -> Self {
        Self {
            name,
            matcher,
            cast,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches(&self, info: &FieldInfo) -> bool {
        (self.matcher)(info)
    }

    pub fn apply(&self, raw: &RawField<'_>) -> Value {
        (self.cast)(raw)
    }
}

impl fmt::Debug for ColumnCastRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnCastRule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// `LONGLONG` columns of width 1 are booleans stored as integers.
pub const TINY_BOOLEAN_RULE: ColumnCastRule =
    ColumnCastRule::new("longlong_width_1_as_bool", is_tiny_boolean, cast_tiny_boolean);

/// `BIT` columns become booleans from the low bit of their first byte.
pub const BIT_RULE: ColumnCastRule = ColumnCastRule::new("bit_as_bool", is_bit, cast_bit);

/// `NEWDECIMAL` columns become floating point numbers.
pub const DECIMAL_RULE: ColumnCastRule =
    ColumnCastRule::new("newdecimal_as_number", is_decimal, cast_decimal);

/// Any `*DATE*` column becomes a UTC timestamp.
pub const DATE_RULE: ColumnCastRule = ColumnCastRule::new("date_as_utc", is_date, cast_date);

fn is_tiny_boolean(info: &FieldInfo) -> bool {
    info.type_name == column_type::LONGLONG && info.length == Some(1)
}

fn cast_tiny_boolean(raw: &RawField<'_>) -> Value {
    Value::Bool(raw.string().as_deref() == Some("1"))
}

fn is_bit(info: &FieldInfo) -> bool {
    info.type_name == column_type::BIT
}

fn cast_bit(raw: &RawField<'_>) -> Value {
    match raw.buffer() {
        Some([first, ..]) => Value::Bool(first & 1 == 1),
        _ => Value::Bool(false),
    }
}

fn is_decimal(info: &FieldInfo) -> bool {
    info.type_name == column_type::NEWDECIMAL
}

fn cast_decimal(raw: &RawField<'_>) -> Value {
    match raw.string() {
        None => Value::Null,
        Some(text) => match text.trim().parse::<f64>() {
            Ok(v) => Value::Float64(v),
            Err(_) => Value::Decimal(text.into_owned()),
        },
    }
}

fn is_date(info: &FieldInfo) -> bool {
    info.type_name.contains(column_type::DATE_FAMILY)
}

fn cast_date(raw: &RawField<'_>) -> Value {
    let Some(text) = raw.string() else {
        return Value::Null;
    };
    match parse_utc_timestamp(&text) {
        Some(ts) => Value::DateTimeUtc(ts),
        None => {
            tracing::debug!(column = %raw.info.name, value = %text, "unparseable date value left as text");
            Value::String(text.into_owned())
        }
    }
}

/// Parse the textual forms MySQL uses for dates and datetimes as UTC.
pub fn parse_utc_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// An immutable, ordered set of column cast rules.
///
/// Cloning is cheap and every clone shares the same rules.
#[derive(Debug, Clone)]
pub struct TypeCaster {
    rules: Arc<[ColumnCastRule]>,
}

impl TypeCaster {
    pub fn new(rules: Vec<ColumnCastRule>) -> Self {
        Self {
            rules: rules.into(),
        }
    }

    /// Boolean, bit, decimal and date normalization, in that order
    pub fn standard() -> Self {
        Self::new(vec![TINY_BOOLEAN_RULE, BIT_RULE, DECIMAL_RULE, DATE_RULE])
    }

    /// A caster that leaves every column to the driver
    pub fn passthrough() -> Self {
        Self::new(Vec::new())
    }

    pub fn rules(&self) -> &[ColumnCastRule] {
        &self.rules
    }

    /// The first rule that claims this column, if any
    pub fn rule_for(&self, info: &FieldInfo) -> Option<&ColumnCastRule> {
        self.rules.iter().find(|rule| rule.matches(info))
    }

    /// Normalize one value, falling back to `default` when no rule matches.
    pub fn cast<F>(&self, raw: &RawField<'_>, default: F) -> Value
    where
        F: FnOnce() -> Value,
    {
        match self.rule_for(raw.info) {
            Some(rule) => rule.apply(raw),
            None => default(),
        }
    }
}

impl Default for TypeCaster {
    fn default() -> Self {
        Self::standard()
    }
}
