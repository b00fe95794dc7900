//! Column decoding
//!
//! Every value read from the server is offered to the connection's
//! [`TypeCaster`] first. Columns no cast rule claims are decoded here from the
//! column type the server reports.

use std::borrow::Cow;

use chrono::{NaiveDate, NaiveDateTime};
use mysql_async::{Column, Row as MySqlRow, Value as MySqlValue, consts::ColumnType};
use sqlproc_core::{FieldInfo, RawField, ResultSet, Row, TypeCaster, Value};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Upper-case type name for a column type, as the cast rules expect it.
pub fn column_type_name(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::MYSQL_TYPE_DECIMAL => "DECIMAL",
        ColumnType::MYSQL_TYPE_TINY => "TINY",
        ColumnType::MYSQL_TYPE_SHORT => "SHORT",
        ColumnType::MYSQL_TYPE_LONG => "LONG",
        ColumnType::MYSQL_TYPE_FLOAT => "FLOAT",
        ColumnType::MYSQL_TYPE_DOUBLE => "DOUBLE",
        ColumnType::MYSQL_TYPE_NULL => "NULL",
        ColumnType::MYSQL_TYPE_TIMESTAMP => "TIMESTAMP",
        ColumnType::MYSQL_TYPE_LONGLONG => "LONGLONG",
        ColumnType::MYSQL_TYPE_INT24 => "INT24",
        ColumnType::MYSQL_TYPE_DATE => "DATE",
        ColumnType::MYSQL_TYPE_TIME => "TIME",
        ColumnType::MYSQL_TYPE_DATETIME => "DATETIME",
        ColumnType::MYSQL_TYPE_YEAR => "YEAR",
        ColumnType::MYSQL_TYPE_NEWDATE => "NEWDATE",
        ColumnType::MYSQL_TYPE_VARCHAR => "VARCHAR",
        ColumnType::MYSQL_TYPE_BIT => "BIT",
        ColumnType::MYSQL_TYPE_TIMESTAMP2 => "TIMESTAMP2",
        ColumnType::MYSQL_TYPE_DATETIME2 => "DATETIME2",
        ColumnType::MYSQL_TYPE_TIME2 => "TIME2",
        ColumnType::MYSQL_TYPE_JSON => "JSON",
        ColumnType::MYSQL_TYPE_NEWDECIMAL => "NEWDECIMAL",
        ColumnType::MYSQL_TYPE_ENUM => "ENUM",
        ColumnType::MYSQL_TYPE_SET => "SET",
        ColumnType::MYSQL_TYPE_TINY_BLOB => "TINY_BLOB",
        ColumnType::MYSQL_TYPE_MEDIUM_BLOB => "MEDIUM_BLOB",
        ColumnType::MYSQL_TYPE_LONG_BLOB => "LONG_BLOB",
        ColumnType::MYSQL_TYPE_BLOB => "BLOB",
        ColumnType::MYSQL_TYPE_VAR_STRING => "VAR_STRING",
        ColumnType::MYSQL_TYPE_STRING => "STRING",
        ColumnType::MYSQL_TYPE_GEOMETRY => "GEOMETRY",
        _ => "UNKNOWN",
    }
}

/// Cast rule metadata for a result column
pub fn field_info(column: &Column) -> FieldInfo {
    FieldInfo::new(
        column.name_str(),
        column_type_name(column.column_type()),
        Some(column.column_length()),
    )
}

/// The value as the server would send it over the text protocol.
/// `None` for SQL `NULL`.
fn text_bytes(value: &MySqlValue) -> Option<Cow<'_, [u8]>> {
    let text = match value {
        MySqlValue::NULL => return None,
        MySqlValue::Bytes(bytes) => return Some(Cow::Borrowed(bytes.as_slice())),
        MySqlValue::Int(i) => i.to_string(),
        MySqlValue::UInt(u) => u.to_string(),
        MySqlValue::Float(f) => f.to_string(),
        MySqlValue::Double(d) => d.to_string(),
        MySqlValue::Date(year, month, day, hour, min, sec, micro) => {
            if *micro == 0 {
                format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, min, sec
                )
            } else {
                format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
                    year, month, day, hour, min, sec, micro
                )
            }
        }
        MySqlValue::Time(negative, days, hours, mins, secs, micros) => {
            format_time(*negative, *days, *hours, *mins, *secs, *micros)
        }
    };
    Some(Cow::Owned(text.into_bytes()))
}

fn format_time(negative: bool, days: u32, hours: u8, mins: u8, secs: u8, micros: u32) -> String {
    let total_hours = days * 24 + hours as u32;
    let sign = if negative { "-" } else { "" };
    if micros == 0 {
        format!("{}{:02}:{:02}:{:02}", sign, total_hours, mins, secs)
    } else {
        format!("{}{:02}:{:02}:{:02}.{:06}", sign, total_hours, mins, secs, micros)
    }
}

/// Decoding for columns no cast rule claims.
pub fn decode_default(value: &MySqlValue, column_type: ColumnType) -> Value {
    match value {
        MySqlValue::NULL => Value::Null,
        MySqlValue::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => decode_text(text, column_type),
            Err(_) => Value::Bytes(bytes.clone()),
        },
        MySqlValue::Int(i) => Value::Int64(*i),
        MySqlValue::UInt(u) => match i64::try_from(*u) {
            Ok(i) => Value::Int64(i),
            Err(_) => Value::UInt64(*u),
        },
        MySqlValue::Float(f) => Value::Float32(*f),
        MySqlValue::Double(d) => Value::Float64(*d),
        MySqlValue::Date(year, month, day, hour, min, sec, micro) => {
            let date = NaiveDate::from_ymd_opt(*year as i32, *month as u32, *day as u32);
            let is_date_only = *hour == 0 && *min == 0 && *sec == 0 && *micro == 0;
            match date {
                Some(date) if is_date_only => Value::Date(date),
                Some(date) => date
                    .and_hms_micro_opt(*hour as u32, *min as u32, *sec as u32, *micro)
                    .map(Value::DateTime)
                    .unwrap_or(Value::Null),
                // zero dates such as 0000-00-00
                None => text_bytes(value)
                    .map(|b| Value::String(String::from_utf8_lossy(&b).into_owned()))
                    .unwrap_or(Value::Null),
            }
        }
        MySqlValue::Time(negative, days, hours, mins, secs, micros) => {
            Value::String(format_time(*negative, *days, *hours, *mins, *secs, *micros))
        }
    }
}

fn decode_text(text: &str, column_type: ColumnType) -> Value {
    let text_value = || Value::String(text.to_string());
    match column_type {
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_YEAR => match text.parse::<i64>() {
            Ok(i) => Value::Int64(i),
            Err(_) => text.parse::<u64>().map(Value::UInt64).unwrap_or_else(|_| text_value()),
        },
        ColumnType::MYSQL_TYPE_FLOAT => text
            .parse::<f32>()
            .map(Value::Float32)
            .unwrap_or_else(|_| text_value()),
        ColumnType::MYSQL_TYPE_DOUBLE => text
            .parse::<f64>()
            .map(Value::Float64)
            .unwrap_or_else(|_| text_value()),
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
            Value::Decimal(text.to_string())
        }
        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(Value::Date)
                .unwrap_or_else(|_| text_value())
        }
        ColumnType::MYSQL_TYPE_DATETIME
        | ColumnType::MYSQL_TYPE_DATETIME2
        | ColumnType::MYSQL_TYPE_TIMESTAMP
        | ColumnType::MYSQL_TYPE_TIMESTAMP2 => NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
            .map(Value::DateTime)
            .unwrap_or_else(|_| text_value()),
        _ => text_value(),
    }
}

/// Decode one value, cast rules first.
pub fn decode_value(caster: &TypeCaster, info: &FieldInfo, column_type: ColumnType, value: &MySqlValue) -> Value {
    let bytes = text_bytes(value);
    let raw = RawField::new(info, bytes.as_deref());
    caster.cast(&raw, || decode_default(value, column_type))
}

/// Decode one result set. Every row gets the same column names.
pub fn decode_result_set(columns: &[Column], rows: Vec<MySqlRow>, caster: &TypeCaster) -> ResultSet {
    let infos: Vec<FieldInfo> = columns.iter().map(field_info).collect();
    let names: Vec<String> = infos.iter().map(|info| info.name.clone()).collect();

    let rows = rows
        .into_iter()
        .map(|row| {
            let values = infos
                .iter()
                .zip(columns)
                .enumerate()
                .map(|(idx, (info, column))| match row.as_ref(idx) {
                    Some(value) => decode_value(caster, info, column.column_type(), value),
                    None => decode_value(caster, info, column.column_type(), &MySqlValue::NULL),
                })
                .collect();
            Row::new(names.clone(), values)
        })
        .collect();

    ResultSet::new(names, rows)
}
