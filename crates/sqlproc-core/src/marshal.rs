//! Argument marshalling
//!
//! Turns a procedure's argument list into the comma-separated literal list that
//! goes between the parentheses of `CALL name(...)`. Marshalling is pure and
//! all-or-nothing: the first argument without a SQL literal fails the whole
//! call and no partial literal list is ever returned.

use std::fmt;
use thiserror::Error;

use crate::{CallArgument, RawArgument};

/// Format used for timestamp literals
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Characters that are prefixed with a backslash inside string literals
const ESCAPED_CHARS: [char; 5] = ['\\', '"', '\'', '`', '´'];

/// Why a single argument could not be marshalled
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarshalErrorKind {
    #[error("an undefined value")]
    Undefined,

    #[error("a null value")]
    Null,

    #[error("an object value")]
    Object,

    #[error("an array value")]
    Array,

    #[error("an unsupported value ({0})")]
    Unsupported(String),
}

/// A rejected argument list.
///
/// `position` is 1-based and counts only the procedure's arguments, not the
/// procedure name.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "You tried to send {kind} to procedure \"{procedure}\" (argument {position})\nParameters: {arguments}"
)]
pub struct MarshalError {
    pub procedure: String,
    pub position: usize,
    pub kind: MarshalErrorKind,
    /// The whole argument list, rendered for the diagnostic
    pub arguments: String,
}

/// Something that either has a SQL literal or a reason it has none.
trait Literal: fmt::Display {
    fn to_literal(&self) -> std::result::Result<String, MarshalErrorKind>;
}

impl Literal for CallArgument {
    fn to_literal(&self) -> std::result::Result<String, MarshalErrorKind> {
        match self {
            CallArgument::String(s) => Ok(quote_string(s)),
            CallArgument::Number(n) if !n.is_finite() => {
                Err(MarshalErrorKind::Unsupported(format!("non-finite number {}", n)))
            }
            CallArgument::Number(n) => Ok(n.to_string()),
            CallArgument::Boolean(b) => Ok(if *b { "1" } else { "0" }.to_string()),
            CallArgument::Timestamp(ts) => Ok(format!("\"{}\"", ts.format(TIMESTAMP_FORMAT))),
            CallArgument::Null => Ok("null".to_string()),
        }
    }
}

impl Literal for RawArgument {
    fn to_literal(&self) -> std::result::Result<String, MarshalErrorKind> {
        match self {
            RawArgument::Value(v) => v.to_literal(),
            RawArgument::Undefined => Err(MarshalErrorKind::Undefined),
            RawArgument::Null => Err(MarshalErrorKind::Null),
            RawArgument::Object(_) => Err(MarshalErrorKind::Object),
            RawArgument::Array(_) => Err(MarshalErrorKind::Array),
            RawArgument::Opaque(description) => {
                Err(MarshalErrorKind::Unsupported(description.clone()))
            }
        }
    }
}

/// Escape a string and wrap it in double quotes.
///
/// Every backslash, double quote, single quote, backtick and acute accent is
/// prefixed with a backslash, so the literal cannot be closed early.
pub fn quote_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if ESCAPED_CHARS.contains(&c) {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Marshal typed arguments into a literal list.
pub fn marshal(procedure: &str, args: &[CallArgument]) -> std::result::Result<String, MarshalError> {
    marshal_list(procedure, args)
}

/// Marshal arguments from a dynamic source into a literal list.
pub fn marshal_raw(procedure: &str, args: &[RawArgument]) -> std::result::Result<String, MarshalError> {
    marshal_list(procedure, args)
}

/// Build the full `CALL` statement for a procedure.
pub fn call_statement(procedure: &str, args: &[CallArgument]) -> std::result::Result<String, MarshalError> {
    let literals = marshal(procedure, args)?;
    Ok(format!("CALL {}({})", procedure, literals))
}

/// Build the full `CALL` statement from dynamic arguments.
pub fn call_statement_raw(procedure: &str, args: &[RawArgument]) -> std::result::Result<String, MarshalError> {
    let literals = marshal_raw(procedure, args)?;
    Ok(format!("CALL {}({})", procedure, literals))
}

fn marshal_list<A: Literal>(procedure: &str, args: &[A]) -> std::result::Result<String, MarshalError> {
    let mut literals = Vec::with_capacity(args.len());

    for (idx, arg) in args.iter().enumerate() {
        match arg.to_literal() {
            Ok(literal) => literals.push(literal),
            Err(kind) => {
                tracing::debug!(procedure = %procedure, position = idx + 1, %kind, "rejecting procedure argument");
                return Err(MarshalError {
                    procedure: procedure.to_string(),
                    position: idx + 1,
                    kind,
                    arguments: render_arguments(args),
                });
            }
        }
    }

    Ok(literals.join(","))
}

fn render_arguments<A: fmt::Display>(args: &[A]) -> String {
    let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    format!("[{}]", rendered.join(", "))
}

#[cfg(test)]
mod tests;
