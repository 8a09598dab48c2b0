//! Call record types
//!
//! Records hold encoded text, not decoded values: decoding needs the target
//! type, which is only known when the matching call arrives.

use std::fmt;

use super::glyph;
use crate::codec;

/// A recorded argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub value: ArgumentValue,
}

/// Encoded argument text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentValue {
    /// Plain input parameter
    Input(String),
    /// `&mut` parameter: its value before the call and, once known, after it
    Output {
        before: String,
        after: Option<String>,
    },
}

impl Argument {
    pub fn input(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: ArgumentValue::Input(value.into()),
        }
    }

    pub fn output(
        name: impl Into<String>,
        before: impl Into<String>,
        after: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: ArgumentValue::Output {
                before: before.into(),
                after,
            },
        }
    }

    /// The value passed into the call
    pub fn passed(&self) -> &str {
        match &self.value {
            ArgumentValue::Input(v) => v,
            ArgumentValue::Output { before, .. } => before,
        }
    }

    pub fn is_output(&self) -> bool {
        matches!(self.value, ArgumentValue::Output { .. })
    }
}

/// An exception descriptor stored in place of a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedException {
    /// Error kind or type name, e.g. `InvalidOperation`
    pub kind: String,
    pub message: String,
}

impl RecordedException {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Capture any error as a descriptor, using its Rust type name as the kind
    pub fn from_error<E: std::error::Error + 'static>(error: &E) -> Self {
        Self::new(
            crate::value::short_type_name(std::any::type_name::<E>()),
            error.to_string(),
        )
    }
}

impl fmt::Display for RecordedException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// What a call produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedResult {
    /// Encoded return value
    Returns(String),
    /// The call raised an error
    Throws(RecordedException),
}

/// One recorded call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallRecord {
    pub method: String,
    pub arguments: Vec<Argument>,
    /// `None` for void calls
    pub result: Option<RecordedResult>,
    /// Free-text notes
    pub notes: Vec<String>,
}

impl CallRecord {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Default::default()
        }
    }

    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_returns(mut self, encoded: impl Into<String>) -> Self {
        self.result = Some(RecordedResult::Returns(encoded.into()));
        self
    }

    pub fn with_throws(mut self, exception: RecordedException) -> Self {
        self.result = Some(RecordedResult::Throws(exception));
        self
    }

    /// Encoded return value, if any
    pub fn returns(&self) -> Option<&str> {
        match &self.result {
            Some(RecordedResult::Returns(text)) => Some(text),
            _ => None,
        }
    }

    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments.iter().find(|a| a.name == name)
    }

    /// `Add(a: 2, b: 3)`, used in mismatch reports
    pub fn signature(&self) -> String {
        let args = self
            .arguments
            .iter()
            .map(|a| format!("{}: {}", a.name, a.passed()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({})", self.method, args)
    }

    /// Append this record in transcript form, without a trailing blank line
    pub fn render_into(&self, out: &mut String, indent: usize) {
        let pad = " ".repeat(indent);
        out.push_str(&format!("{} {}:\n", glyph::CALL, self.method));

        for argument in &self.arguments {
            match &argument.value {
                ArgumentValue::Input(value) => {
                    out.push_str(&format!(
                        "{}{} {}: {}\n",
                        pad,
                        glyph::INPUT,
                        argument.name,
                        value
                    ));
                }
                ArgumentValue::Output { before, after } => {
                    out.push_str(&format!(
                        "{}{} {}: {}\n",
                        pad,
                        glyph::OUTPUT_BEFORE,
                        argument.name,
                        before
                    ));
                    if let Some(after) = after {
                        out.push_str(&format!(
                            "{}{} {}: {}\n",
                            pad,
                            glyph::OUTPUT_AFTER,
                            argument.name,
                            after
                        ));
                    }
                }
            }
        }

        for note in &self.notes {
            out.push_str(&format!("{}{} {}\n", pad, glyph::NOTE, note));
        }

        match &self.result {
            Some(RecordedResult::Returns(value)) => {
                out.push_str(&format!("{}{} Returns: {}\n", pad, glyph::RESULT, value));
            }
            Some(RecordedResult::Throws(exception)) => {
                out.push_str(&format!(
                    "{}{} Throws: {}: {}\n",
                    pad,
                    glyph::RESULT,
                    exception.kind,
                    codec::quote(&exception.message)
                ));
            }
            None => {}
        }
    }
}

impl fmt::Display for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}
