//! Transcript text format
//!
//! A transcript is the human-editable record of a call sequence:
//!
//! ```text
//! 📋 <Test Inputs>
//!   🔸 userName: "alice"
//!
//! 🔧 Reset:
//!
//! 🔧 Add:
//!   🔸 a: 5
//!   🔸 b: 3
//!   🔹 Returns: 8
//! ```
//!
//! Every line inside a record starts with a fixed glyph; blank lines
//! separate records. Values use the [`crate::codec`] grammar.

mod record;

pub use record::{Argument, ArgumentValue, CallRecord, RecordedException, RecordedResult};

use crate::codec;
use crate::error::{MimicError, Result};
use crate::inputs::TestInputs;

/// Leading glyphs of transcript lines
pub mod glyph {
    /// Call header (`🔧 Add:`)
    pub const CALL: &str = "🔧";
    /// Input parameter
    pub const INPUT: &str = "🔸";
    /// Output parameter value before the call
    pub const OUTPUT_BEFORE: &str = "🔶";
    /// Output parameter value after the call
    pub const OUTPUT_AFTER: &str = "🔷";
    /// `Returns:` or `Throws:` line
    pub const RESULT: &str = "🔹";
    /// Free-text note
    pub const NOTE: &str = "💬";
    /// Test input preamble header
    pub const TEST_INPUTS: &str = "📋";
}

/// Marker following the preamble glyph
pub const TEST_INPUTS_MARKER: &str = "<Test Inputs>";

/// Default indentation of record body lines
pub const DEFAULT_INDENT: usize = 2;

/// A parsed transcript
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    pub inputs: TestInputs,
    pub records: Vec<CallRecord>,
}

enum Section {
    None,
    Inputs,
    Record(CallRecord),
}

impl Transcript {
    pub fn new(records: Vec<CallRecord>) -> Self {
        Self {
            inputs: TestInputs::default(),
            records,
        }
    }

    /// Parse transcript text
    pub fn parse(text: &str) -> Result<Self> {
        let mut transcript = Transcript::default();
        let mut section = Section::None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();

            if line.is_empty() {
                transcript.close(&mut section);
                continue;
            }

            if let Some(rest) = line.strip_prefix(glyph::TEST_INPUTS) {
                if rest.trim() != TEST_INPUTS_MARKER {
                    return Err(line_error(line_no, line, "expected '<Test Inputs>'"));
                }
                if !matches!(section, Section::None) || !transcript.records.is_empty() {
                    return Err(line_error(
                        line_no,
                        line,
                        "test inputs must come before the first call",
                    ));
                }
                section = Section::Inputs;
                continue;
            }

            if let Some(rest) = line.strip_prefix(glyph::CALL) {
                let Some(method) = rest.trim().strip_suffix(':') else {
                    return Err(line_error(line_no, line, "call header must end with ':'"));
                };
                let method = method.trim();
                if method.is_empty() {
                    return Err(line_error(line_no, line, "call header has no method name"));
                }
                transcript.close(&mut section);
                section = Section::Record(CallRecord::new(method));
                continue;
            }

            if let Some(rest) = line.strip_prefix(glyph::INPUT) {
                let (name, value) = name_value(line_no, line, rest)?;
                match &mut section {
                    Section::Inputs => transcript.inputs.push(name, value),
                    Section::Record(record) => record.arguments.push(Argument::input(name, value)),
                    Section::None => {
                        return Err(line_error(line_no, line, "parameter before any call header"));
                    }
                }
                continue;
            }

            let Section::Record(record) = &mut section else {
                return Err(line_error(line_no, line, "line outside of a call record"));
            };

            if let Some(rest) = line.strip_prefix(glyph::OUTPUT_BEFORE) {
                let (name, value) = name_value(line_no, line, rest)?;
                record.arguments.push(Argument::output(name, value, None));
            } else if let Some(rest) = line.strip_prefix(glyph::OUTPUT_AFTER) {
                let (name, value) = name_value(line_no, line, rest)?;
                let paired = match record.arguments.last_mut() {
                    Some(last) if last.name == name => match &mut last.value {
                        ArgumentValue::Output { after, .. } if after.is_none() => {
                            *after = Some(value.to_string());
                            true
                        }
                        _ => false,
                    },
                    _ => false,
                };
                if !paired {
                    return Err(line_error(
                        line_no,
                        line,
                        "output value without a matching before value",
                    ));
                }
            } else if let Some(rest) = line.strip_prefix(glyph::RESULT) {
                if record.result.is_some() {
                    return Err(line_error(line_no, line, "call already has a result"));
                }
                record.result = Some(parse_result(line_no, line, rest.trim())?);
            } else if let Some(rest) = line.strip_prefix(glyph::NOTE) {
                record.notes.push(rest.trim().to_string());
            } else {
                return Err(line_error(line_no, line, "unrecognised line"));
            }
        }

        transcript.close(&mut section);
        Ok(transcript)
    }

    /// Render in canonical form
    pub fn render(&self, indent: usize) -> String {
        let inputs = (!self.inputs.is_empty()).then_some(&self.inputs);
        render_records(inputs, &self.records, indent)
    }

    fn close(&mut self, section: &mut Section) {
        if let Section::Record(record) = std::mem::replace(section, Section::None) {
            self.records.push(record);
        }
    }
}

/// Render an optional preamble followed by records, blocks separated by a
/// blank line
pub fn render_records(inputs: Option<&TestInputs>, records: &[CallRecord], indent: usize) -> String {
    let mut blocks = Vec::with_capacity(records.len() + 1);
    if let Some(inputs) = inputs {
        blocks.push(inputs.render(indent));
    }
    for record in records {
        let mut block = String::new();
        record.render_into(&mut block, indent);
        blocks.push(block);
    }
    blocks.join("\n")
}

fn line_error(line_no: usize, line: &str, reason: &str) -> MimicError {
    MimicError::malformed(line, format!("line {}: {}", line_no, reason))
}

fn name_value<'a>(line_no: usize, line: &str, rest: &'a str) -> Result<(&'a str, &'a str)> {
    let Some((name, value)) = rest.split_once(':') else {
        return Err(line_error(line_no, line, "expected 'name: value'"));
    };
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() || value.is_empty() {
        return Err(line_error(line_no, line, "expected 'name: value'"));
    }
    Ok((name, value))
}

fn parse_result(line_no: usize, line: &str, rest: &str) -> Result<RecordedResult> {
    if let Some(value) = rest.strip_prefix("Returns:") {
        let value = value.trim();
        if value.is_empty() {
            return Err(line_error(line_no, line, "Returns has no value"));
        }
        return Ok(RecordedResult::Returns(value.to_string()));
    }

    if let Some(body) = rest.strip_prefix("Throws:") {
        let body = body.trim();
        let (kind, message) = match body.split_once(':') {
            Some((kind, message)) => {
                let message = codec::unquote(message.trim()).map_err(|_| {
                    line_error(line_no, line, "Throws message must be a quoted string")
                })?;
                (kind.trim(), message)
            }
            None => (body, String::new()),
        };
        if kind.is_empty() {
            return Err(line_error(line_no, line, "Throws has no error kind"));
        }
        return Ok(RecordedResult::Throws(RecordedException::new(kind, message)));
    }

    Err(line_error(line_no, line, "expected 'Returns:' or 'Throws:'"))
}

#[cfg(test)]
mod tests;
