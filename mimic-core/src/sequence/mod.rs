//! Ordered call-sequence engine
//!
//! A `CallSequence` owns the *expected* records parsed from a transcript and
//! the *produced* records built as calls arrive. Each call moves through
//! `Idle -> Matching -> {Replayed, Recorded, Mismatched}`:
//!
//! - A different method name at the cursor is a hard failure: the code took
//!   a structurally different path.
//! - Different argument values are not checked. They are written to the
//!   produced records so the rendered transcript shows the full divergence.
//!
//! # Example
//!
//! ```rust,ignore
//! use mimic_core::sequence::{Call, CallSequence};
//!
//! let mut sequence = CallSequence::from_transcript(text, Some("Calc.Add.basic.verified.txt"))?;
//! let replay = sequence.match_next(&Call::new("Add").arg("a", 2).arg("b", 3).returns::<i32>(), &registry)?;
//! sequence.verify_all_expected_consumed()?;
//! let produced = sequence.render();
//! ```

mod call;

pub use call::{Call, CallArgument, Expectation};

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::config::MimicConfig;
use crate::error::{MimicError, Result};
use crate::inputs::TestInputs;
use crate::registry::ObjectRegistry;
use crate::transcript::{
    self, ArgumentValue, CallRecord, RecordedException, RecordedResult, Transcript,
};
use crate::value::Value;

/// What happens when the expected records run out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SequenceMode {
    /// Calls needing a value fail with "no calls remain" (default)
    #[default]
    Replay,

    /// Calls pass through to the real dependency and their outcome is recorded
    Record,
}

/// Outcome of matching one call
#[derive(Debug, Clone, PartialEq)]
pub enum Replay {
    /// Answered from the transcript; `value` is `None` for void calls
    Replayed {
        value: Option<Value>,
        /// Values written back to `&mut` arguments
        outputs: Vec<(String, Value)>,
    },

    /// No expected record: run the real call, then report its outcome with
    /// [`CallSequence::record_return`] or [`CallSequence::record_error`]
    Passthrough,
}

impl Replay {
    fn void() -> Self {
        Replay::Replayed {
            value: None,
            outputs: Vec::new(),
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self, Replay::Passthrough)
    }

    /// The replayed return value, if any
    pub fn value(&self) -> Option<&Value> {
        match self {
            Replay::Replayed { value, .. } => value.as_ref(),
            Replay::Passthrough => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Replay::Replayed { value, .. } => value,
            Replay::Passthrough => None,
        }
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        match self {
            Replay::Replayed { outputs, .. } => {
                outputs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            Replay::Passthrough => None,
        }
    }
}

/// Expected and produced call records plus the forward-only cursor
#[derive(Debug, Clone)]
pub struct CallSequence {
    expected: Vec<CallRecord>,
    produced: Vec<CallRecord>,
    cursor: usize,
    mode: SequenceMode,
    inputs: TestInputs,
    source_path: Option<String>,
    /// Produced record waiting for the outcome of a passthrough call
    pending: Option<usize>,
    indent: usize,
    emit_test_inputs: bool,
}

impl CallSequence {
    /// Build from parsed records
    pub fn new(transcript: Transcript, mode: SequenceMode) -> Self {
        Self {
            expected: transcript.records,
            produced: Vec::new(),
            cursor: 0,
            mode,
            inputs: transcript.inputs,
            source_path: None,
            pending: None,
            indent: transcript::DEFAULT_INDENT,
            emit_test_inputs: true,
        }
    }

    /// An empty sequence that records every call
    pub fn recording() -> Self {
        Self::new(Transcript::default(), SequenceMode::Record)
    }

    /// Parse transcript text and replay it
    pub fn from_transcript(text: &str, source_path: Option<&str>) -> Result<Self> {
        let transcript = Transcript::parse(text).map_err(|e| match (e, source_path) {
            (MimicError::MalformedGrammar { text, reason }, Some(path)) => {
                MimicError::MalformedGrammar {
                    text,
                    reason: format!("{} ({})", reason, path),
                }
            }
            (e, _) => e,
        })?;

        tracing::debug!(
            records = transcript.records.len(),
            inputs = transcript.inputs.len(),
            source = source_path.unwrap_or("<inline>"),
            "Loaded transcript"
        );

        let mut sequence = Self::new(transcript, SequenceMode::Replay);
        sequence.source_path = source_path.map(str::to_string);
        Ok(sequence)
    }

    /// Apply mode and rendering options
    pub fn with_config(mut self, config: &MimicConfig) -> Self {
        self.mode = config.mode;
        self.indent = config.indent;
        self.emit_test_inputs = config.emit_test_inputs;
        self
    }

    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn mode(&self) -> SequenceMode {
        self.mode
    }

    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    pub fn inputs(&self) -> &TestInputs {
        &self.inputs
    }

    /// Set a test input to be written in the rendered preamble
    pub fn set_input(&mut self, name: impl Into<String>, value: &Value, registry: &ObjectRegistry) {
        self.inputs.push(name, codec::encode(value, Some(registry)));
    }

    pub fn expected(&self) -> &[CallRecord] {
        &self.expected
    }

    pub fn produced(&self) -> &[CallRecord] {
        &self.produced
    }

    /// Expected records not yet consumed
    pub fn remaining(&self) -> &[CallRecord] {
        &self.expected[self.cursor..]
    }

    /// Match an intercepted call against the record at the cursor
    pub fn match_next(&mut self, call: &Call, registry: &ObjectRegistry) -> Result<Replay> {
        self.pending = None;
        let mut produced = call.to_record(Some(registry));

        if self.cursor >= self.expected.len() {
            return self.exhausted(call, produced);
        }
        let expected = &self.expected[self.cursor];

        if expected.method != call.method {
            let error = MimicError::SequenceMismatch {
                expected: expected.signature(),
                actual: produced.signature(),
                location: self.source_path.clone(),
            };
            tracing::warn!(
                cursor = self.cursor,
                expected = %expected.method,
                actual = %call.method,
                "Call sequence mismatch"
            );
            return Err(error);
        }

        if !same_arguments(expected, &produced) {
            tracing::debug!(
                method = %call.method,
                expected = %expected.signature(),
                actual = %produced.signature(),
                "Argument values differ; left for approval"
            );
        }

        let mut recorded_outputs = Vec::new();
        for (argument, passed) in produced.arguments.iter_mut().zip(&call.arguments) {
            let Some(output_type) = &passed.output else {
                continue;
            };
            let recorded_after = expected.argument(&argument.name).and_then(|a| match &a.value {
                ArgumentValue::Output { after, .. } => after.clone(),
                ArgumentValue::Input(_) => None,
            });
            if let (ArgumentValue::Output { after, .. }, Some(text)) =
                (&mut argument.value, recorded_after)
            {
                recorded_outputs.push((argument.name.clone(), text.clone(), output_type));
                *after = Some(text);
            }
        }

        produced.result = expected.result.clone();
        produced.notes = expected.notes.clone();
        let result = expected.result.clone();
        self.produced.push(produced);
        self.cursor += 1;

        tracing::debug!(cursor = self.cursor, method = %call.method, "Replayed call");

        let outputs = recorded_outputs
            .into_iter()
            .map(|(name, text, output_type)| {
                Ok((name, codec::decode(&text, output_type, Some(registry))?))
            })
            .collect::<Result<Vec<_>>>()?;

        match (result, &call.expects) {
            (Some(RecordedResult::Throws(exception)), _) => Err(MimicError::Replayed(exception)),
            (Some(RecordedResult::Returns(text)), Expectation::Value(value_type)) => {
                let value = codec::decode(&text, value_type, Some(registry))?;
                Ok(Replay::Replayed {
                    value: Some(value),
                    outputs,
                })
            }
            (None, Expectation::Value(_)) => Err(MimicError::MissingReturnValue {
                method: call.method.clone(),
                location: self.source_path.clone(),
            }),
            (_, Expectation::Void) => Ok(Replay::Replayed {
                value: None,
                outputs,
            }),
        }
    }

    fn exhausted(&mut self, call: &Call, produced: CallRecord) -> Result<Replay> {
        self.produced.push(produced);

        match (self.mode, &call.expects) {
            (SequenceMode::Record, _) => {
                self.pending = Some(self.produced.len() - 1);
                tracing::debug!(method = %call.method, "Recording passthrough call");
                Ok(Replay::Passthrough)
            }
            (SequenceMode::Replay, Expectation::Void) => {
                tracing::debug!(method = %call.method, "Unscripted void call recorded");
                Ok(Replay::void())
            }
            (SequenceMode::Replay, Expectation::Value(_)) => {
                tracing::warn!(method = %call.method, "No calls remain");
                Err(MimicError::NoCallsRemain {
                    method: call.method.clone(),
                    location: self.source_path.clone(),
                })
            }
        }
    }

    /// Record the return value of the pending passthrough call
    pub fn record_return(&mut self, value: &Value, registry: &ObjectRegistry) -> Result<()> {
        let record = self.take_pending()?;
        record.result = Some(RecordedResult::Returns(codec::encode(value, Some(registry))));
        Ok(())
    }

    /// Record the error raised by the pending passthrough call
    pub fn record_error(&mut self, exception: RecordedException) -> Result<()> {
        let record = self.take_pending()?;
        record.result = Some(RecordedResult::Throws(exception));
        Ok(())
    }

    /// Record the value a passthrough call wrote back to a `&mut` argument
    pub fn record_output(
        &mut self,
        name: &str,
        value: &Value,
        registry: &ObjectRegistry,
    ) -> Result<()> {
        let record = self.pending_record()?;
        let encoded = codec::encode(value, Some(registry));
        match record
            .arguments
            .iter_mut()
            .find(|a| a.name == name)
            .map(|a| &mut a.value)
        {
            Some(ArgumentValue::Output { after, .. }) => {
                *after = Some(encoded);
                Ok(())
            }
            _ => Err(MimicError::malformed(
                name,
                format!("'{}' is not an output argument of '{}'", name, record.method),
            )),
        }
    }

    /// Attach a free-text note to the most recent produced record
    pub fn add_note(&mut self, note: impl Into<String>) {
        if let Some(record) = self.produced.last_mut() {
            record.notes.push(note.into());
        }
    }

    /// Fail if any expected call was never made
    pub fn verify_all_expected_consumed(&self) -> Result<()> {
        let remaining = self.remaining();
        if remaining.is_empty() {
            return Ok(());
        }
        Err(MimicError::UnconsumedCalls {
            remaining: remaining.iter().map(CallRecord::signature).collect(),
        })
    }

    /// Serialize the produced records (and test inputs) as a transcript
    pub fn render(&self) -> String {
        let inputs = (self.emit_test_inputs && !self.inputs.is_empty()).then_some(&self.inputs);
        transcript::render_records(inputs, &self.produced, self.indent)
    }

    fn pending_record(&mut self) -> Result<&mut CallRecord> {
        let index = self.pending.ok_or_else(|| self.not_recording())?;
        Ok(&mut self.produced[index])
    }

    fn take_pending(&mut self) -> Result<&mut CallRecord> {
        let index = self.pending.take().ok_or_else(|| self.not_recording())?;
        Ok(&mut self.produced[index])
    }

    fn not_recording(&self) -> MimicError {
        MimicError::NotRecording {
            method: self
                .produced
                .last()
                .map(|r| r.method.clone())
                .unwrap_or_default(),
        }
    }
}

fn same_arguments(expected: &CallRecord, actual: &CallRecord) -> bool {
    expected.arguments.len() == actual.arguments.len()
        && expected
            .arguments
            .iter()
            .zip(&actual.arguments)
            .all(|(e, a)| e.name == a.name && e.passed() == a.passed())
}

#[cfg(test)]
mod tests;
