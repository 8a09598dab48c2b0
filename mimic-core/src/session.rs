//! Replay session: a call sequence paired with its object registry
//!
//! Interception wrappers hold a `ReplaySession` and forward every method
//! call through [`ReplaySession::call`]. The session matches the call, decodes
//! the recorded value into the Rust return type, and keeps the registry the
//! codec needs for object references.
//!
//! # Example
//!
//! ```rust,ignore
//! use mimic_core::prelude::*;
//!
//! struct CalculatorMimic<'a>(&'a mut ReplaySession);
//!
//! impl CalculatorMimic<'_> {
//!     fn add(&mut self, a: i32, b: i32) -> Result<i32> {
//!         self.0.call(Call::new("Add").arg("a", a).arg("b", b))
//!     }
//! }
//!
//! let mut session = ReplaySession::from_transcript(&text, Some(path))?;
//! assert_eq!(CalculatorMimic(&mut session).add(2, 3)?, 5);
//! let produced = session.finish()?;
//! ```

use crate::config::MimicConfig;
use crate::error::{MimicError, Result};
use crate::registry::ObjectRegistry;
use crate::sequence::{Call, CallSequence, Replay};
use crate::transcript::RecordedException;
use crate::value::{ReplayValue, Value};

/// Call sequence plus registry for one test case
#[derive(Debug)]
pub struct ReplaySession {
    sequence: CallSequence,
    registry: ObjectRegistry,
}

impl ReplaySession {
    pub fn new(sequence: CallSequence, registry: ObjectRegistry) -> Self {
        Self { sequence, registry }
    }

    /// A session with nothing expected that records every call
    pub fn recording() -> Self {
        Self::new(CallSequence::recording(), ObjectRegistry::new())
    }

    /// Replay the given transcript text
    pub fn from_transcript(text: &str, source_path: Option<&str>) -> Result<Self> {
        Ok(Self::new(
            CallSequence::from_transcript(text, source_path)?,
            ObjectRegistry::new(),
        ))
    }

    /// Replay a transcript with mode and rendering taken from `config`
    pub fn from_config(text: &str, source_path: Option<&str>, config: &MimicConfig) -> Result<Self> {
        config.validate()?;
        let sequence = CallSequence::from_transcript(text, source_path)?.with_config(config);
        Ok(Self::new(sequence, ObjectRegistry::new()))
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ObjectRegistry {
        &mut self.registry
    }

    pub fn sequence(&self) -> &CallSequence {
        &self.sequence
    }

    pub fn sequence_mut(&mut self) -> &mut CallSequence {
        &mut self.sequence
    }

    /// Match a call and decode the replayed return value as `R`
    ///
    /// The call's expectation is set from `R`. In record mode, past the end
    /// of the transcript, this returns `NoCallsRemain`; use [`Self::call_with`]
    /// to run the real dependency instead.
    pub fn call<R: ReplayValue>(&mut self, call: Call) -> Result<R> {
        let call = call.returns::<R>();
        match self.sequence.match_next(&call, &self.registry)? {
            Replay::Replayed {
                value: Some(value), ..
            } => R::from_value(value),
            Replay::Replayed { value: None, .. } => Err(MimicError::MissingReturnValue {
                method: call.method,
                location: self.sequence.source_path().map(str::to_string),
            }),
            Replay::Passthrough => Err(MimicError::NoCallsRemain {
                method: call.method,
                location: self.sequence.source_path().map(str::to_string),
            }),
        }
    }

    /// Match a call with no return value
    ///
    /// Returns the replayed values of its `&mut` arguments, empty when the
    /// call has none or was passed through.
    pub fn call_void(&mut self, call: Call) -> Result<Vec<(String, Value)>> {
        match self.sequence.match_next(&call, &self.registry)? {
            Replay::Replayed { outputs, .. } => Ok(outputs),
            Replay::Passthrough => Ok(Vec::new()),
        }
    }

    /// Match a call, running `real` when the sequence passes it through
    ///
    /// The outcome of `real` is recorded: a value as `Returns`, an error as
    /// `Throws` with the error type's short name as kind.
    pub fn call_with<R, E, F>(&mut self, call: Call, real: F) -> Result<std::result::Result<R, E>>
    where
        R: ReplayValue + Clone,
        E: std::error::Error + 'static,
        F: FnOnce() -> std::result::Result<R, E>,
    {
        let call = call.returns::<R>();
        match self.sequence.match_next(&call, &self.registry) {
            Ok(Replay::Passthrough) => match real() {
                Ok(value) => {
                    let encoded: Value = value.clone().into_value();
                    self.sequence.record_return(&encoded, &self.registry)?;
                    Ok(Ok(value))
                }
                Err(error) => {
                    self.sequence
                        .record_error(RecordedException::from_error(&error))?;
                    Ok(Err(error))
                }
            },
            Ok(Replay::Replayed {
                value: Some(value), ..
            }) => R::from_value(value).map(Ok),
            Ok(Replay::Replayed { value: None, .. }) => Err(MimicError::MissingReturnValue {
                method: call.method,
                location: self.sequence.source_path().map(str::to_string),
            }),
            Err(error) => Err(error),
        }
    }

    /// Record a test input in the rendered preamble
    pub fn set_input<T: ReplayValue>(&mut self, name: &str, value: T) {
        self.sequence
            .set_input(name, &value.into_value(), &self.registry);
    }

    /// Check every expected call was made and render the produced transcript
    pub fn finish(&self) -> Result<String> {
        self.sequence.verify_all_expected_consumed()?;
        let rendered = self.sequence.render();
        tracing::info!(
            calls = self.sequence.produced().len(),
            source = self.sequence.source_path().unwrap_or("<inline>"),
            "Replay session finished"
        );
        Ok(rendered)
    }
}
