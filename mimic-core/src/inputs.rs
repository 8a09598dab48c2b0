//! Named test-case inputs from the `<Test Inputs>` preamble
//!
//! A transcript may start with a preamble of `name: value` lines that
//! parameterise the test case. Declared parameters missing from the preamble
//! keep their defaults.

use crate::codec;
use crate::error::{MimicError, Result};
use crate::registry::ObjectRegistry;
use crate::transcript::{glyph, TEST_INPUTS_MARKER};
use crate::value::{ReplayValue, Value, ValueType};

/// Preamble entries as encoded text, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestInputs {
    entries: Vec<(String, String)>,
}

/// A parameter the test declares, with an optional default
#[derive(Debug, Clone)]
pub struct InputParameter {
    pub name: String,
    pub value_type: ValueType,
    pub default: Option<Value>,
}

impl InputParameter {
    /// A parameter that must appear in the preamble
    pub fn required<T: ReplayValue>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: T::value_type(),
            default: None,
        }
    }

    /// A parameter that falls back to `default`
    pub fn with_default<T: ReplayValue>(name: impl Into<String>, default: T) -> Self {
        Self {
            name: name.into(),
            value_type: T::value_type(),
            default: Some(default.into_value()),
        }
    }
}

impl TestInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry
    pub fn push(&mut self, name: impl Into<String>, encoded: impl Into<String>) {
        let name = name.into();
        let encoded = encoded.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, value)) => *value = encoded,
            None => self.entries.push((name, encoded)),
        }
    }

    /// Encoded text of an entry
    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Decode one entry, `None` if absent
    pub fn get<T: ReplayValue>(
        &self,
        name: &str,
        registry: Option<&ObjectRegistry>,
    ) -> Result<Option<T>> {
        self.get_raw(name)
            .map(|text| codec::decode_as::<T>(text, registry))
            .transpose()
    }

    /// Decode one entry or fall back to `default`
    pub fn get_or<T: ReplayValue>(
        &self,
        name: &str,
        default: T,
        registry: Option<&ObjectRegistry>,
    ) -> Result<T> {
        Ok(self.get(name, registry)?.unwrap_or(default))
    }

    /// Decode every declared parameter, applying defaults
    pub fn resolve(
        &self,
        parameters: &[InputParameter],
        registry: Option<&ObjectRegistry>,
    ) -> Result<Vec<(String, Value)>> {
        for (name, _) in &self.entries {
            if !parameters.iter().any(|p| &p.name == name) {
                tracing::debug!(input = %name, "Test input is not a declared parameter");
            }
        }

        parameters
            .iter()
            .map(|param| {
                let value = match (self.get_raw(&param.name), &param.default) {
                    (Some(text), _) => codec::decode(text, &param.value_type, registry)?,
                    (None, Some(default)) => default.clone(),
                    (None, None) => {
                        return Err(MimicError::MissingInput {
                            name: param.name.clone(),
                        });
                    }
                };
                Ok((param.name.clone(), value))
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the preamble block
    pub fn render(&self, indent: usize) -> String {
        let pad = " ".repeat(indent);
        let mut out = format!("{} {}\n", glyph::TEST_INPUTS, TEST_INPUTS_MARKER);
        for (name, value) in &self.entries {
            out.push_str(&format!("{}{} {}: {}\n", pad, glyph::INPUT, name, value));
        }
        out
    }
}
