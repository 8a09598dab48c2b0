//! Description of an intercepted call

use crate::codec;
use crate::registry::ObjectRegistry;
use crate::transcript::{Argument, CallRecord};
use crate::value::{ReplayValue, Value, ValueType};

/// What the caller needs back from a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Nothing (unit-returning method)
    Void,
    /// A value of this type
    Value(ValueType),
}

/// One argument as passed by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct CallArgument {
    pub name: String,
    pub value: Value,
    /// Type of the value written back, for `&mut` parameters
    pub output: Option<ValueType>,
}

/// A method invocation forwarded by an interception wrapper
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: String,
    pub arguments: Vec<CallArgument>,
    pub expects: Expectation,
}

impl Call {
    /// A void call with no arguments
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: Vec::new(),
            expects: Expectation::Void,
        }
    }

    /// Add an input argument
    pub fn arg<T: ReplayValue>(self, name: impl Into<String>, value: T) -> Self {
        self.arg_value(name, value.into_value())
    }

    pub fn arg_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.push(CallArgument {
            name: name.into(),
            value,
            output: None,
        });
        self
    }

    /// Add a `&mut` argument whose value after the call is recorded too
    pub fn output<T: ReplayValue>(mut self, name: impl Into<String>, before: T) -> Self {
        self.arguments.push(CallArgument {
            name: name.into(),
            value: before.into_value(),
            output: Some(T::value_type()),
        });
        self
    }

    /// Expect a return value of type `T`
    pub fn returns<T: ReplayValue>(self) -> Self {
        self.returns_type(T::value_type())
    }

    pub fn returns_type(mut self, value_type: ValueType) -> Self {
        self.expects = Expectation::Value(value_type);
        self
    }

    pub fn is_void(&self) -> bool {
        self.expects == Expectation::Void
    }

    /// Encode into a record without a result
    pub fn to_record(&self, registry: Option<&ObjectRegistry>) -> CallRecord {
        let mut record = CallRecord::new(&self.method);
        for argument in &self.arguments {
            let encoded = codec::encode(&argument.value, registry);
            record.arguments.push(match argument.output {
                Some(_) => Argument::output(&argument.name, encoded, None),
                None => Argument::input(&argument.name, encoded),
            });
        }
        record
    }
}
