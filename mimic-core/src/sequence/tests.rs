//! Tests for call matching

use std::sync::Arc;

use super::*;
use crate::value::{ReplayValue, ValueType};

const ADD_MULTIPLY: &str = "\
🔧 Add:
  🔸 a: 2
  🔸 b: 3
  🔹 Returns: 5

🔧 Multiply:
  🔸 a: 4
  🔸 b: 5
  🔹 Returns: 20
";

fn add(a: i32, b: i32) -> Call {
    Call::new("Add").arg("a", a).arg("b", b).returns::<i32>()
}

fn multiply(a: i32, b: i32) -> Call {
    Call::new("Multiply").arg("a", a).arg("b", b).returns::<i32>()
}

fn replayed_int(replay: Replay) -> i64 {
    match replay.into_value() {
        Some(Value::Int(n)) => n,
        other => panic!("expected an int, got {:?}", other),
    }
}

#[test]
fn test_replays_values_in_order() {
    let registry = ObjectRegistry::new();
    let mut sequence = CallSequence::from_transcript(ADD_MULTIPLY, None).unwrap();

    assert_eq!(replayed_int(sequence.match_next(&add(2, 3), &registry).unwrap()), 5);
    assert_eq!(replayed_int(sequence.match_next(&multiply(4, 5), &registry).unwrap()), 20);

    sequence.verify_all_expected_consumed().unwrap();
    assert_eq!(sequence.render(), ADD_MULTIPLY);
}

#[test]
fn test_argument_divergence_is_deferred() {
    let registry = ObjectRegistry::new();
    let mut sequence = CallSequence::from_transcript(ADD_MULTIPLY, None).unwrap();

    let replay = sequence.match_next(&add(99, 1), &registry).unwrap();
    assert_eq!(replayed_int(replay), 5);

    let produced = &sequence.produced()[0];
    assert_eq!(produced.signature(), "Add(a: 99, b: 1)");
    assert_eq!(produced.returns(), Some("5"));
    assert!(sequence.render().contains("🔸 a: 99"));
}

#[test]
fn test_method_mismatch_fails_without_consuming() {
    let registry = ObjectRegistry::new();
    let mut sequence = CallSequence::from_transcript(ADD_MULTIPLY, Some("Calc.verified.txt")).unwrap();

    let err = sequence.match_next(&multiply(4, 5), &registry).unwrap_err();
    match &err {
        MimicError::SequenceMismatch {
            expected,
            actual,
            location,
        } => {
            assert_eq!(expected, "Add(a: 2, b: 3)");
            assert_eq!(actual, "Multiply(a: 4, b: 5)");
            assert_eq!(location.as_deref(), Some("Calc.verified.txt"));
        }
        other => panic!("expected mismatch, got {:?}", other),
    }
    assert!(err.to_string().contains("Calc.verified.txt"));
    assert!(sequence.produced().is_empty());
    assert_eq!(sequence.remaining().len(), 2);
}

#[test]
fn test_reset_then_add_then_exhausted() {
    let text = "🔧 Reset:\n\n🔧 Add:\n  🔸 a: 5\n  🔸 b: 3\n  🔹 Returns: 8\n";
    let registry = ObjectRegistry::new();
    let mut sequence = CallSequence::from_transcript(text, None).unwrap();

    let reset = sequence.match_next(&Call::new("Reset"), &registry).unwrap();
    assert_eq!(reset.value(), None);
    assert_eq!(replayed_int(sequence.match_next(&add(5, 3), &registry).unwrap()), 8);

    let err = sequence.match_next(&add(1, 1), &registry).unwrap_err();
    assert!(matches!(err, MimicError::NoCallsRemain { ref method, .. } if method == "Add"));
    assert!(err.to_string().to_lowercase().contains("no calls remain"));

    assert_eq!(sequence.produced().len(), 3);
    assert!(sequence.produced()[2].result.is_none());
}

#[test]
fn test_exhausted_void_call_is_recorded() {
    let registry = ObjectRegistry::new();
    let mut sequence = CallSequence::from_transcript("", None).unwrap();

    let replay = sequence
        .match_next(&Call::new("Log").arg("message", "hi".to_string()), &registry)
        .unwrap();
    assert_eq!(replay, Replay::void());
    assert_eq!(sequence.render(), "🔧 Log:\n  🔸 message: \"hi\"\n");
}

#[test]
fn test_missing_return_value() {
    let registry = ObjectRegistry::new();
    let mut sequence = CallSequence::from_transcript("🔧 Add:\n  🔸 a: 1\n  🔸 b: 2\n", None).unwrap();

    let err = sequence.match_next(&add(1, 2), &registry).unwrap_err();
    assert!(matches!(err, MimicError::MissingReturnValue { ref method, .. } if method == "Add"));
    assert_eq!(sequence.produced().len(), 1);
}

#[test]
fn test_recorded_exception_is_raised() {
    let text = "🔧 Divide:\n  🔸 a: 1\n  🔸 b: 0\n  🔹 Throws: DivideByZero: \"cannot divide\"\n";
    let registry = ObjectRegistry::new();
    let mut sequence = CallSequence::from_transcript(text, None).unwrap();

    let call = Call::new("Divide").arg("a", 1).arg("b", 0).returns::<i32>();
    let err = sequence.match_next(&call, &registry).unwrap_err();
    match err {
        MimicError::Replayed(exception) => {
            assert_eq!(exception.kind, "DivideByZero");
            assert_eq!(exception.message, "cannot divide");
        }
        other => panic!("expected replayed exception, got {:?}", other),
    }
    assert_eq!(sequence.render(), text);
}

#[test]
fn test_notes_copied_to_produced() {
    let text = "🔧 Reset:\n  💬 clears memory\n";
    let registry = ObjectRegistry::new();
    let mut sequence = CallSequence::from_transcript(text, None).unwrap();

    sequence.match_next(&Call::new("Reset"), &registry).unwrap();
    assert_eq!(sequence.produced()[0].notes, vec!["clears memory"]);
    assert_eq!(sequence.render(), text);
}

#[test]
fn test_output_argument_replayed() {
    let text = "\
🔧 TryParse:
  🔸 text: \"42\"
  🔶 result: 0
  🔷 result: 42
  🔹 Returns: True
";
    let registry = ObjectRegistry::new();
    let mut sequence = CallSequence::from_transcript(text, None).unwrap();

    let call = Call::new("TryParse")
        .arg("text", "42".to_string())
        .output("result", 0i32)
        .returns::<bool>();
    let replay = sequence.match_next(&call, &registry).unwrap();

    assert_eq!(replay.value(), Some(&Value::Bool(true)));
    assert_eq!(replay.output("result"), Some(&Value::Int(42)));
    assert_eq!(sequence.render(), text);
}

#[test]
fn test_unconsumed_calls_reported() {
    let registry = ObjectRegistry::new();
    let mut sequence = CallSequence::from_transcript(ADD_MULTIPLY, None).unwrap();
    sequence.match_next(&add(2, 3), &registry).unwrap();

    let err = sequence.verify_all_expected_consumed().unwrap_err();
    match err {
        MimicError::UnconsumedCalls { remaining } => {
            assert_eq!(remaining, vec!["Multiply(a: 4, b: 5)"]);
        }
        other => panic!("expected unconsumed calls, got {:?}", other),
    }
}

#[test]
fn test_record_mode_passthrough() {
    let registry = ObjectRegistry::new();
    let mut sequence = CallSequence::recording();
    assert_eq!(sequence.mode(), SequenceMode::Record);

    let replay = sequence.match_next(&add(2, 3), &registry).unwrap();
    assert!(replay.is_passthrough());
    sequence.record_return(&Value::Int(5), &registry).unwrap();

    let replay = sequence.match_next(&Call::new("Divide").arg("a", 1).arg("b", 0).returns::<i32>(), &registry).unwrap();
    assert!(replay.is_passthrough());
    sequence
        .record_error(RecordedException::new("DivideByZero", "cannot divide"))
        .unwrap();

    assert_eq!(
        sequence.render(),
        "🔧 Add:\n  🔸 a: 2\n  🔸 b: 3\n  🔹 Returns: 5\n\n\
         🔧 Divide:\n  🔸 a: 1\n  🔸 b: 0\n  🔹 Throws: DivideByZero: \"cannot divide\"\n"
    );
}

#[test]
fn test_record_without_pending_call() {
    let registry = ObjectRegistry::new();
    let mut sequence = CallSequence::recording();
    let err = sequence.record_return(&Value::Int(1), &registry).unwrap_err();
    assert!(matches!(err, MimicError::NotRecording { .. }));

    sequence.match_next(&add(1, 1), &registry).unwrap();
    sequence.record_return(&Value::Int(2), &registry).unwrap();
    let err = sequence.record_return(&Value::Int(2), &registry).unwrap_err();
    assert!(matches!(err, MimicError::NotRecording { ref method } if method == "Add"));
}

#[test]
fn test_record_output_argument() {
    let registry = ObjectRegistry::new();
    let mut sequence = CallSequence::recording();
    let call = Call::new("Fill").output("buffer", Vec::<i32>::new());

    sequence.match_next(&call, &registry).unwrap();
    sequence
        .record_output("buffer", &Value::List(vec![Value::Int(1), Value::Int(2)]), &registry)
        .unwrap();

    assert_eq!(
        sequence.render(),
        "🔧 Fill:\n  🔶 buffer: []\n  🔷 buffer: [1, 2]\n"
    );
}

trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

struct FixedClock(i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

#[test]
fn test_object_return_resolved_through_registry() {
    let mut registry = ObjectRegistry::new();
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(7));
    registry.register(clock.clone(), Some("Clock_1")).unwrap();

    let text = "🔧 GetClock:\n  🔹 Returns: <id:Clock_1>\n";
    let mut sequence = CallSequence::from_transcript(text, None).unwrap();

    let replay = sequence
        .match_next(&Call::new("GetClock").returns::<Arc<dyn Clock>>(), &registry)
        .unwrap();
    let resolved = Arc::<dyn Clock>::from_value(replay.into_value().unwrap()).unwrap();
    assert_eq!(resolved.now(), 7);
    assert!(Arc::ptr_eq(&resolved, &clock));
}

#[test]
fn test_unknown_object_return_fails() {
    let registry = ObjectRegistry::new();
    let text = "🔧 GetClock:\n  🔹 Returns: <unknown:Clock>\n";
    let mut sequence = CallSequence::from_transcript(text, None).unwrap();

    let err = sequence
        .match_next(
            &Call::new("GetClock").returns_type(ValueType::AnyObject),
            &registry,
        )
        .unwrap_err();
    assert!(matches!(err, MimicError::UnknownObject { type_name: Some(ref t) } if t == "Clock"));
}

#[test]
fn test_inputs_rendered_as_preamble() {
    let text = "📋 <Test Inputs>\n  🔸 limit: 3\n\n🔧 Reset:\n";
    let registry = ObjectRegistry::new();
    let mut sequence = CallSequence::from_transcript(text, None).unwrap();
    assert_eq!(sequence.inputs().get_raw("limit"), Some("3"));

    sequence.match_next(&Call::new("Reset"), &registry).unwrap();
    assert_eq!(sequence.render(), text);

    let quiet = sequence.with_config(&MimicConfig {
        emit_test_inputs: false,
        ..MimicConfig::default()
    });
    assert_eq!(quiet.render(), "🔧 Reset:\n");
}

#[test]
fn test_set_input_and_add_note() {
    let registry = ObjectRegistry::new();
    let mut sequence = CallSequence::recording();
    sequence.set_input("user", &Value::Str("bob".to_string()), &registry);

    sequence.match_next(&Call::new("Reset"), &registry).unwrap();
    sequence.add_note("first call");

    assert_eq!(
        sequence.render(),
        "📋 <Test Inputs>\n  🔸 user: \"bob\"\n\n🔧 Reset:\n  💬 first call\n"
    );
}

#[test]
fn test_malformed_transcript_names_source() {
    let err = CallSequence::from_transcript("🔧 Add\n", Some("Broken.verified.txt")).unwrap_err();
    assert!(err.to_string().contains("Broken.verified.txt"));
}

#[test]
fn test_undecodable_output_still_records_the_call() {
    let text = "\
🔧 TryParse:
  🔸 text: \"42\"
  🔶 result: 0
  🔷 result: \"oops\"
  🔹 Returns: True
";
    let registry = ObjectRegistry::new();
    let mut sequence = CallSequence::from_transcript(text, None).unwrap();

    let call = Call::new("TryParse")
        .arg("text", "42".to_string())
        .output("result", 0i32)
        .returns::<bool>();
    let err = sequence.match_next(&call, &registry).unwrap_err();

    assert!(matches!(err, MimicError::TypeConversion { .. }));
    assert_eq!(sequence.produced().len(), 1);
    assert!(sequence.remaining().is_empty());
    assert_eq!(sequence.render(), text);
}
