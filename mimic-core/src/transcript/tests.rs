//! Tests for transcript parsing and rendering

use super::*;

const CALCULATOR: &str = "\
🔧 Reset:

🔧 Add:
  🔸 a: 5
  🔸 b: 3
  🔹 Returns: 8

🔧 Divide:
  🔸 a: 1
  🔸 b: 0
  💬 division by zero is reported, not panicked
  🔹 Throws: DivideByZero: \"cannot divide 1 by 0\"
";

#[test]
fn test_parse_records() {
    let transcript = Transcript::parse(CALCULATOR).unwrap();
    assert!(transcript.inputs.is_empty());
    assert_eq!(transcript.records.len(), 3);

    let reset = &transcript.records[0];
    assert_eq!(reset.method, "Reset");
    assert!(reset.arguments.is_empty());
    assert!(reset.result.is_none());

    let add = &transcript.records[1];
    assert_eq!(add.signature(), "Add(a: 5, b: 3)");
    assert_eq!(add.returns(), Some("8"));

    let divide = &transcript.records[2];
    assert_eq!(divide.notes, vec!["division by zero is reported, not panicked"]);
    assert_eq!(
        divide.result,
        Some(RecordedResult::Throws(RecordedException::new(
            "DivideByZero",
            "cannot divide 1 by 0"
        )))
    );
}

#[test]
fn test_render_is_canonical() {
    let transcript = Transcript::parse(CALCULATOR).unwrap();
    assert_eq!(transcript.render(DEFAULT_INDENT), CALCULATOR);
}

#[test]
fn test_parse_tolerates_crlf_and_extra_blank_lines() {
    let text = "\r\n\r\n🔧 Add:\r\n    🔸 a: 1\r\n🔹 Returns: 1\r\n\r\n\r\n🔧 Reset:\r\n";
    let transcript = Transcript::parse(text).unwrap();
    assert_eq!(transcript.records.len(), 2);
    assert_eq!(transcript.records[0].returns(), Some("1"));
    assert_eq!(transcript.records[1].method, "Reset");
}

#[test]
fn test_output_arguments() {
    let text = "\
🔧 TryParse:
  🔸 text: \"42\"
  🔶 result: 0
  🔷 result: 42
  🔹 Returns: True
";
    let transcript = Transcript::parse(text).unwrap();
    let record = &transcript.records[0];
    assert_eq!(
        record.argument("result").unwrap().value,
        ArgumentValue::Output {
            before: "0".to_string(),
            after: Some("42".to_string())
        }
    );
    assert_eq!(transcript.render(2), text);
}

#[test]
fn test_values_with_colons() {
    let text = "🔧 Schedule:\n  🔸 at: 2024-03-01 10:15:00\n  🔸 tags: {\"a\": 1}\n";
    let transcript = Transcript::parse(text).unwrap();
    let record = &transcript.records[0];
    assert_eq!(record.argument("at").unwrap().passed(), "2024-03-01 10:15:00");
    assert_eq!(record.argument("tags").unwrap().passed(), "{\"a\": 1}");
}

#[test]
fn test_empty_transcript() {
    let transcript = Transcript::parse("").unwrap();
    assert!(transcript.records.is_empty());
    assert_eq!(transcript.render(2), "");
}

#[test]
fn test_malformed_lines_report_line_number() {
    let cases = [
        ("🔸 a: 1\n", "line 1"),
        ("🔧 Add\n", "line 1"),
        ("🔧 Add:\n  🔹 Returns: 1\n  🔹 Returns: 2\n", "line 3"),
        ("🔧 Add:\n  what is this\n", "line 2"),
        ("🔧 Add:\n  🔷 out: 1\n", "line 2"),
        ("🔧 Add:\n\n📋 <Test Inputs>\n", "line 3"),
        ("🔧 Add:\n  🔹 Maybe: 1\n", "line 2"),
        ("🔧 Save:\n  🔹 Throws: IoError: disk full\n", "line 2"),
    ];

    for (text, expected_line) in cases {
        let err = Transcript::parse(text).unwrap_err();
        match &err {
            MimicError::MalformedGrammar { reason, .. } => {
                assert!(reason.contains(expected_line), "{:?}: {}", text, reason);
            }
            other => panic!("{:?} gave {:?}", text, other),
        }
    }
}

#[test]
fn test_throws_without_message() {
    let transcript = Transcript::parse("🔧 Open:\n  🔹 Throws: Timeout\n").unwrap();
    assert_eq!(
        transcript.records[0].result,
        Some(RecordedResult::Throws(RecordedException::new("Timeout", "")))
    );
}

#[test]
fn test_exception_from_error() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
    let exception = RecordedException::from_error(&io);
    assert_eq!(exception.kind, "Error");
    assert_eq!(exception.message, "missing file");
    assert_eq!(exception.to_string(), "Error: missing file");
}
