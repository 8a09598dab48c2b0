//! Record a calculator's calls, then replay the transcript
//!
//! Run with: `cargo run -p mimic-core --example calculator_replay`

use mimic_core::prelude::*;

#[derive(Debug)]
struct Overflow;

impl std::fmt::Display for Overflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "result does not fit in i32")
    }
}

impl std::error::Error for Overflow {}

fn real_add(a: i32, b: i32) -> std::result::Result<i32, Overflow> {
    a.checked_add(b).ok_or(Overflow)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // First run: nothing recorded yet, so the real implementation answers
    let mut recording = ReplaySession::recording();
    for (a, b) in [(2, 3), (i32::MAX, 1)] {
        let outcome = recording.call_with(Call::new("Add").arg("a", a).arg("b", b), || {
            real_add(a, b)
        })?;
        println!("recorded Add({}, {}) -> {:?}", a, b, outcome.map_err(|e| e.to_string()));
    }
    let transcript = recording.finish()?;
    println!("\n{}", transcript);

    // Later runs: the transcript is the dependency
    let mut replay = ReplaySession::from_transcript(&transcript, Some("calculator.verified.txt"))?;
    let sum: i32 = replay.call(Call::new("Add").arg("a", 2).arg("b", 3))?;
    println!("replayed Add(2, 3) -> {}", sum);

    match replay.call::<i32>(Call::new("Add").arg("a", i32::MAX).arg("b", 1)) {
        Err(MimicError::Replayed(exception)) => println!("replayed error -> {}", exception),
        other => println!("unexpected -> {:?}", other),
    }

    replay.finish()?;
    Ok(())
}
