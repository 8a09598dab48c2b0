//! # Mimic - Characterization Testing by Call Replay
//!
//! Mimic records the calls a unit makes to its dependencies as a
//! human-editable transcript, then replays that transcript as the
//! dependency's behaviour on later runs:
//! - A text value grammar for primitives, strings, collections, date-times and object references
//! - An object registry that gives live objects stable textual ids
//! - A call sequence that replays values in order and records what actually happened
//! - Argument divergences left in the produced transcript for a human to approve
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mimic_core::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let text = "🔧 Add:\n  🔸 a: 2\n  🔸 b: 3\n  🔹 Returns: 5\n";
//!     let mut session = ReplaySession::from_transcript(text, None)?;
//!
//!     let sum: i32 = session.call(Call::new("Add").arg("a", 2).arg("b", 3))?;
//!     assert_eq!(sum, 5);
//!
//!     let produced = session.finish()?;
//!     assert_eq!(produced, text);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **codec**: text grammar for values, `<id:X>` and `<unknown:T>` references
//! - **registry**: id assignment and supply channels for non-serializable objects
//! - **transcript**: the line-based record format with its glyph prefixes
//! - **sequence**: the forward-only matching engine
//! - **session**: the typed facade interception wrappers call into

pub mod codec;
pub mod config;
pub mod error;
pub mod inputs;
pub mod registry;
pub mod sequence;
pub mod session;
pub mod transcript;
pub mod value;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::codec::{decode, decode_as, encode, encode_value};
    pub use crate::config::MimicConfig;
    pub use crate::error::{MimicError, ObjectNotFound, Result};
    pub use crate::inputs::{InputParameter, TestInputs};
    pub use crate::registry::{ObjectRegistry, SupplyKind};
    pub use crate::sequence::{Call, CallSequence, Expectation, Replay, SequenceMode};
    pub use crate::session::ReplaySession;
    pub use crate::transcript::{CallRecord, RecordedException, RecordedResult, Transcript};
    pub use crate::value::{CapabilityType, ObjectRef, ReplayValue, Value, ValueType};
}
