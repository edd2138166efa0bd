//! # hearth-dialogue — Turn Orchestration for Hearth
//!
//! One call to [`TurnOrchestrator::handle_turn`] is one exchange with a
//! character:
//!
//! ```text
//! load log ─► context ─► reply ─► emotion ─► append ─► reflect ─► compact ─► persist ─► voice
//! └──────────────────── per-character critical section ──────────────────────────┘
//! ```
//!
//! Completion and synthesis failures degrade the turn (error text as the
//! reply, `"neutral"` emotion, no audio, no reflection or compaction this
//! time). Only a storage failure is returned as an error.

pub mod compaction;
pub mod orchestrator;
pub mod reflection;
pub mod setup;
pub mod telemetry;

pub use orchestrator::{TurnOrchestrator, TurnResult};
pub use setup::SetupError;
