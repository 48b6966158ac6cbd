//! Client-side session core for the spike analysis workflow.
//!
//! Owns the whole lifecycle: file acceptance, the single in-flight
//! analysis request, restoration of the last completed analysis across
//! restarts, and the append-only chat transcript layered on top of it.
//! Rendering and the actual statistics/spike detection live elsewhere.

pub mod controller;
pub mod gate;
pub mod persist;
pub mod transcript;

pub use controller::{AnalysisRequest, SessionController, SessionState};
pub use gate::GateError;
pub use persist::{FileSnapshotStore, MemorySnapshotStore, NullSnapshotStore, SnapshotStore};
pub use transcript::{Transcript, FALLBACK_ANSWER};
