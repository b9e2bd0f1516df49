//! Session registry and ordered-action execution engine.
//!
//! The registry owns the map from session id to live browser instance;
//! the engine runs ordered action sequences against one session under a
//! configurable error policy.

pub mod registry;
pub mod sequence;

pub use registry::{Session, SessionRegistry, SessionSummary};
pub use sequence::{run_sequence, ActionStep, ErrorPolicy, ExecutionReport, StepOutcome};
