//! Shellform Provider
//!
//! Manages resources whose lifecycle is implemented by user-supplied shell
//! commands. A command is resolved for each lifecycle action, run behind a
//! process-wide execution gate, and its auxiliary output is kept as both a
//! drift trigger and a structured result.

pub mod diagnostics;
pub mod gate;
pub mod interpreter;
pub mod provider;
pub mod resolver;
pub mod resources;
pub mod runner;
pub mod schema;
pub mod state;

pub use diagnostics::{Diagnostic, Severity};
pub use gate::ExecutionGate;
pub use provider::{ApplyOutcome, PlannedChange, PriorResource, ShellformProvider};
pub use runner::{CommandOutput, CommandRequest, CommandRunner, ShellRunner};
pub use state::DynamicValue;
