//! Debug service for the posh editor-services host.
//!
//! Owns the breakpoint registry, captures stack frames and variable
//! containers when the engine's debugger stops, exposes variable expansion
//! and assignment to request handlers, and maps stepping commands onto the
//! debugger's resume actions.

pub mod breakpoints;
pub mod condition;
pub mod error;
pub mod remote_files;
pub mod service;
pub mod stack;
pub mod variables;

pub use breakpoints::{BreakpointRegistry, CommandBreakpoint, CommandBreakpointSpec, LineBreakpoint, LineBreakpointSpec};
pub use error::DebugError;
pub use remote_files::{LocalSessionFiles, RemoteFileMirror};
pub use service::{DebugEvent, DebugService};
pub use stack::{PresentationHint, StackFrameDetails};
pub use variables::{VariableNode, VariableScopeRecord, VariableStore};
