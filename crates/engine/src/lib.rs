//! Engine seam for the posh editor-services host.
//!
//! The host never links a scripting runtime directly: it drives a
//! [`runspace::Runspace`] trait object and the [`debugger::Debugger`] channel
//! it exposes. A production binding wraps the real engine; the in-tree
//! [`local`] binding is a programmable stand-in for tests and the smoke REPL.

pub mod cancel;
pub mod command;
pub mod debugger;
pub mod error;
pub mod events;
pub mod global;
pub mod local;
pub mod runspace;
pub mod value;

pub use cancel::CancelToken;
pub use command::EngineCommand;
pub use debugger::{
	BreakpointSite, BreakpointUpdate, BreakpointUpdateKind, Debugger, DebuggerCommandOutcome, DebuggerStopEvent, DebuggerStopInfo, EngineBreakpoint,
	EngineStackFrame, EngineVariable, ResumeAction, ScriptRegion, VariableScope,
};
pub use error::{EngineError, ErrorRecord, ParseDiagnostic};
pub use events::Subscription;
pub use runspace::{InvocationContext, OutputSink, ParsedScript, Runspace, RunspaceAvailability, RunspaceHandle, RunspaceInfo, RunspaceLocation};
pub use value::Value;
