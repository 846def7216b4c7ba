//! Runspace contract: the engine session the host drives.

use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::command::EngineCommand;
use crate::debugger::{BreakpointUpdate, Debugger, DebuggerStopEvent};
use crate::error::{EngineError, ErrorRecord, ParseDiagnostic};
use crate::events::Subscription;
use crate::value::Value;

/// Whether the session lives in this process or mirrors a remote one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunspaceLocation {
	Local,
	Remote,
}

/// Coarse session health, used by failure recovery to find a usable frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunspaceAvailability {
	Available,
	Busy,
	Unusable,
}

/// Static facts about a runspace.
#[derive(Debug, Clone)]
pub struct RunspaceInfo {
	pub location: RunspaceLocation,
	/// Host application name, used in scratch-file names.
	pub host_name: String,
}

impl RunspaceInfo {
	pub fn is_remote(&self) -> bool {
		self.location == RunspaceLocation::Remote
	}
}

/// Destination for pipeline output and non-terminating errors.
pub trait OutputSink: Send + Sync {
	fn write_output(&self, text: &str);
	fn write_error(&self, record: &ErrorRecord);
}

/// An [`OutputSink`] that discards everything.
pub struct NullSink;

impl OutputSink for NullSink {
	fn write_output(&self, _text: &str) {}
	fn write_error(&self, _record: &ErrorRecord) {}
}

/// Per-invocation context handed to the binding.
pub struct InvocationContext<'a> {
	/// Composed cancellation for this invocation; the binding must abandon
	/// the pipeline promptly when it fires.
	pub cancel: &'a CancelToken,
	/// Record the invocation in the session history.
	pub add_to_history: bool,
}

impl<'a> InvocationContext<'a> {
	pub fn new(cancel: &'a CancelToken) -> Self {
		Self {
			cancel,
			add_to_history: false,
		}
	}

	pub fn with_history(mut self, add_to_history: bool) -> Self {
		self.add_to_history = add_to_history;
		self
	}
}

/// Structural facts about parsed script text, used by breakpoint condition
/// compilation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParsedScript {
	/// The block contains a `break` or `continue` flow statement.
	pub has_flow_break: bool,
}

/// Handler invoked (synchronously, on the pipeline thread) when the engine's
/// debugger stops. The innermost registration receives the event.
pub type DebuggerStopHandler = Arc<dyn Fn(&DebuggerStopEvent) + Send + Sync>;

/// Handler invoked on engine breakpoint lifecycle changes.
pub type BreakpointUpdatedHandler = Arc<dyn Fn(&BreakpointUpdate) + Send + Sync>;

/// An engine session. Exactly one pipeline thread invokes it at a time; other
/// threads hold the handle only to interrupt or observe.
pub trait Runspace: Send + Sync {
	fn info(&self) -> RunspaceInfo;

	fn availability(&self) -> RunspaceAvailability;

	/// Runs one pipeline to completion, writing output and non-terminating
	/// errors to `output`, and returns the pipeline's objects.
	fn invoke(&self, command: &EngineCommand, output: &dyn OutputSink, ctx: &InvocationContext<'_>) -> Result<Vec<Value>, EngineError>;

	/// Stops the in-flight invocation. Callable from any thread.
	fn interrupt(&self);

	/// The debugger channel for this session.
	fn debugger(&self) -> &dyn Debugger;

	/// Parses script text without executing it.
	fn parse(&self, source: &str) -> Result<ParsedScript, ParseDiagnostic>;

	/// Subscribes to debugger stops. The registration is owned: dropping the
	/// subscription detaches the handler.
	fn on_debugger_stop(&self, handler: DebuggerStopHandler) -> Subscription;

	/// Subscribes to breakpoint lifecycle updates.
	fn on_breakpoint_updated(&self, handler: BreakpointUpdatedHandler) -> Subscription;

	/// Releases the session. Idempotent.
	fn close(&self);
}

/// Shared handle to a runspace as carried by the frame stack.
pub type RunspaceHandle = Arc<dyn Runspace>;
