//! Debugger contract exposed by a runspace binding.

use parking_lot::Mutex;

use crate::command::EngineCommand;
use crate::error::EngineError;
use crate::runspace::OutputSink;
use crate::value::Value;

/// How execution proceeds after a debugger stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeAction {
	Continue,
	StepInto,
	StepOver,
	StepOut,
	/// Terminate the command being debugged.
	Stop,
}

/// Intrinsic debugger verbs routed through the debugger command channel.
///
/// While the debugger is stopped, these commands (and, on remote runspaces,
/// every command) must go through [`Debugger::process_command`] so that the
/// resulting resume action is observable by the executor.
const DEBUGGER_VERBS: &[&str] = &[
	"continue", "c", "k", "h", "?", "list", "l", "stepInto", "s", "stepOut", "o", "stepOver", "v", "quit", "q", "detach", "d",
];

/// True when `text` is one of the intrinsic debugger verbs.
pub fn is_debugger_command(text: &str) -> bool {
	let trimmed = text.trim();
	DEBUGGER_VERBS.iter().any(|verb| trimmed.eq_ignore_ascii_case(verb))
}

/// Maps an intrinsic verb to its resume action, if it resumes at all.
///
/// `list`/`l`, `h`, `?`, and `k` inspect state without resuming.
pub fn resume_action_for_verb(text: &str) -> Option<ResumeAction> {
	match text.trim().to_ascii_lowercase().as_str() {
		"continue" | "c" => Some(ResumeAction::Continue),
		"stepinto" | "s" => Some(ResumeAction::StepInto),
		"stepover" | "v" => Some(ResumeAction::StepOver),
		"stepout" | "o" => Some(ResumeAction::StepOut),
		"quit" | "q" | "detach" | "d" => Some(ResumeAction::Stop),
		_ => None,
	}
}

/// Source extent of a statement or frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptRegion {
	pub start_line: u32,
	pub start_column: u32,
	pub end_line: u32,
	pub end_column: u32,
}

impl ScriptRegion {
	pub fn line(line: u32) -> Self {
		Self {
			start_line: line,
			start_column: 1,
			end_line: line,
			end_column: 1,
		}
	}
}

/// Details the engine reports when the debugger stops.
#[derive(Debug, Clone, Default)]
pub struct DebuggerStopInfo {
	/// Engine ids of the breakpoints that were hit, if any.
	pub breakpoint_ids: Vec<i64>,
	/// Script being debugged; `None` for interactive or untitled input.
	pub script_path: Option<String>,
	/// Position of the statement the debugger stopped on.
	pub region: Option<ScriptRegion>,
}

/// Event args for a debugger stop.
///
/// The innermost subscriber runs its nested debug loop inside the handler and
/// records the outcome with [`DebuggerStopEvent::set_resume`]; the binding
/// reads it back once the handler returns.
pub struct DebuggerStopEvent {
	pub info: DebuggerStopInfo,
	resume: Mutex<ResumeAction>,
}

impl DebuggerStopEvent {
	pub fn new(info: DebuggerStopInfo) -> Self {
		Self {
			info,
			resume: Mutex::new(ResumeAction::Continue),
		}
	}

	pub fn set_resume(&self, action: ResumeAction) {
		*self.resume.lock() = action;
	}

	pub fn resume(&self) -> ResumeAction {
		*self.resume.lock()
	}
}

/// Where a breakpoint binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointSite {
	Line {
		path: String,
		line: u32,
		column: Option<u32>,
	},
	Command {
		name: String,
	},
}

/// A breakpoint as known to the engine.
#[derive(Debug, Clone)]
pub struct EngineBreakpoint {
	pub id: i64,
	pub site: BreakpointSite,
	/// Compiled action block, if the breakpoint is conditional.
	pub action: Option<String>,
	pub enabled: bool,
}

/// Breakpoint lifecycle notification raised by the engine.
///
/// The engine does not document Set/Removed ordering during conditional
/// breakpoint installation; consumers must treat updates as idempotent.
#[derive(Debug, Clone)]
pub struct BreakpointUpdate {
	pub kind: BreakpointUpdateKind,
	pub breakpoint: EngineBreakpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointUpdateKind {
	Set,
	Removed,
	Enabled,
	Disabled,
}

/// Outcome of a command processed through the debugger channel.
#[derive(Debug, Clone, Default)]
pub struct DebuggerCommandOutcome {
	/// Resume action requested by the command, if it resumes execution.
	pub resume: Option<ResumeAction>,
	/// True when the debugger evaluated the command itself rather than
	/// deferring to normal pipeline invocation.
	pub handled_by_debugger: bool,
}

/// Variable scopes the debug service inspects on stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableScope {
	Global,
	Script,
	/// Locals of one call-stack frame, innermost first.
	Local { frame: usize },
}

/// A variable as reported by the engine for one scope.
#[derive(Debug, Clone)]
pub struct EngineVariable {
	pub name: String,
	pub value: Value,
	/// Engine type name of the variable object itself (not its value);
	/// user-created variables carry the plain variable suffix.
	pub type_name: String,
	pub is_read_only: bool,
	pub is_constant: bool,
}

/// Type-name suffix distinguishing user-created variables from
/// engine-internal session state.
pub const USER_VARIABLE_TYPE_SUFFIX: &str = "PSVariable";

impl EngineVariable {
	pub fn user(name: impl Into<String>, value: Value) -> Self {
		Self {
			name: name.into(),
			value,
			type_name: format!("System.Management.Automation.{USER_VARIABLE_TYPE_SUFFIX}"),
			is_read_only: false,
			is_constant: false,
		}
	}

	/// True when the variable object's type name marks it user-created.
	pub fn is_user_created(&self) -> bool {
		self.type_name.ends_with(USER_VARIABLE_TYPE_SUFFIX)
	}
}

/// A call-stack frame as reported by the engine.
#[derive(Debug, Clone)]
pub struct EngineStackFrame {
	pub script_path: Option<String>,
	pub function_name: String,
	pub region: Option<ScriptRegion>,
}

/// The debugger channel of a runspace.
///
/// All methods are invoked from the pipeline thread; bindings may assume a
/// single caller at a time but must stay `Send + Sync` because the handle is
/// shared through the frame stack.
pub trait Debugger: Send + Sync {
	/// True while execution is stopped at a breakpoint or step.
	fn in_breakpoint(&self) -> bool;

	/// Processes a command in the debugger's context.
	fn process_command(&self, command: &EngineCommand, output: &dyn OutputSink) -> Result<DebuggerCommandOutcome, EngineError>;

	/// Requests how the stopped debugger resumes. Takes effect when the
	/// innermost stop handler returns.
	fn set_resume_action(&self, action: ResumeAction);

	/// Asks the engine to stop at the next statement of running code.
	fn break_execution(&self) -> Result<(), EngineError>;

	fn set_breakpoint(&self, site: BreakpointSite, action: Option<String>) -> Result<EngineBreakpoint, EngineError>;

	fn remove_breakpoint(&self, id: i64) -> Result<(), EngineError>;

	fn breakpoints(&self) -> Vec<EngineBreakpoint>;

	/// Call stack at the current stop, innermost frame first.
	fn call_stack(&self) -> Result<Vec<EngineStackFrame>, EngineError>;

	/// Variables visible in one scope at the current stop.
	fn variables(&self, scope: VariableScope) -> Result<Vec<EngineVariable>, EngineError>;

	/// Evaluates an expression in the context of the current stop.
	fn evaluate(&self, expression: &str) -> Result<Value, EngineError>;

	/// Assigns a variable in one scope at the current stop.
	fn set_variable(&self, scope: VariableScope, name: &str, value: Value) -> Result<(), EngineError>;

	/// Applies the variable's type-converter attribute, when one is attached,
	/// before assignment. The default is the identity transform.
	fn convert_for_assignment(&self, _scope: VariableScope, _name: &str, value: Value) -> Result<Value, EngineError> {
		Ok(value)
	}

	/// Source excerpt around the current stop, as the `list` command prints.
	fn source_listing(&self) -> Result<String, EngineError>;
}

#[cfg(test)]
mod tests {
	use super::{ResumeAction, is_debugger_command, resume_action_for_verb};

	#[test]
	fn verb_table_covers_aliases_and_full_names() {
		for verb in ["continue", "c", "stepInto", "s", "stepOut", "o", "stepOver", "v", "quit", "q", "detach", "d", "k", "h", "?", "list", "l"] {
			assert!(is_debugger_command(verb), "{verb} should be intrinsic");
		}
		assert!(is_debugger_command("  C  "));
		assert!(!is_debugger_command("Get-Process"));
	}

	#[test]
	fn inspection_verbs_do_not_resume() {
		assert_eq!(resume_action_for_verb("list"), None);
		assert_eq!(resume_action_for_verb("k"), None);
		assert_eq!(resume_action_for_verb("v"), Some(ResumeAction::StepOver));
		assert_eq!(resume_action_for_verb("q"), Some(ResumeAction::Stop));
	}
}
