//! Session state backing the local binding.

use std::sync::Arc;

use crate::debugger::{DebuggerStopEvent, EngineBreakpoint, EngineVariable, ResumeAction, ScriptRegion, VariableScope};
use crate::error::EngineError;
use crate::runspace::RunspaceAvailability;
use crate::value::Value;

/// One call-stack frame fixture, innermost first in the stack.
#[derive(Debug, Clone, Default)]
pub struct LocalFrame {
	pub function_name: String,
	pub script_path: Option<String>,
	pub region: Option<ScriptRegion>,
	pub locals: Vec<EngineVariable>,
}

impl LocalFrame {
	pub fn new(function_name: impl Into<String>) -> Self {
		Self {
			function_name: function_name.into(),
			..Self::default()
		}
	}

	pub fn at(mut self, script_path: impl Into<String>, region: ScriptRegion) -> Self {
		self.script_path = Some(script_path.into());
		self.region = Some(region);
		self
	}

	pub fn with_local(mut self, variable: EngineVariable) -> Self {
		self.locals.push(variable);
		self
	}
}

/// Mutable session state shared between the runspace and its debugger.
pub(crate) struct SessionState {
	pub global: Vec<EngineVariable>,
	pub script: Vec<EngineVariable>,
	pub call_stack: Vec<LocalFrame>,
	pub history: Vec<String>,
	pub breakpoints: Vec<EngineBreakpoint>,
	pub next_breakpoint_id: i64,
	pub in_breakpoint: bool,
	/// Stop event currently being handled, so `set_resume_action` reaches it.
	pub current_stop: Option<Arc<DebuggerStopEvent>>,
	pub break_requested: bool,
	pub source_listing: String,
	pub availability: RunspaceAvailability,
}

impl Default for SessionState {
	fn default() -> Self {
		Self {
			global: Vec::new(),
			script: Vec::new(),
			call_stack: Vec::new(),
			history: Vec::new(),
			breakpoints: Vec::new(),
			next_breakpoint_id: 1,
			in_breakpoint: false,
			current_stop: None,
			break_requested: false,
			source_listing: String::new(),
			availability: RunspaceAvailability::Available,
		}
	}
}

impl SessionState {
	pub fn scope_variables(&self, scope: VariableScope) -> Result<Vec<EngineVariable>, EngineError> {
		match scope {
			VariableScope::Global => Ok(self.global.clone()),
			VariableScope::Script => Ok(self.script.clone()),
			VariableScope::Local { frame } => self
				.call_stack
				.get(frame)
				.map(|f| f.locals.clone())
				.ok_or_else(|| EngineError::runtime(format!("no call-stack frame at index {frame}"))),
		}
	}

	pub fn scope_variables_mut(&mut self, scope: VariableScope) -> Result<&mut Vec<EngineVariable>, EngineError> {
		match scope {
			VariableScope::Global => Ok(&mut self.global),
			VariableScope::Script => Ok(&mut self.script),
			VariableScope::Local { frame } => self
				.call_stack
				.get_mut(frame)
				.map(|f| &mut f.locals)
				.ok_or_else(|| EngineError::runtime(format!("no call-stack frame at index {frame}"))),
		}
	}

	/// Upserts a variable in one scope, honoring read-only and constant flags.
	pub fn assign(&mut self, scope: VariableScope, name: &str, value: Value) -> Result<(), EngineError> {
		let variables = self.scope_variables_mut(scope)?;
		if let Some(existing) = variables.iter_mut().find(|v| v.name.eq_ignore_ascii_case(name)) {
			if existing.is_constant {
				return Err(EngineError::runtime(format!("cannot overwrite constant variable '{name}'")));
			}
			if existing.is_read_only {
				return Err(EngineError::runtime(format!("cannot overwrite read-only variable '{name}'")));
			}
			existing.value = value;
			return Ok(());
		}
		variables.push(EngineVariable::user(name, value));
		Ok(())
	}

	/// Resolves `$name` the way the stopped debugger would: innermost locals,
	/// then script scope, then global scope.
	pub fn lookup(&self, name: &str) -> Option<&EngineVariable> {
		self.call_stack
			.first()
			.and_then(|frame| frame.locals.iter().find(|v| v.name.eq_ignore_ascii_case(name)))
			.or_else(|| self.script.iter().find(|v| v.name.eq_ignore_ascii_case(name)))
			.or_else(|| self.global.iter().find(|v| v.name.eq_ignore_ascii_case(name)))
	}

	pub fn take_resume(&mut self) -> ResumeAction {
		self.current_stop.take().map(|stop| stop.resume()).unwrap_or(ResumeAction::Continue)
	}
}
