//! Debugger channel of the local binding.

use std::sync::Arc;

use parking_lot::Mutex;

use super::state::SessionState;
use crate::command::EngineCommand;
use crate::debugger::{
	BreakpointSite, BreakpointUpdate, BreakpointUpdateKind, Debugger, DebuggerCommandOutcome, EngineBreakpoint, EngineStackFrame, EngineVariable,
	ResumeAction, VariableScope, is_debugger_command, resume_action_for_verb,
};
use crate::error::EngineError;
use crate::events::HandlerRegistry;
use crate::runspace::OutputSink;
use crate::value::Value;

pub(crate) struct LocalDebugger {
	pub(crate) state: Arc<Mutex<SessionState>>,
	pub(crate) breakpoint_events: HandlerRegistry<BreakpointUpdate>,
}

impl LocalDebugger {
	/// Parses the tiny expression surface the stand-in evaluator supports:
	/// literals and `$name` lookups.
	fn evaluate_text(&self, expression: &str) -> Result<Value, EngineError> {
		let trimmed = expression.trim();
		if let Some(name) = trimmed.strip_prefix('$') {
			let state = self.state.lock();
			return state
				.lookup(name)
				.map(|v| v.value.clone())
				.ok_or_else(|| EngineError::runtime(format!("variable '${name}' is not defined")));
		}
		if let Some(stripped) = trimmed.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')) {
			return Ok(Value::String(stripped.to_string()));
		}
		if let Some(stripped) = trimmed.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
			return Ok(Value::String(stripped.to_string()));
		}
		if trimmed.eq_ignore_ascii_case("$true") || trimmed.eq_ignore_ascii_case("true") {
			return Ok(Value::Bool(true));
		}
		if trimmed.eq_ignore_ascii_case("$false") || trimmed.eq_ignore_ascii_case("false") {
			return Ok(Value::Bool(false));
		}
		if let Ok(n) = trimmed.parse::<i64>() {
			return Ok(Value::Int(n));
		}
		if let Ok(f) = trimmed.parse::<f64>() {
			return Ok(Value::Float(f));
		}
		Ok(Value::String(trimmed.to_string()))
	}
}

impl Debugger for LocalDebugger {
	fn in_breakpoint(&self) -> bool {
		self.state.lock().in_breakpoint
	}

	fn process_command(&self, command: &EngineCommand, output: &dyn OutputSink) -> Result<DebuggerCommandOutcome, EngineError> {
		let text = command
			.leading_script()
			.or(command.leading_command())
			.ok_or_else(|| EngineError::runtime("empty debugger command"))?
			.trim()
			.to_string();

		if is_debugger_command(&text) {
			if let Some(action) = resume_action_for_verb(&text) {
				self.set_resume_action(action);
				return Ok(DebuggerCommandOutcome {
					resume: Some(action),
					handled_by_debugger: true,
				});
			}
			match text.to_ascii_lowercase().as_str() {
				"list" | "l" => output.write_output(&self.source_listing()?),
				"k" => {
					for frame in self.call_stack()? {
						output.write_output(&frame.function_name);
					}
				}
				// h and ? print the same summary the engine console shows.
				_ => output.write_output("c, s, v, o, q, k, l, d, <enter>"),
			}
			return Ok(DebuggerCommandOutcome {
				resume: None,
				handled_by_debugger: true,
			});
		}

		// Anything else evaluates in the stop context.
		let value = self.evaluate_text(&text)?;
		output.write_output(&value.display_string());
		Ok(DebuggerCommandOutcome {
			resume: None,
			handled_by_debugger: true,
		})
	}

	fn set_resume_action(&self, action: ResumeAction) {
		let state = self.state.lock();
		if let Some(stop) = &state.current_stop {
			stop.set_resume(action);
		}
	}

	fn break_execution(&self) -> Result<(), EngineError> {
		self.state.lock().break_requested = true;
		Ok(())
	}

	fn set_breakpoint(&self, site: BreakpointSite, action: Option<String>) -> Result<EngineBreakpoint, EngineError> {
		let breakpoint = {
			let mut state = self.state.lock();
			let id = state.next_breakpoint_id;
			state.next_breakpoint_id += 1;
			let breakpoint = EngineBreakpoint {
				id,
				site,
				action,
				enabled: true,
			};
			state.breakpoints.push(breakpoint.clone());
			breakpoint
		};
		self.breakpoint_events.emit(&BreakpointUpdate {
			kind: BreakpointUpdateKind::Set,
			breakpoint: breakpoint.clone(),
		});
		Ok(breakpoint)
	}

	fn remove_breakpoint(&self, id: i64) -> Result<(), EngineError> {
		let removed = {
			let mut state = self.state.lock();
			let index = state.breakpoints.iter().position(|bp| bp.id == id);
			index.map(|i| state.breakpoints.remove(i))
		};
		if let Some(breakpoint) = removed {
			self.breakpoint_events.emit(&BreakpointUpdate {
				kind: BreakpointUpdateKind::Removed,
				breakpoint,
			});
		}
		Ok(())
	}

	fn breakpoints(&self) -> Vec<EngineBreakpoint> {
		self.state.lock().breakpoints.clone()
	}

	fn call_stack(&self) -> Result<Vec<EngineStackFrame>, EngineError> {
		let state = self.state.lock();
		if !state.in_breakpoint {
			return Err(EngineError::runtime("debugger is not stopped"));
		}
		Ok(state
			.call_stack
			.iter()
			.map(|frame| EngineStackFrame {
				script_path: frame.script_path.clone(),
				function_name: frame.function_name.clone(),
				region: frame.region,
			})
			.collect())
	}

	fn variables(&self, scope: VariableScope) -> Result<Vec<EngineVariable>, EngineError> {
		self.state.lock().scope_variables(scope)
	}

	fn evaluate(&self, expression: &str) -> Result<Value, EngineError> {
		self.evaluate_text(expression)
	}

	fn set_variable(&self, scope: VariableScope, name: &str, value: Value) -> Result<(), EngineError> {
		self.state.lock().assign(scope, name, value)
	}

	fn source_listing(&self) -> Result<String, EngineError> {
		Ok(self.state.lock().source_listing.clone())
	}
}
