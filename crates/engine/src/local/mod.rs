//! In-process stand-in binding.
//!
//! `LocalRunspace` is not a scripting-language implementation: it dispatches
//! pipelines to registered handlers plus a handful of built-in conveniences
//! (`prompt`, `Write-Output`, `Start-Sleep`, variable reads/assignments) so
//! the smoke REPL works and the host/debug test suites can script engine
//! behavior — including debugger stops raised mid-invocation, the way a real
//! binding raises them.

mod debugger;
mod state;

pub use state::LocalFrame;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio_util::sync::CancellationToken;

use self::debugger::LocalDebugger;
use crate::cancel::CancelToken;
use self::state::SessionState;
use crate::command::EngineCommand;
use crate::debugger::{BreakpointUpdate, Debugger, DebuggerStopEvent, DebuggerStopInfo, EngineVariable, ResumeAction, VariableScope};
use crate::error::{EngineError, ParseDiagnostic};
use crate::events::{HandlerRegistry, Subscription};
use crate::runspace::{
	BreakpointUpdatedHandler, DebuggerStopHandler, InvocationContext, OutputSink, ParsedScript, Runspace, RunspaceAvailability, RunspaceInfo,
	RunspaceLocation,
};
use crate::value::Value;

/// Handler for a registered command or script.
pub type ScriptHandler = Arc<dyn Fn(&Invocation<'_>, &EngineCommand) -> Result<Vec<Value>, EngineError> + Send + Sync>;

struct Shared {
	info: RunspaceInfo,
	state: Arc<Mutex<SessionState>>,
	stop_events: HandlerRegistry<DebuggerStopEvent>,
	breakpoint_events: HandlerRegistry<BreakpointUpdate>,
	commands: Mutex<FxHashMap<String, ScriptHandler>>,
	scripts: Mutex<Vec<(String, ScriptHandler)>>,
	interrupt: Mutex<Option<CancellationToken>>,
	closed: AtomicBool,
	poisoned: Mutex<Option<String>>,
}

/// The view handed to handlers while an invocation is in flight.
pub struct Invocation<'a> {
	pub output: &'a dyn OutputSink,
	caller_cancel: &'a CancelToken,
	invoke_cancel: CancellationToken,
	shared: &'a Arc<Shared>,
}

impl Invocation<'_> {
	/// True when the caller's token fired or [`Runspace::interrupt`] ran.
	pub fn is_cancelled(&self) -> bool {
		self.caller_cancel.is_cancelled() || self.invoke_cancel.is_cancelled()
	}

	/// Returns `Err(Interrupted)` once cancellation is observed.
	pub fn checkpoint(&self) -> Result<(), EngineError> {
		if self.is_cancelled() { Err(EngineError::Interrupted) } else { Ok(()) }
	}

	/// Sleeps cancellably, in small slices.
	pub fn sleep(&self, duration: Duration) -> Result<(), EngineError> {
		let deadline = std::time::Instant::now() + duration;
		while std::time::Instant::now() < deadline {
			self.checkpoint()?;
			std::thread::sleep(Duration::from_millis(2));
		}
		self.checkpoint()
	}

	/// Raises a debugger stop on the invoking thread and blocks until the
	/// innermost stop handler returns, yielding the requested resume action.
	pub fn trigger_stop(&self, info: DebuggerStopInfo) -> ResumeAction {
		let event = Arc::new(DebuggerStopEvent::new(info));
		{
			let mut state = self.shared.state.lock();
			state.in_breakpoint = true;
			state.break_requested = false;
			state.current_stop = Some(Arc::clone(&event));
		}
		let delivered = self.shared.stop_events.emit_innermost(&event);
		let mut state = self.shared.state.lock();
		state.in_breakpoint = false;
		let action = state.take_resume();
		if !delivered {
			tracing::warn!("debugger stop raised with no subscriber");
		}
		action
	}

	/// True when a `break_execution` request is pending; consumes it.
	pub fn take_break_request(&self) -> bool {
		std::mem::take(&mut self.shared.state.lock().break_requested)
	}

	pub fn assign(&self, scope: VariableScope, name: &str, value: Value) -> Result<(), EngineError> {
		self.shared.state.lock().assign(scope, name, value)
	}

	pub fn lookup(&self, name: &str) -> Option<Value> {
		self.shared.state.lock().lookup(name).map(|v| v.value.clone())
	}
}

/// Builder for [`LocalRunspace`].
pub struct LocalRunspaceBuilder {
	location: RunspaceLocation,
	host_name: String,
}

impl LocalRunspaceBuilder {
	pub fn remote(mut self) -> Self {
		self.location = RunspaceLocation::Remote;
		self
	}

	pub fn host_name(mut self, name: impl Into<String>) -> Self {
		self.host_name = name.into();
		self
	}

	pub fn build(self) -> Arc<LocalRunspace> {
		let state = Arc::new(Mutex::new(SessionState::default()));
		let breakpoint_events = HandlerRegistry::new();
		Arc::new(LocalRunspace {
			debugger: LocalDebugger {
				state: Arc::clone(&state),
				breakpoint_events: breakpoint_events.clone(),
			},
			shared: Arc::new(Shared {
				info: RunspaceInfo {
					location: self.location,
					host_name: self.host_name,
				},
				state,
				stop_events: HandlerRegistry::new(),
				breakpoint_events,
				commands: Mutex::new(FxHashMap::default()),
				scripts: Mutex::new(Vec::new()),
				interrupt: Mutex::new(None),
				closed: AtomicBool::new(false),
				poisoned: Mutex::new(None),
			}),
		})
	}
}

pub struct LocalRunspace {
	shared: Arc<Shared>,
	debugger: LocalDebugger,
}

impl LocalRunspace {
	pub fn builder() -> LocalRunspaceBuilder {
		LocalRunspaceBuilder {
			location: RunspaceLocation::Local,
			host_name: "posh".to_string(),
		}
	}

	/// A local session with default built-ins only.
	pub fn local() -> Arc<Self> {
		Self::builder().build()
	}

	/// Registers a handler for a named command (case-insensitive).
	pub fn register_command(&self, name: impl Into<String>, handler: ScriptHandler) {
		self.shared.commands.lock().insert(name.into().to_ascii_lowercase(), handler);
	}

	/// Registers a handler for an exact script text.
	pub fn register_script(&self, text: impl Into<String>, handler: ScriptHandler) {
		self.shared.scripts.lock().push((text.into().trim().to_string(), handler));
	}

	pub fn history(&self) -> Vec<String> {
		self.shared.state.lock().history.clone()
	}

	pub fn set_variable_fixture(&self, scope: VariableScope, variable: EngineVariable) {
		let mut state = self.shared.state.lock();
		match state.scope_variables_mut(scope) {
			Ok(variables) => variables.push(variable),
			Err(_) => tracing::warn!("variable fixture targets a missing frame"),
		}
	}

	pub fn set_call_stack_fixture(&self, frames: Vec<LocalFrame>) {
		self.shared.state.lock().call_stack = frames;
	}

	pub fn set_source_listing(&self, listing: impl Into<String>) {
		self.shared.state.lock().source_listing = listing.into();
	}

	/// Makes every subsequent invocation fail with `SessionLost`, simulating
	/// a dropped remote or corrupted engine state.
	pub fn poison(&self, reason: impl Into<String>) {
		*self.shared.poisoned.lock() = Some(reason.into());
		self.shared.state.lock().availability = RunspaceAvailability::Unusable;
	}

	fn builtin_command(&self, invocation: &Invocation<'_>, name: &str, command: &EngineCommand) -> Result<Vec<Value>, EngineError> {
		match name.to_ascii_lowercase().as_str() {
			"prompt" => {
				let prompt = if self.debugger.in_breakpoint() { "[DBG]: PS> " } else { "PS> " };
				Ok(vec![Value::from(prompt)])
			}
			"write-output" => {
				let values: Vec<Value> = command.steps()[0].parameters.iter().filter_map(|p| p.value.clone()).collect();
				Ok(values)
			}
			"start-sleep" => {
				let seconds = command.steps()[0]
					.parameters
					.iter()
					.filter_map(|p| p.value.as_ref())
					.find_map(|v| match v {
						Value::Int(n) => Some(*n),
						_ => None,
					})
					.unwrap_or(0);
				invocation.sleep(Duration::from_secs(seconds.max(0) as u64))?;
				Ok(Vec::new())
			}
			_ => Err(EngineError::runtime(format!("The term '{name}' is not recognized as a command"))),
		}
	}

	fn builtin_script(&self, invocation: &Invocation<'_>, text: &str) -> Result<Vec<Value>, EngineError> {
		let trimmed = text.trim();
		if let Some(rest) = trimmed.strip_prefix("Write-Output ") {
			return Ok(rest.split_whitespace().map(|token| self.debugger.evaluate(token)).collect::<Result<_, _>>()?);
		}
		if let Some(rest) = trimmed.strip_prefix("Start-Sleep ") {
			let seconds: u64 = rest.trim().parse().map_err(|_| EngineError::runtime("Start-Sleep expects a duration"))?;
			invocation.sleep(Duration::from_secs(seconds))?;
			return Ok(Vec::new());
		}
		if trimmed.eq_ignore_ascii_case("$pid") {
			return Ok(vec![Value::Int(i64::from(std::process::id()))]);
		}
		if let Some((name, expr)) = trimmed.strip_prefix('$').and_then(|rest| rest.split_once('=')) {
			let value = self.debugger.evaluate(expr.trim())?;
			invocation.assign(VariableScope::Global, name.trim(), value)?;
			return Ok(Vec::new());
		}
		if let Some(name) = trimmed.strip_prefix('$') {
			return invocation
				.lookup(name)
				.map(|value| vec![value])
				.ok_or_else(|| EngineError::runtime(format!("variable '${name}' is not defined")));
		}
		Err(EngineError::runtime(format!(
			"The term '{}' is not recognized as a command",
			trimmed.split_whitespace().next().unwrap_or_default()
		)))
	}

	fn dispatch(&self, invocation: &Invocation<'_>, command: &EngineCommand) -> Result<Vec<Value>, EngineError> {
		if let Some(name) = command.leading_command() {
			let handler = self.shared.commands.lock().get(&name.to_ascii_lowercase()).cloned();
			return match handler {
				Some(handler) => handler(invocation, command),
				None => self.builtin_command(invocation, name, command),
			};
		}
		if let Some(text) = command.leading_script() {
			let handler = {
				let scripts = self.shared.scripts.lock();
				scripts.iter().find(|(registered, _)| registered == text.trim()).map(|(_, h)| Arc::clone(h))
			};
			return match handler {
				Some(handler) => handler(invocation, command),
				None => self.builtin_script(invocation, text),
			};
		}
		Err(EngineError::runtime("empty pipeline"))
	}
}

impl Runspace for LocalRunspace {
	fn info(&self) -> RunspaceInfo {
		self.shared.info.clone()
	}

	fn availability(&self) -> RunspaceAvailability {
		if self.shared.closed.load(Ordering::SeqCst) {
			return RunspaceAvailability::Unusable;
		}
		self.shared.state.lock().availability
	}

	fn invoke(&self, command: &EngineCommand, output: &dyn OutputSink, ctx: &InvocationContext<'_>) -> Result<Vec<Value>, EngineError> {
		if self.shared.closed.load(Ordering::SeqCst) {
			return Err(EngineError::SessionLost("runspace closed".to_string()));
		}
		if let Some(reason) = self.shared.poisoned.lock().clone() {
			return Err(EngineError::SessionLost(reason));
		}
		if ctx.cancel.is_cancelled() {
			return Err(EngineError::Interrupted);
		}

		{
			let mut state = self.shared.state.lock();
			state.availability = RunspaceAvailability::Busy;
			if ctx.add_to_history {
				state.history.push(command.representation());
			}
		}

		let invoke_cancel = CancellationToken::new();
		// Nested pipelines (debug prompt evaluation) replace the interrupt
		// registration for their duration and restore the outer one after.
		let previous = self.shared.interrupt.lock().replace(invoke_cancel.clone());
		let invocation = Invocation {
			output,
			caller_cancel: ctx.cancel,
			invoke_cancel,
			shared: &self.shared,
		};

		let result = self.dispatch(&invocation, command);

		*self.shared.interrupt.lock() = previous;
		self.shared.state.lock().availability = RunspaceAvailability::Available;
		result
	}

	fn interrupt(&self) {
		if let Some(token) = self.shared.interrupt.lock().as_ref() {
			token.cancel();
		}
	}

	fn debugger(&self) -> &dyn Debugger {
		&self.debugger
	}

	fn parse(&self, source: &str) -> Result<ParsedScript, ParseDiagnostic> {
		parse_source(source)
	}

	fn on_debugger_stop(&self, handler: DebuggerStopHandler) -> Subscription {
		self.shared.stop_events.subscribe(handler)
	}

	fn on_breakpoint_updated(&self, handler: BreakpointUpdatedHandler) -> Subscription {
		self.shared.breakpoint_events.subscribe(handler)
	}

	fn close(&self) {
		self.shared.closed.store(true, Ordering::SeqCst);
	}
}

/// Minimal structural parse: balanced delimiters and flow-break detection.
fn parse_source(source: &str) -> Result<ParsedScript, ParseDiagnostic> {
	let mut depth: Vec<(char, u32, u32)> = Vec::new();
	let mut in_quote: Option<char> = None;
	let mut has_flow_break = false;
	let mut word = String::new();
	let mut line = 1u32;
	let mut column = 0u32;

	for ch in source.chars() {
		if ch == '\n' {
			line += 1;
			column = 0;
		} else {
			column += 1;
		}

		if let Some(quote) = in_quote {
			if ch == quote {
				in_quote = None;
			}
			continue;
		}

		if ch.is_alphanumeric() {
			word.push(ch);
			continue;
		}
		if word.eq_ignore_ascii_case("break") || word.eq_ignore_ascii_case("continue") {
			has_flow_break = true;
		}
		word.clear();

		match ch {
			'\'' | '"' => in_quote = Some(ch),
			'(' | '{' | '[' => depth.push((ch, line, column)),
			')' | '}' | ']' => {
				let expected = match ch {
					')' => '(',
					'}' => '{',
					_ => '[',
				};
				match depth.pop() {
					Some((open, ..)) if open == expected => {}
					_ => return Err(ParseDiagnostic::new(format!("unexpected '{ch}'"), line, column)),
				}
			}
			_ => {}
		}
	}

	if word.eq_ignore_ascii_case("break") || word.eq_ignore_ascii_case("continue") {
		has_flow_break = true;
	}
	if let Some(quote) = in_quote {
		return Err(ParseDiagnostic::new(format!("unterminated {quote} string"), line, column));
	}
	if let Some((open, open_line, open_column)) = depth.pop() {
		return Err(ParseDiagnostic::new(format!("missing closing delimiter for '{open}'"), open_line, open_column));
	}

	Ok(ParsedScript { has_flow_break })
}
