//! The debug service: breakpoint lifecycle, stop capture, variable
//! operations, and stepping, layered over the pipeline executor.
//!
//! External request handlers call in from any thread; everything that talks
//! to the engine is shipped to the pipeline thread as a task. Stop capture
//! is the exception: it runs synchronously inside the debugger-stop event,
//! which the executor delivers on the pipeline thread.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use posh_engine::command::EngineCommand;
use posh_engine::debugger::{BreakpointSite, BreakpointUpdate, Debugger as _, DebuggerStopInfo, ResumeAction, VariableScope};
use posh_engine::error::EngineError;
use posh_engine::events::{HandlerRegistry, Subscription};
use posh_engine::runspace::Runspace as _;
use posh_host::context::SessionEvent;
use posh_host::executor::PipelineExecutor;
use posh_host::options::ExecutionOptions;
use tokio_util::sync::CancellationToken;

use crate::breakpoints::{BreakpointRegistry, CommandBreakpoint, CommandBreakpointSpec, LineBreakpoint, LineBreakpointSpec};
use crate::condition::{compile_action, escape_wildcards, scrub_parse_error};
use crate::error::{DebugError, Result};
use crate::remote_files::RemoteFileMirror;
use crate::stack::{StackFrameDetails, capture_stack};
use crate::variables::{
	AUTO_SCOPE_NAME, GLOBAL_SCOPE_ID, GLOBAL_SCOPE_NAME, LOCAL_SCOPE_NAME, SCRIPT_SCOPE_ID, SCRIPT_SCOPE_NAME, VariableNode, VariableScopeRecord,
	VariableStore, variable_value_string,
};

/// Events the debug service raises toward the protocol layer.
#[derive(Debug, Clone)]
pub enum DebugEvent {
	Stopped {
		script_path: Option<String>,
		line: u32,
		breakpoint_ids: Vec<i64>,
	},
	Resumed(ResumeAction),
	BreakpointChanged(BreakpointUpdate),
}

struct DebugState {
	registry: BreakpointRegistry,
	variables: VariableStore,
	frames: Vec<StackFrameDetails>,
	stopped: bool,
}

struct ServiceInner {
	executor: Arc<PipelineExecutor>,
	mirror: Arc<dyn RemoteFileMirror>,
	state: Mutex<DebugState>,
	events: HandlerRegistry<DebugEvent>,
	workspace_root: Mutex<Option<PathBuf>>,
	hit_counter: AtomicU64,
	_subscription: Mutex<Option<Subscription>>,
}

pub struct DebugService {
	inner: Arc<ServiceInner>,
}

impl DebugService {
	pub fn new(executor: Arc<PipelineExecutor>, mirror: Arc<dyn RemoteFileMirror>) -> Self {
		let inner = Arc::new(ServiceInner {
			executor: Arc::clone(&executor),
			mirror,
			state: Mutex::new(DebugState {
				registry: BreakpointRegistry::new(),
				variables: VariableStore::new(),
				frames: Vec::new(),
				stopped: false,
			}),
			events: HandlerRegistry::new(),
			workspace_root: Mutex::new(None),
			hit_counter: AtomicU64::new(0),
			_subscription: Mutex::new(None),
		});

		let weak = Arc::downgrade(&inner);
		let subscription = executor.subscribe(Arc::new(move |event| {
			if let Some(inner) = weak.upgrade() {
				ServiceInner::on_session_event(&inner, event);
			}
		}));
		inner._subscription.lock().replace(subscription);

		Self { inner }
	}

	pub fn set_workspace_root(&self, root: impl Into<PathBuf>) {
		self.inner.workspace_root.lock().replace(root.into());
	}

	pub fn subscribe(&self, handler: Arc<dyn Fn(&DebugEvent) + Send + Sync>) -> Subscription {
		self.inner.events.subscribe(handler)
	}

	pub fn is_stopped(&self) -> bool {
		self.inner.state.lock().stopped
	}

	// ---- breakpoint lifecycle --------------------------------------------

	/// Sets (optionally replacing) the line breakpoints for one file and
	/// returns their verified states.
	pub fn set_line_breakpoints(&self, path: &str, specs: Vec<LineBreakpointSpec>, clear_existing: bool) -> Result<Vec<LineBreakpoint>> {
		let inner = Arc::clone(&self.inner);
		let path = path.to_string();
		let handle = self.inner.executor.submit_with_runspace(
			format!("set-breakpoints {path}"),
			ExecutionOptions::handler(),
			CancellationToken::new(),
			move |runspace, _cancel| {
				let debugger = runspace.debugger();

				// Remote sessions address breakpoints by the remote path.
				let engine_path = if runspace.info().is_remote() {
					match inner.mirror.map_to_remote(std::path::Path::new(&path)) {
						Some(remote) => remote,
						None => {
							tracing::debug!(path = %path, "breakpoint path has no remote mapping, dropping");
							return Ok(Vec::new());
						}
					}
				} else {
					path.clone()
				};

				if clear_existing {
					let stale = inner.state.lock().registry.clear_file(&path);
					for id in stale {
						debugger
							.remove_breakpoint(id)
							.map_err(|e| posh_host::error::TaskError::Engine(e))?;
					}
				}

				let mut results = Vec::with_capacity(specs.len());
				for spec in &specs {
					let counter = inner.hit_counter.fetch_add(1, Ordering::Relaxed);
					let action = match compile_action(runspace.as_ref(), spec.condition.as_deref(), spec.hit_count, counter) {
						Ok(action) => action,
						Err(message) => {
							results.push(LineBreakpoint::unverified(&path, spec, message));
							continue;
						}
					};
					let site = BreakpointSite::Line {
						path: escape_wildcards(&engine_path),
						line: spec.line,
						column: spec.column,
					};
					match debugger.set_breakpoint(site, action) {
						Ok(engine_bp) => results.push(LineBreakpoint {
							verified: true,
							message: None,
							source: path.clone(),
							line: spec.line,
							column: spec.column,
							condition: spec.condition.clone(),
							hit_count: spec.hit_count,
							id: Some(engine_bp.id),
						}),
						Err(EngineError::Parse(diagnostic)) => {
							results.push(LineBreakpoint::unverified(&path, spec, scrub_parse_error(&diagnostic)));
						}
						Err(error) => return Err(posh_host::error::TaskError::Engine(error)),
					}
				}

				let mut state = inner.state.lock();
				for breakpoint in &results {
					state.registry.record_line_breakpoint(breakpoint.clone());
				}
				Ok(results)
			},
		);
		Ok(handle.wait()?)
	}

	/// Sets (optionally replacing) the session's command breakpoints.
	pub fn set_command_breakpoints(&self, specs: Vec<CommandBreakpointSpec>, clear_existing: bool) -> Result<Vec<CommandBreakpoint>> {
		let inner = Arc::clone(&self.inner);
		let handle = self.inner.executor.submit_with_runspace(
			"set-command-breakpoints",
			ExecutionOptions::handler(),
			CancellationToken::new(),
			move |runspace, _cancel| {
				let debugger = runspace.debugger();
				if clear_existing {
					let stale = inner.state.lock().registry.clear_commands();
					for id in stale {
						debugger
							.remove_breakpoint(id)
							.map_err(|e| posh_host::error::TaskError::Engine(e))?;
					}
				}

				let mut results = Vec::with_capacity(specs.len());
				for spec in &specs {
					let counter = inner.hit_counter.fetch_add(1, Ordering::Relaxed);
					let action = match compile_action(runspace.as_ref(), spec.condition.as_deref(), spec.hit_count, counter) {
						Ok(action) => action,
						Err(message) => {
							results.push(CommandBreakpoint {
								verified: false,
								message: Some(message),
								name: spec.name.clone(),
								condition: spec.condition.clone(),
								hit_count: spec.hit_count,
								id: None,
							});
							continue;
						}
					};
					let site = BreakpointSite::Command { name: spec.name.clone() };
					match debugger.set_breakpoint(site, action) {
						Ok(engine_bp) => results.push(CommandBreakpoint {
							verified: true,
							message: None,
							name: spec.name.clone(),
							condition: spec.condition.clone(),
							hit_count: spec.hit_count,
							id: Some(engine_bp.id),
						}),
						Err(EngineError::Parse(diagnostic)) => results.push(CommandBreakpoint {
							verified: false,
							message: Some(scrub_parse_error(&diagnostic)),
							name: spec.name.clone(),
							condition: spec.condition.clone(),
							hit_count: spec.hit_count,
							id: None,
						}),
						Err(error) => return Err(posh_host::error::TaskError::Engine(error)),
					}
				}

				let mut state = inner.state.lock();
				for breakpoint in &results {
					state.registry.record_command_breakpoint(breakpoint.clone());
				}
				Ok(results)
			},
		);
		Ok(handle.wait()?)
	}

	pub fn breakpoints_in_file(&self, path: &str) -> Vec<LineBreakpoint> {
		self.inner.state.lock().registry.breakpoints_in_file(path)
	}

	// ---- stop-state queries ----------------------------------------------

	pub fn get_stack_frames(&self) -> Result<Vec<StackFrameDetails>> {
		let state = self.inner.state.lock();
		if !state.stopped {
			return Err(DebugError::NotStopped);
		}
		Ok(state.frames.clone())
	}

	/// The four scopes of one frame, in presentation order.
	pub fn get_variable_scopes(&self, frame_index: usize) -> Result<Vec<VariableScopeRecord>> {
		let state = self.inner.state.lock();
		if !state.stopped {
			return Err(DebugError::NotStopped);
		}
		let frame = state.frames.get(frame_index).ok_or(DebugError::UnknownContainer(frame_index))?;
		Ok(vec![
			VariableScopeRecord {
				id: frame.auto_variables_id,
				name: AUTO_SCOPE_NAME.to_string(),
			},
			VariableScopeRecord {
				id: frame.local_variables_id,
				name: LOCAL_SCOPE_NAME.to_string(),
			},
			VariableScopeRecord {
				id: SCRIPT_SCOPE_ID,
				name: SCRIPT_SCOPE_NAME.to_string(),
			},
			VariableScopeRecord {
				id: GLOBAL_SCOPE_ID,
				name: GLOBAL_SCOPE_NAME.to_string(),
			},
		])
	}

	/// Children of a container; ids are assigned on first expansion and
	/// cached for the rest of the stop.
	pub fn get_variables(&self, container_id: usize) -> Result<Vec<VariableNode>> {
		let mut state = self.inner.state.lock();
		if !state.stopped {
			return Err(DebugError::NotStopped);
		}
		state.variables.children_of(container_id).ok_or(DebugError::UnknownContainer(container_id))
	}

	/// Resolves a dotted expression (`obj.Child.Leaf`) against one frame's
	/// scopes by case-insensitive name walk. Returns `None` when any segment
	/// is missing.
	pub fn get_variable_from_expression(&self, expression: &str, frame_index: usize) -> Result<Option<VariableNode>> {
		let scopes = self.get_variable_scopes(frame_index)?;
		let mut segments = expression.split('.');
		let Some(first) = segments.next().map(|s| s.trim_start_matches('$')) else {
			return Ok(None);
		};

		let mut state = self.inner.state.lock();
		let mut current = scopes.iter().find_map(|scope| state.variables.find_child(scope.id, first));
		for segment in segments {
			let Some(node) = current else { break };
			if !node.expandable {
				return Ok(None);
			}
			current = state.variables.find_child(node.id, segment);
		}
		Ok(current)
	}

	/// Evaluates `value_expression` on the pipeline thread and assigns the
	/// result to `name` in the scope that `container_id` denotes. Returns the
	/// new display string.
	pub fn set_variable(&self, container_id: usize, name: &str, value_expression: &str) -> Result<String> {
		let scope = self.scope_for_container(container_id)?;
		let node = {
			let mut state = self.inner.state.lock();
			state
				.variables
				.find_child(container_id, name)
				.ok_or_else(|| DebugError::VariableNotFound(name.to_string()))?
		};

		let inner = Arc::clone(&self.inner);
		let bare_name = name.trim_start_matches('$').to_string();
		let expression = value_expression.to_string();
		let handle = self.inner.executor.submit_with_runspace(
			format!("set-variable {name}"),
			ExecutionOptions::handler(),
			CancellationToken::new(),
			move |runspace, _cancel| {
				let debugger = runspace.debugger();
				let value = debugger.evaluate(&expression).map_err(posh_host::error::TaskError::Engine)?;
				// Variables carrying a type-converter attribute transform
				// through the engine before assignment.
				let value = debugger
					.convert_for_assignment(scope, &bare_name, value)
					.map_err(posh_host::error::TaskError::Engine)?;
				debugger
					.set_variable(scope, &bare_name, value.clone())
					.map_err(posh_host::error::TaskError::Engine)?;
				inner.state.lock().variables.update_value(node.id, &value);
				Ok(variable_value_string(&value))
			},
		);
		Ok(handle.wait()?)
	}

	fn scope_for_container(&self, container_id: usize) -> Result<VariableScope> {
		if container_id == GLOBAL_SCOPE_ID {
			return Ok(VariableScope::Global);
		}
		if container_id == SCRIPT_SCOPE_ID {
			return Ok(VariableScope::Script);
		}
		let state = self.inner.state.lock();
		state
			.frames
			.iter()
			.position(|frame| frame.auto_variables_id == container_id || frame.local_variables_id == container_id)
			.map(|frame| VariableScope::Local { frame })
			.ok_or(DebugError::UnknownContainer(container_id))
	}

	// ---- stepping --------------------------------------------------------

	pub fn continue_execution(&self) -> Result<()> {
		self.send_resume_verb("c")
	}

	pub fn step_over(&self) -> Result<()> {
		self.send_resume_verb("v")
	}

	pub fn step_in(&self) -> Result<()> {
		self.send_resume_verb("s")
	}

	pub fn step_out(&self) -> Result<()> {
		self.send_resume_verb("o")
	}

	/// Terminates the command being debugged.
	pub fn abort(&self) -> Result<()> {
		self.send_resume_verb("q")
	}

	/// Asks the engine to stop at the next statement of running code.
	pub fn break_execution(&self) -> Result<()> {
		let handle = self.inner.executor.submit_with_runspace(
			"break-execution",
			ExecutionOptions::handler(),
			CancellationToken::new(),
			|runspace, _cancel| runspace.debugger().break_execution().map_err(posh_host::error::TaskError::Engine),
		);
		Ok(handle.wait()?)
	}

	fn send_resume_verb(&self, verb: &str) -> Result<()> {
		let handle = self
			.inner
			.executor
			.submit_command(EngineCommand::script(verb), ExecutionOptions::handler(), CancellationToken::new());
		handle.wait()?;
		Ok(())
	}

	// ---- test/diagnostic access ------------------------------------------

	/// Snapshot of one variable's display string by container and name.
	pub fn variable_value(&self, container_id: usize, name: &str) -> Option<String> {
		self.inner.state.lock().variables.find_child(container_id, name).map(|node| node.value_string)
	}
}

impl ServiceInner {
	fn on_session_event(inner: &Arc<Self>, event: &SessionEvent) {
		match event {
			SessionEvent::DebuggerStopped(info) => Self::on_stopped(inner, info),
			SessionEvent::DebuggerResumed(action) => {
				let mut state = inner.state.lock();
				state.stopped = false;
				state.frames.clear();
				state.variables.reset();
				drop(state);
				inner.events.emit(&DebugEvent::Resumed(*action));
			}
			SessionEvent::BreakpointUpdated(update) => {
				inner.state.lock().registry.apply_engine_update(update);
				inner.events.emit(&DebugEvent::BreakpointChanged(update.clone()));
			}
			_ => {}
		}
	}

	/// Runs on the pipeline thread inside the stop event: captures frames and
	/// variables while the engine is parked.
	fn on_stopped(inner: &Arc<Self>, info: &DebuggerStopInfo) {
		let Some(runspace) = inner.executor.current_runspace() else {
			return;
		};
		let debugger = runspace.debugger();

		// A stop with no script gets a materialized listing so the editor
		// still has something to show frames against.
		let fallback_path = if info.script_path.is_none() {
			match debugger.source_listing() {
				Ok(listing) if !listing.is_empty() => {
					let name = format!("[{}] Script Listing.ps1", runspace.info().host_name);
					match inner.mirror.create_temporary_file(&name, &listing) {
						Ok(path) => Some(path.to_string_lossy().into_owned()),
						Err(error) => {
							tracing::debug!(%error, "could not materialize script listing");
							None
						}
					}
				}
				_ => None,
			}
		} else {
			None
		};

		let workspace_root = inner.workspace_root.lock().clone();
		let mut state = inner.state.lock();
		let DebugState { variables, frames, stopped, .. } = &mut *state;
		match capture_stack(debugger, info, fallback_path.as_deref(), workspace_root.as_deref(), variables) {
			Ok(captured) => {
				*frames = captured;
				*stopped = true;
			}
			Err(error) => {
				tracing::warn!(%error, "stack capture failed");
				*frames = Vec::new();
				*stopped = true;
			}
		}
		let line = state.frames.first().map_or(info.region.map_or(1, |r| r.start_line), |f| f.start_line);
		let script_path = state.frames.first().and_then(|f| f.script_path.clone()).or_else(|| info.script_path.clone());
		drop(state);

		inner.events.emit(&DebugEvent::Stopped {
			script_path,
			line,
			breakpoint_ids: info.breakpoint_ids.clone(),
		});
	}
}
