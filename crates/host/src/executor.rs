//! Pipeline thread executor.
//!
//! One dedicated OS thread owns every engine invocation for the process
//! lifetime. Producers submit tasks and immediately receive a promise; the
//! thread consumes the foreground deque through one of three loops
//! (top-level, nested, debug) chosen by the current frame, and drains the
//! background deque only while the engine is idle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::ThreadId;

use parking_lot::{Mutex, RwLock};
use posh_engine::cancel::CancelToken;
use posh_engine::command::EngineCommand;
use posh_engine::debugger::{Debugger as _, DebuggerStopEvent, ResumeAction, is_debugger_command};
use posh_engine::error::{EngineError, ErrorRecord};
use posh_engine::events::Subscription;
use posh_engine::global;
use posh_engine::runspace::{InvocationContext, OutputSink, Runspace as _, RunspaceAvailability, RunspaceHandle, RunspaceInfo};
use posh_engine::value::Value;
use tokio_util::sync::CancellationToken;

use crate::cancel::CancellationContext;
use crate::console::{ConsoleHost, NullConsole};
use crate::context::{RunspaceContext, SessionEvent};
use crate::deque::{PriorityDeque, TakeError};
use crate::error::TaskError;
use crate::frame::{FrameType, RunspaceFrame};
use crate::options::{ExecutionOptions, Priority};
use crate::readline::{NoInput, ReadLineProvider};
use crate::repl::ReplTask;
use crate::task::{self, ExecutionStatus, ExecutionStatusEvent, PipelineTask, TaskEnv, TaskHandle};

/// Creates a fresh engine session; used at startup and when failure recovery
/// unwinds the whole stack.
pub type RunspaceFactory = Box<dyn Fn() -> RunspaceHandle + Send + Sync>;

/// One active debugger stop: the loop-exit signal plus the resume action the
/// resuming command recorded.
pub(crate) struct DebugSession {
	resumed: CancellationToken,
	action: Mutex<Option<ResumeAction>>,
}

/// Routes engine pipeline output to the host console according to the task's
/// execution options.
struct HostOutput<'a> {
	console: &'a dyn ConsoleHost,
	echo_output: bool,
	echo_errors: bool,
}

impl OutputSink for HostOutput<'_> {
	fn write_output(&self, text: &str) {
		if self.echo_output {
			self.console.write_line(text);
		}
	}

	fn write_error(&self, record: &ErrorRecord) {
		if self.echo_errors {
			self.console.write_error_line(&record.to_string());
		}
	}
}

pub(crate) struct PipelineInner {
	pub(crate) foreground: PriorityDeque<Box<dyn PipelineTask>>,
	pub(crate) background: PriorityDeque<Box<dyn PipelineTask>>,
	pub(crate) thread_cancel: CancellationToken,
	loop_scopes: CancellationContext,
	command_scopes: CancellationContext,
	/// Shared for task execution, exclusive for failure recovery.
	task_processing: RwLock<()>,
	pub(crate) context: RunspaceContext,
	pub(crate) console: Arc<dyn ConsoleHost>,
	pub(crate) readline: Arc<dyn ReadLineProvider>,
	factory: RunspaceFactory,
	pub(crate) repl_enabled: AtomicBool,
	idle_supported: AtomicBool,
	in_idle: AtomicBool,
	debug_sessions: Mutex<Vec<Arc<DebugSession>>>,
	thread_id: Mutex<Option<ThreadId>>,
}

impl PipelineInner {
	// ---- submission side -------------------------------------------------

	pub(crate) fn enqueue(&self, task: Box<dyn PipelineTask>) {
		self.emit_status(task.representation(), ExecutionStatus::Pending);
		let options = task.options().clone();
		tracing::debug!(task = %task.representation(), priority = ?options.priority, "pipeline.submit");

		if options.interrupt_current_foreground {
			// Fence the deque so nothing dequeues between the cancellation
			// and the injected task.
			let _gate = self.foreground.block_consumers();
			self.cancel_current_task();
			self.foreground.prepend(task);
			return;
		}

		let use_background = !options.must_run_in_foreground && self.repl_enabled.load(Ordering::SeqCst) && self.idle_supported.load(Ordering::SeqCst);
		let deque = if use_background { &self.background } else { &self.foreground };
		match options.priority {
			Priority::Next => deque.prepend(task),
			Priority::Normal => deque.append(task),
		}
	}

	pub(crate) fn cancel_current_task(&self) {
		tracing::debug!("pipeline.cancel_current");
		if let Some(runspace) = self.context.current_runspace() {
			runspace.interrupt();
		}
		self.command_scopes.cancel_current();
	}

	pub(crate) fn cancel_current_task_stack(&self) {
		tracing::debug!("pipeline.cancel_stack");
		if let Some(runspace) = self.context.current_runspace() {
			runspace.interrupt();
		}
		self.command_scopes.cancel_all();
	}

	pub(crate) fn emit_status(&self, representation: &str, status: ExecutionStatus) {
		self.context.emit(SessionEvent::ExecutionStatus(ExecutionStatusEvent {
			representation: representation.to_string(),
			status,
		}));
	}

	// ---- frame management ------------------------------------------------

	/// Pushes a frame for `runspace`, subscribing the frame to the engine's
	/// debugger-stop and breakpoint-updated events. Pipeline thread only.
	pub(crate) fn push_frame(self: &Arc<Self>, runspace: RunspaceHandle, frame_type: FrameType) -> Arc<RunspaceFrame> {
		let frame = Arc::new(RunspaceFrame::new(Arc::clone(&runspace), frame_type));

		let weak = Arc::downgrade(self);
		frame.attach(runspace.on_debugger_stop(Arc::new(move |event| {
			if let Some(inner) = weak.upgrade() {
				PipelineInner::handle_debugger_stop(&inner, event);
			}
		})));
		let weak = Arc::downgrade(self);
		frame.attach(runspace.on_breakpoint_updated(Arc::new(move |update| {
			if let Some(inner) = weak.upgrade() {
				inner.context.emit(SessionEvent::BreakpointUpdated(update.clone()));
			}
		})));

		self.context.push_frame(Arc::clone(&frame));
		global::set_default_runspace(&runspace);
		frame
	}

	/// Pops the current frame. The engine handle is released when no other
	/// frame shares it: asynchronously when the session is exiting,
	/// synchronously otherwise.
	pub(crate) fn pop_frame(&self) -> Option<Arc<RunspaceFrame>> {
		let frame = self.context.pop_frame()?;
		if !self.context.stack().shares_runspace(frame.runspace()) {
			let runspace = Arc::clone(frame.runspace());
			if frame.is_session_exiting() {
				std::thread::spawn(move || runspace.close());
			} else {
				runspace.close();
			}
		}
		match self.context.current_runspace() {
			Some(top) => global::set_default_runspace(&top),
			None => global::clear_default_runspace(),
		}
		Some(frame)
	}

	// ---- pipeline thread -------------------------------------------------

	fn thread_main(inner: Arc<PipelineInner>) {
		*inner.thread_id.lock() = Some(std::thread::current().id());
		let runspace = (inner.factory)();
		inner.push_frame(runspace, FrameType::empty());
		tracing::debug!("pipeline thread started");

		inner.top_level_loop();

		// Settle every promise still queued, then unwind the stack.
		inner.command_scopes.cancel_all();
		for queue in [&inner.foreground, &inner.background] {
			for task in queue.drain() {
				inner.emit_status(task.representation(), ExecutionStatus::Aborted);
				task.drop_cancelled();
			}
		}
		let popped = inner.context.stack().try_pop_to_depth(0);
		let mut closed: Vec<usize> = Vec::new();
		for frame in popped {
			let key = Arc::as_ptr(frame.runspace()) as *const () as usize;
			if !closed.contains(&key) {
				closed.push(key);
				frame.runspace().close();
			}
		}
		global::clear_default_runspace();
		tracing::debug!("pipeline thread stopped");
	}

	fn top_level_loop(self: &Arc<Self>) {
		loop {
			if self.thread_cancel.is_cancelled() {
				break;
			}
			let Some(frame) = self.context.current_frame() else { break };
			if frame.is_exiting() {
				break;
			}
			let parents = CancelToken::union([frame.cancel_token(), self.thread_cancel.clone()]);
			let loop_scope = self.loop_scopes.enter_scope(&parents);
			match self.foreground.take(loop_scope.token()) {
				Ok(task) => self.run_task(task, loop_scope.token()),
				Err(TakeError::Cancelled) => continue,
			}
		}
	}

	/// Nested-prompt loop; with a debug session attached this is the debug
	/// loop, whose `take` is additionally woken by the resumed signal. The
	/// resume flag is only consulted between tasks: the task that effects
	/// the resume must run to completion.
	pub(crate) fn nested_loop(self: &Arc<Self>, frame: &Arc<RunspaceFrame>, session: Option<&Arc<DebugSession>>) {
		loop {
			if self.thread_cancel.is_cancelled() || frame.is_exiting() {
				break;
			}
			if session.is_some_and(|s| s.resumed.is_cancelled()) {
				break;
			}
			let parents = CancelToken::union([frame.cancel_token(), self.thread_cancel.clone()]);
			let loop_scope = self.loop_scopes.enter_scope(&parents);
			let take_token = match session {
				Some(s) => loop_scope.token().joined(s.resumed.clone()),
				None => loop_scope.token().clone(),
			};
			match self.foreground.take(&take_token) {
				Ok(task) => self.run_task(task, loop_scope.token()),
				Err(TakeError::Cancelled) => continue,
			}
		}
	}

	/// Drains the background deque without blocking, inside a
	/// non-interactive frame. Invoked by the read-line provider's idle hook,
	/// on the pipeline thread.
	pub(crate) fn run_idle_loop(self: &Arc<Self>) {
		if self.in_idle.swap(true, Ordering::SeqCst) {
			return;
		}
		if let Some(parent) = self.context.current_frame() {
			let frame = self.push_frame(Arc::clone(parent.runspace()), parent.frame_type() | FrameType::NON_INTERACTIVE);
			while !self.thread_cancel.is_cancelled() {
				let Some(task) = self.background.try_take() else { break };
				let parents = CancelToken::union([frame.cancel_token(), self.thread_cancel.clone()]);
				let loop_scope = self.loop_scopes.enter_scope(&parents);
				self.run_task(task, loop_scope.token());
			}
			self.pop_frame();
		}
		self.in_idle.store(false, Ordering::SeqCst);
	}

	fn run_task(self: &Arc<Self>, task: Box<dyn PipelineTask>, loop_token: &CancelToken) {
		if task.caller_cancelled() {
			// Dropped before dequeue: promise cancelled, engine untouched.
			self.emit_status(task.representation(), ExecutionStatus::Aborted);
			tracing::debug!(task = %task.representation(), "pipeline.dropped_cancelled");
			task.drop_cancelled();
			return;
		}

		let representation = task.representation().to_string();
		let scope = self.command_scopes.enter_scope(loop_token);
		let outcome;
		let fatal;
		{
			let _processing = self.task_processing.read();
			self.emit_status(&representation, ExecutionStatus::Running);
			tracing::debug!(task = %representation, "pipeline.execute");
			let mut env = TaskEnv {
				inner: self,
				scope: scope.token().clone(),
				fatal: None,
			};
			outcome = task.run(&mut env);
			fatal = env.fatal;
		}
		drop(scope);
		self.emit_status(&representation, outcome.status());

		if let Some(reason) = fatal {
			self.recover_runspace(&reason);
		}
	}

	// ---- command execution -----------------------------------------------

	/// Runs one engine command the way §4.4 prescribes: inside a fresh
	/// isolation frame, routed through the debugger channel when the
	/// debugger is stopped and the command is an intrinsic verb (or the
	/// runspace is remote), with error disposition per the options.
	pub(crate) fn execute_command(
		inner: &Arc<Self>,
		scope: &CancelToken,
		command: &EngineCommand,
		options: &ExecutionOptions,
		fatal: &mut Option<String>,
	) -> Result<Vec<Value>, TaskError> {
		let parent = inner.context.current_frame().ok_or_else(|| TaskError::failed("no active runspace"))?;
		let frame = inner.push_frame(Arc::clone(parent.runspace()), parent.frame_type());
		let result = Self::invoke_in_frame(inner, &frame, scope, command, options, fatal);
		inner.pop_frame();
		result
	}

	fn invoke_in_frame(
		inner: &Arc<Self>,
		frame: &RunspaceFrame,
		scope: &CancelToken,
		command: &EngineCommand,
		options: &ExecutionOptions,
		fatal: &mut Option<String>,
	) -> Result<Vec<Value>, TaskError> {
		let runspace = frame.runspace();
		debug_assert!(global::is_default_runspace(runspace), "current frame must hold the default engine slot");

		if options.write_input_to_host {
			inner.console.write_line(&command.representation());
		}
		let sink = HostOutput {
			console: inner.console.as_ref(),
			echo_output: options.write_output_to_host,
			echo_errors: !options.throw_on_error,
		};

		let debugger = runspace.debugger();
		let text = command.leading_script().or_else(|| command.leading_command());
		if debugger.in_breakpoint() && (runspace.info().is_remote() || text.is_some_and(is_debugger_command)) {
			return match debugger.process_command(command, &sink) {
				Ok(outcome) => {
					if let Some(action) = outcome.resume {
						tracing::debug!(?action, "debugger resume requested");
						inner.signal_debugger_resume(action);
					}
					Ok(Vec::new())
				}
				Err(error) => Self::settle_engine_error(inner, scope, runspace, error, options, fatal),
			};
		}

		let ctx = InvocationContext::new(scope).with_history(options.add_to_history);
		match runspace.invoke(command, &sink, &ctx) {
			Ok(values) => {
				if options.write_output_to_host {
					for value in &values {
						let text = value.display_string();
						if !text.is_empty() {
							inner.console.write_line(&text);
						}
					}
				}
				Ok(values)
			}
			Err(error) => Self::settle_engine_error(inner, scope, runspace, error, options, fatal),
		}
	}

	fn settle_engine_error(
		inner: &Arc<Self>,
		scope: &CancelToken,
		runspace: &RunspaceHandle,
		error: EngineError,
		options: &ExecutionOptions,
		fatal: &mut Option<String>,
	) -> Result<Vec<Value>, TaskError> {
		match error {
			EngineError::Interrupted => {
				Self::verify_cancellation(inner, runspace);
				Err(TaskError::Cancelled)
			}
			error if error.is_fatal() => {
				*fatal = Some(error.to_string());
				Err(TaskError::Engine(error))
			}
			error => {
				if scope.is_cancelled() {
					Self::verify_cancellation(inner, runspace);
					return Err(TaskError::Cancelled);
				}
				if options.throw_on_error {
					Err(TaskError::Engine(error))
				} else {
					match error {
						EngineError::Runtime(record) => inner.console.write_error_line(&record.to_string()),
						other => inner.console.write_error_line(&other.to_string()),
					}
					Ok(Vec::new())
				}
			}
		}
	}

	/// A stopped pipeline on a remote runspace may leave the remote side
	/// sitting in its breakpoint; probe and force a Stop resume so the debug
	/// session unwinds.
	fn verify_cancellation(inner: &Arc<Self>, runspace: &RunspaceHandle) {
		if runspace.info().is_remote() && runspace.debugger().in_breakpoint() {
			tracing::debug!("remote still in breakpoint after cancel, forcing resume=Stop");
			runspace.debugger().set_resume_action(ResumeAction::Stop);
			inner.signal_debugger_resume(ResumeAction::Stop);
		}
	}

	// ---- debugger --------------------------------------------------------

	pub(crate) fn signal_debugger_resume(&self, action: ResumeAction) {
		let sessions = self.debug_sessions.lock();
		if let Some(session) = sessions.last() {
			*session.action.lock() = Some(action);
			session.resumed.cancel();
			self.foreground.notify();
		}
	}

	/// Engine debugger-stop handler: pushes a debug frame, runs the debug
	/// loop until a command effects a resume, then reports the resume action
	/// back to the engine through the event.
	pub(crate) fn handle_debugger_stop(inner: &Arc<Self>, event: &DebuggerStopEvent) {
		tracing::debug!(script = ?event.info.script_path, "debugger stopped");
		let Some(parent) = inner.context.current_frame() else {
			return;
		};
		let frame = inner.push_frame(Arc::clone(parent.runspace()), parent.frame_type() | FrameType::DEBUG | FrameType::NESTED);
		inner.context.emit(SessionEvent::DebuggerStopped(event.info.clone()));

		let session = Arc::new(DebugSession {
			resumed: CancellationToken::new(),
			action: Mutex::new(None),
		});
		inner.debug_sessions.lock().push(Arc::clone(&session));
		if inner.repl_enabled.load(Ordering::SeqCst) {
			inner.foreground.prepend(Box::new(ReplTask::new(inner.context.depth())));
		}

		inner.nested_loop(&frame, Some(&session));

		inner.debug_sessions.lock().pop();
		inner.pop_frame();
		let action = session.action.lock().take().unwrap_or(ResumeAction::Continue);
		event.set_resume(action);
		inner.context.emit(SessionEvent::DebuggerResumed(action));
	}

	// ---- failure recovery ------------------------------------------------

	/// Unwinds unusable frames under the task-processing writer lock; if the
	/// stack empties, reinitializes the engine from the factory.
	fn recover_runspace(self: &Arc<Self>, reason: &str) {
		tracing::warn!(reason, "runspace failure, recovering");
		let _guard = self.task_processing.write();
		while let Some(frame) = self.context.current_frame() {
			if frame.runspace().availability() != RunspaceAvailability::Unusable {
				break;
			}
			self.pop_frame();
		}
		if self.context.depth() == 0 {
			let runspace = (self.factory)();
			self.push_frame(runspace, FrameType::empty());
			self.console.write_error_line(&format!("The session became unusable and was reinitialized: {reason}"));
		}
	}
}

/// Handle to the pipeline executor. Cloneable submission side lives behind
/// `Arc`; dropping the last handle shuts the thread down.
pub struct PipelineExecutor {
	inner: Arc<PipelineInner>,
	thread: Mutex<Option<std::thread::JoinHandle<()>>>,
}

pub struct PipelineExecutorBuilder {
	console: Arc<dyn ConsoleHost>,
	readline: Arc<dyn ReadLineProvider>,
	factory: RunspaceFactory,
}

impl PipelineExecutorBuilder {
	pub fn console(mut self, console: Arc<dyn ConsoleHost>) -> Self {
		self.console = console;
		self
	}

	pub fn readline(mut self, readline: Arc<dyn ReadLineProvider>) -> Self {
		self.readline = readline;
		self
	}

	/// Spawns the pipeline thread and returns the executor handle.
	pub fn start(self) -> std::io::Result<PipelineExecutor> {
		let inner = Arc::new(PipelineInner {
			foreground: PriorityDeque::new(),
			background: PriorityDeque::new(),
			thread_cancel: CancellationToken::new(),
			loop_scopes: CancellationContext::new(),
			command_scopes: CancellationContext::new(),
			task_processing: RwLock::new(()),
			context: RunspaceContext::new(),
			console: self.console,
			readline: self.readline,
			factory: self.factory,
			repl_enabled: AtomicBool::new(false),
			idle_supported: AtomicBool::new(false),
			in_idle: AtomicBool::new(false),
			debug_sessions: Mutex::new(Vec::new()),
			thread_id: Mutex::new(None),
		});

		// Cancellation chokepoints wake blocked consumers immediately.
		for scopes in [&inner.loop_scopes, &inner.command_scopes] {
			let weak = Arc::downgrade(&inner);
			scopes.register_waker(Arc::new(move || {
				if let Some(inner) = weak.upgrade() {
					inner.foreground.notify();
					inner.background.notify();
				}
			}));
		}

		let thread_inner = Arc::clone(&inner);
		let thread = std::thread::Builder::new()
			.name("posh-pipeline".to_string())
			.spawn(move || PipelineInner::thread_main(thread_inner))?;

		Ok(PipelineExecutor {
			inner,
			thread: Mutex::new(Some(thread)),
		})
	}
}

impl PipelineExecutor {
	pub fn builder(factory: impl Fn() -> RunspaceHandle + Send + Sync + 'static) -> PipelineExecutorBuilder {
		PipelineExecutorBuilder {
			console: Arc::new(NullConsole),
			readline: Arc::new(NoInput),
			factory: Box::new(factory),
		}
	}

	/// Submits an engine command. The promise settles from the pipeline
	/// thread; inconsistent options fail it immediately.
	pub fn submit_command(&self, command: EngineCommand, options: ExecutionOptions, caller: CancellationToken) -> TaskHandle<Vec<Value>> {
		if let Err(message) = options.validate() {
			return TaskHandle::rejected(command.representation(), TaskError::Rejected(message));
		}
		let (task, handle) = task::command_task(command, options, caller);
		self.inner.enqueue(Box::new(task));
		handle
	}

	/// Submits a closure of the engine handle.
	pub fn submit_with_runspace<T: Send + 'static>(
		&self,
		representation: impl Into<String>,
		options: ExecutionOptions,
		caller: CancellationToken,
		body: impl FnOnce(&RunspaceHandle, &CancelToken) -> Result<T, TaskError> + Send + 'static,
	) -> TaskHandle<T> {
		let representation = representation.into();
		if let Err(message) = options.validate() {
			return TaskHandle::rejected(representation, TaskError::Rejected(message));
		}
		let (task, handle) = task::runspace_task(representation, options, caller, Box::new(body));
		self.inner.enqueue(Box::new(task));
		handle
	}

	/// Submits a closure of cancellation alone.
	pub fn submit_with_cancel<T: Send + 'static>(
		&self,
		representation: impl Into<String>,
		options: ExecutionOptions,
		caller: CancellationToken,
		body: impl FnOnce(&CancelToken) -> Result<T, TaskError> + Send + 'static,
	) -> TaskHandle<T> {
		let representation = representation.into();
		if let Err(message) = options.validate() {
			return TaskHandle::rejected(representation, TaskError::Rejected(message));
		}
		let (task, handle) = task::cancel_task(representation, options, caller, Box::new(body));
		self.inner.enqueue(Box::new(task));
		handle
	}

	/// Cancels the task currently running on the pipeline thread (or the
	/// read-line wait standing in for one). The console Ctrl-C handler
	/// routes here.
	pub fn cancel_current_task(&self) {
		self.inner.cancel_current_task();
	}

	/// Cancels every scope on the pipeline thread's stack.
	pub fn cancel_current_task_stack(&self) {
		self.inner.cancel_current_task_stack();
	}

	/// Starts the interactive console REPL and installs the idle hook that
	/// drains background tasks while reads block.
	pub fn start_repl(&self) {
		if self.inner.repl_enabled.swap(true, Ordering::SeqCst) {
			return;
		}
		let weak = Arc::downgrade(&self.inner);
		let installed = self.inner.readline.try_override_idle_handler(Arc::new(move || {
			if let Some(inner) = weak.upgrade() {
				inner.run_idle_loop();
			}
		}));
		self.inner.idle_supported.store(installed, Ordering::SeqCst);
		self.inner.foreground.append(Box::new(ReplTask::new(1)));
	}

	/// Subscribes to session lifecycle events, delivered synchronously on
	/// the pipeline thread.
	pub fn subscribe(&self, handler: Arc<dyn Fn(&SessionEvent) + Send + Sync>) -> Subscription {
		self.inner.context.subscribe(handler)
	}

	/// The current engine session's metadata, for diagnostics.
	pub fn runspace_info(&self) -> Option<RunspaceInfo> {
		self.inner.context.current_runspace().map(|runspace| runspace.info())
	}

	/// The current engine handle. Invoking it is only legal from the
	/// pipeline thread (i.e. inside session event handlers); other threads
	/// must restrict themselves to metadata.
	pub fn current_runspace(&self) -> Option<RunspaceHandle> {
		self.inner.context.current_runspace()
	}

	/// Marks the session as exiting: the current frame's loop winds down and
	/// its engine handle is released off-thread.
	pub fn request_session_exit(&self) {
		if let Some(frame) = self.inner.context.current_frame() {
			frame.mark_session_exiting();
		}
		self.inner.foreground.notify();
	}

	/// The pipeline thread's id, once the thread has started.
	pub fn pipeline_thread_id(&self) -> Option<ThreadId> {
		*self.inner.thread_id.lock()
	}

	/// Stops the pipeline thread, cancelling queued and in-flight work.
	/// Must not be called from the pipeline thread itself.
	pub fn shutdown(&self) {
		tracing::debug!("pipeline.shutdown");
		self.inner.repl_enabled.store(false, Ordering::SeqCst);
		self.inner.thread_cancel.cancel();
		if let Some(runspace) = self.inner.context.current_runspace() {
			runspace.interrupt();
		}
		self.inner.command_scopes.cancel_all();
		self.inner.loop_scopes.cancel_all();
		self.inner.foreground.notify();
		self.inner.background.notify();
		if let Some(handle) = self.thread.lock().take() {
			let _ = handle.join();
		}
	}
}

impl Drop for PipelineExecutor {
	fn drop(&mut self) {
		self.shutdown();
	}
}
