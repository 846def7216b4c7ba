//! Synchronous tasks: the unit of work the pipeline thread executes.
//!
//! Three shapes share one object-safe contract: a closure of the engine
//! handle, a closure of cancellation alone, and an engine-command
//! invocation. Each carries execution options, a caller token, and a result
//! promise fulfilled exactly once, from the pipeline thread.

use std::sync::Arc;

use posh_engine::cancel::CancelToken;
use posh_engine::command::EngineCommand;
use posh_engine::runspace::RunspaceHandle;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::executor::PipelineInner;
use crate::options::ExecutionOptions;

/// Wire-facing task lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecutionStatus {
	Pending,
	Running,
	Completed,
	Failed,
	Aborted,
}

/// Payload of `powerShell/executionStatusChanged` notifications.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStatusEvent {
	pub representation: String,
	pub status: ExecutionStatus,
}

/// How a task run ended, for status events and fatal-error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskOutcome {
	Completed,
	Failed,
	Cancelled,
}

impl TaskOutcome {
	pub(crate) fn status(self) -> ExecutionStatus {
		match self {
			Self::Completed => ExecutionStatus::Completed,
			Self::Failed => ExecutionStatus::Failed,
			Self::Cancelled => ExecutionStatus::Aborted,
		}
	}
}

/// Execution environment handed to a running task on the pipeline thread.
pub(crate) struct TaskEnv<'a> {
	pub(crate) inner: &'a Arc<PipelineInner>,
	/// The per-command scope token this task runs under.
	pub(crate) scope: CancelToken,
	/// Set when the engine reported a fatal error; triggers recovery after
	/// the task's promise is fulfilled.
	pub(crate) fatal: Option<String>,
}

impl TaskEnv<'_> {
	pub(crate) fn current_runspace(&self) -> Option<RunspaceHandle> {
		self.inner.context.current_runspace()
	}
}

/// Object-safe task contract consumed by the executor.
pub(crate) trait PipelineTask: Send {
	fn representation(&self) -> &str;

	fn options(&self) -> &ExecutionOptions;

	/// True when the caller's token fired before the task started.
	fn caller_cancelled(&self) -> bool;

	/// Fulfills the promise as cancelled without touching the engine.
	fn drop_cancelled(self: Box<Self>);

	/// Runs on the pipeline thread and fulfills the promise from there.
	fn run(self: Box<Self>, env: &mut TaskEnv<'_>) -> TaskOutcome;
}

fn outcome_of<T>(result: &Result<T, TaskError>) -> TaskOutcome {
	match result {
		Ok(_) => TaskOutcome::Completed,
		Err(TaskError::Cancelled) => TaskOutcome::Cancelled,
		Err(_) => TaskOutcome::Failed,
	}
}

/// Caller-side handle to a submitted task.
pub struct TaskHandle<T> {
	receiver: oneshot::Receiver<Result<T, TaskError>>,
	cancel: CancellationToken,
	representation: String,
}

impl<T> TaskHandle<T> {
	/// Requests cancellation. Before dequeue the task is dropped without an
	/// engine call; mid-execution the engine is asked to stop.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	pub fn representation(&self) -> &str {
		&self.representation
	}

	/// Blocks the calling thread until the promise settles. Must not be
	/// called from the pipeline thread.
	pub fn wait(self) -> Result<T, TaskError> {
		self.receiver.blocking_recv().unwrap_or(Err(TaskError::Cancelled))
	}

	/// Awaits the promise.
	pub async fn join(self) -> Result<T, TaskError> {
		self.receiver.await.unwrap_or(Err(TaskError::Cancelled))
	}

	/// A handle whose promise failed at submission time.
	pub(crate) fn rejected(representation: String, error: TaskError) -> Self {
		let (sender, receiver) = oneshot::channel();
		let _ = sender.send(Err(error));
		Self {
			receiver,
			cancel: CancellationToken::new(),
			representation,
		}
	}
}

type RunspaceBody<T> = Box<dyn FnOnce(&RunspaceHandle, &CancelToken) -> Result<T, TaskError> + Send>;
type CancelBody<T> = Box<dyn FnOnce(&CancelToken) -> Result<T, TaskError> + Send>;

enum ClosureBody<T> {
	WithRunspace(RunspaceBody<T>),
	WithCancel(CancelBody<T>),
}

/// Closure-shaped task.
pub(crate) struct ClosureTask<T> {
	representation: String,
	options: ExecutionOptions,
	caller: CancellationToken,
	promise: oneshot::Sender<Result<T, TaskError>>,
	body: ClosureBody<T>,
}

impl<T: Send + 'static> PipelineTask for ClosureTask<T> {
	fn representation(&self) -> &str {
		&self.representation
	}

	fn options(&self) -> &ExecutionOptions {
		&self.options
	}

	fn caller_cancelled(&self) -> bool {
		self.caller.is_cancelled()
	}

	fn drop_cancelled(self: Box<Self>) {
		let _ = self.promise.send(Err(TaskError::Cancelled));
	}

	fn run(self: Box<Self>, env: &mut TaskEnv<'_>) -> TaskOutcome {
		let scope = env.scope.joined(self.caller.clone());
		let result = match self.body {
			ClosureBody::WithRunspace(body) => match env.current_runspace() {
				Some(runspace) => body(&runspace, &scope),
				None => Err(TaskError::failed("no active runspace")),
			},
			ClosureBody::WithCancel(body) => body(&scope),
		};
		let result = if scope.is_cancelled() && result.is_err() { Err(TaskError::Cancelled) } else { result };
		let outcome = outcome_of(&result);
		let _ = self.promise.send(result);
		outcome
	}
}

/// Engine-command-shaped task.
pub(crate) struct CommandTask {
	representation: String,
	options: ExecutionOptions,
	caller: CancellationToken,
	promise: oneshot::Sender<Result<Vec<posh_engine::value::Value>, TaskError>>,
	command: EngineCommand,
}

impl PipelineTask for CommandTask {
	fn representation(&self) -> &str {
		&self.representation
	}

	fn options(&self) -> &ExecutionOptions {
		&self.options
	}

	fn caller_cancelled(&self) -> bool {
		self.caller.is_cancelled()
	}

	fn drop_cancelled(self: Box<Self>) {
		let _ = self.promise.send(Err(TaskError::Cancelled));
	}

	fn run(self: Box<Self>, env: &mut TaskEnv<'_>) -> TaskOutcome {
		let scope = env.scope.joined(self.caller.clone());
		let result = PipelineInner::execute_command(env.inner, &scope, &self.command, &self.options, &mut env.fatal);
		let outcome = outcome_of(&result);
		let _ = self.promise.send(result);
		outcome
	}
}

/// Builds a command task plus its caller-side handle.
pub(crate) fn command_task(
	command: EngineCommand,
	options: ExecutionOptions,
	caller: CancellationToken,
) -> (CommandTask, TaskHandle<Vec<posh_engine::value::Value>>) {
	let representation = command.representation();
	let (sender, receiver) = oneshot::channel();
	let task = CommandTask {
		representation: representation.clone(),
		options,
		caller: caller.clone(),
		promise: sender,
		command,
	};
	let handle = TaskHandle {
		receiver,
		cancel: caller,
		representation,
	};
	(task, handle)
}

/// Builds a closure-of-runspace task plus its handle.
pub(crate) fn runspace_task<T: Send + 'static>(
	representation: String,
	options: ExecutionOptions,
	caller: CancellationToken,
	body: RunspaceBody<T>,
) -> (ClosureTask<T>, TaskHandle<T>) {
	let (sender, receiver) = oneshot::channel();
	let task = ClosureTask {
		representation: representation.clone(),
		options,
		caller: caller.clone(),
		promise: sender,
		body: ClosureBody::WithRunspace(body),
	};
	let handle = TaskHandle {
		receiver,
		cancel: caller,
		representation,
	};
	(task, handle)
}

/// Builds a closure-of-cancellation task plus its handle.
pub(crate) fn cancel_task<T: Send + 'static>(
	representation: String,
	options: ExecutionOptions,
	caller: CancellationToken,
	body: CancelBody<T>,
) -> (ClosureTask<T>, TaskHandle<T>) {
	let (sender, receiver) = oneshot::channel();
	let task = ClosureTask {
		representation: representation.clone(),
		options,
		caller: caller.clone(),
		promise: sender,
		body: ClosureBody::WithCancel(body),
	};
	let handle = TaskHandle {
		receiver,
		cancel: caller,
		representation,
	};
	(task, handle)
}
