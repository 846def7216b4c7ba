//! Console REPL tasks.
//!
//! One REPL task exists per active prompt depth: the top-level prompt, each
//! nested prompt, and each debug prompt. A task runs a single
//! prompt → read-line → evaluate cycle on the pipeline thread and re-enqueues
//! itself, so queued work interleaves between cycles. The task dies when its
//! prompt level unwinds (frame depth dropped below the one it was created
//! at) or the REPL is disabled.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use posh_engine::command::EngineCommand;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::executor::PipelineInner;
use crate::options::ExecutionOptions;
use crate::readline::ReadLineError;
use crate::task::{PipelineTask, TaskEnv, TaskOutcome};

const FALLBACK_PROMPT: &str = "PS> ";

pub(crate) struct ReplTask {
	options: ExecutionOptions,
	caller: CancellationToken,
	/// Frame depth this prompt belongs to; the task stops re-enqueueing once
	/// the stack unwinds below it.
	depth: usize,
}

impl ReplTask {
	pub(crate) fn new(depth: usize) -> Self {
		Self {
			options: ExecutionOptions {
				must_run_in_foreground: true,
				throw_on_error: false,
				..ExecutionOptions::default()
			},
			caller: CancellationToken::new(),
			depth,
		}
	}

	fn requeue(&self, inner: &Arc<PipelineInner>) {
		if inner.repl_enabled.load(Ordering::SeqCst) && !inner.thread_cancel.is_cancelled() {
			inner.foreground.append(Box::new(ReplTask {
				options: self.options.clone(),
				caller: self.caller.clone(),
				depth: self.depth,
			}));
		}
	}

	fn read_prompt(&self, env: &mut TaskEnv<'_>) -> String {
		let options = ExecutionOptions {
			must_run_in_foreground: true,
			..ExecutionOptions::default()
		};
		let mut fatal = None;
		let prompt = match PipelineInner::execute_command(env.inner, &env.scope, &EngineCommand::command("prompt"), &options, &mut fatal) {
			Ok(values) => values
				.first()
				.map(|value| value.display_string())
				.filter(|text| !text.is_empty())
				.unwrap_or_else(|| FALLBACK_PROMPT.to_string()),
			Err(_) => FALLBACK_PROMPT.to_string(),
		};
		if fatal.is_some() {
			env.fatal = fatal;
		}
		prompt
	}
}

impl PipelineTask for ReplTask {
	fn representation(&self) -> &str {
		"repl"
	}

	fn options(&self) -> &ExecutionOptions {
		&self.options
	}

	fn caller_cancelled(&self) -> bool {
		self.caller.is_cancelled()
	}

	fn drop_cancelled(self: Box<Self>) {}

	fn run(self: Box<Self>, env: &mut TaskEnv<'_>) -> TaskOutcome {
		let inner = env.inner;
		if !inner.repl_enabled.load(Ordering::SeqCst) || inner.thread_cancel.is_cancelled() {
			return TaskOutcome::Completed;
		}
		if inner.context.depth() < self.depth {
			// This prompt level unwound (debug session resumed, nested
			// prompt exited); let the task die quietly.
			return TaskOutcome::Completed;
		}

		let prompt = self.read_prompt(env);
		if env.fatal.is_some() {
			return TaskOutcome::Failed;
		}
		inner.console.write_prompt(&prompt);

		let line = match inner.readline.read_line(&env.scope) {
			Ok(line) => line,
			Err(ReadLineError::Cancelled) => {
				// A cancelled read is how Ctrl-C lands mid-prompt; print the
				// newline the interrupted prompt owes and read again.
				if inner.readline.last_key_was_ctrl_c() {
					inner.console.write_line("");
				}
				self.requeue(inner);
				return TaskOutcome::Cancelled;
			}
			Err(ReadLineError::Eof) => {
				tracing::debug!("read-line provider exhausted, stopping repl");
				inner.repl_enabled.store(false, Ordering::SeqCst);
				return TaskOutcome::Completed;
			}
			Err(ReadLineError::Io(message)) => {
				inner.console.write_error_line(&message);
				self.requeue(inner);
				return TaskOutcome::Failed;
			}
		};

		if line.is_empty() {
			if inner.readline.last_key_was_ctrl_c() {
				inner.console.write_line("");
			}
			self.requeue(inner);
			return TaskOutcome::Completed;
		}

		let mut fatal = None;
		let result = PipelineInner::execute_command(inner, &env.scope, &EngineCommand::script(line), &ExecutionOptions::repl_input(), &mut fatal);
		if fatal.is_some() {
			env.fatal = fatal;
		}
		if let Err(error) = &result {
			if !error.is_cancelled() {
				// repl_input routes engine errors to the console already;
				// anything surfacing here is host-side.
				inner.console.write_error_line(&error.to_string());
			}
		}

		if self.caller.is_cancelled() {
			return TaskOutcome::Cancelled;
		}
		self.requeue(inner);
		TaskOutcome::Completed
	}
}
