//! Task-level error taxonomy.

use posh_engine::error::EngineError;
use thiserror::Error;

/// Why a task's promise did not complete with a value.
#[derive(Debug, Error)]
pub enum TaskError {
	/// The caller supplied inconsistent execution options; nothing ran.
	#[error("task rejected: {0}")]
	Rejected(String),

	/// The task's cancellation fired, before dequeue or mid-execution.
	#[error("task cancelled")]
	Cancelled,

	/// The engine raised a terminating error and the caller asked for
	/// throw-on-error semantics.
	#[error(transparent)]
	Engine(EngineError),

	/// The task body failed outside the engine.
	#[error("task failed: {0}")]
	Failed(String),
}

impl TaskError {
	pub fn failed(message: impl Into<String>) -> Self {
		Self::Failed(message.into())
	}

	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}

impl From<EngineError> for TaskError {
	fn from(error: EngineError) -> Self {
		match error {
			// An interrupted invocation is a cancelled task, not a failure.
			EngineError::Interrupted => Self::Cancelled,
			other => Self::Engine(other),
		}
	}
}
