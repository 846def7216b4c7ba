//! Debug-service error types.

use posh_engine::error::EngineError;
use posh_host::error::TaskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DebugError {
	/// Stack frames and variables only exist while the debugger is stopped.
	#[error("debugger is not stopped")]
	NotStopped,

	#[error("unknown variable container {0}")]
	UnknownContainer(usize),

	#[error("variable '{0}' was not found")]
	VariableNotFound(String),

	#[error(transparent)]
	Task(#[from] TaskError),

	#[error(transparent)]
	Engine(#[from] EngineError),

	#[error("{0}")]
	Failed(String),
}

impl DebugError {
	pub fn failed(message: impl Into<String>) -> Self {
		Self::Failed(message.into())
	}
}

pub type Result<T> = std::result::Result<T, DebugError>;
