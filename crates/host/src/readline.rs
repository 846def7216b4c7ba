//! Pluggable read-line providers.
//!
//! The REPL does not care whether lines come from a bare terminal reader or
//! a rich one with completion and history; it only needs a cancellable read,
//! the last-key flag (to detect a bare Ctrl-C at an empty prompt), and the
//! idle hook the executor uses to drain background tasks while the read
//! blocks.

use std::sync::Arc;

use posh_engine::cancel::CancelToken;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadLineError {
	/// The per-command scope was cancelled while reading.
	#[error("read cancelled")]
	Cancelled,

	/// Input is exhausted; the REPL should wind down.
	#[error("end of input")]
	Eof,

	#[error("read failed: {0}")]
	Io(String),
}

/// Callback invoked by the provider while a read blocks and the engine is
/// idle.
pub type IdleHandler = Arc<dyn Fn() + Send + Sync>;

/// Replacement key reader, installed by hosts that intercept raw keys.
pub type ReadKeyHandler = Arc<dyn Fn() -> Option<char> + Send + Sync>;

pub trait ReadLineProvider: Send + Sync {
	/// Blocks for one line of input. Cancelling `cancel` aborts the read.
	fn read_line(&self, cancel: &CancelToken) -> Result<String, ReadLineError>;

	/// True when the last key the provider observed was Ctrl-C.
	fn last_key_was_ctrl_c(&self) -> bool;

	/// Installs the engine-idle callback. Returns false when this provider
	/// cannot interleave idle work (e.g. a plain blocking reader).
	fn try_override_idle_handler(&self, _handler: IdleHandler) -> bool {
		false
	}

	/// Replaces the raw key reader. Providers without raw key access ignore
	/// the override.
	fn override_read_key(&self, _handler: ReadKeyHandler) {}
}

/// A provider with no input; every read reports end-of-input.
pub struct NoInput;

impl ReadLineProvider for NoInput {
	fn read_line(&self, _cancel: &CancelToken) -> Result<String, ReadLineError> {
		Err(ReadLineError::Eof)
	}

	fn last_key_was_ctrl_c(&self) -> bool {
		false
	}
}
