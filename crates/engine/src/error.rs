//! Error types crossing the engine seam.

use thiserror::Error;

/// A non-terminating engine error, as written to host output when the caller
/// did not request throw-on-error semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
	pub message: String,
	pub script_path: Option<String>,
	pub line: Option<u32>,
}

impl ErrorRecord {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			script_path: None,
			line: None,
		}
	}
}

impl std::fmt::Display for ErrorRecord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match (&self.script_path, self.line) {
			(Some(path), Some(line)) => write!(f, "{} ({path}:{line})", self.message),
			_ => f.write_str(&self.message),
		}
	}
}

/// A parse failure reported by the engine's parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseDiagnostic {
	pub message: String,
	pub line: u32,
	pub column: u32,
}

impl ParseDiagnostic {
	pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
		Self {
			message: message.into(),
			line,
			column,
		}
	}

	/// Strips engine positional noise (`At line:1 char:3`, `+ ~~~` carets)
	/// down to the first human-readable sentence.
	pub fn human_message(&self) -> String {
		self.message
			.lines()
			.map(str::trim)
			.find(|line| !line.is_empty() && !line.starts_with("At line:") && !line.starts_with('+'))
			.unwrap_or(self.message.trim())
			.to_string()
	}
}

/// Errors surfaced by runspace and debugger operations.
#[derive(Debug, Error)]
pub enum EngineError {
	/// Script text failed to parse.
	#[error("parse error: {0}")]
	Parse(ParseDiagnostic),

	/// Script raised a terminating error at runtime.
	#[error("{0}")]
	Runtime(ErrorRecord),

	/// The in-flight invocation was stopped.
	#[error("invocation interrupted")]
	Interrupted,

	/// The runspace is no longer usable (remote dropped, state corrupted).
	#[error("runspace unusable: {0}")]
	SessionLost(String),
}

impl EngineError {
	pub fn runtime(message: impl Into<String>) -> Self {
		Self::Runtime(ErrorRecord::new(message))
	}

	/// True when the error means the runspace itself must be replaced.
	pub fn is_fatal(&self) -> bool {
		matches!(self, Self::SessionLost(_))
	}
}
