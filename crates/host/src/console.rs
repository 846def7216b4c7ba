//! Host console surface.
//!
//! The REPL and error paths write through this trait; the server wires it to
//! the editor's integrated console, tests capture it in memory.

use posh_engine::error::ErrorRecord;

pub trait ConsoleHost: Send + Sync {
	/// Writes one line of normal output.
	fn write_line(&self, text: &str);

	/// Writes one error line, through the same channel as normal output so
	/// editor console semantics are preserved.
	fn write_error_line(&self, text: &str);

	/// Writes prompt text without a trailing newline.
	fn write_prompt(&self, text: &str);
}

impl dyn ConsoleHost {
	pub fn write_error_record(&self, record: &ErrorRecord) {
		self.write_error_line(&record.to_string());
	}
}

/// A console that discards everything; the headless default.
pub struct NullConsole;

impl ConsoleHost for NullConsole {
	fn write_line(&self, _text: &str) {}
	fn write_error_line(&self, _text: &str) {}
	fn write_prompt(&self, _text: &str) {}
}
