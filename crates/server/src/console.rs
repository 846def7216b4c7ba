//! Stdout-backed console host.

use std::io::Write;

use posh_host::console::ConsoleHost;

/// Writes session output to stdout. Errors share the channel so the
/// integrated-console semantics match what an editor terminal shows.
pub struct StdioConsole;

impl ConsoleHost for StdioConsole {
	fn write_line(&self, text: &str) {
		let mut stdout = std::io::stdout().lock();
		let _ = writeln!(stdout, "{text}");
	}

	fn write_error_line(&self, text: &str) {
		let mut stdout = std::io::stdout().lock();
		let _ = writeln!(stdout, "{text}");
	}

	fn write_prompt(&self, text: &str) {
		let mut stdout = std::io::stdout().lock();
		let _ = write!(stdout, "{text}");
		let _ = stdout.flush();
	}
}
