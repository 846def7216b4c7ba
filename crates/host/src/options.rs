//! Execution options attached to every submitted task.

use serde::{Deserialize, Serialize};

/// Queue priority. `Next` runs before any pending `Normal` task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
	#[default]
	Normal,
	Next,
}

/// Per-task execution options.
///
/// `interrupt_current_foreground` implies `Next` priority and foreground
/// placement; [`ExecutionOptions::validate`] rejects records that say
/// otherwise rather than silently promoting them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionOptions {
	pub priority: Priority,
	pub must_run_in_foreground: bool,
	pub interrupt_current_foreground: bool,
	pub write_output_to_host: bool,
	pub write_input_to_host: bool,
	pub throw_on_error: bool,
	pub add_to_history: bool,
}

impl Default for ExecutionOptions {
	fn default() -> Self {
		Self {
			priority: Priority::Normal,
			must_run_in_foreground: false,
			interrupt_current_foreground: false,
			write_output_to_host: false,
			write_input_to_host: false,
			throw_on_error: true,
			add_to_history: false,
		}
	}
}

impl ExecutionOptions {
	/// Defaults for handler-submitted work: throw-on-error, quiet, normal
	/// priority.
	pub fn handler() -> Self {
		Self {
			must_run_in_foreground: true,
			..Self::default()
		}
	}

	/// Defaults for REPL user input: echo to host, keep history, surface
	/// errors as console records instead of failures.
	pub fn repl_input() -> Self {
		Self {
			must_run_in_foreground: true,
			write_output_to_host: true,
			add_to_history: true,
			throw_on_error: false,
			..Self::default()
		}
	}

	pub fn with_priority(mut self, priority: Priority) -> Self {
		self.priority = priority;
		self
	}

	pub fn interrupting(mut self) -> Self {
		self.interrupt_current_foreground = true;
		self.priority = Priority::Next;
		self.must_run_in_foreground = true;
		self
	}

	/// Checks internal consistency at submission time.
	pub fn validate(&self) -> Result<(), String> {
		if self.interrupt_current_foreground {
			if self.priority != Priority::Next {
				return Err("interruptCurrentForeground requires Next priority".to_string());
			}
			if !self.must_run_in_foreground {
				return Err("interruptCurrentForeground requires mustRunInForeground".to_string());
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::{ExecutionOptions, Priority};

	#[test]
	fn interrupting_builder_satisfies_its_own_invariant() {
		let options = ExecutionOptions::default().interrupting();
		assert!(options.validate().is_ok());
		assert_eq!(options.priority, Priority::Next);
	}

	#[test]
	fn inconsistent_interrupt_records_are_rejected() {
		let options = ExecutionOptions {
			interrupt_current_foreground: true,
			..ExecutionOptions::default()
		};
		assert!(options.validate().is_err());
	}
}
