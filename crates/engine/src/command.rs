//! Pipeline command builder.
//!
//! An [`EngineCommand`] is one engine pipeline: one or more steps, each a
//! named command or a script fragment, with optional parameters. The host
//! builds these; bindings interpret them.

use crate::value::Value;

/// One engine pipeline invocation.
#[derive(Debug, Clone)]
pub struct EngineCommand {
	steps: Vec<CommandStep>,
}

/// A single step in a pipeline.
#[derive(Debug, Clone)]
pub struct CommandStep {
	pub kind: StepKind,
	pub parameters: Vec<Parameter>,
}

/// Step payload: a named command or raw script text.
#[derive(Debug, Clone)]
pub enum StepKind {
	Command(String),
	Script(String),
}

/// A parameter attached to a step. `value: None` marks a switch.
#[derive(Debug, Clone)]
pub struct Parameter {
	pub name: Option<String>,
	pub value: Option<Value>,
}

impl EngineCommand {
	/// Starts a pipeline from a named command.
	pub fn command(name: impl Into<String>) -> Self {
		Self {
			steps: vec![CommandStep {
				kind: StepKind::Command(name.into()),
				parameters: Vec::new(),
			}],
		}
	}

	/// Starts a pipeline from raw script text.
	pub fn script(text: impl Into<String>) -> Self {
		Self {
			steps: vec![CommandStep {
				kind: StepKind::Script(text.into()),
				parameters: Vec::new(),
			}],
		}
	}

	/// Adds a named parameter to the last step.
	pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.last_step().parameters.push(Parameter {
			name: Some(name.into()),
			value: Some(value.into()),
		});
		self
	}

	/// Adds a switch parameter to the last step.
	pub fn switch(mut self, name: impl Into<String>) -> Self {
		self.last_step().parameters.push(Parameter {
			name: Some(name.into()),
			value: None,
		});
		self
	}

	/// Adds a positional argument to the last step.
	pub fn arg(mut self, value: impl Into<Value>) -> Self {
		self.last_step().parameters.push(Parameter {
			name: None,
			value: Some(value.into()),
		});
		self
	}

	/// Appends another command step to the pipeline.
	pub fn then_command(mut self, name: impl Into<String>) -> Self {
		self.steps.push(CommandStep {
			kind: StepKind::Command(name.into()),
			parameters: Vec::new(),
		});
		self
	}

	fn last_step(&mut self) -> &mut CommandStep {
		self.steps.last_mut().expect("EngineCommand always has at least one step")
	}

	pub fn steps(&self) -> &[CommandStep] {
		&self.steps
	}

	/// First step's command name, if the pipeline starts with one.
	pub fn leading_command(&self) -> Option<&str> {
		match self.steps.first().map(|s| &s.kind) {
			Some(StepKind::Command(name)) => Some(name),
			_ => None,
		}
	}

	/// First step's script text, if the pipeline starts with one.
	pub fn leading_script(&self) -> Option<&str> {
		match self.steps.first().map(|s| &s.kind) {
			Some(StepKind::Script(text)) => Some(text),
			_ => None,
		}
	}

	/// Short single-line rendering for logs and task representations.
	pub fn representation(&self) -> String {
		let mut out = String::new();
		for (i, step) in self.steps.iter().enumerate() {
			if i > 0 {
				out.push_str(" | ");
			}
			match &step.kind {
				StepKind::Command(name) => out.push_str(name),
				StepKind::Script(text) => out.push_str(text.lines().next().unwrap_or_default()),
			}
			for p in &step.parameters {
				match (&p.name, &p.value) {
					(Some(name), Some(value)) => {
						out.push_str(&format!(" -{name} {}", value.display_string()));
					}
					(Some(name), None) => out.push_str(&format!(" -{name}")),
					(None, Some(value)) => {
						out.push(' ');
						out.push_str(&value.display_string());
					}
					(None, None) => {}
				}
			}
		}
		out
	}
}
