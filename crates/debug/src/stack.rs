//! Stack-frame capture on debugger stop.

use std::path::Path;

use posh_engine::debugger::{Debugger, DebuggerStopInfo, EngineVariable, VariableScope};
use posh_engine::error::EngineError;
use serde::Serialize;

use crate::variables::{AUTO_SCOPE_NAME, LOCAL_SCOPE_NAME, VariableStore, is_auto_variable};

/// UI hint for one captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PresentationHint {
	Normal,
	Label,
	Subtle,
}

/// One captured call-stack frame, valid until the debugger resumes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrameDetails {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub script_path: Option<String>,
	pub function_name: String,
	pub start_line: u32,
	pub start_column: u32,
	pub end_line: u32,
	pub end_column: u32,
	pub presentation_hint: PresentationHint,
	pub auto_variables_id: usize,
	pub local_variables_id: usize,
}

/// Captures global/script scopes, the call stack, and per-frame variables
/// into `store`. Runs on the pipeline thread during the stop event.
pub fn capture_stack(
	debugger: &dyn Debugger,
	info: &DebuggerStopInfo,
	fallback_script_path: Option<&str>,
	workspace_root: Option<&Path>,
	store: &mut VariableStore,
) -> Result<Vec<StackFrameDetails>, EngineError> {
	store.reset();

	let globals = debugger.variables(VariableScope::Global)?;
	for variable in &globals {
		store.add_variable(crate::variables::GLOBAL_SCOPE_ID, variable);
	}
	for variable in debugger.variables(VariableScope::Script)? {
		store.add_variable(crate::variables::SCRIPT_SCOPE_ID, &variable);
	}

	let mut frames = Vec::new();
	for (index, engine_frame) in debugger.call_stack()?.into_iter().enumerate() {
		let auto_id = store.add_container(AUTO_SCOPE_NAME);
		let local_id = store.add_container(LOCAL_SCOPE_NAME);

		let locals: Vec<EngineVariable> = debugger.variables(VariableScope::Local { frame: index })?;
		for variable in &locals {
			store.add_variable(local_id, variable);
			if is_auto_variable(variable, &globals) {
				store.add_variable(auto_id, variable);
			}
		}

		let script_path = engine_frame.script_path.or_else(|| fallback_script_path.map(str::to_string));
		let mut details = StackFrameDetails {
			presentation_hint: presentation_hint_for(script_path.as_deref(), workspace_root),
			script_path,
			function_name: engine_frame.function_name,
			start_line: engine_frame.region.map_or(1, |r| r.start_line),
			start_column: engine_frame.region.map_or(1, |r| r.start_column),
			end_line: engine_frame.region.map_or(1, |r| r.end_line),
			end_column: engine_frame.region.map_or(1, |r| r.end_column),
			auto_variables_id: auto_id,
			local_variables_id: local_id,
		};

		// The engine's stop position is more precise than the call-stack
		// extent for the frame being stopped in.
		if index == 0 {
			if let Some(region) = info.region {
				details.start_line = region.start_line;
				details.start_column = region.start_column;
				details.end_line = region.end_line;
				details.end_column = region.end_column;
			}
		}
		frames.push(details);
	}

	Ok(frames)
}

fn presentation_hint_for(script_path: Option<&str>, workspace_root: Option<&Path>) -> PresentationHint {
	match (script_path, workspace_root) {
		(Some(path), Some(root)) if !Path::new(path).starts_with(root) => PresentationHint::Subtle,
		_ => PresentationHint::Normal,
	}
}
