//! Session-event to notification mapping.
//!
//! The transport layer subscribes to core session events and forwards the
//! ones with a wire contract; this module owns that mapping so the method
//! names and payload shapes stay in one place.

use posh_debug::service::DebugEvent;
use posh_engine::runspace::RunspaceLocation;
use posh_host::context::SessionEvent;
use posh_host::frame::FrameType;
use serde_json::Value;

use crate::methods::notification;
use crate::types::{RunspaceDetails, RunspaceLocationKind, StartDebuggerDetails};

fn frame_type_names(frame_type: FrameType) -> Vec<String> {
	frame_type
		.iter_names()
		.map(|(name, _)| {
			let mut pretty = String::new();
			for (i, part) in name.split('_').enumerate() {
				if i > 0 || !part.is_empty() {
					let mut chars = part.chars();
					if let Some(first) = chars.next() {
						pretty.push(first.to_ascii_uppercase());
						pretty.extend(chars.map(|c| c.to_ascii_lowercase()));
					}
				}
			}
			pretty
		})
		.collect()
}

fn location_kind(location: RunspaceLocation) -> RunspaceLocationKind {
	match location {
		RunspaceLocation::Local => RunspaceLocationKind::Local,
		RunspaceLocation::Remote => RunspaceLocationKind::Remote,
	}
}

/// Maps a core session event onto its outbound notification, if it has one.
pub fn notification_for_session_event(event: &SessionEvent) -> Option<(&'static str, Value)> {
	match event {
		SessionEvent::ExecutionStatus(status) => Some((
			notification::EXECUTION_STATUS_CHANGED,
			serde_json::to_value(status).unwrap_or(Value::Null),
		)),
		SessionEvent::RunspaceChanged { location, frame_type } => {
			let details = RunspaceDetails {
				location: location_kind(*location),
				frame_types: frame_type_names(*frame_type),
			};
			Some((notification::RUNSPACE_CHANGED, serde_json::to_value(&details).unwrap_or(Value::Null)))
		}
		_ => None,
	}
}

/// Maps a debug-service event onto its outbound notification, if any.
pub fn notification_for_debug_event(event: &DebugEvent) -> Option<(&'static str, Value)> {
	match event {
		DebugEvent::Stopped {
			script_path,
			line,
			breakpoint_ids,
		} => {
			let details = StartDebuggerDetails {
				script_path: script_path.clone(),
				line: *line,
				breakpoint_ids: breakpoint_ids.clone(),
			};
			Some((notification::START_DEBUGGER, serde_json::to_value(&details).unwrap_or(Value::Null)))
		}
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use posh_host::context::SessionEvent;
	use posh_host::frame::FrameType;
	use posh_host::task::{ExecutionStatus, ExecutionStatusEvent};
	use pretty_assertions::assert_eq;

	use super::notification_for_session_event;

	#[test]
	fn execution_status_maps_to_its_contractual_method() {
		let event = SessionEvent::ExecutionStatus(ExecutionStatusEvent {
			representation: "Write-Output 1".to_string(),
			status: ExecutionStatus::Running,
		});
		let (method, params) = notification_for_session_event(&event).expect("mapped");
		assert_eq!(method, "powerShell/executionStatusChanged");
		assert_eq!(params["status"], "Running");
	}

	#[test]
	fn runspace_changed_carries_frame_type_names() {
		let event = SessionEvent::RunspaceChanged {
			location: posh_engine::runspace::RunspaceLocation::Local,
			frame_type: FrameType::DEBUG | FrameType::NESTED,
		};
		let (method, params) = notification_for_session_event(&event).expect("mapped");
		assert_eq!(method, "powerShell/runspaceChanged");
		let names: Vec<String> = params["frameTypes"]
			.as_array()
			.expect("array")
			.iter()
			.map(|v| v.as_str().unwrap_or_default().to_string())
			.collect();
		assert_eq!(names, vec!["Nested".to_string(), "Debug".to_string()]);
	}

	#[test]
	fn frame_pushes_have_no_wire_contract() {
		let event = SessionEvent::FramePushed {
			frame_type: FrameType::empty(),
			depth: 2,
		};
		assert!(notification_for_session_event(&event).is_none());
	}
}
