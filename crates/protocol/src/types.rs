//! Payload types for the custom protocol surface.

use lsp_types::{Position, Range};
use serde::{Deserialize, Serialize};

/// Result of `powerShell/getVersion`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDetails {
	pub version: String,
	pub display_version: String,
	pub edition: String,
	pub architecture: String,
}

/// Params of `powerShell/expandAlias`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandAliasParams {
	pub text: String,
}

/// Result of `powerShell/getRunspace` and payload of
/// `powerShell/runspaceChanged`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunspaceDetails {
	pub location: RunspaceLocationKind,
	/// Frame-type names active for the current frame, e.g. `["Debug",
	/// "Nested"]`. Empty for a plain top-level frame.
	pub frame_types: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunspaceLocationKind {
	Local,
	Remote,
}

/// Payload of `powerShell/startDebugger`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDebuggerDetails {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub script_path: Option<String>,
	pub line: u32,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub breakpoint_ids: Vec<i64>,
}

/// Payload of the `powerShell/extensionCommand{Added,Updated,Removed}`
/// notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionCommandDetails {
	pub name: String,
	pub display_name: String,
}

/// Params of `editor/insertText`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertTextParams {
	pub file_path: String,
	pub insert_text: String,
	pub insert_range: Range,
}

/// Params of `editor/setSelection`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSelectionParams {
	pub selection_range: Range,
}

/// Params of `editor/setCursorPosition`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCursorPositionParams {
	pub cursor_position: Position,
}

/// Params of the `editor/show*Message` and `editor/setStatusBarMessage`
/// requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowMessageParams {
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timeout_ms: Option<u64>,
}
