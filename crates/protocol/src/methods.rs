//! Contractual method names.
//!
//! Standard language-server methods come from `lsp_types`; this module pins
//! the engine-specific custom methods, the notifications the core emits, and
//! the editor commands the server sends back to the client.

/// Engine-specific request methods (client → server).
pub mod request {
	pub const GET_VERSION: &str = "powerShell/getVersion";
	pub const GET_COMMAND: &str = "powerShell/getCommand";
	pub const GET_COMMANDS: &str = "powerShell/getCommands";
	pub const GET_ALL_COMMANDS: &str = "powerShell/getAllCommands";
	pub const EXPAND_ALIAS: &str = "powerShell/expandAlias";
	pub const FIND_MODULE: &str = "powerShell/findModule";
	pub const SHOW_HELP: &str = "powerShell/showHelp";
	pub const GET_PS_HOST_PROCESSES: &str = "powerShell/getPSHostProcesses";
	pub const GET_RUNSPACE: &str = "powerShell/getRunspace";
	pub const GET_PSSA_RULES: &str = "powerShell/getPSSARules";
	pub const GET_SCRIPT_FILE_MARKERS: &str = "powerShell/getScriptFileMarkers";
	pub const GET_SCRIPT_REGION: &str = "powerShell/getScriptRegion";
	pub const GET_FORMATTING_SCRIPT_REGION: &str = "powerShell/getFormattingScriptRegion";
	pub const GET_COMMENT_HELP: &str = "powerShell/getCommentHelp";
	pub const CONVERT_TO_CSHARP_CLASS: &str = "powerShell/convertToCSharpClass";
	pub const CONVERT_TO_POWERSHELL_CLASS: &str = "powerShell/convertToPowerShellClass";
	pub const NEW_PROJECT_FROM_TEMPLATE: &str = "powerShell/newProjectFromTemplate";
	pub const GET_PROJECT_TEMPLATES: &str = "powerShell/getProjectTemplates";
}

/// Notifications the server pushes to the client.
pub mod notification {
	pub const EXECUTION_STATUS_CHANGED: &str = "powerShell/executionStatusChanged";
	pub const RUNSPACE_CHANGED: &str = "powerShell/runspaceChanged";
	pub const START_DEBUGGER: &str = "powerShell/startDebugger";
	pub const EXTENSION_COMMAND_ADDED: &str = "powerShell/extensionCommandAdded";
	pub const EXTENSION_COMMAND_UPDATED: &str = "powerShell/extensionCommandUpdated";
	pub const EXTENSION_COMMAND_REMOVED: &str = "powerShell/extensionCommandRemoved";
}

/// Editor commands (server → client requests).
pub mod editor_command {
	pub const OPEN_FILE: &str = "editor/openFile";
	pub const CLOSE_FILE: &str = "editor/closeFile";
	pub const SAVE_FILE: &str = "editor/saveFile";
	pub const NEW_FILE: &str = "editor/newFile";
	pub const INSERT_TEXT: &str = "editor/insertText";
	pub const SET_SELECTION: &str = "editor/setSelection";
	pub const SET_CURSOR_POSITION: &str = "editor/setCursorPosition";
	pub const GET_EDITOR_CONTEXT: &str = "editor/getEditorContext";
	pub const SHOW_INFORMATION_MESSAGE: &str = "editor/showInformationMessage";
	pub const SHOW_WARNING_MESSAGE: &str = "editor/showWarningMessage";
	pub const SHOW_ERROR_MESSAGE: &str = "editor/showErrorMessage";
	pub const SET_STATUS_BAR_MESSAGE: &str = "editor/setStatusBarMessage";
}
