//! JSON-RPC (LSP dialect) surface of the posh editor services.
//!
//! Message framing and dispatch belong to the transport; this crate pins
//! what is contractual: method names, payload shapes, and the mapping from
//! core session events to outbound notifications. Standard LSP types are
//! re-exported from `lsp_types`.

pub mod bridge;
pub mod methods;
pub mod types;

pub use lsp_types;
/// The execution-option record submitted by every core-bound request.
pub use posh_host::options::{ExecutionOptions, Priority};
pub use types::{
	ExpandAliasParams, ExtensionCommandDetails, InsertTextParams, RunspaceDetails, RunspaceLocationKind, SetCursorPositionParams, SetSelectionParams,
	ShowMessageParams, StartDebuggerDetails, VersionDetails,
};
