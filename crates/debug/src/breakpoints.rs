//! Breakpoint records and the per-file registry.

use posh_engine::debugger::{BreakpointSite, BreakpointUpdate, BreakpointUpdateKind};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Requested line breakpoint, as a client sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineBreakpointSpec {
	pub line: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub column: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub condition: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub hit_count: Option<u32>,
}

impl LineBreakpointSpec {
	pub fn line(line: u32) -> Self {
		Self {
			line,
			column: None,
			condition: None,
			hit_count: None,
		}
	}

	pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
		self.condition = Some(condition.into());
		self
	}

	pub fn with_hit_count(mut self, hit_count: u32) -> Self {
		self.hit_count = Some(hit_count);
		self
	}
}

/// Requested command breakpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandBreakpointSpec {
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub condition: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub hit_count: Option<u32>,
}

/// A line breakpoint as reported back to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineBreakpoint {
	pub verified: bool,
	/// Diagnostic explaining an unverified breakpoint.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	pub source: String,
	pub line: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub column: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub condition: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub hit_count: Option<u32>,
	/// Engine breakpoint id once set.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<i64>,
}

impl LineBreakpoint {
	pub fn unverified(source: &str, spec: &LineBreakpointSpec, message: impl Into<String>) -> Self {
		Self {
			verified: false,
			message: Some(message.into()),
			source: source.to_string(),
			line: spec.line,
			column: spec.column,
			condition: spec.condition.clone(),
			hit_count: spec.hit_count,
			id: None,
		}
	}
}

/// A command breakpoint as reported back to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandBreakpoint {
	pub verified: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub condition: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub hit_count: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<i64>,
}

/// Index of known breakpoints, fed by requests and by engine
/// breakpoint-updated events.
///
/// Engine updates arrive in no documented order during conditional
/// breakpoint installation, so every update is an idempotent upsert or
/// delete keyed by engine id.
#[derive(Default)]
pub struct BreakpointRegistry {
	by_file: FxHashMap<String, Vec<LineBreakpoint>>,
	commands: Vec<CommandBreakpoint>,
}

fn file_key(path: &str) -> String {
	path.to_lowercase()
}

impl BreakpointRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record_line_breakpoint(&mut self, breakpoint: LineBreakpoint) {
		let entries = self.by_file.entry(file_key(&breakpoint.source)).or_default();
		// (path, line, column) is unique per file.
		entries.retain(|existing| (existing.line, existing.column) != (breakpoint.line, breakpoint.column));
		entries.push(breakpoint);
	}

	pub fn record_command_breakpoint(&mut self, breakpoint: CommandBreakpoint) {
		// Command names are unique across the session.
		self.commands.retain(|existing| !existing.name.eq_ignore_ascii_case(&breakpoint.name));
		self.commands.push(breakpoint);
	}

	pub fn breakpoints_in_file(&self, path: &str) -> Vec<LineBreakpoint> {
		self.by_file.get(&file_key(path)).cloned().unwrap_or_default()
	}

	pub fn command_breakpoints(&self) -> Vec<CommandBreakpoint> {
		self.commands.clone()
	}

	/// Removes every line breakpoint recorded for `path`, returning the
	/// engine ids that must be removed from the engine.
	pub fn clear_file(&mut self, path: &str) -> Vec<i64> {
		self.by_file
			.remove(&file_key(path))
			.map(|entries| entries.iter().filter_map(|bp| bp.id).collect())
			.unwrap_or_default()
	}

	/// Removes every command breakpoint, returning engine ids to remove.
	pub fn clear_commands(&mut self) -> Vec<i64> {
		self.commands.drain(..).filter_map(|bp| bp.id).collect()
	}

	/// Applies an engine breakpoint-updated event.
	pub fn apply_engine_update(&mut self, update: &BreakpointUpdate) {
		match (&update.kind, &update.breakpoint.site) {
			(BreakpointUpdateKind::Removed, BreakpointSite::Line { path, .. }) => {
				if let Some(entries) = self.by_file.get_mut(&file_key(path)) {
					entries.retain(|bp| bp.id != Some(update.breakpoint.id));
				}
			}
			(BreakpointUpdateKind::Removed, BreakpointSite::Command { name }) => {
				self.commands.retain(|bp| !bp.name.eq_ignore_ascii_case(name));
			}
			(BreakpointUpdateKind::Set, BreakpointSite::Line { path, line, column }) => {
				let entries = self.by_file.entry(file_key(path)).or_default();
				if let Some(existing) = entries.iter_mut().find(|bp| bp.id == Some(update.breakpoint.id)) {
					existing.verified = true;
					existing.line = *line;
					existing.column = *column;
				} else if let Some(existing) = entries.iter_mut().find(|bp| (bp.line, bp.column) == (*line, *column)) {
					existing.verified = true;
					existing.id = Some(update.breakpoint.id);
				} else {
					entries.push(LineBreakpoint {
						verified: true,
						message: None,
						source: path.clone(),
						line: *line,
						column: *column,
						condition: None,
						hit_count: None,
						id: Some(update.breakpoint.id),
					});
				}
			}
			(BreakpointUpdateKind::Set, BreakpointSite::Command { name }) => {
				if !self.commands.iter().any(|bp| bp.id == Some(update.breakpoint.id)) {
					self.commands.push(CommandBreakpoint {
						verified: true,
						message: None,
						name: name.clone(),
						condition: None,
						hit_count: None,
						id: Some(update.breakpoint.id),
					});
				}
			}
			// Enable/disable do not change registry membership.
			(BreakpointUpdateKind::Enabled | BreakpointUpdateKind::Disabled, _) => {}
		}
	}
}

#[cfg(test)]
mod tests {
	use posh_engine::debugger::{BreakpointSite, BreakpointUpdate, BreakpointUpdateKind, EngineBreakpoint};
	use pretty_assertions::assert_eq;

	use super::{BreakpointRegistry, LineBreakpoint, LineBreakpointSpec};

	fn update(kind: BreakpointUpdateKind, id: i64, path: &str, line: u32) -> BreakpointUpdate {
		BreakpointUpdate {
			kind,
			breakpoint: EngineBreakpoint {
				id,
				site: BreakpointSite::Line {
					path: path.to_string(),
					line,
					column: None,
				},
				action: None,
				enabled: true,
			},
		}
	}

	#[test]
	fn same_position_replaces_instead_of_duplicating() {
		let mut registry = BreakpointRegistry::new();
		let spec = LineBreakpointSpec::line(10);
		registry.record_line_breakpoint(LineBreakpoint::unverified("/tmp/a.ps1", &spec, "first"));
		registry.record_line_breakpoint(LineBreakpoint::unverified("/tmp/a.ps1", &spec, "second"));

		let entries = registry.breakpoints_in_file("/tmp/a.ps1");
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].message.as_deref(), Some("second"));
	}

	#[test]
	fn file_lookup_is_case_insensitive() {
		let mut registry = BreakpointRegistry::new();
		registry.record_line_breakpoint(LineBreakpoint::unverified("/Tmp/Case.PS1", &LineBreakpointSpec::line(1), "x"));
		assert_eq!(registry.breakpoints_in_file("/tmp/case.ps1").len(), 1);
	}

	#[test]
	fn engine_updates_are_idempotent_in_any_order() {
		let mut registry = BreakpointRegistry::new();

		// Update-before-set must not panic or duplicate.
		registry.apply_engine_update(&update(BreakpointUpdateKind::Set, 5, "/tmp/a.ps1", 3));
		registry.apply_engine_update(&update(BreakpointUpdateKind::Set, 5, "/tmp/a.ps1", 3));
		assert_eq!(registry.breakpoints_in_file("/tmp/a.ps1").len(), 1);

		registry.apply_engine_update(&update(BreakpointUpdateKind::Removed, 5, "/tmp/a.ps1", 3));
		registry.apply_engine_update(&update(BreakpointUpdateKind::Removed, 5, "/tmp/a.ps1", 3));
		assert!(registry.breakpoints_in_file("/tmp/a.ps1").is_empty());
	}

	#[test]
	fn clear_file_returns_engine_ids_once() {
		let mut registry = BreakpointRegistry::new();
		registry.apply_engine_update(&update(BreakpointUpdateKind::Set, 7, "/tmp/a.ps1", 3));
		registry.apply_engine_update(&update(BreakpointUpdateKind::Set, 8, "/tmp/a.ps1", 9));

		assert_eq!(registry.clear_file("/tmp/a.ps1"), vec![7, 8]);
		assert!(registry.clear_file("/tmp/a.ps1").is_empty());
	}
}
