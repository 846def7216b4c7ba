//! Variable containers for one debugger stop.
//!
//! Ids index a flat vector owned by the debug service. Low ids are reserved
//! (dummy slot, global scope, script scope); capture allocates the rest
//! monotonically and never reuses an id within a stop epoch. The vector is
//! reset on resume.

use posh_engine::debugger::EngineVariable;
use posh_engine::value::Value;
use serde::Serialize;

pub const DUMMY_VARIABLE_ID: usize = 0;
pub const GLOBAL_SCOPE_ID: usize = 1;
pub const SCRIPT_SCOPE_ID: usize = 2;
/// First id handed out by capture; everything below is reserved.
pub const FIRST_VARIABLE_ID: usize = 10;

/// Engine-internal variables carry this prefix and never show as autos.
pub const INTERNAL_VARIABLE_PREFIX: &str = "__";

/// Scope names surfaced to variable-scope requests, in presentation order.
pub const AUTO_SCOPE_NAME: &str = "Auto";
pub const LOCAL_SCOPE_NAME: &str = "Local";
pub const SCRIPT_SCOPE_NAME: &str = "Script";
pub const GLOBAL_SCOPE_NAME: &str = "Global";

/// One entry in the flat variable table: a scope container or a variable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableNode {
	pub id: usize,
	pub name: String,
	pub value_string: String,
	pub expandable: bool,
	/// Backing value for lazy child expansion; scope containers have none.
	#[serde(skip)]
	value: Option<Value>,
	/// Child ids, computed at most once per stop.
	#[serde(skip)]
	children: Option<Vec<usize>>,
}

/// A named scope handle returned by variable-scope requests.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableScopeRecord {
	pub id: usize,
	pub name: String,
}

/// Renders a value the way the debugger's variable pane shows it: strings
/// quoted, everything else via its display form.
pub fn variable_value_string(value: &Value) -> String {
	match value {
		Value::String(text) => format!("\"{text}\""),
		other => other.display_string(),
	}
}

/// The flat variable table for the current stop epoch.
pub struct VariableStore {
	nodes: Vec<VariableNode>,
}

impl Default for VariableStore {
	fn default() -> Self {
		let mut store = Self { nodes: Vec::new() };
		store.seed_reserved();
		store
	}
}

impl VariableStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn seed_reserved(&mut self) {
		debug_assert!(self.nodes.is_empty());
		self.nodes.push(VariableNode {
			id: DUMMY_VARIABLE_ID,
			name: String::new(),
			value_string: String::new(),
			expandable: false,
			value: None,
			children: Some(Vec::new()),
		});
		for (id, name) in [(GLOBAL_SCOPE_ID, GLOBAL_SCOPE_NAME), (SCRIPT_SCOPE_ID, SCRIPT_SCOPE_NAME)] {
			self.nodes.push(VariableNode {
				id,
				name: name.to_string(),
				value_string: String::new(),
				expandable: true,
				value: None,
				children: Some(Vec::new()),
			});
		}
		while self.nodes.len() < FIRST_VARIABLE_ID {
			self.nodes.push(VariableNode {
				id: self.nodes.len(),
				name: String::new(),
				value_string: String::new(),
				expandable: false,
				value: None,
				children: Some(Vec::new()),
			});
		}
	}

	/// Clears the table back to the reserved slots. Called on resume.
	pub fn reset(&mut self) {
		self.nodes.clear();
		self.seed_reserved();
	}

	/// Allocates an empty container (frame auto/local scopes).
	pub fn add_container(&mut self, name: impl Into<String>) -> usize {
		let id = self.nodes.len();
		self.nodes.push(VariableNode {
			id,
			name: name.into(),
			value_string: String::new(),
			expandable: true,
			value: None,
			children: Some(Vec::new()),
		});
		id
	}

	/// Adds one engine variable under `container_id` and returns its id.
	pub fn add_variable(&mut self, container_id: usize, variable: &EngineVariable) -> usize {
		let id = self.nodes.len();
		self.nodes.push(VariableNode {
			id,
			name: format!("${}", variable.name),
			value_string: variable_value_string(&variable.value),
			expandable: variable.value.is_expandable(),
			value: Some(variable.value.clone()),
			children: None,
		});
		if let Some(container) = self.nodes.get_mut(container_id) {
			if let Some(children) = container.children.as_mut() {
				children.push(id);
			}
		}
		id
	}

	pub fn get(&self, id: usize) -> Option<&VariableNode> {
		self.nodes.get(id)
	}

	/// Child nodes of `id`, expanding lazily on first access.
	pub fn children_of(&mut self, id: usize) -> Option<Vec<VariableNode>> {
		let node = self.nodes.get(id)?;
		if let Some(children) = node.children.clone() {
			return Some(children.iter().filter_map(|child| self.nodes.get(*child).cloned()).collect());
		}
		if !node.expandable {
			return Some(Vec::new());
		}

		let value_children = node.value.as_ref().map(Value::children).unwrap_or_default();
		let mut child_ids = Vec::with_capacity(value_children.len());
		for (name, value) in value_children {
			let child_id = self.nodes.len();
			self.nodes.push(VariableNode {
				id: child_id,
				name,
				value_string: variable_value_string(&value),
				expandable: value.is_expandable(),
				value: Some(value),
				children: None,
			});
			child_ids.push(child_id);
		}
		if let Some(node) = self.nodes.get_mut(id) {
			node.children = Some(child_ids.clone());
		}
		Some(child_ids.iter().filter_map(|child| self.nodes.get(*child).cloned()).collect())
	}

	/// Finds a child of `container_id` by display name, case-insensitively.
	pub fn find_child(&mut self, container_id: usize, name: &str) -> Option<VariableNode> {
		let dollar = format!("${name}");
		self.children_of(container_id)?
			.into_iter()
			.find(|node| node.name.eq_ignore_ascii_case(name) || node.name.eq_ignore_ascii_case(&dollar))
	}

	/// Refreshes a variable's cached value after assignment.
	pub fn update_value(&mut self, id: usize, value: &Value) {
		if let Some(node) = self.nodes.get_mut(id) {
			node.value_string = variable_value_string(value);
			node.expandable = value.is_expandable();
			node.value = Some(value.clone());
			node.children = None;
		}
	}

	pub fn next_id(&self) -> usize {
		self.nodes.len()
	}
}

/// Auto-variable classification: the subset of locals worth showing by
/// default.
pub fn is_auto_variable(variable: &EngineVariable, globals: &[EngineVariable]) -> bool {
	let name = variable.name.as_str();
	if name.starts_with(INTERNAL_VARIABLE_PREFIX) {
		return false;
	}
	if name.eq_ignore_ascii_case("PSDebugContext") {
		return false;
	}
	if name == "_" {
		return true;
	}
	if name.eq_ignore_ascii_case("args") {
		return !variable.value.is_empty();
	}
	if (variable.is_constant || variable.is_read_only) && globals.iter().any(|global| global.name.eq_ignore_ascii_case(name)) {
		return false;
	}
	variable.is_user_created()
}

#[cfg(test)]
mod tests {
	use posh_engine::debugger::EngineVariable;
	use posh_engine::value::Value;
	use pretty_assertions::assert_eq;

	use super::{FIRST_VARIABLE_ID, VariableStore, is_auto_variable, variable_value_string};

	fn record(fields: &[(&str, Value)]) -> Value {
		Value::Record(fields.iter().map(|(name, value)| (name.to_string(), value.clone())).collect())
	}

	#[test]
	fn capture_ids_start_at_the_reserved_floor() {
		let store = VariableStore::new();
		assert_eq!(store.next_id(), FIRST_VARIABLE_ID);
	}

	#[test]
	fn children_expand_once_and_cache() {
		let mut store = VariableStore::new();
		let container = store.add_container("Local");
		let variable = EngineVariable::user("point", record(&[("X", Value::Int(1)), ("Y", Value::Int(2))]));
		let id = store.add_variable(container, &variable);

		let children = store.children_of(id).expect("children");
		assert_eq!(children.len(), 2);
		assert_eq!(store.get(id).map(|node| node.name.as_str()), Some("$point"));
		let first_ids: Vec<usize> = children.iter().map(|c| c.id).collect();

		// A second expansion returns the same ids, not new ones.
		let again = store.children_of(id).expect("children");
		assert_eq!(again.iter().map(|c| c.id).collect::<Vec<_>>(), first_ids);
	}

	#[test]
	fn reset_reclaims_everything_but_reserved_slots() {
		let mut store = VariableStore::new();
		let container = store.add_container("Local");
		store.add_variable(container, &EngineVariable::user("x", Value::Int(1)));
		assert!(store.next_id() > FIRST_VARIABLE_ID);

		store.reset();
		assert_eq!(store.next_id(), FIRST_VARIABLE_ID);
	}

	#[test]
	fn strings_are_quoted_in_value_strings() {
		assert_eq!(variable_value_string(&Value::from("hi")), "\"hi\"");
		assert_eq!(variable_value_string(&Value::Int(3)), "3");
	}

	#[test]
	fn auto_classification_follows_the_display_heuristics() {
		let globals = vec![EngineVariable {
			is_constant: true,
			..EngineVariable::user("HOME", Value::from("/root"))
		}];

		// User-created locals show.
		assert!(is_auto_variable(&EngineVariable::user("i", Value::Int(1)), &globals));
		// Engine internals and the debug context never show.
		assert!(!is_auto_variable(&EngineVariable::user("__internal", Value::Int(1)), &globals));
		assert!(!is_auto_variable(&EngineVariable::user("PSDebugContext", Value::Null), &globals));
		// $_ always shows; $args only when nonempty.
		assert!(is_auto_variable(&EngineVariable::user("_", Value::Int(9)), &globals));
		assert!(!is_auto_variable(&EngineVariable::user("args", Value::List(Vec::new())), &globals));
		assert!(is_auto_variable(&EngineVariable::user("args", Value::List(vec![Value::Int(1)])), &globals));
		// Constants duplicating a global stay hidden.
		let shadowed = EngineVariable {
			is_constant: true,
			..EngineVariable::user("HOME", Value::from("/root"))
		};
		assert!(!is_auto_variable(&shadowed, &globals));
		// Session-state variables that are not user-created stay hidden.
		let session = EngineVariable {
			type_name: "System.Management.Automation.SessionStateInternalEntry".to_string(),
			..EngineVariable::user("host", Value::Null)
		};
		assert!(!is_auto_variable(&session, &globals));
	}
}
