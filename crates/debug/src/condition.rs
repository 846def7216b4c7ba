//! Breakpoint condition compilation.
//!
//! Conditions and hit counts become an engine action block that breaks when
//! satisfied. A textual scan catches the operator mistakes users import from
//! other languages (`==`, `!=`, comparison chevrons) and turns them into a
//! pointed diagnostic instead of an opaque parse failure.

use posh_engine::error::ParseDiagnostic;
use posh_engine::runspace::{ParsedScript, Runspace};

/// Operator mistakes worth a dedicated hint, longest first so `<=` is not
/// reported as `<`.
const OPERATOR_HINTS: &[(&str, &str)] = &[
	("==", "-eq"),
	("!=", "-ne"),
	("<=", "-le"),
	(">=", "-ge"),
	("<", "-lt"),
	(">", "-gt"),
];

/// Scans for comparison-operator mistakes outside quoted spans.
pub fn find_operator_mistake(condition: &str) -> Option<String> {
	let mut in_quote: Option<char> = None;
	let chars: Vec<char> = condition.chars().collect();
	let mut i = 0;
	while i < chars.len() {
		let ch = chars[i];
		if let Some(quote) = in_quote {
			if ch == quote {
				in_quote = None;
			}
			i += 1;
			continue;
		}
		match ch {
			'\'' | '"' => {
				in_quote = Some(ch);
				i += 1;
			}
			_ => {
				let rest: String = chars[i..].iter().collect();
				if let Some((found, replacement)) = OPERATOR_HINTS.iter().find(|(op, _)| rest.starts_with(op)) {
					return Some(format!("Use '{replacement}' instead of '{found}'."));
				}
				i += 1;
			}
		}
	}
	None
}

/// Compiles a condition and/or hit count into an engine action block.
///
/// `counter` keys the hit-count state variable so separate breakpoints do
/// not share counters. Returns `Ok(None)` for unconditional breakpoints and
/// `Err(message)` with a human-readable diagnostic for invalid conditions.
pub fn compile_action(runspace: &dyn Runspace, condition: Option<&str>, hit_count: Option<u32>, counter: u64) -> Result<Option<String>, String> {
	let condition = condition.map(str::trim).filter(|text| !text.is_empty());

	let hit_clause = hit_count.map(|count| format!("if (++$script:__breakpointHits{counter} -eq {count}) {{ break }}"));

	let Some(condition) = condition else {
		return Ok(hit_clause);
	};

	if let Some(hint) = find_operator_mistake(condition) {
		return Err(hint);
	}

	let parsed = runspace.parse(condition).map_err(|diagnostic| scrub_parse_error(&diagnostic))?;

	Ok(Some(match (parsed, hit_clause) {
		// A block that already controls break/continue is used verbatim.
		(ParsedScript { has_flow_break: true }, _) => condition.to_string(),
		(_, Some(hit_clause)) => format!("if ({condition}) {{ {hit_clause} }}"),
		(_, None) => format!("if ({condition}) {{ break }}"),
	}))
}

/// Reduces an engine parse error to its first human-readable sentence.
pub fn scrub_parse_error(diagnostic: &ParseDiagnostic) -> String {
	diagnostic.human_message()
}

/// Escapes wildcard-significant characters before a path reaches the
/// engine's breakpoint API.
pub fn escape_wildcards(path: &str) -> String {
	let mut escaped = String::with_capacity(path.len());
	for ch in path.chars() {
		if matches!(ch, '*' | '?' | '[' | ']') {
			escaped.push('`');
		}
		escaped.push(ch);
	}
	escaped
}
