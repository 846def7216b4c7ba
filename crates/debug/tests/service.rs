//! End-to-end debug service behavior over the pipeline executor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use posh_debug::breakpoints::{CommandBreakpointSpec, LineBreakpointSpec};
use posh_debug::remote_files::LocalSessionFiles;
use posh_debug::service::DebugService;
use posh_engine::command::EngineCommand;
use posh_engine::debugger::{Debugger as _, DebuggerStopInfo, EngineVariable, ResumeAction, ScriptRegion};
use posh_engine::local::{LocalFrame, LocalRunspace};
use posh_engine::runspace::{Runspace, RunspaceHandle};
use posh_engine::value::Value;
use posh_host::executor::PipelineExecutor;
use posh_host::options::ExecutionOptions;
use posh_host::task::TaskHandle;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

fn wait_until(condition: impl Fn() -> bool) -> bool {
	let deadline = Instant::now() + WAIT;
	while Instant::now() < deadline {
		if condition() {
			return true;
		}
		std::thread::sleep(Duration::from_millis(5));
	}
	condition()
}

struct Fixture {
	executor: Arc<PipelineExecutor>,
	service: DebugService,
	runspace: Arc<LocalRunspace>,
}

/// A session whose `./loop.ps1` stops at line 5 with `$i = 3` in scope.
fn fixture() -> Fixture {
	let runspace = LocalRunspace::local();
	runspace.set_call_stack_fixture(vec![
		LocalFrame::new("loop.ps1")
			.at("/tmp/loop.ps1", ScriptRegion::line(5))
			.with_local(EngineVariable::user("i", Value::Int(3)))
			.with_local(EngineVariable::user(
				"point",
				Value::Record(vec![("X".to_string(), Value::Int(7)), ("Y".to_string(), Value::Int(9))]),
			)),
	]);
	runspace.register_script(
		"./loop.ps1",
		Arc::new(|invocation, _command| {
			let action = invocation.trigger_stop(DebuggerStopInfo {
				breakpoint_ids: vec![1],
				script_path: Some("/tmp/loop.ps1".to_string()),
				region: Some(ScriptRegion::line(5)),
			});
			match action {
				ResumeAction::Stop => Err(posh_engine::error::EngineError::Interrupted),
				_ => Ok(vec![Value::from("finished")]),
			}
		}),
	);

	let runspace_clone = Arc::clone(&runspace);
	let executor = Arc::new(
		PipelineExecutor::builder(move || Arc::clone(&runspace_clone) as RunspaceHandle)
			.start()
			.expect("pipeline thread should spawn"),
	);
	let mirror = Arc::new(LocalSessionFiles::new().expect("session scratch dir"));
	let service = DebugService::new(Arc::clone(&executor), mirror);
	service.set_workspace_root("/tmp");

	Fixture {
		executor,
		service,
		runspace,
	}
}

fn run_script(fixture: &Fixture) -> TaskHandle<Vec<Value>> {
	fixture.executor.submit_command(
		EngineCommand::script("./loop.ps1"),
		ExecutionOptions::handler(),
		CancellationToken::new(),
	)
}

#[test]
fn stop_captures_frames_and_four_scopes() {
	let fixture = fixture();
	let script = run_script(&fixture);
	assert!(wait_until(|| fixture.service.is_stopped()), "debugger should stop");

	let frames = fixture.service.get_stack_frames().expect("frames while stopped");
	assert!(!frames.is_empty());
	assert_eq!(frames[0].script_path.as_deref(), Some("/tmp/loop.ps1"));
	assert_eq!(frames[0].start_line, 5);

	let scopes = fixture.service.get_variable_scopes(0).expect("scopes");
	let names: Vec<&str> = scopes.iter().map(|scope| scope.name.as_str()).collect();
	assert_eq!(names, vec!["Auto", "Local", "Script", "Global"]);

	fixture.service.continue_execution().expect("continue");
	assert!(wait_until(|| !fixture.service.is_stopped()), "debugger should resume");
	let values = script.wait().expect("script should finish after continue");
	assert_eq!(values, vec![Value::from("finished")]);
	fixture.executor.shutdown();
}

#[test]
fn captured_variables_expand_and_round_trip_assignment() {
	let fixture = fixture();
	let script = run_script(&fixture);
	assert!(wait_until(|| fixture.service.is_stopped()));

	let scopes = fixture.service.get_variable_scopes(0).expect("scopes");
	let auto_id = scopes[0].id;
	let local_id = scopes[1].id;

	let autos = fixture.service.get_variables(auto_id).expect("autos");
	let i = autos.iter().find(|node| node.name == "$i").expect("$i should be an auto");
	assert_eq!(i.value_string, "3");

	// Expandable record walks by dotted expression.
	let x = fixture
		.service
		.get_variable_from_expression("point.X", 0)
		.expect("walk")
		.expect("point.X resolves");
	assert_eq!(x.value_string, "7");
	assert!(
		fixture
			.service
			.get_variable_from_expression("point.Missing", 0)
			.expect("walk")
			.is_none()
	);

	// Assignment round-trips through the engine and the cached container.
	let new_value = fixture.service.set_variable(local_id, "i", "5").expect("set");
	assert_eq!(new_value, "5");
	assert_eq!(fixture.service.variable_value(local_id, "i").as_deref(), Some("5"));
	let engine_value = fixture
		.runspace
		.debugger()
		.evaluate("$i")
		.expect("engine sees the assignment");
	assert_eq!(engine_value, Value::Int(5));

	fixture.service.continue_execution().expect("continue");
	script.wait().expect("script finishes");
	fixture.executor.shutdown();
}

#[test]
fn state_queries_fail_once_resumed() {
	let fixture = fixture();
	let script = run_script(&fixture);
	assert!(wait_until(|| fixture.service.is_stopped()));

	fixture.service.continue_execution().expect("continue");
	script.wait().expect("script finishes");
	assert!(wait_until(|| !fixture.service.is_stopped()));

	assert!(fixture.service.get_stack_frames().is_err());
	assert!(fixture.service.get_variable_scopes(0).is_err());
	fixture.executor.shutdown();
}

#[test]
fn line_breakpoints_verify_and_compile_their_conditions() {
	let fixture = fixture();

	let breakpoints = fixture
		.service
		.set_line_breakpoints(
			"/tmp/loop.ps1",
			vec![LineBreakpointSpec::line(5).with_condition("$i -eq 3"), LineBreakpointSpec::line(9)],
			true,
		)
		.expect("set breakpoints");

	assert_eq!(breakpoints.len(), 2);
	assert!(breakpoints.iter().all(|bp| bp.verified));

	let engine_breakpoints = fixture.runspace.debugger().breakpoints();
	assert_eq!(engine_breakpoints.len(), 2);
	assert_eq!(engine_breakpoints[0].action.as_deref(), Some("if ($i -eq 3) { break }"));

	// The per-file registry mirrors what the engine holds.
	let recorded = fixture.service.breakpoints_in_file("/tmp/loop.ps1");
	assert_eq!(recorded.len(), 2);
	assert!(recorded.iter().all(|bp| bp.id.is_some()));
	fixture.executor.shutdown();
}

#[test]
fn command_breakpoints_verify_and_clear() {
	let fixture = fixture();

	let breakpoints = fixture
		.service
		.set_command_breakpoints(
			vec![CommandBreakpointSpec {
				name: "Write-Output".to_string(),
				condition: None,
				hit_count: Some(2),
			}],
			true,
		)
		.expect("set command breakpoints");
	assert_eq!(breakpoints.len(), 1);
	assert!(breakpoints[0].verified);
	assert_eq!(fixture.runspace.debugger().breakpoints().len(), 1);

	let cleared = fixture.service.set_command_breakpoints(Vec::new(), true).expect("clear");
	assert!(cleared.is_empty());
	assert!(fixture.runspace.debugger().breakpoints().is_empty());
	fixture.executor.shutdown();
}

#[test]
fn stop_without_source_materializes_a_script_listing() {
	let fixture = fixture();
	fixture.runspace.set_source_listing("1:  $x = 1\n2:* $x");
	fixture.runspace.set_call_stack_fixture(vec![LocalFrame::new("<ScriptBlock>")]);
	fixture.runspace.register_script(
		"./interactive.ps1",
		Arc::new(|invocation, _command| {
			invocation.trigger_stop(DebuggerStopInfo::default());
			Ok(Vec::new())
		}),
	);

	let script = fixture.executor.submit_command(
		EngineCommand::script("./interactive.ps1"),
		ExecutionOptions::handler(),
		CancellationToken::new(),
	);
	assert!(wait_until(|| fixture.service.is_stopped()));

	let frames = fixture.service.get_stack_frames().expect("frames");
	let listing_path = frames[0].script_path.as_deref().expect("a listing stands in for the missing source");
	assert!(listing_path.contains("Script Listing"), "got: {listing_path}");
	assert_eq!(
		std::fs::read_to_string(listing_path).expect("listing file exists"),
		"1:  $x = 1\n2:* $x"
	);

	fixture.service.continue_execution().expect("continue");
	script.wait().expect("script finishes");
	fixture.executor.shutdown();
}

#[test]
fn break_request_stops_at_the_next_statement() {
	let fixture = fixture();
	fixture.runspace.register_script(
		"./serve.ps1",
		Arc::new(|invocation, _command| {
			// A long-running command polls for pending break requests the
			// way the engine checks between statements.
			if invocation.take_break_request() {
				let action = invocation.trigger_stop(DebuggerStopInfo::default());
				if action == ResumeAction::Stop {
					return Err(posh_engine::error::EngineError::Interrupted);
				}
			}
			Ok(vec![Value::from("served")])
		}),
	);

	fixture.service.break_execution().expect("request break");
	let script = fixture.executor.submit_command(
		EngineCommand::script("./serve.ps1"),
		ExecutionOptions::handler(),
		CancellationToken::new(),
	);

	assert!(wait_until(|| fixture.service.is_stopped()), "break request should stop the script");
	fixture.service.continue_execution().expect("continue");
	let values = script.wait().expect("script finishes");
	assert_eq!(values, vec![Value::from("served")]);
	fixture.executor.shutdown();
}

#[test]
fn invalid_condition_reports_a_hint_and_sets_nothing() {
	let fixture = fixture();

	let breakpoints = fixture
		.service
		.set_line_breakpoints("/tmp/loop.ps1", vec![LineBreakpointSpec::line(5).with_condition("$i == 3")], true)
		.expect("request should not fail outright");

	assert_eq!(breakpoints.len(), 1);
	assert!(!breakpoints[0].verified);
	let message = breakpoints[0].message.as_deref().expect("diagnostic message");
	assert!(message.contains("Use '-eq' instead of '=='"), "got: {message}");
	assert!(fixture.runspace.debugger().breakpoints().is_empty());
	fixture.executor.shutdown();
}

#[test]
fn clearing_breakpoints_is_idempotent() {
	let fixture = fixture();

	fixture
		.service
		.set_line_breakpoints("/tmp/loop.ps1", vec![LineBreakpointSpec::line(3), LineBreakpointSpec::line(4)], true)
		.expect("seed breakpoints");
	assert_eq!(fixture.runspace.debugger().breakpoints().len(), 2);

	for _ in 0..2 {
		let cleared = fixture
			.service
			.set_line_breakpoints("/tmp/loop.ps1", Vec::new(), true)
			.expect("clear");
		assert!(cleared.is_empty());
		assert!(fixture.runspace.debugger().breakpoints().is_empty());
	}
	fixture.executor.shutdown();
}

#[test]
fn stepping_verbs_resume_with_their_actions() {
	let fixture = fixture();
	let script = run_script(&fixture);
	assert!(wait_until(|| fixture.service.is_stopped()));

	// Step-over resumes the engine; the scripted handler treats any
	// non-Stop action as "keep going".
	fixture.service.step_over().expect("step");
	assert!(wait_until(|| !fixture.service.is_stopped()));
	script.wait().expect("script finishes");
	fixture.executor.shutdown();
}

#[test]
fn abort_terminates_the_debugged_command() {
	let fixture = fixture();
	let script = run_script(&fixture);
	assert!(wait_until(|| fixture.service.is_stopped()));

	fixture.service.abort().expect("abort");
	assert!(wait_until(|| !fixture.service.is_stopped()));
	assert!(script.wait().is_err(), "aborted script must not complete");
	fixture.executor.shutdown();
}
