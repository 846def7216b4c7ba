//! Console REPL behavior: echo, history, Ctrl-C, and prompt cadence.

mod common;

use std::sync::Arc;

use common::{BufferConsole, QueueReadLine, WAIT, wait_until};
use posh_engine::local::LocalRunspace;
use posh_engine::runspace::RunspaceHandle;
use posh_host::console::ConsoleHost;
use posh_host::executor::PipelineExecutor;
use posh_host::readline::ReadLineProvider;

struct ReplFixture {
	executor: PipelineExecutor,
	console: Arc<BufferConsole>,
	readline: Arc<QueueReadLine>,
	runspace: Arc<LocalRunspace>,
}

fn repl_fixture() -> ReplFixture {
	let console = BufferConsole::new();
	let readline = QueueReadLine::new();
	let runspace = LocalRunspace::local();
	let runspace_clone = Arc::clone(&runspace);
	let executor = PipelineExecutor::builder(move || Arc::clone(&runspace_clone) as RunspaceHandle)
		.console(Arc::clone(&console) as Arc<dyn ConsoleHost>)
		.readline(Arc::clone(&readline) as Arc<dyn ReadLineProvider>)
		.start()
		.expect("pipeline thread should spawn");
	executor.start_repl();
	ReplFixture {
		executor,
		console,
		readline,
		runspace,
	}
}

#[test]
fn repl_echoes_output_and_records_history() {
	let fixture = repl_fixture();
	fixture.readline.push_line("Write-Output 42");

	assert!(wait_until(WAIT, || fixture.console.has_line("42")), "console should show the output");
	assert!(
		wait_until(WAIT, || fixture.runspace.history() == vec!["Write-Output 42".to_string()]),
		"history should contain exactly the one entry"
	);
	fixture.executor.shutdown();
}

#[test]
fn prompt_is_written_before_each_read() {
	let fixture = repl_fixture();
	assert!(
		wait_until(WAIT, || fixture.console.prompts.lock().iter().any(|p| p == "PS> ")),
		"the engine prompt should reach the console"
	);

	// An empty line re-prompts without evaluating anything.
	fixture.readline.push_line("");
	assert!(
		wait_until(WAIT, || fixture.console.prompts.lock().len() >= 2),
		"empty input should lead to another prompt"
	);
	assert!(fixture.runspace.history().is_empty());
	fixture.executor.shutdown();
}

#[test]
fn bare_ctrl_c_at_prompt_prints_newline_and_continues() {
	let fixture = repl_fixture();
	assert!(wait_until(WAIT, || !fixture.console.prompts.lock().is_empty()), "repl should prompt");

	// Ctrl-C while the read blocks: console handler cancels the current
	// task, which aborts the read.
	fixture.readline.press_ctrl_c();
	fixture.executor.cancel_current_task();

	assert!(wait_until(WAIT, || fixture.console.blank_lines() >= 1), "one blank line should print");
	fixture.readline.clear_ctrl_c();

	// The REPL survives and keeps evaluating.
	fixture.readline.push_line("Write-Output after-interrupt");
	assert!(
		wait_until(WAIT, || fixture.console.has_line("after-interrupt")),
		"repl should continue after Ctrl-C"
	);
	fixture.executor.shutdown();
}

#[test]
fn engine_errors_reach_the_console_not_the_promise() {
	let fixture = repl_fixture();
	fixture.readline.push_line("No-Such-Command");

	assert!(
		wait_until(WAIT, || fixture.console.has_error("No-Such-Command")),
		"unknown command should print an error record"
	);

	// Still interactive afterwards.
	fixture.readline.push_line("Write-Output still-alive");
	assert!(wait_until(WAIT, || fixture.console.has_line("still-alive")));
	fixture.executor.shutdown();
}

#[test]
fn eof_winds_the_repl_down() {
	let fixture = repl_fixture();
	fixture.readline.push_line("Write-Output last");
	fixture.readline.finish_after_queue();

	assert!(wait_until(WAIT, || fixture.console.has_line("last")));
	// Let the next cycle observe EOF and wind down before sampling.
	std::thread::sleep(std::time::Duration::from_millis(100));
	let prompts_after_drain = fixture.console.prompts.lock().len();
	std::thread::sleep(std::time::Duration::from_millis(100));
	assert_eq!(fixture.console.prompts.lock().len(), prompts_after_drain, "no further prompts after EOF");
	fixture.executor.shutdown();
}
