//! Executor scheduling, cancellation, and recovery behavior.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use common::{BufferConsole, QueueReadLine, WAIT, wait_until};
use parking_lot::Mutex;
use posh_engine::command::EngineCommand;
use posh_engine::local::LocalRunspace;
use posh_engine::runspace::RunspaceHandle;
use posh_host::context::SessionEvent;
use posh_host::error::TaskError;
use posh_host::executor::PipelineExecutor;
use posh_host::options::{ExecutionOptions, Priority};
use posh_host::task::{ExecutionStatus, TaskHandle};
use tokio_util::sync::CancellationToken;

fn executor() -> PipelineExecutor {
	PipelineExecutor::builder(|| LocalRunspace::local() as RunspaceHandle)
		.start()
		.expect("pipeline thread should spawn")
}

#[test]
fn engine_work_runs_on_the_pipeline_thread() {
	let executor = executor();
	let seen = Arc::new(Mutex::new(Vec::new()));

	for _ in 0..3 {
		let seen_clone = Arc::clone(&seen);
		executor
			.submit_with_cancel("record-thread", ExecutionOptions::handler(), CancellationToken::new(), move |_| {
				seen_clone.lock().push(std::thread::current().id());
				Ok(())
			})
			.wait()
			.expect("task should complete");
	}

	let pipeline_id = executor.pipeline_thread_id().expect("thread id should be recorded");
	let seen = seen.lock();
	assert_eq!(seen.len(), 3);
	assert!(seen.iter().all(|id| *id == pipeline_id));
	assert!(seen.iter().all(|id| *id != std::thread::current().id()));
}

#[test]
fn same_priority_tasks_complete_in_submission_order() {
	let executor = executor();
	let order = Arc::new(Mutex::new(Vec::new()));

	let mut handles = Vec::new();
	for i in 0..5 {
		let order_clone = Arc::clone(&order);
		handles.push(executor.submit_with_cancel(
			format!("task-{i}"),
			ExecutionOptions::handler(),
			CancellationToken::new(),
			move |_| {
				order_clone.lock().push(i);
				Ok(())
			},
		));
	}
	for handle in handles {
		handle.wait().expect("task should complete");
	}

	assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn next_priority_runs_before_pending_normal() {
	let executor = executor();
	let order = Arc::new(Mutex::new(Vec::new()));
	let hold = Arc::new(AtomicBool::new(true));

	// Occupy the pipeline so the queue builds up behind this task.
	let hold_clone = Arc::clone(&hold);
	let blocker = executor.submit_with_cancel("blocker", ExecutionOptions::handler(), CancellationToken::new(), move |_| {
		while hold_clone.load(Ordering::SeqCst) {
			std::thread::sleep(Duration::from_millis(1));
		}
		Ok(())
	});

	let order_a = Arc::clone(&order);
	let normal = executor.submit_with_cancel("normal", ExecutionOptions::handler(), CancellationToken::new(), move |_| {
		order_a.lock().push("normal");
		Ok(())
	});
	let order_b = Arc::clone(&order);
	let next = executor.submit_with_cancel(
		"next",
		ExecutionOptions::handler().with_priority(Priority::Next),
		CancellationToken::new(),
		move |_| {
			order_b.lock().push("next");
			Ok(())
		},
	);

	hold.store(false, Ordering::SeqCst);
	blocker.wait().expect("blocker");
	next.wait().expect("next");
	normal.wait().expect("normal");

	assert_eq!(*order.lock(), vec!["next", "normal"]);
}

#[test]
fn interrupting_task_preempts_running_command() {
	let executor = executor();
	let running = Arc::new(AtomicBool::new(false));
	let running_clone = Arc::clone(&running);
	let _sub = executor.subscribe(Arc::new(move |event| {
		if let SessionEvent::ExecutionStatus(status) = event {
			if status.status == ExecutionStatus::Running && status.representation.contains("Start-Sleep") {
				running_clone.store(true, Ordering::SeqCst);
			}
		}
	}));

	let sleep = executor.submit_command(
		EngineCommand::script("Start-Sleep 60"),
		ExecutionOptions::repl_input(),
		CancellationToken::new(),
	);
	assert!(wait_until(WAIT, || running.load(Ordering::SeqCst)), "sleep should start running");

	let pid = executor.submit_command(
		EngineCommand::script("$pid"),
		ExecutionOptions::handler().interrupting(),
		CancellationToken::new(),
	);

	assert!(matches!(sleep.wait(), Err(TaskError::Cancelled)), "preempted sleep must cancel");
	let values = pid.wait().expect("pid task should complete");
	assert_eq!(values.first().map(|v| v.display_string()), Some(std::process::id().to_string()));
}

#[test]
fn interrupting_task_runs_before_other_pending_work() {
	let executor = executor();
	let order = Arc::new(Mutex::new(Vec::new()));

	let running: TaskHandle<()> = executor.submit_with_cancel("running", ExecutionOptions::handler(), CancellationToken::new(), move |cancel| {
		while !cancel.is_cancelled() {
			std::thread::sleep(Duration::from_millis(1));
		}
		Err(TaskError::Cancelled)
	});
	let order_a = Arc::clone(&order);
	let pending = executor.submit_with_cancel("pending", ExecutionOptions::handler(), CancellationToken::new(), move |_| {
		order_a.lock().push("pending");
		Ok(())
	});
	std::thread::sleep(Duration::from_millis(30));

	let order_b = Arc::clone(&order);
	let interrupt = executor.submit_with_cancel(
		"interrupt",
		ExecutionOptions::handler().interrupting(),
		CancellationToken::new(),
		move |_| {
			order_b.lock().push("interrupt");
			Ok(())
		},
	);

	assert!(matches!(running.wait(), Err(TaskError::Cancelled)));
	interrupt.wait().expect("interrupt task");
	pending.wait().expect("pending task");
	assert_eq!(*order.lock(), vec!["interrupt", "pending"]);
}

#[test]
fn cancelling_before_dequeue_drops_without_engine_call() {
	let executor = executor();
	let hold = Arc::new(AtomicBool::new(true));
	let executed = Arc::new(AtomicBool::new(false));

	let hold_clone = Arc::clone(&hold);
	let blocker = executor.submit_with_cancel("blocker", ExecutionOptions::handler(), CancellationToken::new(), move |_| {
		while hold_clone.load(Ordering::SeqCst) {
			std::thread::sleep(Duration::from_millis(1));
		}
		Ok(())
	});

	let executed_clone = Arc::clone(&executed);
	let victim = executor.submit_with_cancel("victim", ExecutionOptions::handler(), CancellationToken::new(), move |_| {
		executed_clone.store(true, Ordering::SeqCst);
		Ok(())
	});
	victim.cancel();
	hold.store(false, Ordering::SeqCst);

	blocker.wait().expect("blocker");
	assert!(matches!(victim.wait(), Err(TaskError::Cancelled)));
	assert!(!executed.load(Ordering::SeqCst), "cancelled task must never run");
}

#[test]
fn inconsistent_options_fail_the_promise_at_submission() {
	let executor = executor();
	let options = ExecutionOptions {
		interrupt_current_foreground: true,
		..ExecutionOptions::default()
	};
	let handle = executor.submit_command(EngineCommand::script("Write-Output 1"), options, CancellationToken::new());
	assert!(matches!(handle.wait(), Err(TaskError::Rejected(_))));
}

#[test]
fn session_lost_recovers_with_a_fresh_runspace() {
	let console = BufferConsole::new();
	let created: Arc<Mutex<Vec<Arc<LocalRunspace>>>> = Arc::new(Mutex::new(Vec::new()));
	let created_clone = Arc::clone(&created);
	let executor = PipelineExecutor::builder(move || {
		let runspace = LocalRunspace::local();
		created_clone.lock().push(Arc::clone(&runspace));
		runspace as RunspaceHandle
	})
	.console(Arc::clone(&console) as Arc<dyn posh_host::console::ConsoleHost>)
	.start()
	.expect("pipeline thread should spawn");

	assert!(wait_until(WAIT, || !created.lock().is_empty()), "initial runspace should exist");
	created.lock()[0].poison("remote endpoint dropped");

	let failed = executor.submit_command(EngineCommand::script("Write-Output 1"), ExecutionOptions::handler(), CancellationToken::new());
	assert!(matches!(failed.wait(), Err(TaskError::Engine(_))));

	// The factory supplied a replacement session; new work succeeds.
	let values = executor
		.submit_command(EngineCommand::script("Write-Output 2"), ExecutionOptions::handler(), CancellationToken::new())
		.wait()
		.expect("post-recovery command");
	assert_eq!(values.first().map(|v| v.display_string()), Some("2".to_string()));
	assert!(
		wait_until(WAIT, || console.has_error("reinitialized")),
		"recovery must explain itself on the console"
	);
}

#[test]
fn session_exit_releases_the_engine_handle_off_thread() {
	let runspace = LocalRunspace::local();
	let runspace_clone = Arc::clone(&runspace);
	let executor = PipelineExecutor::builder(move || Arc::clone(&runspace_clone) as RunspaceHandle)
		.start()
		.expect("pipeline thread should spawn");

	// Let the thread come up, then wind the session down.
	assert!(wait_until(WAIT, || executor.pipeline_thread_id().is_some()));
	executor.request_session_exit();

	assert!(
		wait_until(WAIT, || {
			use posh_engine::runspace::Runspace as _;
			runspace.availability() == posh_engine::runspace::RunspaceAvailability::Unusable
		}),
		"session exit should close the engine handle"
	);
	executor.shutdown();
}

#[test]
fn background_tasks_run_only_inside_a_non_interactive_frame() {
	let console = BufferConsole::new();
	let readline = QueueReadLine::new();
	let executor = PipelineExecutor::builder(|| LocalRunspace::local() as RunspaceHandle)
		.console(Arc::clone(&console) as Arc<dyn posh_host::console::ConsoleHost>)
		.readline(Arc::clone(&readline) as Arc<dyn posh_host::readline::ReadLineProvider>)
		.start()
		.expect("pipeline thread should spawn");

	let events = Arc::new(Mutex::new(Vec::new()));
	let events_clone = Arc::clone(&events);
	let _sub = executor.subscribe(Arc::new(move |event| {
		match event {
			SessionEvent::FramePushed { frame_type, .. } => events_clone.lock().push(format!("push:{frame_type:?}")),
			SessionEvent::FramePopped { frame_type, .. } => events_clone.lock().push(format!("pop:{frame_type:?}")),
			SessionEvent::ExecutionStatus(status) if status.status == ExecutionStatus::Running => {
				events_clone.lock().push(format!("run:{}", status.representation));
			}
			_ => {}
		}
	}));

	executor.start_repl();
	let background = executor.submit_with_cancel(
		"background-probe",
		ExecutionOptions::default(),
		CancellationToken::new(),
		move |_| Ok(()),
	);
	background.wait().expect("background task should drain during idle");

	let log = events.lock().clone();
	let run_index = log
		.iter()
		.position(|entry| entry == "run:background-probe")
		.expect("background task must have run");
	let enclosing_push = log[..run_index]
		.iter()
		.rev()
		.find(|entry| entry.starts_with("push:"))
		.expect("a frame must enclose the background task");
	assert!(
		enclosing_push.contains("NON_INTERACTIVE"),
		"expected a non-interactive frame, got {enclosing_push}"
	);
}
