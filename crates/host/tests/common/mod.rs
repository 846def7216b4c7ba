//! Shared fixtures for host integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use posh_engine::cancel::CancelToken;
use posh_host::console::ConsoleHost;
use posh_host::readline::{IdleHandler, ReadLineError, ReadLineProvider};

/// Captures console writes for assertions.
#[derive(Default)]
pub struct BufferConsole {
	pub lines: Mutex<Vec<String>>,
	pub errors: Mutex<Vec<String>>,
	pub prompts: Mutex<Vec<String>>,
}

impl BufferConsole {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn has_line(&self, needle: &str) -> bool {
		self.lines.lock().iter().any(|line| line.contains(needle))
	}

	pub fn has_error(&self, needle: &str) -> bool {
		self.errors.lock().iter().any(|line| line.contains(needle))
	}

	pub fn blank_lines(&self) -> usize {
		self.lines.lock().iter().filter(|line| line.is_empty()).count()
	}
}

impl ConsoleHost for BufferConsole {
	fn write_line(&self, text: &str) {
		self.lines.lock().push(text.to_string());
	}

	fn write_error_line(&self, text: &str) {
		self.errors.lock().push(text.to_string());
	}

	fn write_prompt(&self, text: &str) {
		self.prompts.lock().push(text.to_string());
	}
}

/// A read-line provider fed from the test thread.
#[derive(Default)]
pub struct QueueReadLine {
	lines: Mutex<VecDeque<String>>,
	ctrl_c: AtomicBool,
	eof_when_empty: AtomicBool,
	idle: Mutex<Option<IdleHandler>>,
}

impl QueueReadLine {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn push_line(&self, line: impl Into<String>) {
		self.lines.lock().push_back(line.into());
	}

	/// Records a Ctrl-C keypress the way a terminal reader would.
	pub fn press_ctrl_c(&self) {
		self.ctrl_c.store(true, Ordering::SeqCst);
	}

	pub fn clear_ctrl_c(&self) {
		self.ctrl_c.store(false, Ordering::SeqCst);
	}

	pub fn finish_after_queue(&self) {
		self.eof_when_empty.store(true, Ordering::SeqCst);
	}
}

impl ReadLineProvider for QueueReadLine {
	fn read_line(&self, cancel: &CancelToken) -> Result<String, ReadLineError> {
		loop {
			if let Some(line) = self.lines.lock().pop_front() {
				return Ok(line);
			}
			if cancel.is_cancelled() {
				return Err(ReadLineError::Cancelled);
			}
			if self.eof_when_empty.load(Ordering::SeqCst) {
				return Err(ReadLineError::Eof);
			}
			let idle = self.idle.lock().clone();
			if let Some(idle) = idle {
				idle();
			}
			std::thread::sleep(Duration::from_millis(2));
		}
	}

	fn last_key_was_ctrl_c(&self) -> bool {
		self.ctrl_c.load(Ordering::SeqCst)
	}

	fn try_override_idle_handler(&self, handler: IdleHandler) -> bool {
		*self.idle.lock() = Some(handler);
		true
	}
}

/// Polls `condition` until it holds or the timeout elapses.
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
	let deadline = Instant::now() + timeout;
	while Instant::now() < deadline {
		if condition() {
			return true;
		}
		std::thread::sleep(Duration::from_millis(5));
	}
	condition()
}

pub const WAIT: Duration = Duration::from_secs(5);
