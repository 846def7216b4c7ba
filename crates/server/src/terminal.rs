//! Minimal terminal read-line provider.
//!
//! A detached thread drains stdin into a queue; `read_line` (called on the
//! pipeline thread) polls the queue, honoring cancellation and invoking the
//! idle hook so background tasks drain while the read blocks. A richer
//! provider with completion and history would slot in behind the same trait.

use std::collections::VecDeque;
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use posh_engine::cancel::CancelToken;
use posh_host::readline::{IdleHandler, ReadLineError, ReadLineProvider};

pub struct TerminalReadLine {
	lines: Mutex<VecDeque<String>>,
	eof: AtomicBool,
	ctrl_c: AtomicBool,
	idle: Mutex<Option<IdleHandler>>,
}

impl TerminalReadLine {
	pub fn spawn() -> Arc<Self> {
		let provider = Arc::new(Self {
			lines: Mutex::new(VecDeque::new()),
			eof: AtomicBool::new(false),
			ctrl_c: AtomicBool::new(false),
			idle: Mutex::new(None),
		});

		let reader = Arc::clone(&provider);
		std::thread::Builder::new()
			.name("posh-stdin".to_string())
			.spawn(move || {
				for line in std::io::stdin().lock().lines() {
					match line {
						Ok(line) => reader.lines.lock().push_back(line),
						Err(error) => {
							tracing::debug!(%error, "stdin read failed");
							break;
						}
					}
				}
				reader.eof.store(true, Ordering::SeqCst);
			})
			.ok();

		provider
	}

	/// Called from the interrupt handler when SIGINT arrives.
	pub fn record_ctrl_c(&self) {
		self.ctrl_c.store(true, Ordering::SeqCst);
	}

	/// True once stdin is exhausted and every queued line was consumed.
	pub fn finished(&self) -> bool {
		self.eof.load(Ordering::SeqCst) && self.lines.lock().is_empty()
	}
}

impl ReadLineProvider for TerminalReadLine {
	fn read_line(&self, cancel: &CancelToken) -> Result<String, ReadLineError> {
		// A fresh read session; the last-key flag describes keys seen during
		// this read only.
		self.ctrl_c.store(false, Ordering::SeqCst);
		loop {
			if let Some(line) = self.lines.lock().pop_front() {
				return Ok(line);
			}
			if cancel.is_cancelled() {
				return Err(ReadLineError::Cancelled);
			}
			if self.eof.load(Ordering::SeqCst) {
				return Err(ReadLineError::Eof);
			}
			let idle = self.idle.lock().clone();
			if let Some(idle) = idle {
				idle();
			}
			std::thread::sleep(Duration::from_millis(10));
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
