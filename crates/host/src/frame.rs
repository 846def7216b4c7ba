//! Runspace frames: one engine invocation context per stack entry.

use std::sync::atomic::{AtomicBool, Ordering};

use bitflags::bitflags;
use parking_lot::Mutex;
use posh_engine::events::Subscription;
use posh_engine::runspace::RunspaceHandle;
use tokio_util::sync::CancellationToken;

bitflags! {
	/// Frame-type bitmask. An empty set is a plain top-level frame.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct FrameType: u8 {
		const NESTED          = 1 << 0;
		const DEBUG           = 1 << 1;
		const REMOTE          = 1 << 2;
		const NON_INTERACTIVE = 1 << 3;
		const REPL            = 1 << 4;
	}
}

/// One entry on the runspace frame stack.
///
/// The frame owns the engine handle for its lifetime on the stack: only the
/// pipeline thread invokes it while this frame (or a descendant sharing the
/// handle) is current. Event subscriptions attached on push are dropped on
/// pop, detaching the handlers.
pub struct RunspaceFrame {
	runspace: RunspaceHandle,
	frame_type: FrameType,
	cancel: CancellationToken,
	session_exiting: AtomicBool,
	subscriptions: Mutex<Vec<Subscription>>,
}

impl RunspaceFrame {
	pub fn new(runspace: RunspaceHandle, frame_type: FrameType) -> Self {
		Self {
			runspace,
			frame_type,
			cancel: CancellationToken::new(),
			session_exiting: AtomicBool::new(false),
			subscriptions: Mutex::new(Vec::new()),
		}
	}

	pub fn runspace(&self) -> &RunspaceHandle {
		&self.runspace
	}

	pub fn frame_type(&self) -> FrameType {
		self.frame_type
	}

	/// The frame's cancellation source; parents every scope entered while
	/// this frame is current.
	pub fn cancel_token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	/// Requests that the loop running this frame exit.
	pub fn request_exit(&self) {
		self.cancel.cancel();
	}

	/// Marks the whole session as exiting, which defers the engine handle
	/// release to a detached thread on pop.
	pub fn mark_session_exiting(&self) {
		self.session_exiting.store(true, Ordering::SeqCst);
		self.cancel.cancel();
	}

	pub fn is_session_exiting(&self) -> bool {
		self.session_exiting.load(Ordering::SeqCst)
	}

	/// True when the loop consuming this frame should stop.
	pub fn is_exiting(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Attaches an owned event registration released on pop.
	pub fn attach(&self, subscription: Subscription) {
		self.subscriptions.lock().push(subscription);
	}

	/// Drops every attached registration.
	pub(crate) fn release_subscriptions(&self) {
		self.subscriptions.lock().clear();
	}
}

impl std::fmt::Debug for RunspaceFrame {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RunspaceFrame")
			.field("frame_type", &self.frame_type)
			.field("session_exiting", &self.is_session_exiting())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use posh_engine::local::LocalRunspace;

	use super::{FrameType, RunspaceFrame};

	#[test]
	fn empty_frame_type_is_plain_top_level() {
		let frame_type = FrameType::empty();
		assert!(!frame_type.contains(FrameType::DEBUG));
		assert!((frame_type | FrameType::DEBUG | FrameType::NESTED).contains(FrameType::DEBUG));
	}

	#[test]
	fn session_exit_implies_loop_exit() {
		let frame = RunspaceFrame::new(LocalRunspace::local(), FrameType::REPL);
		assert!(!frame.is_exiting());
		frame.mark_session_exiting();
		assert!(frame.is_exiting());
		assert!(frame.is_session_exiting());
	}
}
