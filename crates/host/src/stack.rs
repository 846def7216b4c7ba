//! The runspace frame stack.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::frame::RunspaceFrame;

/// LIFO stack of runspace frames. The top frame is "current": its engine
/// handle is the one every invocation targets.
///
/// Mutation happens only on the pipeline thread, except
/// [`FrameStack::try_pop_to_depth`], which runs under the executor's
/// task-processing writer lock during runspace failure recovery.
#[derive(Default)]
pub struct FrameStack {
	frames: Mutex<Vec<Arc<RunspaceFrame>>>,
}

impl FrameStack {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&self, frame: Arc<RunspaceFrame>) {
		self.frames.lock().push(frame);
	}

	pub fn pop(&self) -> Option<Arc<RunspaceFrame>> {
		let frame = self.frames.lock().pop();
		if let Some(frame) = &frame {
			frame.release_subscriptions();
		}
		frame
	}

	pub fn peek(&self) -> Option<Arc<RunspaceFrame>> {
		self.frames.lock().last().cloned()
	}

	pub fn depth(&self) -> usize {
		self.frames.lock().len()
	}

	/// Pops frames until the stack is `depth` deep, returning the popped
	/// frames top-first. Subscriptions of popped frames are released.
	pub fn try_pop_to_depth(&self, depth: usize) -> Vec<Arc<RunspaceFrame>> {
		let mut frames = self.frames.lock();
		let mut popped = Vec::new();
		while frames.len() > depth {
			if let Some(frame) = frames.pop() {
				frame.release_subscriptions();
				popped.push(frame);
			}
		}
		popped
	}

	/// True when any remaining frame shares `runspace`'s engine handle.
	pub fn shares_runspace(&self, runspace: &posh_engine::runspace::RunspaceHandle) -> bool {
		self.frames.lock().iter().any(|frame| Arc::ptr_eq(frame.runspace(), runspace))
	}
}
