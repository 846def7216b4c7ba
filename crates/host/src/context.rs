//! Session context: the frame stack plus lifecycle event fan-out.

use std::sync::Arc;

use posh_engine::debugger::{BreakpointUpdate, DebuggerStopInfo, ResumeAction};
use posh_engine::events::{HandlerRegistry, Subscription};
use posh_engine::runspace::{Runspace as _, RunspaceHandle, RunspaceLocation};

use crate::frame::{FrameType, RunspaceFrame};
use crate::stack::FrameStack;
use crate::task::ExecutionStatusEvent;

/// Lifecycle events emitted by the session, synchronously on the pipeline
/// thread. The protocol layer bridges these onto its own transport.
#[derive(Debug, Clone)]
pub enum SessionEvent {
	/// A frame with a different engine handle became current.
	RunspaceChanged {
		location: RunspaceLocation,
		frame_type: FrameType,
	},
	FramePushed {
		frame_type: FrameType,
		depth: usize,
	},
	FramePopped {
		frame_type: FrameType,
		depth: usize,
	},
	DebuggerStopped(DebuggerStopInfo),
	DebuggerResumed(ResumeAction),
	BreakpointUpdated(BreakpointUpdate),
	ExecutionStatus(ExecutionStatusEvent),
}

/// Frame stack wrapper owning the lifecycle event registry.
#[derive(Default)]
pub struct RunspaceContext {
	stack: FrameStack,
	events: HandlerRegistry<SessionEvent>,
}

impl RunspaceContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn subscribe(&self, handler: Arc<dyn Fn(&SessionEvent) + Send + Sync>) -> Subscription {
		self.events.subscribe(handler)
	}

	pub fn emit(&self, event: SessionEvent) {
		self.events.emit(&event);
	}

	pub fn current_frame(&self) -> Option<Arc<RunspaceFrame>> {
		self.stack.peek()
	}

	pub fn current_runspace(&self) -> Option<RunspaceHandle> {
		self.stack.peek().map(|frame| Arc::clone(frame.runspace()))
	}

	pub fn depth(&self) -> usize {
		self.stack.depth()
	}

	pub(crate) fn stack(&self) -> &FrameStack {
		&self.stack
	}

	/// Pushes a frame and emits the lifecycle events. `RunspaceChanged` fires
	/// only when the engine handle actually changes; per-command isolation
	/// frames reuse the parent handle and stay silent on that channel.
	pub(crate) fn push_frame(&self, frame: Arc<RunspaceFrame>) {
		let handle_changed = match self.stack.peek() {
			Some(previous) => !Arc::ptr_eq(previous.runspace(), frame.runspace()),
			None => true,
		};
		let frame_type = frame.frame_type();
		let location = frame.runspace().info().location;
		self.stack.push(frame);
		let depth = self.stack.depth();
		self.emit(SessionEvent::FramePushed { frame_type, depth });
		if handle_changed {
			self.emit(SessionEvent::RunspaceChanged { location, frame_type });
		}
	}

	/// Pops the current frame and emits the lifecycle events.
	pub(crate) fn pop_frame(&self) -> Option<Arc<RunspaceFrame>> {
		let frame = self.stack.pop()?;
		let depth = self.stack.depth();
		self.emit(SessionEvent::FramePopped {
			frame_type: frame.frame_type(),
			depth,
		});
		if let Some(top) = self.stack.peek() {
			if !Arc::ptr_eq(top.runspace(), frame.runspace()) {
				self.emit(SessionEvent::RunspaceChanged {
					location: top.runspace().info().location,
					frame_type: top.frame_type(),
				});
			}
		}
		Some(frame)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use parking_lot::Mutex;
	use posh_engine::local::LocalRunspace;

	use super::{RunspaceContext, SessionEvent};
	use crate::frame::{FrameType, RunspaceFrame};

	#[test]
	fn runspace_changed_fires_only_on_handle_transitions() {
		let context = RunspaceContext::new();
		let seen = Arc::new(Mutex::new(Vec::new()));
		let seen_clone = Arc::clone(&seen);
		let _sub = context.subscribe(Arc::new(move |event| {
			if matches!(event, SessionEvent::RunspaceChanged { .. }) {
				seen_clone.lock().push(());
			}
		}));

		let runspace = LocalRunspace::local();
		context.push_frame(Arc::new(RunspaceFrame::new(runspace.clone(), FrameType::empty())));
		// Per-command isolation frame: same handle, no RunspaceChanged.
		context.push_frame(Arc::new(RunspaceFrame::new(runspace.clone(), FrameType::empty())));
		assert_eq!(seen.lock().len(), 1);

		// A different handle becomes current.
		context.push_frame(Arc::new(RunspaceFrame::new(LocalRunspace::local(), FrameType::REMOTE)));
		assert_eq!(seen.lock().len(), 2);

		// Popping back to the shared handle fires again.
		context.pop_frame();
		assert_eq!(seen.lock().len(), 3);
		context.pop_frame();
		assert_eq!(seen.lock().len(), 3);
	}
}
