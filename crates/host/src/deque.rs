//! Dual-priority blocking deque with a consumer gate.
//!
//! Producers `append` (Normal, FIFO) or `prepend` (Next, LIFO). The single
//! consumer blocks in [`PriorityDeque::take`], preferring prepended items.
//! While the consumer gate is held every dequeue pauses; the executor uses
//! this to fence the queue during preemption so no other task slips in
//! between "cancel current" and "prepend interrupt task".

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use posh_engine::cancel::CancelToken;

/// Cancellation is delivered to blocked consumers by wakers registered on
/// the cancellation contexts; this poll interval only covers tokens fired
/// outside those chokepoints (e.g. a caller token cancelled off-thread).
const TAKE_RECHECK_INTERVAL: Duration = Duration::from_millis(20);

/// Why a blocking take returned without an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeError {
	Cancelled,
}

struct Lanes<T> {
	high: Vec<T>,
	low: VecDeque<T>,
	gate_depth: usize,
}

pub struct PriorityDeque<T> {
	lanes: Mutex<Lanes<T>>,
	available: Condvar,
}

impl<T> Default for PriorityDeque<T> {
	fn default() -> Self {
		Self {
			lanes: Mutex::new(Lanes {
				high: Vec::new(),
				low: VecDeque::new(),
				gate_depth: 0,
			}),
			available: Condvar::new(),
		}
	}
}

impl<T> PriorityDeque<T> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends to the Normal lane (FIFO).
	pub fn append(&self, item: T) {
		self.lanes.lock().low.push_back(item);
		self.available.notify_all();
	}

	/// Prepends to the Next lane (LIFO).
	pub fn prepend(&self, item: T) {
		self.lanes.lock().high.push(item);
		self.available.notify_all();
	}

	/// Blocks until an item is available and the gate is open, preferring
	/// the Next lane. Returns `Err(Cancelled)` once `token` fires.
	pub fn take(&self, token: &CancelToken) -> Result<T, TakeError> {
		let mut lanes = self.lanes.lock();
		loop {
			if token.is_cancelled() {
				return Err(TakeError::Cancelled);
			}
			if lanes.gate_depth == 0 {
				if let Some(item) = lanes.high.pop() {
					return Ok(item);
				}
				if let Some(item) = lanes.low.pop_front() {
					return Ok(item);
				}
			}
			self.available.wait_for(&mut lanes, TAKE_RECHECK_INTERVAL);
		}
	}

	/// Non-blocking take; `None` when empty or the gate is held.
	pub fn try_take(&self) -> Option<T> {
		let mut lanes = self.lanes.lock();
		if lanes.gate_depth > 0 {
			return None;
		}
		lanes.high.pop().or_else(|| lanes.low.pop_front())
	}

	/// Holds every consumer until the returned gate drops.
	pub fn block_consumers(&self) -> ConsumerGate<'_, T> {
		self.lanes.lock().gate_depth += 1;
		ConsumerGate { deque: self }
	}

	/// Removes and returns everything queued, bypassing the gate.
	pub fn drain(&self) -> Vec<T> {
		let mut lanes = self.lanes.lock();
		let mut items: Vec<T> = lanes.high.drain(..).rev().collect();
		items.extend(lanes.low.drain(..));
		items
	}

	/// Wakes blocked consumers so they re-check their tokens.
	pub fn notify(&self) {
		self.available.notify_all();
	}

	pub fn len(&self) -> usize {
		let lanes = self.lanes.lock();
		lanes.high.len() + lanes.low.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// RAII hold on the consumer gate. Dropping reopens the deque and wakes
/// blocked consumers.
pub struct ConsumerGate<'a, T> {
	deque: &'a PriorityDeque<T>,
}

impl<T> Drop for ConsumerGate<'_, T> {
	fn drop(&mut self) {
		let mut lanes = self.deque.lanes.lock();
		lanes.gate_depth = lanes.gate_depth.saturating_sub(1);
		if lanes.gate_depth == 0 {
			drop(lanes);
			self.deque.available.notify_all();
		}
	}
}
