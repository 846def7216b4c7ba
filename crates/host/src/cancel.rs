//! Nested cancellation scopes for the pipeline thread.
//!
//! Two contexts exist per pipeline thread: one for loop iterations and one
//! for per-command execution. Each entered scope composes every parent token
//! with a fresh source; cancelling the scope fires only the inner source,
//! while the composed [`CancelToken`] observes parents too.

use std::sync::Arc;

use parking_lot::Mutex;
use posh_engine::cancel::CancelToken;
use tokio_util::sync::CancellationToken;

struct ScopeEntry {
	id: u64,
	own: CancellationToken,
}

struct ContextInner {
	next_id: u64,
	scopes: Vec<ScopeEntry>,
}

/// A stack of cancellation scopes plus wake hooks for blocked consumers.
pub struct CancellationContext {
	inner: Arc<Mutex<ContextInner>>,
	wakers: Mutex<Vec<Arc<dyn Fn() + Send + Sync>>>,
}

impl Default for CancellationContext {
	fn default() -> Self {
		Self {
			inner: Arc::new(Mutex::new(ContextInner {
				next_id: 0,
				scopes: Vec::new(),
			})),
			wakers: Mutex::new(Vec::new()),
		}
	}
}

impl CancellationContext {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a hook poked on every cancel so a consumer blocked on a
	/// condvar re-checks its token promptly.
	pub fn register_waker(&self, waker: Arc<dyn Fn() + Send + Sync>) {
		self.wakers.lock().push(waker);
	}

	/// Enters a new innermost scope composed of `parents` plus a fresh
	/// source. The scope leaves the stack when the guard drops.
	pub fn enter_scope(&self, parents: &CancelToken) -> CancelScope {
		let own = CancellationToken::new();
		let token = parents.joined(own.clone());
		let id = {
			let mut inner = self.inner.lock();
			let id = inner.next_id;
			inner.next_id += 1;
			inner.scopes.push(ScopeEntry { id, own });
			id
		};
		CancelScope {
			inner: Arc::clone(&self.inner),
			id,
			token,
		}
	}

	/// Cancels the innermost live scope. No-op when the stack is empty.
	pub fn cancel_current(&self) {
		let fired = {
			let inner = self.inner.lock();
			inner.scopes.last().map(|scope| scope.own.clone())
		};
		if let Some(token) = fired {
			token.cancel();
			self.wake();
		}
	}

	/// Cancels every live scope, innermost first.
	pub fn cancel_all(&self) {
		let tokens: Vec<_> = {
			let inner = self.inner.lock();
			inner.scopes.iter().rev().map(|scope| scope.own.clone()).collect()
		};
		if tokens.is_empty() {
			return;
		}
		for token in tokens {
			token.cancel();
		}
		self.wake();
	}

	pub fn depth(&self) -> usize {
		self.inner.lock().scopes.len()
	}

	fn wake(&self) {
		let wakers: Vec<_> = self.wakers.lock().clone();
		for waker in wakers {
			waker();
		}
	}
}

/// RAII guard for an entered scope.
///
/// Cancelling a scope after its guard dropped is impossible by construction:
/// the entry leaves the stack on drop, so `cancel_current` can no longer
/// reach it.
pub struct CancelScope {
	inner: Arc<Mutex<ContextInner>>,
	id: u64,
	token: CancelToken,
}

impl CancelScope {
	/// The composed token: fired when any parent or this scope is cancelled.
	pub fn token(&self) -> &CancelToken {
		&self.token
	}
}

impl Drop for CancelScope {
	fn drop(&mut self) {
		let mut inner = self.inner.lock();
		inner.scopes.retain(|scope| scope.id != self.id);
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use posh_engine::cancel::CancelToken;
	use tokio_util::sync::CancellationToken;

	use super::CancellationContext;

	#[test]
	fn cancel_current_hits_only_the_innermost_scope() {
		let ctx = CancellationContext::new();
		let outer = ctx.enter_scope(&CancelToken::never());
		let inner = ctx.enter_scope(&CancelToken::never());
		assert_eq!(ctx.depth(), 2);

		ctx.cancel_current();

		assert!(inner.token().is_cancelled());
		assert!(!outer.token().is_cancelled());
		drop(inner);
		assert_eq!(ctx.depth(), 1);
	}

	#[test]
	fn scope_observes_parent_cancellation() {
		let ctx = CancellationContext::new();
		let parent = CancellationToken::new();
		let scope = ctx.enter_scope(&CancelToken::single(parent.clone()));

		assert!(!scope.token().is_cancelled());
		parent.cancel();
		assert!(scope.token().is_cancelled());
	}

	#[test]
	fn cancelling_a_released_scope_is_a_no_op() {
		let ctx = CancellationContext::new();
		let outer = ctx.enter_scope(&CancelToken::never());
		{
			let _inner = ctx.enter_scope(&CancelToken::never());
		}
		// The released inner scope is gone; this targets the outer one.
		ctx.cancel_current();
		assert!(outer.token().is_cancelled());
	}

	#[test]
	fn cancel_all_fires_every_scope_and_wakers() {
		let ctx = CancellationContext::new();
		let woken = Arc::new(AtomicUsize::new(0));
		let woken_clone = Arc::clone(&woken);
		ctx.register_waker(Arc::new(move || {
			woken_clone.fetch_add(1, Ordering::SeqCst);
		}));

		let a = ctx.enter_scope(&CancelToken::never());
		let b = ctx.enter_scope(&CancelToken::never());
		ctx.cancel_all();

		assert!(a.token().is_cancelled());
		assert!(b.token().is_cancelled());
		assert_eq!(woken.load(Ordering::SeqCst), 1);
	}
}
