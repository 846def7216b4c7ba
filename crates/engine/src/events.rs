//! Owned event registrations.
//!
//! Subscriptions are handed out by the event source and dispose themselves on
//! drop, so the subscriber side never leaves dangling callbacks behind. The
//! source holds no back-references into the subscriber.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// An owned registration. Dropping it detaches the handler.
pub struct Subscription {
	detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
	pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
		Self {
			detach: Some(Box::new(detach)),
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(detach) = self.detach.take() {
			detach();
		}
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription").finish_non_exhaustive()
	}
}

/// Handler registry for fan-out events.
///
/// Handlers run synchronously on the emitting thread, in registration order.
pub struct HandlerRegistry<E> {
	inner: Arc<Mutex<RegistryInner<E>>>,
}

struct RegistryInner<E> {
	next_id: u64,
	handlers: FxHashMap<u64, Arc<dyn Fn(&E) + Send + Sync>>,
	order: Vec<u64>,
}

impl<E> Default for HandlerRegistry<E> {
	fn default() -> Self {
		Self {
			inner: Arc::new(Mutex::new(RegistryInner {
				next_id: 0,
				handlers: FxHashMap::default(),
				order: Vec::new(),
			})),
		}
	}
}

impl<E: 'static> HandlerRegistry<E> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a handler and returns its owning subscription.
	pub fn subscribe(&self, handler: Arc<dyn Fn(&E) + Send + Sync>) -> Subscription {
		let mut inner = self.inner.lock();
		let id = inner.next_id;
		inner.next_id += 1;
		inner.handlers.insert(id, handler);
		inner.order.push(id);

		let weak = Arc::downgrade(&self.inner);
		Subscription::new(move || {
			if let Some(inner) = weak.upgrade() {
				let mut inner = inner.lock();
				inner.handlers.remove(&id);
				inner.order.retain(|existing| *existing != id);
			}
		})
	}

	/// Calls every live handler with the event.
	///
	/// The handler list is snapshotted first so a handler may subscribe or
	/// drop subscriptions without deadlocking the registry.
	pub fn emit(&self, event: &E) {
		let snapshot: Vec<_> = {
			let inner = self.inner.lock();
			inner.order.iter().filter_map(|id| inner.handlers.get(id).cloned()).collect()
		};
		for handler in snapshot {
			handler(event);
		}
	}

	/// Calls only the most recently registered live handler.
	///
	/// Used for events where the innermost registration wins (nested prompt
	/// frames stacked over one runspace).
	pub fn emit_innermost(&self, event: &E) -> bool {
		let handler = {
			let inner = self.inner.lock();
			inner.order.last().and_then(|id| inner.handlers.get(id).cloned())
		};
		match handler {
			Some(handler) => {
				handler(event);
				true
			}
			None => false,
		}
	}

	pub fn len(&self) -> usize {
		self.inner.lock().handlers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.lock().handlers.is_empty()
	}
}

impl<E> Clone for HandlerRegistry<E> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::HandlerRegistry;

	#[test]
	fn dropping_subscription_detaches_handler() {
		let registry: HandlerRegistry<u32> = HandlerRegistry::new();
		let hits = Arc::new(AtomicUsize::new(0));

		let hits_clone = Arc::clone(&hits);
		let sub = registry.subscribe(Arc::new(move |_| {
			hits_clone.fetch_add(1, Ordering::SeqCst);
		}));

		assert_eq!(registry.len(), 1);
		registry.emit(&1);
		drop(sub);
		registry.emit(&2);

		assert_eq!(hits.load(Ordering::SeqCst), 1);
		assert!(registry.is_empty());
	}

	#[test]
	fn emit_innermost_prefers_latest_registration() {
		let registry: HandlerRegistry<u32> = HandlerRegistry::new();
		let outer = Arc::new(AtomicUsize::new(0));
		let inner = Arc::new(AtomicUsize::new(0));

		let outer_clone = Arc::clone(&outer);
		let _outer_sub = registry.subscribe(Arc::new(move |_| {
			outer_clone.fetch_add(1, Ordering::SeqCst);
		}));
		let inner_clone = Arc::clone(&inner);
		let inner_sub = registry.subscribe(Arc::new(move |_| {
			inner_clone.fetch_add(1, Ordering::SeqCst);
		}));

		assert!(registry.emit_innermost(&1));
		assert_eq!(outer.load(Ordering::SeqCst), 0);
		assert_eq!(inner.load(Ordering::SeqCst), 1);

		// Popping the inner registration falls back to the outer one.
		drop(inner_sub);
		assert!(registry.emit_innermost(&2));
		assert_eq!(outer.load(Ordering::SeqCst), 1);
	}
}
