//! Cancellation observed across the engine seam.
//!
//! The host composes nested cancellation scopes (thread, loop, per-command,
//! caller). A binding only needs to know "has any of them fired", checked
//! synchronously from the invoking thread, so the seam carries a flat union
//! of tokens rather than a linked token tree.

use tokio_util::sync::CancellationToken;

/// A union of cancellation sources: cancelled when any source is.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
	sources: Vec<CancellationToken>,
}

impl CancelToken {
	/// A token that never fires.
	pub fn never() -> Self {
		Self::default()
	}

	pub fn single(token: CancellationToken) -> Self {
		Self { sources: vec![token] }
	}

	pub fn union(tokens: impl IntoIterator<Item = CancellationToken>) -> Self {
		Self {
			sources: tokens.into_iter().collect(),
		}
	}

	/// A new union extended with one more source.
	pub fn joined(&self, token: CancellationToken) -> Self {
		let mut sources = self.sources.clone();
		sources.push(token);
		Self { sources }
	}

	pub fn is_cancelled(&self) -> bool {
		self.sources.iter().any(CancellationToken::is_cancelled)
	}
}

impl From<CancellationToken> for CancelToken {
	fn from(token: CancellationToken) -> Self {
		Self::single(token)
	}
}
