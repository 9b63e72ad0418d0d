#![forbid(unsafe_code)]

//! First-writer-wins settlement shared by racing triggers.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Cloneable handle that settles a single value exactly once.
///
/// Every trigger racing to settle the same outcome (a user click and a
/// countdown, a completion signal and a guard timer) holds a clone. Only the
/// first `resolve` delivers its value; the rest are no-ops.
pub struct ResolveOnce<T> {
	slot: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for ResolveOnce<T> {
	fn clone(&self) -> Self {
		Self {
			slot: Arc::clone(&self.slot),
		}
	}
}

impl<T> std::fmt::Debug for ResolveOnce<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ResolveOnce")
			.field("resolved", &self.is_resolved())
			.finish()
	}
}

/// Create a settle-once handle and the receiver observing its outcome.
pub fn resolve_once<T>() -> (ResolveOnce<T>, oneshot::Receiver<T>) {
	let (tx, rx) = oneshot::channel();
	(
		ResolveOnce {
			slot: Arc::new(Mutex::new(Some(tx))),
		},
		rx,
	)
}

impl<T> ResolveOnce<T> {
	/// Settle with `value`. Returns `true` only for the first caller.
	///
	/// A dropped receiver still counts as settled.
	pub fn resolve(&self, value: T) -> bool {
		let Some(tx) = self.slot.lock().take() else {
			return false;
		};
		let _ = tx.send(value);
		true
	}

	pub fn is_resolved(&self) -> bool {
		self.slot.lock().is_none()
	}
}
