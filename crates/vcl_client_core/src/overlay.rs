#![forbid(unsafe_code)]

//! Blocking "in progress" indicator with a guard timer that hides it when the
//! expected completion signal never arrives.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::once::{ResolveOnce, resolve_once};

/// Longest time a guarded overlay stays up without a completion signal.
pub const OVERLAY_GUARD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayOutcome {
	Completed,
	TimedOut,
}

#[derive(Debug)]
pub struct GuardStart {
	pub generation: u64,
	pub resolver: ResolveOnce<OverlayOutcome>,
	pub receiver: oneshot::Receiver<OverlayOutcome>,
}

#[derive(Debug, Default)]
pub struct Overlay {
	message: Option<String>,
	guard: Option<(u64, ResolveOnce<OverlayOutcome>)>,
	generation: u64,
}

impl Overlay {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_visible(&self) -> bool {
		self.message.is_some()
	}

	pub fn message(&self) -> Option<&str> {
		self.message.as_deref()
	}

	pub fn show(&mut self, message: impl Into<String>) {
		self.message = Some(message.into());
	}

	/// Returns `true` if the overlay was visible.
	pub fn hide(&mut self) -> bool {
		self.message.take().is_some()
	}

	/// Show the overlay and arm a fresh guard. An older guard is superseded.
	pub fn show_guarded(&mut self, message: impl Into<String>) -> GuardStart {
		self.show(message);
		self.generation += 1;
		let (resolver, receiver) = resolve_once();
		self.guard = Some((self.generation, resolver.clone()));
		GuardStart {
			generation: self.generation,
			resolver,
			receiver,
		}
	}

	/// Completion signal. Settles the armed guard, if any, and hides the overlay.
	pub fn complete(&mut self) -> bool {
		if let Some((_, resolver)) = &self.guard {
			resolver.resolve(OverlayOutcome::Completed);
		}
		self.hide()
	}

	/// Apply the settled outcome of guard `generation`.
	///
	/// Returns `true` if this hid the overlay.
	pub fn on_guard_settled(&mut self, generation: u64, outcome: OverlayOutcome) -> bool {
		if self.guard.as_ref().is_none_or(|(g, _)| *g != generation) {
			return false;
		}
		self.guard = None;
		match outcome {
			OverlayOutcome::Completed => false,
			OverlayOutcome::TimedOut => {
				debug!("no completion signal; overlay hidden by guard");
				self.hide()
			}
		}
	}
}

/// Settle `resolver` as timed out after [`OVERLAY_GUARD`].
pub fn spawn_guard(resolver: ResolveOnce<OverlayOutcome>) -> JoinHandle<()> {
	tokio::spawn(async move {
		tokio::time::sleep(OVERLAY_GUARD).await;
		resolver.resolve(OverlayOutcome::TimedOut);
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn guard_hides_stuck_overlay() {
		let mut overlay = Overlay::new();
		let guard = overlay.show_guarded("Checking for updates...");
		let _task = spawn_guard(guard.resolver.clone());
		assert!(overlay.is_visible());

		let outcome = guard.receiver.await.unwrap();
		assert_eq!(outcome, OverlayOutcome::TimedOut);
		assert!(overlay.on_guard_settled(guard.generation, outcome));
		assert!(!overlay.is_visible());
	}

	#[tokio::test(start_paused = true)]
	async fn completion_beats_guard() {
		let mut overlay = Overlay::new();
		let guard = overlay.show_guarded("Checking for updates...");
		let _task = spawn_guard(guard.resolver.clone());

		assert!(overlay.complete());
		let outcome = guard.receiver.await.unwrap();
		assert_eq!(outcome, OverlayOutcome::Completed);
		assert!(!overlay.on_guard_settled(guard.generation, outcome));

		tokio::time::sleep(OVERLAY_GUARD * 2).await;
		assert!(!guard.resolver.resolve(OverlayOutcome::TimedOut));
	}

	#[test]
	fn superseded_guard_is_ignored() {
		let mut overlay = Overlay::new();
		let old = overlay.show_guarded("first");
		let new = overlay.show_guarded("second");
		assert!(!overlay.on_guard_settled(old.generation, OverlayOutcome::TimedOut));
		assert_eq!(overlay.message(), Some("second"));
		assert!(overlay.on_guard_settled(new.generation, OverlayOutcome::TimedOut));
	}
}
