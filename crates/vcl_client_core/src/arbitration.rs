#![forbid(unsafe_code)]

//! Session Arbitration Coordinator.
//!
//! IDLE -> PENDING on a session boundary, back to IDLE once exactly one
//! resolution has been sent. A boundary arriving while another is pending is
//! queued and gets its own full countdown later.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use vcl_domain::{SessionToken, StreamId};
use vcl_protocol::{ClientPush, SessionBoundary};

use crate::once::{ResolveOnce, resolve_once};

/// Ticks shown before the prompt settles on its own.
pub const COUNTDOWN_TICKS: u32 = 5;

/// Length of one countdown tick.
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbitrationRequest {
	pub stream: StreamId,
	pub token: SessionToken,
	pub old_token: Option<SessionToken>,
	pub deadline: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
	/// Carry prior session stats forward.
	Keep,
	/// Start the new session from zero.
	Discard,
}

impl Decision {
	pub fn keep_stats(self) -> bool {
		matches!(self, Decision::Keep)
	}
}

/// Which of the racing triggers settled a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
	User,
	Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
	pub token: SessionToken,
	pub decision: Decision,
	pub trigger: Trigger,
}

/// Countdown progress of the pending request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownTick {
	pub token: SessionToken,
	pub remaining: u32,
}

/// Everything needed to run the countdown of a newly pending request.
#[derive(Debug)]
pub struct CountdownStart {
	pub request: ArbitrationRequest,
	pub resolver: ResolveOnce<Resolution>,
	pub receiver: oneshot::Receiver<Resolution>,
}

#[derive(Debug)]
pub enum RequestOutcome {
	Started(CountdownStart),
	Queued { position: usize },
	Duplicate,
}

/// What to do after a request settled.
#[derive(Debug)]
pub struct Finished {
	pub request: ArbitrationRequest,
	pub resolution: Resolution,
	/// The single resolution frame for this request.
	pub response: ClientPush,
	/// Active stream, whose stats must be fetched again after a discard.
	pub refetch: Option<StreamId>,
	/// Next queued request, now pending.
	pub next: Option<CountdownStart>,
}

#[derive(Debug)]
struct Pending {
	request: ArbitrationRequest,
	resolver: ResolveOnce<Resolution>,
	remaining: u32,
}

#[derive(Debug, Clone)]
struct Queued {
	stream: StreamId,
	token: SessionToken,
	old_token: Option<SessionToken>,
}

#[derive(Debug, Default)]
pub struct ArbitrationCoordinator {
	pending: Option<Pending>,
	queue: VecDeque<Queued>,
}

impl ArbitrationCoordinator {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_pending(&self) -> bool {
		self.pending.is_some()
	}

	pub fn pending(&self) -> Option<&ArbitrationRequest> {
		self.pending.as_ref().map(|p| &p.request)
	}

	/// Countdown ticks left on the pending request.
	pub fn remaining(&self) -> Option<u32> {
		self.pending.as_ref().map(|p| p.remaining)
	}

	/// Register a session boundary for an admitted stream.
	pub fn request(&mut self, boundary: SessionBoundary) -> RequestOutcome {
		let SessionBoundary {
			version,
			new_session_id,
			old_session_id,
		} = boundary;

		let same = |stream: &StreamId, token: &SessionToken| *stream == version && *token == new_session_id;
		let duplicate = self.pending.as_ref().is_some_and(|p| same(&p.request.stream, &p.request.token))
			|| self.queue.iter().any(|q| same(&q.stream, &q.token));
		if duplicate {
			debug!(stream = %version, token = %new_session_id, "session boundary resent; ignoring");
			return RequestOutcome::Duplicate;
		}

		let queued = Queued {
			stream: version,
			token: new_session_id,
			old_token: old_session_id,
		};
		if self.pending.is_some() {
			info!(stream = %queued.stream, token = %queued.token, "session boundary queued behind pending prompt");
			self.queue.push_back(queued);
			return RequestOutcome::Queued {
				position: self.queue.len(),
			};
		}
		RequestOutcome::Started(self.start(queued))
	}

	/// User answer for the pending request. `false` if nothing was settled.
	pub fn respond(&self, decision: Decision) -> bool {
		let Some(pending) = &self.pending else {
			return false;
		};
		pending.resolver.resolve(Resolution {
			token: pending.request.token.clone(),
			decision,
			trigger: Trigger::User,
		})
	}

	/// Record countdown progress. Ignored for anything but the pending token.
	pub fn tick(&mut self, tick: &CountdownTick) -> bool {
		match &mut self.pending {
			Some(p) if p.request.token == tick.token && !p.resolver.is_resolved() => {
				p.remaining = tick.remaining;
				true
			}
			_ => false,
		}
	}

	/// Complete the pending request once its resolution arrived.
	///
	/// Returns `None` for a resolution that does not belong to the pending request.
	pub fn finish(&mut self, resolution: Resolution, active: Option<&StreamId>) -> Option<Finished> {
		if self.pending.as_ref().is_none_or(|p| p.request.token != resolution.token) {
			debug!(token = %resolution.token, "stale arbitration resolution dropped");
			return None;
		}
		let pending = self.pending.take()?;
		let request = pending.request;

		info!(
			stream = %request.stream,
			token = %request.token,
			keep_stats = resolution.decision.keep_stats(),
			trigger = ?resolution.trigger,
			"session boundary resolved"
		);

		let response = ClientPush::SessionBoundaryResponse {
			version: request.stream.clone(),
			keep_stats: resolution.decision.keep_stats(),
			new_session_id: request.token.clone(),
		};
		let refetch = match resolution.decision {
			Decision::Discard => active.cloned(),
			Decision::Keep => None,
		};
		let next = self.queue.pop_front().map(|q| self.start(q));

		Some(Finished {
			request,
			resolution,
			response,
			refetch,
			next,
		})
	}

	fn start(&mut self, q: Queued) -> CountdownStart {
		let (resolver, receiver) = resolve_once();
		let request = ArbitrationRequest {
			stream: q.stream,
			token: q.token,
			old_token: q.old_token,
			deadline: Instant::now() + COUNTDOWN_TICK * COUNTDOWN_TICKS,
		};
		debug!(stream = %request.stream, token = %request.token, "arbitration pending");
		self.pending = Some(Pending {
			request: request.clone(),
			resolver: resolver.clone(),
			remaining: COUNTDOWN_TICKS,
		});
		CountdownStart {
			request,
			resolver,
			receiver,
		}
	}
}

/// Run the countdown of one request: a tick per second, then settle on discard.
///
/// Stops early once the request is settled by anyone else.
pub fn spawn_countdown(
	token: SessionToken,
	resolver: ResolveOnce<Resolution>,
	ticks_tx: mpsc::UnboundedSender<CountdownTick>,
) -> JoinHandle<()> {
	tokio::spawn(async move {
		for remaining in (0..COUNTDOWN_TICKS).rev() {
			tokio::time::sleep(COUNTDOWN_TICK).await;
			if resolver.is_resolved() {
				return;
			}
			if remaining == 0 {
				resolver.resolve(Resolution {
					token,
					decision: Decision::Discard,
					trigger: Trigger::Timeout,
				});
				return;
			}
			let _ = ticks_tx.send(CountdownTick {
				token: token.clone(),
				remaining,
			});
		}
	})
}
