#![forbid(unsafe_code)]

//! Channel Dispatcher: owns the single channel and routes every inbound push
//! to exactly one handler method, after the active-stream admission filter.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, info};
use vcl_domain::StreamId;
use vcl_protocol::{
	ClientPush, ConfigUpdate, MessageKind, MonitoringStatus, NameMappingsNotice, NewEvent, PlayerInfoUpdate, ServerPush,
	SessionBoundary, SessionBoundaryAck, StatsUpdate, StreamNotice,
};

use crate::ClientCoreError;
use crate::channel::{ChannelEvent, ChannelHandle};

pub type ConnectFuture = Pin<Box<dyn Future<Output = Result<ChannelHandle, ClientCoreError>> + Send>>;

/// Opens a fresh channel each time it is called.
pub type ConnectFn = Box<dyn FnMut() -> ConnectFuture + Send>;

/// One handler per inbound kind. Handlers never re-check stream identity.
pub trait PushHandler {
	type Output;

	/// Stream pushes must carry to be admitted.
	fn active_stream(&self) -> Option<&StreamId>;

	fn on_connected(&mut self) -> Self::Output;
	fn on_disconnected(&mut self, reason: String) -> Self::Output;
	fn on_config_update(&mut self, msg: ConfigUpdate) -> Self::Output;
	fn on_stats_updated(&mut self, msg: StatsUpdate) -> Self::Output;
	fn on_new_event(&mut self, msg: NewEvent) -> Self::Output;
	fn on_player_info_updated(&mut self, msg: PlayerInfoUpdate) -> Self::Output;
	fn on_stream_swap(&mut self, msg: StreamNotice) -> Self::Output;
	fn on_monitoring_status(&mut self, msg: MonitoringStatus) -> Self::Output;
	fn on_session_boundary(&mut self, msg: SessionBoundary) -> Self::Output;
	fn on_session_boundary_ack(&mut self, msg: SessionBoundaryAck) -> Self::Output;
	fn on_name_mappings_updated(&mut self, msg: NameMappingsNotice) -> Self::Output;
	/// Kinds that carry no state, only logged.
	fn on_informational(&mut self, kind: MessageKind, stream: Option<StreamId>) -> Self::Output;
}

#[derive(Debug, PartialEq)]
pub enum RouteOutcome<O> {
	Delivered(O),
	/// Stream-scoped push for a stream other than the active one.
	Discarded { kind: MessageKind, stream: StreamId },
}

/// Admission filter plus exhaustive routing.
pub fn route<H: PushHandler>(event: ChannelEvent, handler: &mut H) -> RouteOutcome<H::Output> {
	let push = match event {
		ChannelEvent::Connected => return RouteOutcome::Delivered(handler.on_connected()),
		ChannelEvent::Disconnected { reason } => return RouteOutcome::Delivered(handler.on_disconnected(reason)),
		ChannelEvent::Frame(push) => push,
	};

	let kind = push.kind();
	if let Some(stream) = push.admission_stream()
		&& handler.active_stream() != Some(stream)
	{
		debug!(%kind, %stream, active = ?handler.active_stream().map(StreamId::as_str), "push for inactive stream dropped");
		return RouteOutcome::Discarded {
			kind,
			stream: stream.clone(),
		};
	}

	let output = match push {
		ServerPush::ConfigUpdated(m) => handler.on_config_update(m),
		ServerPush::StatsUpdated(m) => handler.on_stats_updated(m),
		ServerPush::NewEvent(m) => handler.on_new_event(m),
		ServerPush::PlayerInfoUpdated(m) => handler.on_player_info_updated(m),
		ServerPush::StreamSwapDetected(m) => handler.on_stream_swap(m),
		ServerPush::MonitoringStatusChanged(m) => handler.on_monitoring_status(m),
		ServerPush::SessionBoundaryDetected(m) => handler.on_session_boundary(m),
		ServerPush::SessionBoundaryAck(m) => handler.on_session_boundary_ack(m),
		ServerPush::NameMappingsUpdated(m) => handler.on_name_mappings_updated(m),
		ServerPush::VersionChanged(m)
		| ServerPush::InitialScanComplete(m)
		| ServerPush::MonitoringStarted(m)
		| ServerPush::MonitoringStopped(m) => handler.on_informational(kind, Some(m.version)),
		ServerPush::PlayersUpdated(m) => handler.on_informational(kind, Some(m.version)),
	};
	RouteOutcome::Delivered(output)
}

/// Owner of the channel. At most one channel exists at a time.
pub struct Dispatcher {
	connect_fn: ConnectFn,
	channel: Option<ChannelHandle>,
}

impl std::fmt::Debug for Dispatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Dispatcher")
			.field("connected", &self.channel.is_some())
			.finish()
	}
}

impl Dispatcher {
	pub fn new(connect_fn: ConnectFn) -> Self {
		Self {
			connect_fn,
			channel: None,
		}
	}

	/// Future opening a new channel, or `None` while one is open.
	///
	/// The caller awaits it wherever it likes and hands the result to [`Dispatcher::attach`].
	pub fn begin_connect(&mut self) -> Option<ConnectFuture> {
		if self.channel.is_some() {
			debug!("already connected");
			return None;
		}
		Some((self.connect_fn)())
	}

	/// Install a freshly opened channel. A second channel is dropped and `false` returned.
	pub fn attach(&mut self, handle: ChannelHandle) -> bool {
		if self.channel.is_some() {
			debug!("channel already open; dropping the new one");
			return false;
		}
		self.channel = Some(handle);
		true
	}

	/// Drop the channel. Returns `true` if one was open.
	pub fn disconnect(&mut self) -> bool {
		let was_open = self.channel.take().is_some();
		if was_open {
			info!("channel closed by client");
		}
		was_open
	}

	pub fn send(&self, push: ClientPush) -> Result<(), ClientCoreError> {
		match &self.channel {
			Some(channel) => channel.send(push),
			None => Err(ClientCoreError::Transport("not connected".to_string())),
		}
	}

	/// Next channel event. Pending forever while no channel is open.
	///
	/// A disconnect releases the channel so a later `connect` opens a new one.
	pub async fn next_event(&mut self) -> ChannelEvent {
		let Some(channel) = self.channel.as_mut() else {
			return std::future::pending().await;
		};
		let event = channel.recv().await.unwrap_or_else(|| ChannelEvent::Disconnected {
			reason: "channel task ended".to_string(),
		});
		if matches!(event, ChannelEvent::Disconnected { .. }) {
			self.channel = None;
		}
		event
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;
	use tokio::sync::mpsc;
	use vcl_domain::{PlayerInfo, SessionToken};

	use super::*;

	#[derive(Default)]
	struct Recorder {
		active: Option<StreamId>,
		seen: Vec<MessageKind>,
	}

	impl PushHandler for Recorder {
		type Output = ();

		fn active_stream(&self) -> Option<&StreamId> {
			self.active.as_ref()
		}
		fn on_connected(&mut self) {}
		fn on_disconnected(&mut self, _reason: String) {}
		fn on_config_update(&mut self, msg: ConfigUpdate) {
			self.active = Some(msg.current_version);
			self.seen.push(MessageKind::ConfigUpdated);
		}
		fn on_stats_updated(&mut self, _msg: StatsUpdate) {
			self.seen.push(MessageKind::StatsUpdated);
		}
		fn on_new_event(&mut self, _msg: NewEvent) {
			self.seen.push(MessageKind::NewEvent);
		}
		fn on_player_info_updated(&mut self, _msg: PlayerInfoUpdate) {
			self.seen.push(MessageKind::PlayerInfoUpdated);
		}
		fn on_stream_swap(&mut self, _msg: StreamNotice) {
			self.seen.push(MessageKind::StreamSwapDetected);
		}
		fn on_monitoring_status(&mut self, _msg: MonitoringStatus) {
			self.seen.push(MessageKind::MonitoringStatusChanged);
		}
		fn on_session_boundary(&mut self, _msg: SessionBoundary) {
			self.seen.push(MessageKind::SessionBoundaryDetected);
		}
		fn on_session_boundary_ack(&mut self, _msg: SessionBoundaryAck) {
			self.seen.push(MessageKind::SessionBoundaryAck);
		}
		fn on_name_mappings_updated(&mut self, _msg: NameMappingsNotice) {
			self.seen.push(MessageKind::NameMappingsUpdated);
		}
		fn on_informational(&mut self, kind: MessageKind, _stream: Option<StreamId>) {
			self.seen.push(kind);
		}
	}

	fn id(s: &str) -> StreamId {
		StreamId::new(s).unwrap()
	}

	fn frame(push: ServerPush) -> ChannelEvent {
		ChannelEvent::Frame(push)
	}

	#[test]
	fn config_update_bypasses_filter() {
		let mut h = Recorder::default();
		let out = route(
			frame(ServerPush::ConfigUpdated(ConfigUpdate {
				current_version: id("PTU"),
				player_info: PlayerInfo::default(),
				versions: vec![],
			})),
			&mut h,
		);
		assert_eq!(out, RouteOutcome::Delivered(()));
		assert_eq!(h.active, Some(id("PTU")));
	}

	#[test]
	fn nothing_stream_scoped_is_admitted_without_active_stream() {
		let mut h = Recorder::default();
		let out = route(
			frame(ServerPush::MonitoringStatusChanged(MonitoringStatus {
				version: id("LIVE"),
				running: true,
			})),
			&mut h,
		);
		assert!(matches!(out, RouteOutcome::Discarded { kind: MessageKind::MonitoringStatusChanged, .. }));
		assert!(h.seen.is_empty());
	}

	#[tokio::test]
	async fn connect_is_idempotent_and_disconnect_releases() {
		let opened = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
		let counter = opened.clone();
		let mut dispatcher = Dispatcher::new(Box::new(move || -> ConnectFuture {
			counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
			let (in_tx, in_rx) = mpsc::unbounded_channel();
			let (out_tx, _out_rx) = mpsc::unbounded_channel();
			let _ = in_tx.send(ChannelEvent::Connected);
			Box::pin(async move { Ok(ChannelHandle::from_parts(in_rx, out_tx)) })
		}));

		let opening = dispatcher.begin_connect().unwrap();
		assert!(dispatcher.attach(opening.await.unwrap()));
		assert!(dispatcher.begin_connect().is_none());
		assert_eq!(opened.load(std::sync::atomic::Ordering::SeqCst), 1);

		assert_eq!(dispatcher.next_event().await, ChannelEvent::Connected);
		let ended = dispatcher.next_event().await;
		assert!(matches!(ended, ChannelEvent::Disconnected { .. }));
		assert!(matches!(
			dispatcher.send(ClientPush::StartMonitoring { version: id("LIVE") }),
			Err(ClientCoreError::Transport(reason)) if reason == "not connected"
		));

		let opening = dispatcher.begin_connect().unwrap();
		let spare = dispatcher.begin_connect().unwrap();
		assert!(dispatcher.attach(opening.await.unwrap()));
		assert!(!dispatcher.attach(spare.await.unwrap()));
		assert_eq!(opened.load(std::sync::atomic::Ordering::SeqCst), 3);
		assert!(dispatcher.disconnect());
		assert!(dispatcher.send(ClientPush::StartMonitoring { version: id("LIVE") }).is_err());
	}

	fn arb_push() -> impl Strategy<Value = ServerPush> {
		let stream = prop_oneof![Just("LIVE"), Just("PTU"), Just("EPTU")].prop_map(id);
		(stream, 0u8..4).prop_map(|(version, which)| match which {
			0 => ServerPush::MonitoringStatusChanged(MonitoringStatus { version, running: true }),
			1 => ServerPush::StreamSwapDetected(StreamNotice {
				version,
				message: "swap".into(),
			}),
			2 => ServerPush::SessionBoundaryDetected(SessionBoundary {
				version,
				new_session_id: SessionToken::new("s"),
				old_session_id: None,
			}),
			_ => ServerPush::SessionBoundaryAck(SessionBoundaryAck {
				version,
				action: "kept".into(),
				message: None,
			}),
		})
	}

	proptest! {
		#[test]
		fn only_active_stream_pushes_reach_handlers(pushes in proptest::collection::vec(arb_push(), 0..64)) {
			let mut h = Recorder {
				active: Some(id("LIVE")),
				..Recorder::default()
			};
			let mut expected = 0;
			for push in pushes {
				let matches_active = push.admission_stream() == Some(&id("LIVE"));
				let delivered = matches!(route(frame(push), &mut h), RouteOutcome::Delivered(()));
				prop_assert_eq!(delivered, matches_active);
				if matches_active {
					expected += 1;
				}
			}
			prop_assert_eq!(h.seen.len(), expected);
		}
	}
}
