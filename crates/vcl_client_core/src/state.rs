#![forbid(unsafe_code)]

//! The single context object holding all reconciled client state.
//!
//! Every reaction mutates [`ClientState`] synchronously and returns the
//! [`Effect`]s the runtime has to carry out. Nothing here awaits.

use core::fmt;
use std::collections::VecDeque;

use chrono::NaiveDateTime;
use serde_json::json;
use tracing::{debug, info, warn};
use vcl_domain::{CombatEvent, EventParams, PlayerInfo, StatScope, StatsBundle, StreamId};
use vcl_protocol::{
	ClientPush, ConfigUpdate, MessageKind, MonitoringStatus, NameMappingsNotice, NewEvent, PlayerInfoUpdate,
	SessionBoundary, SessionBoundaryAck, StatsUpdate, StreamNotice,
};

use crate::api::{DashboardConfig, PlayerProfile, citizen_profile_url};
use crate::arbitration::{
	ArbitrationCoordinator, ArbitrationRequest, COUNTDOWN_TICKS, CountdownStart, CountdownTick, Decision, RequestOutcome,
	Resolution, Trigger,
};
use crate::dispatcher::PushHandler;
use crate::i18n::{FALLBACK_LANGUAGE, Translations};
use crate::overlay::{GuardStart, Overlay, OverlayOutcome};
use crate::stats_view::StatsView;
use crate::store::{NameMappings, StreamStore};
use crate::timeline::{PushOutcome, SlotId, Timeline, TimelineEntry, TimerLabel};
use crate::{ClientCoreError, DEFAULT_AVATAR, map_core_err};

/// Connection / monitoring indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIndicator {
	Disconnected,
	Monitoring,
	Waiting,
}

impl StatusIndicator {
	pub const fn icon(self) -> &'static str {
		match self {
			StatusIndicator::Disconnected => "🔴",
			StatusIndicator::Monitoring => "🟢",
			StatusIndicator::Waiting => "🟠",
		}
	}

	pub const fn label_key(self) -> &'static str {
		match self {
			StatusIndicator::Disconnected => "status.disconnected",
			StatusIndicator::Monitoring => "status.monitoring",
			StatusIndicator::Waiting => "status.waiting",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
	Info,
	Success,
	Error,
}

/// UI-level events emitted by the runtime.
#[derive(Clone)]
pub enum UiEvent {
	Connecting,
	Reconnecting {
		attempt: u32,
		next_retry_in_ms: u64,
	},
	Connected,
	Disconnected {
		reason: String,
	},
	Status {
		indicator: StatusIndicator,
		label: String,
	},
	ActiveStreamChanged(StreamId),
	PlayerInfo(PlayerInfo),
	Avatar {
		url: String,
	},
	Stats {
		stream: StreamId,
		session: StatsView,
		total: StatsView,
	},
	TimelineEntryAdded {
		entry: TimelineEntry,
		evicted: Option<SlotId>,
	},
	TimelineTimersUpdated(Vec<TimerLabel>),
	TimelineCleared,
	ArbitrationPrompt {
		request: ArbitrationRequest,
		title: String,
		question: String,
		countdown: String,
	},
	ArbitrationCountdown {
		remaining: u32,
		countdown: String,
	},
	ArbitrationClosed {
		decision: Decision,
		trigger: Trigger,
		message: String,
	},
	OverlayShown {
		message: String,
	},
	OverlayHidden,
	Notification {
		kind: NotificationKind,
		message: String,
	},
	PlayerProfile(PlayerProfile),
	LanguageChanged(String),
	Error(String),
}

impl fmt::Debug for UiEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			UiEvent::Connecting => write!(f, "UiEvent::Connecting"),
			UiEvent::Reconnecting {
				attempt,
				next_retry_in_ms,
			} => write!(
				f,
				"UiEvent::Reconnecting {{ attempt: {attempt}, next_retry_in_ms: {next_retry_in_ms} }}"
			),
			UiEvent::Connected => write!(f, "UiEvent::Connected"),
			UiEvent::Disconnected { reason } => write!(f, "UiEvent::Disconnected {{ reason: {reason} }}"),
			UiEvent::Status { indicator, label } => {
				write!(f, "UiEvent::Status {{ indicator: {indicator:?}, label: {label} }}")
			}
			UiEvent::ActiveStreamChanged(stream) => write!(f, "UiEvent::ActiveStreamChanged({stream})"),
			UiEvent::PlayerInfo(info) => write!(f, "UiEvent::PlayerInfo({:?})", info.name),
			UiEvent::Avatar { url } => write!(f, "UiEvent::Avatar {{ url: {url} }}"),
			UiEvent::Stats { stream, session, total } => write!(
				f,
				"UiEvent::Stats {{ stream: {stream}, session: {}, total: {}, ... }}",
				session.kills, total.kills
			),
			UiEvent::TimelineEntryAdded { entry, evicted } => write!(
				f,
				"UiEvent::TimelineEntryAdded {{ slot: {}, kind: {}, evicted: {:?}, ... }}",
				entry.slot.get(),
				entry.kind,
				evicted.map(SlotId::get)
			),
			UiEvent::TimelineTimersUpdated(labels) => {
				write!(f, "UiEvent::TimelineTimersUpdated({} timers)", labels.len())
			}
			UiEvent::TimelineCleared => write!(f, "UiEvent::TimelineCleared"),
			UiEvent::ArbitrationPrompt { request, .. } => write!(
				f,
				"UiEvent::ArbitrationPrompt {{ stream: {}, token: {}, ... }}",
				request.stream, request.token
			),
			UiEvent::ArbitrationCountdown { remaining, .. } => {
				write!(f, "UiEvent::ArbitrationCountdown {{ remaining: {remaining} }}")
			}
			UiEvent::ArbitrationClosed { decision, trigger, .. } => write!(
				f,
				"UiEvent::ArbitrationClosed {{ decision: {decision:?}, trigger: {trigger:?} }}"
			),
			UiEvent::OverlayShown { message } => write!(f, "UiEvent::OverlayShown {{ message: {message} }}"),
			UiEvent::OverlayHidden => write!(f, "UiEvent::OverlayHidden"),
			UiEvent::Notification { kind, message } => {
				write!(f, "UiEvent::Notification {{ kind: {kind:?}, message: {message} }}")
			}
			UiEvent::PlayerProfile(profile) => write!(f, "UiEvent::PlayerProfile({})", profile.name()),
			UiEvent::LanguageChanged(lang) => write!(f, "UiEvent::LanguageChanged({lang})"),
			UiEvent::Error(message) => write!(f, "UiEvent::Error({message})"),
		}
	}
}

/// Work the runtime carries out on behalf of [`ClientState`].
#[derive(Debug)]
pub enum Effect {
	Send(ClientPush),
	FetchConfig,
	PersistActiveStream(StreamId),
	FetchStats(StreamId),
	FetchNameMappings,
	FetchAvatar { stream: StreamId, name: String },
	LookupPlayer { stream: StreamId, name: String },
	ResetSession { stream: StreamId, remove_from_total: bool },
	/// Persist the language, then load its table.
	ChangeLanguage(String),
	LoadLanguage(String),
	StartCountdown(CountdownStart),
	/// Stop the countdown of a settled request.
	CancelCountdown,
	StartOverlayGuard(GuardStart),
	Ui(UiEvent),
}

/// Completion of a request started by an [`Effect`].
#[derive(Debug)]
pub enum FetchResult {
	Config(Result<DashboardConfig, ClientCoreError>),
	StreamPersisted {
		stream: StreamId,
		result: Result<(), ClientCoreError>,
	},
	Stats {
		stream: StreamId,
		result: Result<StatsBundle, ClientCoreError>,
	},
	NameMappings(Result<NameMappings, ClientCoreError>),
	/// `None` when the player has no avatar or the fetch failed.
	Avatar {
		stream: StreamId,
		name: String,
		url: Option<String>,
	},
	PlayerProfile(PlayerProfile),
	SessionReset {
		stream: StreamId,
		result: Result<(), ClientCoreError>,
	},
	Language {
		translations: Translations,
		/// Outcome of persisting the choice; `None` for a plain load.
		persisted: Option<Result<(), ClientCoreError>>,
	},
}

fn local_now() -> NaiveDateTime {
	chrono::Local::now().naive_local()
}

#[derive(Debug)]
pub struct ClientState {
	store: StreamStore,
	timeline: Timeline,
	translations: Translations,
	arbitration: ArbitrationCoordinator,
	overlay: Overlay,
	status: StatusIndicator,
	connected: bool,
	/// Session resolutions waiting for the channel to come back.
	outbox: VecDeque<ClientPush>,
	stats: Option<StatsBundle>,
	language: String,
	language_pinned: bool,
	clock: fn() -> NaiveDateTime,
}

impl ClientState {
	/// `language` pins the UI language; `None` follows the server's setting.
	pub fn new(initial_stream: Option<StreamId>, language: Option<String>) -> Self {
		let language_pinned = language.is_some();
		let language = language.unwrap_or_else(|| FALLBACK_LANGUAGE.to_string());
		Self {
			store: StreamStore::new(initial_stream),
			timeline: Timeline::new(),
			translations: Translations::bundled_or_fallback(&language),
			arbitration: ArbitrationCoordinator::new(),
			overlay: Overlay::new(),
			status: StatusIndicator::Disconnected,
			connected: false,
			outbox: VecDeque::new(),
			stats: None,
			language,
			language_pinned,
			clock: local_now,
		}
	}

	/// Replace the wall clock used for timestamps and timer labels.
	pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
		self.clock = clock;
		self
	}

	pub fn store(&self) -> &StreamStore {
		&self.store
	}

	pub fn timeline(&self) -> &Timeline {
		&self.timeline
	}

	pub fn translations(&self) -> &Translations {
		&self.translations
	}

	pub fn arbitration(&self) -> &ArbitrationCoordinator {
		&self.arbitration
	}

	pub fn overlay(&self) -> &Overlay {
		&self.overlay
	}

	pub fn status(&self) -> StatusIndicator {
		self.status
	}

	pub fn is_connected(&self) -> bool {
		self.connected
	}

	pub fn stats(&self) -> Option<&StatsBundle> {
		self.stats.as_ref()
	}

	pub fn language(&self) -> &str {
		&self.language
	}

	fn now(&self) -> NaiveDateTime {
		(self.clock)()
	}

	fn notify(&self, kind: NotificationKind, key: &str) -> Effect {
		Effect::Ui(UiEvent::Notification {
			kind,
			message: self.translations.text(key),
		})
	}

	fn status_event(&self) -> Effect {
		Effect::Ui(UiEvent::Status {
			indicator: self.status,
			label: self.translations.text(self.status.label_key()),
		})
	}

	/// Initial work: update-check overlay, language, configuration and display names.
	pub fn startup(&mut self) -> Vec<Effect> {
		let message = self.translations.text("loading.checking_updates");
		let guard = self.overlay.show_guarded(message.clone());
		let mut effects = vec![
			Effect::Ui(UiEvent::OverlayShown { message }),
			Effect::StartOverlayGuard(guard),
			self.status_event(),
		];
		if self.language_pinned {
			effects.push(Effect::LoadLanguage(self.language.clone()));
		}
		effects.push(Effect::FetchConfig);
		effects.push(Effect::FetchNameMappings);
		effects
	}

	/// Make `stream` active: clear the timeline, then request its snapshot.
	pub fn set_active(&mut self, stream: StreamId) -> Vec<Effect> {
		if !self.store.set_active(stream.clone()) {
			return Vec::new();
		}
		self.activated(stream)
	}

	fn activated(&mut self, stream: StreamId) -> Vec<Effect> {
		self.timeline.clear();
		self.stats = None;
		vec![
			Effect::Ui(UiEvent::TimelineCleared),
			Effect::Ui(UiEvent::ActiveStreamChanged(stream.clone())),
			Effect::FetchStats(stream),
		]
	}

	/// User-initiated switch: persist first, activate once the server accepted it.
	/// Persist a user stream choice. Streams the server does not offer are refused.
	pub fn switch_stream(&mut self, stream: StreamId) -> Vec<Effect> {
		let offered = self.store.streams();
		if !offered.is_empty() && !offered.contains(&stream) {
			warn!(%stream, "stream not offered by the server");
			return vec![self.notify(NotificationKind::Error, "notifications.stream_switch_failed")];
		}
		vec![Effect::PersistActiveStream(stream)]
	}

	pub fn clear_timeline(&mut self) -> Vec<Effect> {
		self.timeline.clear();
		vec![Effect::Ui(UiEvent::TimelineCleared)]
	}

	/// Recompute live timer labels.
	pub fn tick(&mut self) -> Vec<Effect> {
		let labels = self.timeline.tick(self.now());
		if labels.is_empty() {
			return Vec::new();
		}
		vec![Effect::Ui(UiEvent::TimelineTimersUpdated(labels))]
	}

	pub fn respond_arbitration(&mut self, keep: bool) -> bool {
		let decision = if keep { Decision::Keep } else { Decision::Discard };
		self.arbitration.respond(decision)
	}

	pub fn on_countdown_tick(&mut self, tick: CountdownTick) -> Vec<Effect> {
		if !self.arbitration.tick(&tick) {
			return Vec::new();
		}
		vec![Effect::Ui(UiEvent::ArbitrationCountdown {
			remaining: tick.remaining,
			countdown: self.countdown_label(tick.remaining),
		})]
	}

	fn countdown_label(&self, remaining: u32) -> String {
		let mut params = EventParams::new();
		params.insert("seconds".to_string(), json!(remaining));
		self.translations.resolve("session.countdown", &params)
	}

	fn prompt(&self, start: CountdownStart) -> Vec<Effect> {
		vec![
			Effect::Ui(UiEvent::ArbitrationPrompt {
				request: start.request.clone(),
				title: self.translations.text("session.title"),
				question: self.translations.text("session.question"),
				countdown: self.countdown_label(COUNTDOWN_TICKS),
			}),
			Effect::StartCountdown(start),
		]
	}

	/// The single settled outcome of the pending request.
	pub fn on_arbitration_resolved(&mut self, resolution: Resolution) -> Vec<Effect> {
		let Some(done) = self.arbitration.finish(resolution, self.store.active()) else {
			return Vec::new();
		};

		let message_key = if done.resolution.decision.keep_stats() {
			"session.kept"
		} else {
			"session.discarded"
		};
		let mut effects = vec![Effect::CancelCountdown];
		if self.connected {
			effects.push(Effect::Send(done.response));
		} else {
			info!(token = %done.request.token, "channel down; resolution held until reconnect");
			self.outbox.push_back(done.response);
		}
		effects.push(Effect::Ui(UiEvent::ArbitrationClosed {
			decision: done.resolution.decision,
			trigger: done.resolution.trigger,
			message: self.translations.text(message_key),
		}));
		if let Some(stream) = done.refetch {
			effects.push(Effect::FetchStats(stream));
		}
		if let Some(next) = done.next {
			effects.extend(self.prompt(next));
		}
		effects
	}

	/// Take back a frame the channel refused. Only session resolutions are kept.
	pub fn hold_unsent(&mut self, push: ClientPush) -> bool {
		if !matches!(push, ClientPush::SessionBoundaryResponse { .. }) {
			return false;
		}
		self.outbox.push_back(push);
		true
	}

	pub fn on_overlay_guard(&mut self, generation: u64, outcome: OverlayOutcome) -> Vec<Effect> {
		if self.overlay.on_guard_settled(generation, outcome) {
			return vec![Effect::Ui(UiEvent::OverlayHidden)];
		}
		Vec::new()
	}

	pub fn reset_session(&mut self, remove_from_total: bool) -> Vec<Effect> {
		let Some(stream) = self.store.active().cloned() else {
			return vec![self.notify(NotificationKind::Error, "notifications.reset_error")];
		};
		vec![Effect::ResetSession {
			stream,
			remove_from_total,
		}]
	}

	pub fn refresh_name_mappings(&mut self) -> Vec<Effect> {
		vec![Effect::FetchNameMappings]
	}

	/// Activate a player reference.
	pub fn open_player(&mut self, name: String) -> Vec<Effect> {
		match self.store.active().cloned() {
			Some(stream) => vec![Effect::LookupPlayer { stream, name }],
			None => {
				let profile_url = citizen_profile_url(&name);
				vec![Effect::Ui(UiEvent::PlayerProfile(PlayerProfile::Light {
					name,
					citizen: None,
					profile_url,
				}))]
			}
		}
	}

	pub fn change_language(&mut self, language: String) -> Vec<Effect> {
		self.language_pinned = true;
		vec![Effect::ChangeLanguage(language)]
	}

	pub fn start_monitoring(&mut self) -> Vec<Effect> {
		self.monitoring_command(|version| ClientPush::StartMonitoring { version })
	}

	pub fn stop_monitoring(&mut self) -> Vec<Effect> {
		self.monitoring_command(|version| ClientPush::StopMonitoring { version })
	}

	fn monitoring_command(&self, make: impl FnOnce(StreamId) -> ClientPush) -> Vec<Effect> {
		match self.store.active() {
			Some(stream) => vec![Effect::Send(make(stream.clone()))],
			None => Vec::new(),
		}
	}

	fn player_effects(&self) -> Vec<Effect> {
		let player = self.store.player();
		let mut effects = vec![Effect::Ui(UiEvent::PlayerInfo(player.clone()))];
		match (player.known_name(), player.avatar_url.as_deref()) {
			(Some(_), Some(url)) if !url.is_empty() => effects.push(Effect::Ui(UiEvent::Avatar { url: url.to_string() })),
			(Some(name), _) => {
				if let Some(stream) = self.store.active() {
					effects.push(Effect::FetchAvatar {
						stream: stream.clone(),
						name: name.to_string(),
					});
				}
			}
			(None, _) => effects.push(Effect::Ui(UiEvent::Avatar {
				url: DEFAULT_AVATAR.to_string(),
			})),
		}
		effects
	}

	fn stats_event(&self, stream: &StreamId) -> Option<Effect> {
		let stats = self.stats.as_ref()?;
		Some(Effect::Ui(UiEvent::Stats {
			stream: stream.clone(),
			session: StatsView::render(&stats.session, StatScope::Session, &self.store),
			total: StatsView::render(&stats.total, StatScope::Total, &self.store),
		}))
	}

	fn push_event(&mut self, event: &CombatEvent) -> Vec<Effect> {
		let PushOutcome { slot, evicted } = self.timeline.push(event, &self.translations, self.now());
		let Some(entry) = self.timeline.get(slot).cloned() else {
			return Vec::new();
		};
		vec![Effect::Ui(UiEvent::TimelineEntryAdded { entry, evicted })]
	}

	/// Apply the completion of a request. Stream-scoped results for a stream
	/// that is no longer active are dropped.
	pub fn apply_fetch(&mut self, result: FetchResult) -> Vec<Effect> {
		match result {
			FetchResult::Config(Ok(cfg)) => self.apply_fetched_config(cfg),
			FetchResult::Config(Err(e)) => {
				warn!(error = %e, "loading configuration failed");
				vec![Effect::Ui(UiEvent::Error(map_core_err(e)))]
			}
			FetchResult::StreamPersisted { stream, result } => match result {
				Ok(()) => {
					let mut effects = self.set_active(stream);
					effects.push(Effect::FetchConfig);
					effects
				}
				Err(e) => {
					warn!(%stream, error = %e, "switching stream failed");
					vec![self.notify(NotificationKind::Error, "notifications.stream_switch_failed")]
				}
			},
			FetchResult::Stats { stream, result } => {
				if !self.store.is_active(&stream) {
					debug!(%stream, "stats for inactive stream dropped");
					return Vec::new();
				}
				match result {
					Ok(bundle) => {
						self.stats = Some(bundle);
						self.stats_event(&stream).into_iter().collect()
					}
					Err(e) => {
						warn!(%stream, error = %e, "loading stats failed");
						Vec::new()
					}
				}
			}
			FetchResult::NameMappings(Ok(names)) => {
				self.store.set_names(names);
				match self.store.active().cloned() {
					Some(stream) => self.stats_event(&stream).into_iter().collect(),
					None => Vec::new(),
				}
			}
			FetchResult::NameMappings(Err(e)) => {
				warn!(error = %e, "loading display names failed");
				Vec::new()
			}
			FetchResult::Avatar { stream, name, url } => {
				if !self.store.is_active(&stream) || self.store.player().known_name() != Some(name.as_str()) {
					debug!(player = %name, "avatar for outdated player dropped");
					return Vec::new();
				}
				let url = match url {
					Some(url) if self.store.cache_avatar(&name, url.clone()) => url,
					_ => DEFAULT_AVATAR.to_string(),
				};
				vec![Effect::Ui(UiEvent::Avatar { url })]
			}
			FetchResult::PlayerProfile(profile) => vec![Effect::Ui(UiEvent::PlayerProfile(profile))],
			FetchResult::SessionReset { stream, result } => match result {
				Ok(()) => {
					let mut effects = vec![self.notify(NotificationKind::Success, "notifications.session_reset")];
					if self.store.is_active(&stream) {
						effects.push(Effect::FetchStats(stream));
					}
					effects
				}
				Err(e) => {
					warn!(%stream, error = %e, "session reset failed");
					vec![self.notify(NotificationKind::Error, "notifications.reset_error")]
				}
			},
			FetchResult::Language {
				translations,
				persisted,
			} => {
				self.language = translations.language().to_string();
				self.translations = translations;
				info!(language = %self.language, "language table loaded");
				let mut effects = vec![Effect::Ui(UiEvent::LanguageChanged(self.language.clone())), self.status_event()];
				match persisted {
					Some(Ok(())) => effects.push(self.notify(NotificationKind::Success, "notifications.settings_saved")),
					Some(Err(e)) => {
						warn!(error = %e, "saving language failed");
						effects.push(self.notify(NotificationKind::Error, "notifications.error"));
					}
					None => {}
				}
				effects
			}
		}
	}

	fn apply_fetched_config(&mut self, cfg: DashboardConfig) -> Vec<Effect> {
		let DashboardConfig {
			current_version,
			player_info,
			versions,
			language,
			..
		} = cfg;

		let mut effects = Vec::new();
		if !self.language_pinned
			&& let Some(lang) = language.filter(|l| !l.is_empty() && *l != self.language)
		{
			effects.push(Effect::LoadLanguage(lang));
		}

		match self.store.active() {
			Some(active) if *active != current_version => {
				debug!(%active, server = %current_version, "fetched configuration names another stream; keeping active");
				return effects;
			}
			_ => {}
		}

		let changed = self.store.apply_config(ConfigUpdate {
			current_version: current_version.clone(),
			player_info,
			versions,
		});
		if changed {
			effects.extend(self.activated(current_version));
		} else {
			effects.push(Effect::FetchStats(current_version));
		}
		effects.extend(self.player_effects());
		effects
	}
}

impl PushHandler for ClientState {
	type Output = Vec<Effect>;

	fn active_stream(&self) -> Option<&StreamId> {
		self.store.active()
	}

	fn on_connected(&mut self) -> Vec<Effect> {
		info!(held = self.outbox.len(), "channel connected");
		self.connected = true;
		let mut effects: Vec<Effect> = self.outbox.drain(..).map(Effect::Send).collect();
		effects.extend([Effect::Ui(UiEvent::Connected), Effect::FetchConfig]);
		effects
	}

	fn on_disconnected(&mut self, reason: String) -> Vec<Effect> {
		warn!(%reason, "channel lost");
		self.connected = false;
		self.status = StatusIndicator::Disconnected;
		vec![Effect::Ui(UiEvent::Disconnected { reason }), self.status_event()]
	}

	fn on_config_update(&mut self, msg: ConfigUpdate) -> Vec<Effect> {
		let stream = msg.current_version.clone();
		let mut effects = Vec::new();
		if self.store.apply_config(msg) {
			effects.extend(self.activated(stream));
		}
		effects.extend(self.player_effects());
		effects
	}

	fn on_stats_updated(&mut self, msg: StatsUpdate) -> Vec<Effect> {
		self.stats = Some(msg.stats);
		self.stats_event(&msg.version).into_iter().collect()
	}

	fn on_new_event(&mut self, msg: NewEvent) -> Vec<Effect> {
		self.push_event(&msg.event)
	}

	fn on_player_info_updated(&mut self, msg: PlayerInfoUpdate) -> Vec<Effect> {
		self.store.replace_player(msg.info);
		self.player_effects()
	}

	fn on_stream_swap(&mut self, msg: StreamNotice) -> Vec<Effect> {
		let event = CombatEvent::literal("server", msg.message, self.now());
		self.push_event(&event)
	}

	fn on_monitoring_status(&mut self, msg: MonitoringStatus) -> Vec<Effect> {
		self.status = if msg.running {
			StatusIndicator::Monitoring
		} else {
			StatusIndicator::Waiting
		};
		vec![self.status_event()]
	}

	fn on_session_boundary(&mut self, msg: SessionBoundary) -> Vec<Effect> {
		match self.arbitration.request(msg) {
			RequestOutcome::Started(start) => self.prompt(start),
			RequestOutcome::Queued { position } => {
				debug!(position, "session boundary waiting for pending prompt");
				Vec::new()
			}
			RequestOutcome::Duplicate => Vec::new(),
		}
	}

	fn on_session_boundary_ack(&mut self, msg: SessionBoundaryAck) -> Vec<Effect> {
		info!(stream = %msg.version, action = %msg.action, message = ?msg.message, "session change processed");
		Vec::new()
	}

	fn on_name_mappings_updated(&mut self, msg: NameMappingsNotice) -> Vec<Effect> {
		info!(message = %msg.message, "name tables updated");
		let mut effects = Vec::new();
		if self.overlay.complete() {
			effects.push(Effect::Ui(UiEvent::OverlayHidden));
		}
		effects.push(self.notify(NotificationKind::Success, "notifications.names_updated"));
		effects.push(Effect::FetchNameMappings);
		effects
	}

	fn on_informational(&mut self, kind: MessageKind, stream: Option<StreamId>) -> Vec<Effect> {
		debug!(%kind, stream = ?stream.as_ref().map(StreamId::as_str), "informational push");
		Vec::new()
	}
}
