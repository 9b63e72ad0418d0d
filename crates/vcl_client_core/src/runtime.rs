#![forbid(unsafe_code)]

//! The task that owns [`ClientState`] and drives it.
//!
//! Channel events, user commands, the timeline tick, countdown and guard
//! timers, connect attempts and request completions all arrive on one
//! `select!` loop, so every state reaction runs to completion before the next
//! one starts.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::ClientCoreError;
use crate::api::{DashboardApi, load_translations, lookup_player};
use crate::arbitration::{CountdownTick, Resolution, spawn_countdown};
use crate::channel::{ChannelEvent, ChannelHandle};
use crate::controller::ClientCommand;
use crate::dispatcher::{Dispatcher, RouteOutcome, route};
use crate::map_core_err;
use crate::overlay::{OverlayOutcome, spawn_guard};
use crate::reconnect::{RECONNECT_RESET_AFTER, schedule_reconnect};
use crate::state::{ClientState, Effect, FetchResult, UiEvent};
use crate::timeline::TICK_PERIOD;

/// A running timer task and the receiver it settles.
#[derive(Debug)]
struct Pending<T> {
	task: JoinHandle<()>,
	receiver: oneshot::Receiver<T>,
}

impl<T> Pending<T> {
	fn cancel(self) {
		self.task.abort();
	}
}

type ConnectResult = (u64, Result<ChannelHandle, ClientCoreError>);

async fn settled<T>(slot: &mut Option<Pending<T>>) -> Result<T, oneshot::error::RecvError> {
	match slot {
		Some(pending) => (&mut pending.receiver).await,
		None => std::future::pending().await,
	}
}

pub struct ClientRuntime {
	state: ClientState,
	dispatcher: Dispatcher,
	api: Arc<dyn DashboardApi>,
	ui_tx: mpsc::UnboundedSender<UiEvent>,
	fetch_tx: mpsc::UnboundedSender<FetchResult>,
	fetch_rx: mpsc::UnboundedReceiver<FetchResult>,
	tick_tx: mpsc::UnboundedSender<CountdownTick>,
	tick_rx: mpsc::UnboundedReceiver<CountdownTick>,
	connect_tx: mpsc::UnboundedSender<ConnectResult>,
	connect_rx: mpsc::UnboundedReceiver<ConnectResult>,
	/// Generation of the connect attempt in flight.
	connecting: Option<u64>,
	connect_generation: u64,
	countdown: Option<Pending<Resolution>>,
	guard: Option<Pending<OverlayOutcome>>,
	guard_generation: u64,
	want_connected: bool,
	reconnect_attempt: u32,
	reconnect_deadline: Option<Instant>,
	last_successful_connect: Option<Instant>,
}

impl std::fmt::Debug for ClientRuntime {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ClientRuntime")
			.field("state", &self.state)
			.field("dispatcher", &self.dispatcher)
			.field("reconnect_attempt", &self.reconnect_attempt)
			.finish_non_exhaustive()
	}
}

impl ClientRuntime {
	pub fn new(
		state: ClientState,
		dispatcher: Dispatcher,
		api: Arc<dyn DashboardApi>,
		ui_tx: mpsc::UnboundedSender<UiEvent>,
	) -> Self {
		let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
		let (tick_tx, tick_rx) = mpsc::unbounded_channel();
		let (connect_tx, connect_rx) = mpsc::unbounded_channel();
		Self {
			state,
			dispatcher,
			api,
			ui_tx,
			fetch_tx,
			fetch_rx,
			tick_tx,
			tick_rx,
			connect_tx,
			connect_rx,
			connecting: None,
			connect_generation: 0,
			countdown: None,
			guard: None,
			guard_generation: 0,
			want_connected: false,
			reconnect_attempt: 0,
			reconnect_deadline: None,
			last_successful_connect: None,
		}
	}

	pub fn state(&self) -> &ClientState {
		&self.state
	}

	/// Run until shutdown is signalled or every controller is dropped.
	pub async fn run(mut self, mut cmd_rx: mpsc::Receiver<ClientCommand>, mut shutdown_rx: oneshot::Receiver<()>) {
		let effects = self.state.startup();
		self.apply(effects);

		let mut timeline_tick = tokio::time::interval(TICK_PERIOD);
		timeline_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

		loop {
			let reconnect_deadline = self.reconnect_deadline;
			tokio::select! {
				_ = &mut shutdown_rx => {
					self.stop("shutdown");
					break;
				}

				cmd = cmd_rx.recv() => {
					let Some(cmd) = cmd else {
						self.stop("ui dropped controller");
						break;
					};
					self.handle_command(cmd);
				}

				event = self.dispatcher.next_event() => {
					self.on_channel_event(event);
				}

				Some((generation, result)) = self.connect_rx.recv() => {
					self.on_connect_result(generation, result);
				}

				_ = timeline_tick.tick() => {
					let effects = self.state.tick();
					self.apply(effects);
				}

				Some(result) = self.fetch_rx.recv() => {
					let effects = self.state.apply_fetch(result);
					self.apply(effects);
				}

				Some(tick) = self.tick_rx.recv() => {
					let effects = self.state.on_countdown_tick(tick);
					self.apply(effects);
				}

				resolution = settled(&mut self.countdown), if self.countdown.is_some() => {
					if let Some(countdown) = self.countdown.take() {
						countdown.cancel();
					}
					match resolution {
						Ok(resolution) => {
							let effects = self.state.on_arbitration_resolved(resolution);
							self.apply(effects);
						}
						Err(_) => warn!("arbitration countdown dropped without a resolution"),
					}
				}

				outcome = settled(&mut self.guard), if self.guard.is_some() => {
					if let Some(guard) = self.guard.take() {
						guard.cancel();
					}
					if let Ok(outcome) = outcome {
						let effects = self.state.on_overlay_guard(self.guard_generation, outcome);
						self.apply(effects);
					}
				}

				_ = async move {
					if let Some(deadline) = reconnect_deadline {
						tokio::time::sleep_until(deadline).await;
					}
				}, if reconnect_deadline.is_some() => {
					self.reconnect_deadline = None;
					if self.want_connected {
						self.connect();
					}
				}
			}
		}
	}

	fn stop(&mut self, reason: &str) {
		info!(%reason, "client runtime stopping");
		self.connecting = None;
		self.dispatcher.disconnect();
		if let Some(countdown) = self.countdown.take() {
			countdown.cancel();
		}
		if let Some(guard) = self.guard.take() {
			guard.cancel();
		}
		self.emit(UiEvent::Disconnected {
			reason: reason.to_string(),
		});
	}

	fn emit(&self, event: UiEvent) {
		let _ = self.ui_tx.send(event);
	}

	fn bump_reconnect_attempt(&mut self) -> u32 {
		match self.last_successful_connect {
			Some(last) if Instant::now().duration_since(last) > RECONNECT_RESET_AFTER => self.reconnect_attempt = 1,
			_ => self.reconnect_attempt = self.reconnect_attempt.saturating_add(1).max(1),
		}
		self.reconnect_attempt
	}

	fn schedule_reconnect(&mut self) {
		let attempt = self.bump_reconnect_attempt();
		let (deadline, ms) = schedule_reconnect(attempt);
		self.reconnect_deadline = Some(deadline);
		self.emit(UiEvent::Reconnecting {
			attempt,
			next_retry_in_ms: ms,
		});
	}

	/// Start opening the channel. The result comes back on `connect_rx`.
	fn connect(&mut self) {
		if self.connecting.is_some() {
			debug!("connect already in flight");
			return;
		}
		let Some(opening) = self.dispatcher.begin_connect() else {
			debug!("connect requested while connected");
			return;
		};
		self.connect_generation += 1;
		let generation = self.connect_generation;
		self.connecting = Some(generation);
		self.emit(UiEvent::Connecting);

		let tx = self.connect_tx.clone();
		tokio::spawn(async move {
			let _ = tx.send((generation, opening.await));
		});
	}

	fn on_connect_result(&mut self, generation: u64, result: Result<ChannelHandle, ClientCoreError>) {
		if self.connecting != Some(generation) {
			debug!(generation, "abandoned connect attempt dropped");
			return;
		}
		self.connecting = None;
		match result {
			Ok(handle) => {
				self.dispatcher.attach(handle);
				self.last_successful_connect = Some(Instant::now());
				self.reconnect_attempt = 0;
				self.reconnect_deadline = None;
			}
			Err(e) => {
				warn!(error = %e, "connect failed");
				self.emit(UiEvent::Error(map_core_err(e)));
				if self.want_connected {
					self.schedule_reconnect();
				}
			}
		}
	}

	fn on_channel_event(&mut self, event: ChannelEvent) {
		let lost = matches!(event, ChannelEvent::Disconnected { .. });
		match route(event, &mut self.state) {
			RouteOutcome::Delivered(effects) => self.apply(effects),
			RouteOutcome::Discarded { .. } => {}
		}
		if lost && self.want_connected {
			self.schedule_reconnect();
		}
	}

	fn handle_command(&mut self, cmd: ClientCommand) {
		let effects = match cmd {
			ClientCommand::Connect => {
				self.want_connected = true;
				self.reconnect_attempt = 0;
				self.reconnect_deadline = None;
				self.connect();
				return;
			}
			ClientCommand::Disconnect { reason } => {
				self.want_connected = false;
				self.reconnect_attempt = 0;
				self.reconnect_deadline = None;
				self.connecting = None;
				if !self.dispatcher.disconnect() {
					return;
				}
				match route(ChannelEvent::Disconnected { reason }, &mut self.state) {
					RouteOutcome::Delivered(effects) => effects,
					RouteOutcome::Discarded { .. } => Vec::new(),
				}
			}
			ClientCommand::SwitchStream { stream } => self.state.switch_stream(stream),
			ClientCommand::RespondArbitration { keep } => {
				if !self.state.respond_arbitration(keep) {
					debug!(keep, "no arbitration pending");
				}
				return;
			}
			ClientCommand::ClearTimeline => self.state.clear_timeline(),
			ClientCommand::ResetSession { remove_from_total } => self.state.reset_session(remove_from_total),
			ClientCommand::RefreshNameMappings => self.state.refresh_name_mappings(),
			ClientCommand::OpenPlayer { name } => self.state.open_player(name),
			ClientCommand::ChangeLanguage { language } => self.state.change_language(language),
			ClientCommand::StartMonitoring => self.state.start_monitoring(),
			ClientCommand::StopMonitoring => self.state.stop_monitoring(),
		};
		self.apply(effects);
	}

	fn spawn_fetch<F, Fut>(&self, f: F)
	where
		F: FnOnce(Arc<dyn DashboardApi>) -> Fut,
		Fut: Future<Output = FetchResult> + Send + 'static,
	{
		let fut = f(Arc::clone(&self.api));
		let tx = self.fetch_tx.clone();
		tokio::spawn(async move {
			let _ = tx.send(fut.await);
		});
	}

	fn apply(&mut self, effects: Vec<Effect>) {
		for effect in effects {
			self.apply_one(effect);
		}
	}

	fn apply_one(&mut self, effect: Effect) {
		match effect {
			Effect::Send(push) => {
				let event = push.event_name();
				if let Err(e) = self.dispatcher.send(push.clone()) {
					if self.state.hold_unsent(push) {
						info!(event, error = %e, "push held until reconnect");
					} else {
						warn!(event, error = %e, "push not sent");
						self.emit(UiEvent::Error(map_core_err(e)));
					}
				}
			}
			Effect::FetchConfig => {
				self.spawn_fetch(|api| async move { FetchResult::Config(api.fetch_config().await) });
			}
			Effect::PersistActiveStream(stream) => self.spawn_fetch(|api| async move {
				let result = api.set_active_stream(&stream).await;
				FetchResult::StreamPersisted { stream, result }
			}),
			Effect::FetchStats(stream) => self.spawn_fetch(|api| async move {
				let result = api.fetch_stats(&stream).await;
				FetchResult::Stats { stream, result }
			}),
			Effect::FetchNameMappings => {
				self.spawn_fetch(|api| async move { FetchResult::NameMappings(api.fetch_name_mappings().await) });
			}
			Effect::FetchAvatar { stream, name } => self.spawn_fetch(|api| async move {
				let url = match api.fetch_avatar(&stream, &name).await {
					Ok(url) => url,
					Err(e) => {
						debug!(player = %name, error = %e, "avatar unavailable");
						None
					}
				};
				FetchResult::Avatar { stream, name, url }
			}),
			Effect::LookupPlayer { stream, name } => self.spawn_fetch(|api| async move {
				FetchResult::PlayerProfile(lookup_player(api.as_ref(), &stream, &name).await)
			}),
			Effect::ResetSession {
				stream,
				remove_from_total,
			} => self.spawn_fetch(move |api| async move {
				let result = api.reset_session(&stream, remove_from_total).await;
				FetchResult::SessionReset { stream, result }
			}),
			Effect::ChangeLanguage(language) => self.spawn_fetch(|api| async move {
				let persisted = api.set_language(&language).await;
				FetchResult::Language {
					translations: load_translations(api.as_ref(), &language).await,
					persisted: Some(persisted),
				}
			}),
			Effect::LoadLanguage(language) => self.spawn_fetch(|api| async move {
				FetchResult::Language {
					translations: load_translations(api.as_ref(), &language).await,
					persisted: None,
				}
			}),
			Effect::StartCountdown(start) => {
				if let Some(old) = self.countdown.take() {
					old.cancel();
				}
				let task = spawn_countdown(start.request.token.clone(), start.resolver, self.tick_tx.clone());
				self.countdown = Some(Pending {
					task,
					receiver: start.receiver,
				});
			}
			Effect::CancelCountdown => {
				if let Some(countdown) = self.countdown.take() {
					countdown.cancel();
				}
			}
			Effect::StartOverlayGuard(start) => {
				if let Some(old) = self.guard.take() {
					old.cancel();
				}
				self.guard_generation = start.generation;
				self.guard = Some(Pending {
					task: spawn_guard(start.resolver),
					receiver: start.receiver,
				});
			}
			Effect::Ui(event) => self.emit(event),
		}
	}
}
