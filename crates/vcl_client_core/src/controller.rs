#![forbid(unsafe_code)]

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::info;
use vcl_domain::StreamId;

use crate::ClientCoreError;
use crate::api::DashboardApi;
use crate::channel::open_channel;
use crate::config::ClientConfig;
use crate::dispatcher::{ConnectFuture, Dispatcher};
use crate::runtime::ClientRuntime;
use crate::state::{ClientState, UiEvent};

/// UI -> client commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
	Connect,
	Disconnect { reason: String },
	SwitchStream { stream: StreamId },
	RespondArbitration { keep: bool },
	ClearTimeline,
	ResetSession { remove_from_total: bool },
	RefreshNameMappings,
	OpenPlayer { name: String },
	ChangeLanguage { language: String },
	StartMonitoring,
	StopMonitoring,
}

/// UI command handle for the client task.
#[derive(Debug, Clone)]
pub struct ClientController {
	cmd_tx: mpsc::Sender<ClientCommand>,
}

impl ClientController {
	pub fn new(cmd_tx: mpsc::Sender<ClientCommand>) -> Self {
		Self { cmd_tx }
	}

	async fn send(&self, cmd: ClientCommand) -> Result<(), String> {
		self.cmd_tx
			.send(cmd)
			.await
			.map_err(|_| "client task is not running".to_string())
	}

	pub async fn connect(&self) -> Result<(), String> {
		self.send(ClientCommand::Connect).await
	}

	pub async fn disconnect(&self, reason: impl Into<String>) -> Result<(), String> {
		self.send(ClientCommand::Disconnect { reason: reason.into() }).await
	}

	pub async fn switch_stream(&self, stream: StreamId) -> Result<(), String> {
		self.send(ClientCommand::SwitchStream { stream }).await
	}

	/// Answer the pending session prompt. Ignored when nothing is pending.
	pub async fn respond_arbitration(&self, keep: bool) -> Result<(), String> {
		self.send(ClientCommand::RespondArbitration { keep }).await
	}

	pub async fn clear_timeline(&self) -> Result<(), String> {
		self.send(ClientCommand::ClearTimeline).await
	}

	pub async fn reset_session(&self, remove_from_total: bool) -> Result<(), String> {
		self.send(ClientCommand::ResetSession { remove_from_total }).await
	}

	pub async fn refresh_name_mappings(&self) -> Result<(), String> {
		self.send(ClientCommand::RefreshNameMappings).await
	}

	pub async fn open_player(&self, name: impl Into<String>) -> Result<(), String> {
		self.send(ClientCommand::OpenPlayer { name: name.into() }).await
	}

	pub async fn change_language(&self, language: impl Into<String>) -> Result<(), String> {
		self.send(ClientCommand::ChangeLanguage {
			language: language.into(),
		})
		.await
	}

	pub async fn start_monitoring(&self) -> Result<(), String> {
		self.send(ClientCommand::StartMonitoring).await
	}

	pub async fn stop_monitoring(&self) -> Result<(), String> {
		self.send(ClientCommand::StopMonitoring).await
	}
}

/// Shutdown handle for the client task.
#[derive(Debug)]
pub struct ShutdownHandle {
	shutdown_tx: oneshot::Sender<()>,
	thread: Option<std::thread::JoinHandle<()>>,
}

impl ShutdownHandle {
	/// Signal shutdown and wait for the client thread to exit.
	pub fn shutdown(mut self) {
		let _ = self.shutdown_tx.send(());
		if let Some(thread) = self.thread.take() {
			let _ = thread.join();
		}
	}
}

/// Start the client on its own thread and runtime.
///
/// Nothing connects until [`ClientController::connect`] is called.
pub fn start_client(
	config: ClientConfig,
	api: Arc<dyn DashboardApi>,
) -> Result<(ClientController, mpsc::UnboundedReceiver<UiEvent>, ShutdownHandle), ClientCoreError> {
	let endpoint = config.endpoint().map_err(ClientCoreError::Endpoint)?;
	let connect_timeout = config.connect_timeout;
	let max_frame_bytes = config.max_frame_bytes;
	let dispatcher = Dispatcher::new(Box::new(move || -> ConnectFuture {
		let endpoint = endpoint.clone();
		Box::pin(async move { open_channel(&endpoint, connect_timeout, max_frame_bytes).await })
	}));
	let state = ClientState::new(config.initial_stream.clone(), config.language.clone());

	let (cmd_tx, cmd_rx) = mpsc::channel::<ClientCommand>(128);
	let (ui_tx, ui_rx) = mpsc::unbounded_channel::<UiEvent>();
	let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

	let rt = tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.worker_threads(2)
		.thread_name("vcl-client-worker")
		.build()
		.map_err(|e| ClientCoreError::Io(format!("failed to build tokio runtime: {e}")))?;

	let thread = std::thread::Builder::new()
		.name("vcl-client".to_string())
		.spawn(move || {
			let runtime = ClientRuntime::new(state, dispatcher, api, ui_tx);
			rt.block_on(runtime.run(cmd_rx, shutdown_rx));
			info!("client thread exited");
		})
		.map_err(|e| ClientCoreError::Io(format!("failed to spawn client thread: {e}")))?;

	Ok((
		ClientController::new(cmd_tx),
		ui_rx,
		ShutdownHandle {
			shutdown_tx,
			thread: Some(thread),
		},
	))
}
