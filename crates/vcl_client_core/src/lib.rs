#![forbid(unsafe_code)]

//! Live-update client core for the combat-log dashboard.
//!
//! [`ClientState`] is the single context object holding every piece of
//! reconciled state. [`ClientRuntime`] drives it from the channel, user
//! commands and timers, and executes the [`Effect`]s it returns.

use vcl_protocol::FramingError;

pub mod api;
pub mod arbitration;
pub mod channel;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod i18n;
pub mod linkify;
pub mod once;
pub mod overlay;
pub mod reconnect;
pub mod runtime;
pub mod state;
pub mod stats_view;
pub mod store;
pub mod timeline;

pub use api::{CitizenProfile, DashboardApi, DashboardConfig, HttpDashboardApi, PlayerEncounter, PlayerProfile};
pub use arbitration::{ArbitrationCoordinator, Decision, Resolution, Trigger};
pub use channel::{ChannelEvent, ChannelHandle, open_channel};
pub use config::ClientConfig;
pub use controller::{ClientCommand, ClientController, ShutdownHandle, start_client};
pub use dispatcher::{Dispatcher, PushHandler, RouteOutcome};
pub use i18n::Translations;
pub use linkify::linkify;
pub use once::{ResolveOnce, resolve_once};
pub use overlay::Overlay;
pub use runtime::ClientRuntime;
pub use state::{ClientState, Effect, FetchResult, NotificationKind, StatusIndicator, UiEvent};
pub use stats_view::StatsView;
pub use store::{NameMappings, StreamStore};
pub use timeline::{Timeline, TimelineEntry};

/// Placeholder shown whenever no avatar could be resolved.
pub const DEFAULT_AVATAR: &str = "/static/media/avatar_default_big.jpg";

/// Errors for client core operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientCoreError {
	/// Server endpoint could not be parsed.
	#[error("invalid endpoint: {0}")]
	Endpoint(String),

	/// Connection establishment failed.
	#[error("failed to connect: {0}")]
	Connect(String),

	/// Channel failed after it was established.
	#[error("transport error: {0}")]
	Transport(String),

	/// Protocol framing error.
	#[error(transparent)]
	Framing(#[from] FramingError),

	/// Protocol error (unexpected payloads, invalid resources).
	#[error("protocol error: {0}")]
	Protocol(String),

	/// Request/response API call failed.
	#[error("api error: {0}")]
	Api(String),

	/// Configuration could not be loaded.
	#[error("config error: {0}")]
	Config(String),

	/// IO error.
	#[error("io error: {0}")]
	Io(String),

	/// Other error.
	#[error("error: {0}")]
	Other(String),
}

impl From<anyhow::Error> for ClientCoreError {
	fn from(e: anyhow::Error) -> Self {
		ClientCoreError::Other(format!("{e:#}"))
	}
}

/// Flatten a core error into a user-facing string.
pub fn map_core_err(e: ClientCoreError) -> String {
	match e {
		ClientCoreError::Endpoint(s) => s,
		ClientCoreError::Connect(s) => s,
		ClientCoreError::Transport(s) => s,
		ClientCoreError::Framing(e) => e.to_string(),
		ClientCoreError::Protocol(s) => s,
		ClientCoreError::Api(s) => s,
		ClientCoreError::Config(s) => s,
		ClientCoreError::Io(s) => s,
		ClientCoreError::Other(s) => s,
	}
}
