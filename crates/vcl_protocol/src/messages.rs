#![forbid(unsafe_code)]

use core::fmt;

use serde::{Deserialize, Serialize};
use vcl_domain::{CombatEvent, PlayerInfo, SessionToken, StatsBundle, StreamId};

/// Authoritative configuration: the server's active stream and its player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
	pub current_version: StreamId,
	#[serde(default)]
	pub player_info: PlayerInfo,
	#[serde(default)]
	pub versions: Vec<StreamId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsUpdate {
	pub version: StreamId,
	pub stats: StatsBundle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
	pub version: StreamId,
	pub event: CombatEvent,
}

/// Player info pushed flat next to its stream id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfoUpdate {
	pub version: StreamId,
	#[serde(flatten)]
	pub info: PlayerInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamNotice {
	pub version: StreamId,
	#[serde(default)]
	pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringStatus {
	pub version: StreamId,
	pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBoundary {
	pub version: StreamId,
	pub new_session_id: SessionToken,
	#[serde(default)]
	pub old_session_id: Option<SessionToken>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBoundaryAck {
	pub version: StreamId,
	pub action: String,
	#[serde(default)]
	pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMappingsNotice {
	#[serde(default)]
	pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRef {
	pub version: StreamId,
}

/// Every message the server pushes over the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerPush {
	#[serde(rename = "config_update")]
	ConfigUpdated(ConfigUpdate),
	#[serde(rename = "stats_updated")]
	StatsUpdated(StatsUpdate),
	#[serde(rename = "new_event")]
	NewEvent(NewEvent),
	#[serde(rename = "player_info_updated")]
	PlayerInfoUpdated(PlayerInfoUpdate),
	#[serde(rename = "server_swap_detected")]
	StreamSwapDetected(StreamNotice),
	#[serde(rename = "sc_status_changed")]
	MonitoringStatusChanged(MonitoringStatus),
	#[serde(rename = "session_changed")]
	SessionBoundaryDetected(SessionBoundary),
	#[serde(rename = "session_change_processed")]
	SessionBoundaryAck(SessionBoundaryAck),
	#[serde(rename = "ini_updated")]
	NameMappingsUpdated(NameMappingsNotice),
	#[serde(rename = "version_changed")]
	VersionChanged(StreamRef),
	#[serde(rename = "initial_scan_complete")]
	InitialScanComplete(StreamRef),
	#[serde(rename = "monitoring_started")]
	MonitoringStarted(StreamRef),
	#[serde(rename = "monitoring_stopped")]
	MonitoringStopped(StreamRef),
	#[serde(rename = "players_updated")]
	PlayersUpdated(StreamNotice),
}

impl ServerPush {
	pub fn kind(&self) -> MessageKind {
		match self {
			ServerPush::ConfigUpdated(_) => MessageKind::ConfigUpdated,
			ServerPush::StatsUpdated(_) => MessageKind::StatsUpdated,
			ServerPush::NewEvent(_) => MessageKind::NewEvent,
			ServerPush::PlayerInfoUpdated(_) => MessageKind::PlayerInfoUpdated,
			ServerPush::StreamSwapDetected(_) => MessageKind::StreamSwapDetected,
			ServerPush::MonitoringStatusChanged(_) => MessageKind::MonitoringStatusChanged,
			ServerPush::SessionBoundaryDetected(_) => MessageKind::SessionBoundaryDetected,
			ServerPush::SessionBoundaryAck(_) => MessageKind::SessionBoundaryAck,
			ServerPush::NameMappingsUpdated(_) => MessageKind::NameMappingsUpdated,
			ServerPush::VersionChanged(_) => MessageKind::VersionChanged,
			ServerPush::InitialScanComplete(_) => MessageKind::InitialScanComplete,
			ServerPush::MonitoringStarted(_) => MessageKind::MonitoringStarted,
			ServerPush::MonitoringStopped(_) => MessageKind::MonitoringStopped,
			ServerPush::PlayersUpdated(_) => MessageKind::PlayersUpdated,
		}
	}

	/// Stream this push must match to be admitted.
	///
	/// `None` for pushes that are not stream-scoped. `config_update` names the
	/// new active stream and is therefore never filtered; neither is
	/// `version_changed`, which announces a switch.
	pub fn admission_stream(&self) -> Option<&StreamId> {
		match self {
			ServerPush::ConfigUpdated(_) | ServerPush::NameMappingsUpdated(_) | ServerPush::VersionChanged(_) => None,
			ServerPush::StatsUpdated(m) => Some(&m.version),
			ServerPush::NewEvent(m) => Some(&m.version),
			ServerPush::PlayerInfoUpdated(m) => Some(&m.version),
			ServerPush::StreamSwapDetected(m) => Some(&m.version),
			ServerPush::MonitoringStatusChanged(m) => Some(&m.version),
			ServerPush::SessionBoundaryDetected(m) => Some(&m.version),
			ServerPush::SessionBoundaryAck(m) => Some(&m.version),
			ServerPush::InitialScanComplete(m) => Some(&m.version),
			ServerPush::MonitoringStarted(m) => Some(&m.version),
			ServerPush::MonitoringStopped(m) => Some(&m.version),
			ServerPush::PlayersUpdated(m) => Some(&m.version),
		}
	}
}

/// Closed set of inbound message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
	ConfigUpdated,
	StatsUpdated,
	NewEvent,
	PlayerInfoUpdated,
	StreamSwapDetected,
	MonitoringStatusChanged,
	SessionBoundaryDetected,
	SessionBoundaryAck,
	NameMappingsUpdated,
	VersionChanged,
	InitialScanComplete,
	MonitoringStarted,
	MonitoringStopped,
	PlayersUpdated,
}

impl MessageKind {
	/// Event name on the wire.
	pub const fn as_str(self) -> &'static str {
		match self {
			MessageKind::ConfigUpdated => "config_update",
			MessageKind::StatsUpdated => "stats_updated",
			MessageKind::NewEvent => "new_event",
			MessageKind::PlayerInfoUpdated => "player_info_updated",
			MessageKind::StreamSwapDetected => "server_swap_detected",
			MessageKind::MonitoringStatusChanged => "sc_status_changed",
			MessageKind::SessionBoundaryDetected => "session_changed",
			MessageKind::SessionBoundaryAck => "session_change_processed",
			MessageKind::NameMappingsUpdated => "ini_updated",
			MessageKind::VersionChanged => "version_changed",
			MessageKind::InitialScanComplete => "initial_scan_complete",
			MessageKind::MonitoringStarted => "monitoring_started",
			MessageKind::MonitoringStopped => "monitoring_stopped",
			MessageKind::PlayersUpdated => "players_updated",
		}
	}
}

impl fmt::Display for MessageKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Messages the client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientPush {
	/// Resolution of a session boundary: carry prior session stats forward or discard them.
	#[serde(rename = "session_change_response")]
	SessionBoundaryResponse {
		version: StreamId,
		keep_stats: bool,
		new_session_id: SessionToken,
	},
	#[serde(rename = "start_monitoring")]
	StartMonitoring { version: StreamId },
	#[serde(rename = "stop_monitoring")]
	StopMonitoring { version: StreamId },
}

impl ClientPush {
	pub fn event_name(&self) -> &'static str {
		match self {
			ClientPush::SessionBoundaryResponse { .. } => "session_change_response",
			ClientPush::StartMonitoring { .. } => "start_monitoring",
			ClientPush::StopMonitoring { .. } => "stop_monitoring",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decodes_session_boundary_with_old_token() {
		let raw = r#"{"event":"session_changed","data":{"version":"LIVE","old_session_id":"aaa","new_session_id":"bbb"}}"#;
		let push: ServerPush = serde_json::from_str(raw).unwrap();
		let ServerPush::SessionBoundaryDetected(b) = &push else {
			panic!("unexpected push: {push:?}");
		};
		assert_eq!(b.new_session_id.as_str(), "bbb");
		assert_eq!(push.kind(), MessageKind::SessionBoundaryDetected);
		assert_eq!(push.admission_stream().map(|s| s.as_str()), Some("LIVE"));
	}

	#[test]
	fn player_info_is_flat_on_the_wire() {
		let raw = r#"{"event":"player_info_updated","data":{"version":"PTU","name":"Alpha","id":"77",
			"game_version":"4.3.2 (Build 1)","current_vehicle":null}}"#;
		let push: ServerPush = serde_json::from_str(raw).unwrap();
		let ServerPush::PlayerInfoUpdated(p) = push else {
			panic!("wrong variant");
		};
		assert_eq!(p.version.as_str(), "PTU");
		assert_eq!(p.info.name.as_deref(), Some("Alpha"));
		assert_eq!(p.info.id.as_deref(), Some("77"));
		assert!(p.info.current_vehicle.is_none());
	}

	#[test]
	fn config_and_name_mappings_are_not_stream_scoped() {
		let cfg: ServerPush = serde_json::from_str(
			r#"{"event":"config_update","data":{"current_version":"LIVE","player_info":{"name":"A"},"versions":["LIVE","PTU"]}}"#,
		)
		.unwrap();
		assert!(cfg.admission_stream().is_none());

		let ini: ServerPush = serde_json::from_str(r#"{"event":"ini_updated","data":{"message":"ok"}}"#).unwrap();
		assert!(ini.admission_stream().is_none());
		assert_eq!(ini.kind().to_string(), "ini_updated");
	}

	#[test]
	fn session_response_wire_shape() {
		let out = ClientPush::SessionBoundaryResponse {
			version: StreamId::new("LIVE").unwrap(),
			keep_stats: false,
			new_session_id: SessionToken::new("bbb"),
		};
		let v = serde_json::to_value(&out).unwrap();
		assert_eq!(v["event"], "session_change_response");
		assert_eq!(v["data"]["version"], "LIVE");
		assert_eq!(v["data"]["keep_stats"], false);
		assert_eq!(v["data"]["new_session_id"], "bbb");
		assert_eq!(out.event_name(), "session_change_response");
	}

	#[test]
	fn unknown_event_is_a_decode_error() {
		assert!(serde_json::from_str::<ServerPush>(r#"{"event":"bogus","data":{}}"#).is_err());
	}
}
