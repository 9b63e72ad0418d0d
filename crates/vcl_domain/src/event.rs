use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Template parameters carried by an event (`{name}` -> value).
pub type EventParams = serde_json::Map<String, serde_json::Value>;

/// One discrete entry of the combat log as pushed by the server.
///
/// Text comes either from `message_key` + `params` (templated) or from the
/// literal `message` (legacy servers and client-synthesized entries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(deserialize_with = "de_timestamp")]
	pub timestamp: NaiveDateTime,
	#[serde(default)]
	pub message: Option<String>,
	#[serde(default)]
	pub message_key: Option<String>,
	#[serde(default, deserialize_with = "de_params")]
	pub params: EventParams,
	#[serde(default)]
	pub with_timer: bool,
	#[serde(default, deserialize_with = "de_opt_id")]
	pub player_id: Option<String>,
	#[serde(default, deserialize_with = "de_opt_timestamp")]
	pub timer_start: Option<NaiveDateTime>,
}

impl CombatEvent {
	/// Untemplated entry with fixed text.
	pub fn literal(kind: impl Into<String>, message: impl Into<String>, timestamp: NaiveDateTime) -> Self {
		Self {
			kind: kind.into(),
			timestamp,
			message: Some(message.into()),
			message_key: None,
			params: EventParams::new(),
			with_timer: false,
			player_id: None,
			timer_start: None,
		}
	}

	/// Templated entry.
	pub fn keyed(kind: impl Into<String>, key: impl Into<String>, params: EventParams, timestamp: NaiveDateTime) -> Self {
		Self {
			kind: kind.into(),
			timestamp,
			message: None,
			message_key: Some(key.into()),
			params,
			with_timer: false,
			player_id: None,
			timer_start: None,
		}
	}

	/// Marks the event as carrying a live timer owned by `player_id`.
	pub fn with_timer(mut self, player_id: impl Into<String>, start: Option<NaiveDateTime>) -> Self {
		self.with_timer = true;
		self.player_id = Some(player_id.into());
		self.timer_start = start;
		self
	}

	/// Player owning the live timer, if this event has one.
	///
	/// The flag alone is not enough; an owner id is required too.
	pub fn timer_owner(&self) -> Option<&str> {
		if !self.with_timer {
			return None;
		}
		self.player_id.as_deref().filter(|p| !p.is_empty())
	}

	/// Instant the timer counts from.
	pub fn timer_origin(&self) -> NaiveDateTime {
		self.timer_start.unwrap_or(self.timestamp)
	}
}

/// Parse the server's timestamp format.
///
/// Accepts ISO-8601 local date-times with or without fractional seconds, with
/// `T` or a space as separator. A trailing UTC offset is accepted and dropped.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
	let s = s.trim();
	for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
		if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
			return Some(ts);
		}
	}
	DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local())
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;
	parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

pub(crate) fn de_opt_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = Option::<String>::deserialize(deserializer)?;
	match raw {
		None => Ok(None),
		Some(s) if s.trim().is_empty() => Ok(None),
		Some(s) => parse_timestamp(&s)
			.map(Some)
			.ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}"))),
	}
}

fn de_params<'de, D>(deserializer: D) -> Result<EventParams, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<EventParams>::deserialize(deserializer)?.unwrap_or_default())
}

// Ids arrive as either JSON numbers or strings.
pub(crate) fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	let v = Option::<serde_json::Value>::deserialize(deserializer)?;
	Ok(match v {
		None | Some(serde_json::Value::Null) => None,
		Some(serde_json::Value::String(s)) => Some(s),
		Some(other) => Some(other.to_string()),
	})
}

#[cfg(test)]
mod tests {
	use chrono::Timelike;

	use super::*;

	#[test]
	fn decodes_keyed_event() {
		let raw = r#"{
			"type": "pvp_kill",
			"message": "🎯 Bravo mit P4-AR",
			"timestamp": "2024-05-01T12:00:00.123456",
			"message_key": "events.pvp_kill",
			"params": {"victim": "Bravo", "weapon": "P4-AR"},
			"with_timer": false,
			"player_id": null,
			"timer_start": null
		}"#;
		let ev: CombatEvent = serde_json::from_str(raw).unwrap();
		assert_eq!(ev.kind, "pvp_kill");
		assert_eq!(ev.message_key.as_deref(), Some("events.pvp_kill"));
		assert_eq!(ev.params.get("victim").and_then(|v| v.as_str()), Some("Bravo"));
		assert_eq!(ev.timestamp.hour(), 12);
		assert!(ev.timer_owner().is_none());
	}

	#[test]
	fn decodes_legacy_event_without_key() {
		let raw = r#"{"type":"info","message":"hello","timestamp":"2024-05-01 08:30:00","params":null}"#;
		let ev: CombatEvent = serde_json::from_str(raw).unwrap();
		assert!(ev.message_key.is_none());
		assert!(ev.params.is_empty());
		assert_eq!(ev.message.as_deref(), Some("hello"));
	}

	#[test]
	fn timer_requires_flag_and_owner() {
		let raw = r#"{"type":"player_corpse","timestamp":"2024-05-01T12:00:00","with_timer":true,
			"player_id":"Bravo","timer_start":"2024-05-01T11:59:50"}"#;
		let ev: CombatEvent = serde_json::from_str(raw).unwrap();
		assert_eq!(ev.timer_owner(), Some("Bravo"));
		assert_eq!(ev.timer_origin().second(), 50);

		let raw = r#"{"type":"player_corpse","timestamp":"2024-05-01T12:00:00","with_timer":true}"#;
		let ev: CombatEvent = serde_json::from_str(raw).unwrap();
		assert!(ev.timer_owner().is_none());
		assert_eq!(ev.timer_origin(), ev.timestamp);
	}

	#[test]
	fn timestamps_with_offset_are_accepted() {
		let ts = parse_timestamp("2024-05-01T12:00:00+02:00").unwrap();
		assert_eq!(ts.hour(), 12);
		assert!(parse_timestamp("yesterday").is_none());
	}

	#[test]
	fn numeric_player_ids_are_stringified() {
		let raw = r#"{"type":"x","timestamp":"2024-05-01T12:00:00","with_timer":true,"player_id":42}"#;
		let ev: CombatEvent = serde_json::from_str(raw).unwrap();
		assert_eq!(ev.timer_owner(), Some("42"));
	}
}
