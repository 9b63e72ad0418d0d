#![forbid(unsafe_code)]

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod event;
mod player;
mod stats;

pub use event::{CombatEvent, EventParams, parse_timestamp};
pub use player::PlayerInfo;
pub use stats::{StatScope, StatSnapshot, StatsBundle};

/// Errors for parsing identifiers from strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseIdError {
	#[error("empty value")]
	Empty,
	#[error("invalid format: {0}")]
	InvalidFormat(String),
}

/// One monitored log source (a game build such as `LIVE` or `PTU`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
	/// Create a non-empty `StreamId`.
	pub fn new(id: impl Into<String>) -> Result<Self, ParseIdError> {
		let id = id.into();
		let trimmed = id.trim();
		if trimmed.is_empty() {
			return Err(ParseIdError::Empty);
		}
		if trimmed.contains('/') {
			return Err(ParseIdError::InvalidFormat(format!("stream id must not contain '/': {trimmed}")));
		}
		Ok(Self(trimmed.to_string()))
	}
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for StreamId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for StreamId {
	type Err = ParseIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		StreamId::new(s.to_string())
	}
}

/// Server-issued token naming a freshly detected game session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
	pub fn new(token: impl Into<String>) -> Self {
		Self(token.into())
	}
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for SessionToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stream_id_parse_and_display() {
		let id: StreamId = "LIVE".parse().unwrap();
		assert_eq!(id.as_str(), "LIVE");
		assert_eq!(id.to_string(), "LIVE");
		assert_eq!(StreamId::new("  PTU ").unwrap().as_str(), "PTU");
	}

	#[test]
	fn rejects_empty_and_path_like_ids() {
		assert_eq!(StreamId::new("   "), Err(ParseIdError::Empty));
		assert!(matches!(StreamId::new("LIVE/x"), Err(ParseIdError::InvalidFormat(_))));
	}

	#[test]
	fn stream_id_is_transparent_on_the_wire() {
		let id = StreamId::new("EPTU").unwrap();
		assert_eq!(serde_json::to_string(&id).unwrap(), "\"EPTU\"");
		let back: StreamId = serde_json::from_str("\"EPTU\"").unwrap();
		assert_eq!(back, id);
	}
}
