use serde::{Deserialize, Serialize};

/// The local player as last reported by the server.
///
/// Replaced wholesale on every authoritative update; fields are never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default, deserialize_with = "crate::event::de_opt_id")]
	pub id: Option<String>,
	#[serde(default)]
	pub game_version: Option<String>,
	#[serde(default)]
	pub current_vehicle: Option<String>,
	#[serde(default)]
	pub avatar_url: Option<String>,
}

impl PlayerInfo {
	/// Name if present and non-blank.
	pub fn known_name(&self) -> Option<&str> {
		self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_numeric_ids() {
		let p: PlayerInfo = serde_json::from_str(r#"{"name":"Alpha","id":12345,"game_version":"4.1"}"#).unwrap();
		assert_eq!(p.id.as_deref(), Some("12345"));
		assert_eq!(p.known_name(), Some("Alpha"));
		assert!(p.current_vehicle.is_none());
	}

	#[test]
	fn blank_name_is_unknown() {
		let p = PlayerInfo {
			name: Some("  ".into()),
			..PlayerInfo::default()
		};
		assert_eq!(p.known_name(), None);
	}
}
