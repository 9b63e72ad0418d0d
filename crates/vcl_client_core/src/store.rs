#![forbid(unsafe_code)]

use std::collections::HashMap;

use tracing::debug;
use vcl_domain::{PlayerInfo, StreamId};
use vcl_protocol::ConfigUpdate;

/// Display-name tables served by the dashboard (internal name -> display name).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMappings {
	pub weapons: HashMap<String, String>,
	pub vehicles: HashMap<String, String>,
}

/// Stream State Store: active stream, player info and display-name caches.
///
/// Reads are synchronous and return the last applied value.
#[derive(Debug, Clone, Default)]
pub struct StreamStore {
	active: Option<StreamId>,
	streams: Vec<StreamId>,
	player: PlayerInfo,
	names: NameMappings,
}

impl StreamStore {
	pub fn new(initial: Option<StreamId>) -> Self {
		Self {
			active: initial,
			..Self::default()
		}
	}

	pub fn active(&self) -> Option<&StreamId> {
		self.active.as_ref()
	}

	pub fn is_active(&self, stream: &StreamId) -> bool {
		self.active.as_ref() == Some(stream)
	}

	/// Streams the server offers, as last announced.
	pub fn streams(&self) -> &[StreamId] {
		&self.streams
	}

	pub fn player(&self) -> &PlayerInfo {
		&self.player
	}

	pub fn names(&self) -> &NameMappings {
		&self.names
	}

	/// Make `stream` the active one. Returns `false` if it already was.
	pub fn set_active(&mut self, stream: StreamId) -> bool {
		if self.is_active(&stream) {
			return false;
		}
		debug!(from = ?self.active.as_ref().map(|s| s.as_str()), to = %stream, "active stream changed");
		self.active = Some(stream);
		true
	}

	/// Apply an authoritative configuration push.
	///
	/// Player info is replaced wholesale. Returns `true` if the active stream changed.
	pub fn apply_config(&mut self, update: ConfigUpdate) -> bool {
		let ConfigUpdate {
			current_version,
			player_info,
			versions,
		} = update;
		if !versions.is_empty() {
			self.streams = versions;
		}
		self.player = player_info;
		self.set_active(current_version)
	}

	/// Replace player info wholesale.
	pub fn replace_player(&mut self, info: PlayerInfo) {
		self.player = info;
	}

	/// Cache a fetched avatar, only if the player it was fetched for is still current.
	pub fn cache_avatar(&mut self, player_name: &str, url: String) -> bool {
		if self.player.known_name() != Some(player_name) {
			return false;
		}
		self.player.avatar_url = Some(url);
		true
	}

	pub fn set_names(&mut self, names: NameMappings) {
		debug!(
			weapons = names.weapons.len(),
			vehicles = names.vehicles.len(),
			"display names loaded"
		);
		self.names = names;
	}

	/// Display name of a weapon, falling back to its internal name.
	pub fn weapon_display<'a>(&'a self, internal: &'a str) -> &'a str {
		self.names
			.weapons
			.get(internal)
			.map(String::as_str)
			.filter(|s| !s.is_empty())
			.unwrap_or(internal)
	}

	/// Display name of a vehicle, falling back to its internal name.
	pub fn vehicle_display<'a>(&'a self, internal: &'a str) -> &'a str {
		self.names
			.vehicles
			.get(internal)
			.map(String::as_str)
			.filter(|s| !s.is_empty())
			.unwrap_or(internal)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn id(s: &str) -> StreamId {
		StreamId::new(s).unwrap()
	}

	#[test]
	fn config_replaces_player_and_active() {
		let mut store = StreamStore::new(Some(id("LIVE")));
		store.replace_player(PlayerInfo {
			name: Some("Alpha".into()),
			avatar_url: Some("a.png".into()),
			..PlayerInfo::default()
		});

		let changed = store.apply_config(ConfigUpdate {
			current_version: id("PTU"),
			player_info: PlayerInfo {
				name: Some("Bravo".into()),
				..PlayerInfo::default()
			},
			versions: vec![id("LIVE"), id("PTU")],
		});

		assert!(changed);
		assert!(store.is_active(&id("PTU")));
		assert_eq!(store.player().known_name(), Some("Bravo"));
		assert!(store.player().avatar_url.is_none());
		assert_eq!(store.streams().len(), 2);
	}

	#[test]
	fn set_active_reports_no_change_for_same_stream() {
		let mut store = StreamStore::new(None);
		assert!(store.set_active(id("LIVE")));
		assert!(!store.set_active(id("LIVE")));
	}

	#[test]
	fn avatar_is_cached_only_for_current_player() {
		let mut store = StreamStore::default();
		store.replace_player(PlayerInfo {
			name: Some("Alpha".into()),
			..PlayerInfo::default()
		});
		assert!(!store.cache_avatar("Bravo", "b.png".into()));
		assert!(store.cache_avatar("Alpha", "a.png".into()));
		assert_eq!(store.player().avatar_url.as_deref(), Some("a.png"));
	}

	#[test]
	fn display_names_fall_back_to_internal() {
		let mut store = StreamStore::default();
		let mut names = NameMappings::default();
		names.weapons.insert("behr_rifle_ballistic_01".into(), "P4-AR".into());
		names.vehicles.insert("AEGS_Gladius".into(), String::new());
		store.set_names(names);

		assert_eq!(store.weapon_display("behr_rifle_ballistic_01"), "P4-AR");
		assert_eq!(store.weapon_display("unknown_gun"), "unknown_gun");
		assert_eq!(store.vehicle_display("AEGS_Gladius"), "AEGS_Gladius");
	}
}
