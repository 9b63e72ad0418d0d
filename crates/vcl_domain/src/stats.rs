use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Kill/death counters for one scope of one stream.
///
/// Only raw counters are kept. Ratios and totals are derived on demand so a
/// snapshot always renders the same numbers; server-side derived fields such
/// as `kd_ratio` are ignored on decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatSnapshot {
	pub session_id: Option<String>,
	pub pve_kills: u64,
	pub pvp_kills: u64,
	pub deaths: u64,
	/// weapon -> kills
	pub weapon_kills: BTreeMap<String, u64>,
	/// victim -> weapons used, one entry per kill
	pub pvp_victims: BTreeMap<String, Vec<String>>,
	/// weapon -> own deaths
	pub death_weapons: BTreeMap<String, u64>,
	/// killer -> own deaths
	pub death_by_players: BTreeMap<String, u64>,
	/// vehicle -> destroyed
	pub vehicle_kills: BTreeMap<String, u64>,
	/// player -> (vehicle -> lost)
	pub vehicle_losses_by_player: BTreeMap<String, BTreeMap<String, u64>>,
}

impl StatSnapshot {
	pub fn total_kills(&self) -> u64 {
		self.pve_kills.saturating_add(self.pvp_kills)
	}

	/// Deaths attributed to another player.
	pub fn pvp_deaths(&self) -> u64 {
		self.death_by_players.values().fold(0u64, |acc, n| acc.saturating_add(*n))
	}

	/// Kills per death; `0.0` when there are no deaths.
	pub fn kd_ratio(&self) -> f64 {
		if self.deaths == 0 {
			return 0.0;
		}
		self.total_kills() as f64 / self.deaths as f64
	}

	pub fn is_empty(&self) -> bool {
		self.total_kills() == 0 && self.deaths == 0 && self.vehicle_kills.is_empty()
	}
}

/// Which half of a [`StatsBundle`] to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatScope {
	Session,
	Total,
}

impl StatScope {
	pub const fn as_str(self) -> &'static str {
		match self {
			StatScope::Session => "session",
			StatScope::Total => "total",
		}
	}
}

/// Session and cumulative snapshots for one stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsBundle {
	#[serde(default)]
	pub session: StatSnapshot,
	#[serde(default)]
	pub total: StatSnapshot,
	#[serde(default, deserialize_with = "crate::event::de_opt_timestamp")]
	pub session_start: Option<NaiveDateTime>,
	#[serde(default)]
	pub session_id: Option<String>,
}

impl StatsBundle {
	pub fn scope(&self, scope: StatScope) -> &StatSnapshot {
		match scope {
			StatScope::Session => &self.session,
			StatScope::Total => &self.total,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn derived_numbers_come_from_counters() {
		let mut s = StatSnapshot {
			pve_kills: 3,
			pvp_kills: 4,
			deaths: 2,
			..StatSnapshot::default()
		};
		s.death_by_players.insert("Bravo".into(), 1);
		assert_eq!(s.total_kills(), 7);
		assert_eq!(s.pvp_deaths(), 1);
		assert!((s.kd_ratio() - 3.5).abs() < f64::EPSILON);
	}

	#[test]
	fn kd_is_zero_without_deaths() {
		let s = StatSnapshot {
			pvp_kills: 9,
			..StatSnapshot::default()
		};
		assert_eq!(s.kd_ratio(), 0.0);
	}

	#[test]
	fn server_derived_fields_are_ignored() {
		let raw = r#"{
			"session": {"pvp_kills": 2, "deaths": 1, "kd_ratio": 99.0, "total_kills": 1000,
				"weapon_kills": {"Arrowhead": 2}},
			"total": {},
			"session_start": "2024-05-01T12:00:00.123456",
			"session_id": "abc"
		}"#;
		let b: StatsBundle = serde_json::from_str(raw).unwrap();
		assert_eq!(b.session.total_kills(), 2);
		assert_eq!(b.scope(StatScope::Session).weapon_kills.get("Arrowhead"), Some(&2));
		assert!(b.total.is_empty());
		assert!(b.session_start.is_some());
		assert_eq!(b.session_id.as_deref(), Some("abc"));
	}
}
