#![forbid(unsafe_code)]

use std::cmp::Reverse;

use vcl_domain::{StatScope, StatSnapshot};

use crate::store::StreamStore;

/// One `label ... value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRow {
	pub label: String,
	pub value: String,
}

/// A PvP victim with the weapons used against them, grouped by display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VictimRow {
	pub name: String,
	pub kills: usize,
	pub weapons: String,
}

/// Display-ready rendering of one stat scope.
///
/// Every derived number is computed from the snapshot here; nothing derived is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsView {
	pub scope: StatScope,
	pub kills: String,
	pub deaths: String,
	pub kd_ratio: String,
	pub weapons: Vec<StatRow>,
	pub vehicles: Vec<StatRow>,
	/// Session scope only.
	pub victims: Vec<VictimRow>,
	/// Session scope only.
	pub killers: Vec<StatRow>,
	/// Session scope only.
	pub death_weapons: Vec<StatRow>,
}

impl StatsView {
	pub fn render(snapshot: &StatSnapshot, scope: StatScope, store: &StreamStore) -> Self {
		let total_kills = snapshot.total_kills();

		let weapons = sorted_desc(snapshot.weapon_kills.iter())
			.map(|(name, kills)| StatRow {
				label: store.weapon_display(name).to_string(),
				value: format!("{kills} ({}%)", share(kills, total_kills)),
			})
			.collect();

		let vehicles = sorted_desc(snapshot.vehicle_kills.iter())
			.map(|(name, kills)| StatRow {
				label: store.vehicle_display(name).to_string(),
				value: format!("{kills}x"),
			})
			.collect();

		let mut view = Self {
			scope,
			kills: format!("{total_kills} ({} PvP)", snapshot.pvp_kills),
			deaths: format!("{} ({} PvP)", snapshot.deaths, snapshot.pvp_deaths()),
			kd_ratio: format!("{:.2}", snapshot.kd_ratio()),
			weapons,
			vehicles,
			victims: Vec::new(),
			killers: Vec::new(),
			death_weapons: Vec::new(),
		};

		if scope == StatScope::Session {
			view.victims = snapshot
				.pvp_victims
				.iter()
				.map(|(victim, used)| VictimRow {
					name: victim.clone(),
					kills: used.len(),
					weapons: grouped_weapons(used, store),
				})
				.collect();

			view.killers = sorted_desc(snapshot.death_by_players.iter())
				.map(|(killer, n)| StatRow {
					label: killer.clone(),
					value: format!("{n}x"),
				})
				.collect();

			view.death_weapons = sorted_desc(snapshot.death_weapons.iter())
				.map(|(name, n)| StatRow {
					label: store.weapon_display(name).to_string(),
					value: format!("{n} ({}%)", share(n, snapshot.deaths)),
				})
				.collect();
		}

		view
	}
}

/// Entries by count, highest first; ties keep map order.
fn sorted_desc<'a>(entries: impl Iterator<Item = (&'a String, &'a u64)>) -> impl Iterator<Item = (&'a String, u64)> {
	let mut rows: Vec<(&String, u64)> = entries.map(|(k, v)| (k, *v)).collect();
	rows.sort_by_key(|(_, n)| Reverse(*n));
	rows.into_iter()
}

fn share(part: u64, whole: u64) -> String {
	if whole == 0 {
		return "0".to_string();
	}
	format!("{:.1}", part as f64 / whole as f64 * 100.0)
}

/// `"W1 (2x), W2 (1x)"` in order of first use.
fn grouped_weapons(used: &[String], store: &StreamStore) -> String {
	let mut groups: Vec<(&str, usize)> = Vec::new();
	for weapon in used {
		let display = store.weapon_display(weapon);
		match groups.iter_mut().find(|(name, _)| *name == display) {
			Some((_, count)) => *count += 1,
			None => groups.push((display, 1)),
		}
	}
	groups
		.iter()
		.map(|(name, count)| format!("{name} ({count}x)"))
		.collect::<Vec<_>>()
		.join(", ")
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use super::*;
	use crate::store::NameMappings;

	fn store() -> StreamStore {
		let mut names = NameMappings::default();
		names.weapons.insert("behr_rifle".into(), "P4-AR".into());
		names.weapons.insert("behr_rifle_mk2".into(), "P4-AR".into());
		names.vehicles.insert("AEGS_Gladius".into(), "Gladius".into());
		let mut store = StreamStore::default();
		store.set_names(names);
		store
	}

	fn snapshot() -> StatSnapshot {
		StatSnapshot {
			pve_kills: 1,
			pvp_kills: 3,
			deaths: 3,
			weapon_kills: BTreeMap::from([("behr_rifle".into(), 1), ("knife".into(), 3)]),
			pvp_victims: BTreeMap::from([(
				"Bravo".into(),
				vec!["behr_rifle".into(), "knife".into(), "behr_rifle_mk2".into()],
			)]),
			death_weapons: BTreeMap::from([("knife".into(), 2), ("behr_rifle".into(), 1)]),
			death_by_players: BTreeMap::from([("Charlie".into(), 1), ("Delta".into(), 2)]),
			vehicle_kills: BTreeMap::from([("AEGS_Gladius".into(), 2)]),
			..StatSnapshot::default()
		}
	}

	#[test]
	fn renders_session_scope() {
		let view = StatsView::render(&snapshot(), StatScope::Session, &store());
		assert_eq!(view.kills, "4 (3 PvP)");
		assert_eq!(view.deaths, "3 (3 PvP)");
		assert_eq!(view.kd_ratio, "1.33");
		assert_eq!(
			view.weapons,
			vec![
				StatRow {
					label: "knife".into(),
					value: "3 (75.0%)".into()
				},
				StatRow {
					label: "P4-AR".into(),
					value: "1 (25.0%)".into()
				},
			]
		);
		assert_eq!(view.vehicles[0].label, "Gladius");
		assert_eq!(view.vehicles[0].value, "2x");
		assert_eq!(
			view.victims,
			vec![VictimRow {
				name: "Bravo".into(),
				kills: 3,
				weapons: "P4-AR (2x), knife (1x)".into(),
			}]
		);
		assert_eq!(view.killers[0].label, "Delta");
		assert_eq!(view.death_weapons[0].value, "2 (66.7%)");
	}

	#[test]
	fn total_scope_skips_session_only_sections() {
		let view = StatsView::render(&snapshot(), StatScope::Total, &store());
		assert!(view.victims.is_empty());
		assert!(view.killers.is_empty());
		assert!(view.death_weapons.is_empty());
		assert_eq!(view.weapons.len(), 2);
	}

	#[test]
	fn zero_deaths_render_zero_ratio() {
		let view = StatsView::render(&StatSnapshot::default(), StatScope::Session, &StreamStore::default());
		assert_eq!(view.kills, "0 (0 PvP)");
		assert_eq!(view.kd_ratio, "0.00");
	}

	#[test]
	fn rendering_is_deterministic() {
		let s = snapshot();
		let st = store();
		assert_eq!(
			StatsView::render(&s, StatScope::Session, &st),
			StatsView::render(&s, StatScope::Session, &st)
		);
	}
}
