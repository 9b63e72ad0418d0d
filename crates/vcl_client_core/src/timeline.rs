#![forbid(unsafe_code)]

//! Event Timeline Engine: bounded, newest-first buffer of rendered entries
//! with live elapsed-time labels for timer-bearing events.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::NaiveDateTime;
use vcl_domain::CombatEvent;

use crate::i18n::Translations;
use crate::linkify::linkify;

/// Hard capacity of the timeline buffer.
pub const TIMELINE_CAPACITY: usize = 50;

/// Period of the timer tick.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Identity of one rendered entry. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

impl SlotId {
	pub fn get(self) -> u64 {
		self.0
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
	pub slot: SlotId,
	pub kind: String,
	pub timestamp: NaiveDateTime,
	/// Templated and linkified text. Immutable once rendered.
	pub text: String,
	/// `[HH:MM:SS]` for plain entries, `(Ns)` for timer-bearing ones.
	pub time_label: String,
	pub timer_owner: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimerEntry {
	start: NaiveDateTime,
	slot: SlotId,
}

/// Result of [`Timeline::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushOutcome {
	pub slot: SlotId,
	pub evicted: Option<SlotId>,
}

/// New label of one timer slot after a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerLabel {
	pub slot: SlotId,
	pub label: String,
}

#[derive(Debug, Default)]
pub struct Timeline {
	entries: VecDeque<TimelineEntry>,
	timers: HashMap<String, TimerEntry>,
	next_slot: u64,
}

impl Timeline {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Entries, newest first.
	pub fn entries(&self) -> impl Iterator<Item = &TimelineEntry> {
		self.entries.iter()
	}

	pub fn get(&self, slot: SlotId) -> Option<&TimelineEntry> {
		self.entries.iter().find(|e| e.slot == slot)
	}

	pub fn live_timers(&self) -> usize {
		self.timers.len()
	}

	/// Slot currently annotated by `player`'s timer.
	pub fn timer_slot(&self, player: &str) -> Option<SlotId> {
		self.timers.get(player).map(|t| t.slot)
	}

	/// Render `event`, insert it at the head and evict the oldest entry past capacity.
	pub fn push(&mut self, event: &CombatEvent, translations: &Translations, now: NaiveDateTime) -> PushOutcome {
		let slot = SlotId(self.next_slot);
		self.next_slot += 1;

		let text = linkify(&translations.render_event(event));
		let owner = event.timer_owner().map(str::to_string);
		let time_label = match &owner {
			Some(player) => {
				let start = event.timer_origin();
				self.timers.insert(player.clone(), TimerEntry { start, slot });
				elapsed_label(start, now)
			}
			None => format!("[{}]", event.timestamp.format("%H:%M:%S")),
		};

		self.entries.push_front(TimelineEntry {
			slot,
			kind: event.kind.clone(),
			timestamp: event.timestamp,
			text,
			time_label,
			timer_owner: owner,
		});

		let mut evicted = None;
		while self.entries.len() > TIMELINE_CAPACITY {
			let Some(old) = self.entries.pop_back() else {
				break;
			};
			self.timers.retain(|_, t| t.slot != old.slot);
			evicted = Some(old.slot);
		}

		PushOutcome { slot, evicted }
	}

	/// Recompute every live timer label. Entry text is never touched.
	pub fn tick(&mut self, now: NaiveDateTime) -> Vec<TimerLabel> {
		let mut updates = Vec::with_capacity(self.timers.len());
		for timer in self.timers.values() {
			let label = elapsed_label(timer.start, now);
			if let Some(entry) = self.entries.iter_mut().find(|e| e.slot == timer.slot) {
				entry.time_label.clone_from(&label);
				updates.push(TimerLabel { slot: timer.slot, label });
			}
		}
		updates.sort_by_key(|u| u.slot);
		updates
	}

	/// Drop every entry and timer.
	pub fn clear(&mut self) {
		self.entries.clear();
		self.timers.clear();
	}
}

/// `(Ns)` for the whole seconds elapsed since `start`; never negative.
pub fn elapsed_label(start: NaiveDateTime, now: NaiveDateTime) -> String {
	let secs = (now - start).num_seconds().max(0);
	format!("({secs}s)")
}

#[cfg(test)]
mod tests {
	use chrono::TimeDelta;
	use proptest::prelude::*;
	use serde_json::json;

	use super::*;

	fn t0() -> NaiveDateTime {
		vcl_domain::parse_timestamp("2024-05-01T12:00:00").unwrap()
	}

	fn plain(n: usize) -> CombatEvent {
		CombatEvent::literal("kill", format!("event {n}"), t0())
	}

	fn timed(player: &str, start: NaiveDateTime) -> CombatEvent {
		CombatEvent::literal("respawn", format!("🔄 {player} respawned at Lorville"), start).with_timer(player, Some(start))
	}

	#[test]
	fn renders_plain_entry_with_clock_label() {
		let mut tl = Timeline::new();
		let params = json!({"victim": "Bravo", "weapon": "P4-AR"}).as_object().cloned().unwrap();
		let ev = CombatEvent::keyed("pvp_kill", "events.pvp_kill", params, t0() + TimeDelta::seconds(5));
		let out = tl.push(&ev, &Translations::bundled_or_fallback("en"), t0());

		let entry = tl.get(out.slot).unwrap();
		assert_eq!(entry.time_label, "[12:00:05]");
		assert!(entry.text.contains("data-player=\"Bravo\">Bravo</a> with P4-AR"));
		assert_eq!(out.evicted, None);
	}

	#[test]
	fn evicts_oldest_at_capacity() {
		let mut tl = Timeline::new();
		let tr = Translations::empty("de");
		let first = tl.push(&plain(0), &tr, t0()).slot;
		for n in 1..TIMELINE_CAPACITY {
			assert_eq!(tl.push(&plain(n), &tr, t0()).evicted, None);
		}
		assert_eq!(tl.len(), TIMELINE_CAPACITY);

		let out = tl.push(&plain(99), &tr, t0());
		assert_eq!(out.evicted, Some(first));
		assert_eq!(tl.len(), TIMELINE_CAPACITY);
		assert_eq!(tl.entries().next().unwrap().text, "event 99");
		assert_eq!(tl.entries().last().unwrap().text, "event 1");
	}

	#[test]
	fn same_player_timer_replaces_earlier() {
		let mut tl = Timeline::new();
		let tr = Translations::empty("de");
		let a = tl.push(&timed("Alpha", t0()), &tr, t0()).slot;
		let b = tl.push(&timed("Alpha", t0() + TimeDelta::seconds(3)), &tr, t0() + TimeDelta::seconds(3)).slot;

		assert_eq!(tl.live_timers(), 1);
		assert_eq!(tl.timer_slot("Alpha"), Some(b));

		let updates = tl.tick(t0() + TimeDelta::seconds(10));
		assert_eq!(updates, vec![TimerLabel { slot: b, label: "(7s)".into() }]);
		assert_eq!(tl.get(a).unwrap().time_label, "(0s)");
	}

	#[test]
	fn tick_only_touches_timer_label() {
		let mut tl = Timeline::new();
		let tr = Translations::empty("de");
		let slot = tl.push(&timed("Alpha", t0()), &tr, t0() + TimeDelta::seconds(2)).slot;
		let before = tl.get(slot).unwrap().clone();
		assert_eq!(before.time_label, "(2s)");

		tl.tick(t0() + TimeDelta::seconds(42));
		let after = tl.get(slot).unwrap();
		assert_eq!(after.time_label, "(42s)");
		assert_eq!(after.text, before.text);
	}

	#[test]
	fn future_start_renders_zero() {
		assert_eq!(elapsed_label(t0() + TimeDelta::seconds(30), t0()), "(0s)");
		assert_eq!(elapsed_label(t0(), t0() + TimeDelta::milliseconds(1999)), "(1s)");
	}

	#[test]
	fn timer_flag_without_owner_is_plain() {
		let mut tl = Timeline::new();
		let mut ev = plain(1);
		ev.with_timer = true;
		let slot = tl.push(&ev, &Translations::empty("de"), t0()).slot;
		assert_eq!(tl.live_timers(), 0);
		assert_eq!(tl.get(slot).unwrap().time_label, "[12:00:00]");
	}

	#[test]
	fn clear_drops_entries_and_timers() {
		let mut tl = Timeline::new();
		let tr = Translations::empty("de");
		tl.push(&timed("Alpha", t0()), &tr, t0());
		tl.push(&plain(1), &tr, t0());
		tl.clear();
		assert!(tl.is_empty());
		assert_eq!(tl.live_timers(), 0);
		assert!(tl.tick(t0()).is_empty());
	}

	proptest! {
		#[test]
		fn bounded_fifo_with_consistent_timers(owners in proptest::collection::vec(proptest::option::of(0u8..4), 0..160)) {
			let mut tl = Timeline::new();
			let tr = Translations::empty("de");
			let mut slots = Vec::new();
			for owner in &owners {
				let ev = match owner {
					Some(p) => timed(&format!("P{p}"), t0()),
					None => plain(slots.len()),
				};
				let out = tl.push(&ev, &tr, t0());
				slots.push(out.slot);
				prop_assert!(tl.len() <= TIMELINE_CAPACITY);
			}

			let expected: Vec<SlotId> = slots.iter().rev().take(TIMELINE_CAPACITY).copied().collect();
			let actual: Vec<SlotId> = tl.entries().map(|e| e.slot).collect();
			prop_assert_eq!(actual, expected);

			prop_assert!(tl.live_timers() <= 4);
			for p in 0u8..4 {
				if let Some(slot) = tl.timer_slot(&format!("P{p}")) {
					prop_assert!(tl.get(slot).is_some());
				}
			}
		}
	}
}
