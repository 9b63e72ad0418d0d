#![forbid(unsafe_code)]

//! Rewrites player names inside rendered event text into clickable references.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Bumped whenever [`LINK_RULES`] changes order or content.
pub const LINK_RULES_VERSION: u32 = 1;

/// Names the server uses for non-player actors.
pub const RESERVED_TOKENS: &[&str] = &["NPC", "PDC"];

/// CSS class carried by every player reference.
pub const PLAYER_LINK_CLASS: &str = "player-link";

/// One event phrasing and the capture holding the player name.
#[derive(Debug, Clone, Copy)]
pub struct LinkRule {
	pub name: &'static str,
	pub pattern: &'static str,
}

/// Applied in order, each over the output of the previous one.
pub const LINK_RULES: &[LinkRule] = &[
	LinkRule {
		name: "killed_by_with",
		pattern: r"(?:von|by) ([^\s]+) (?:mit|with)",
	},
	LinkRule {
		name: "pvp_kill",
		pattern: r"🎯 ([^\s]+) (?:mit|with)",
	},
	LinkRule {
		name: "destroyed_by",
		pattern: r"(?:durch|by) ([^\s]+)\)",
	},
	LinkRule {
		name: "respawn",
		pattern: r"🔄 ([^\s]+) (?:ist respawnt|respawned)",
	},
	LinkRule {
		name: "corpse",
		pattern: r"☠️ ([^\s]+)'s ",
	},
	LinkRule {
		name: "spotted",
		pattern: r"👁️ ([^\s]+) (?:wurde|spotted)",
	},
];

static COMPILED_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
	LINK_RULES
		.iter()
		.map(|rule| Regex::new(rule.pattern).expect("link rule pattern is valid"))
		.collect()
});

/// Escape text for embedding in markup or a quoted attribute.
pub fn escape_markup(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#039;"),
			other => out.push(other),
		}
	}
	out
}

/// Markup of a single player reference.
pub fn player_link(name: &str) -> String {
	let escaped = escape_markup(name);
	format!(
		"<a href=\"#\" class=\"{PLAYER_LINK_CLASS}\" data-player=\"{escaped}\">{escaped}</a>"
	)
}

pub fn is_reserved(name: &str) -> bool {
	RESERVED_TOKENS.contains(&name)
}

/// Wrap every recognised player name in `text` into a player reference.
pub fn linkify(text: &str) -> String {
	let mut result = text.to_string();
	for re in COMPILED_RULES.iter() {
		if !re.is_match(&result) {
			continue;
		}
		result = re
			.replace_all(&result, |caps: &Captures<'_>| {
				let whole = &caps[0];
				let name = &caps[1];
				if is_reserved(name) {
					return whole.to_string();
				}
				whole.replacen(name, &player_link(name), 1)
			})
			.into_owned();
	}
	result
}

/// Player names referenced in already linkified text, in order of appearance.
pub fn linked_players(markup: &str) -> Vec<String> {
	static LINK: LazyLock<Regex> = LazyLock::new(|| {
		Regex::new(r#"data-player="([^"]*)""#).expect("player link pattern is valid")
	});
	LINK.captures_iter(markup)
		.map(|c| unescape_markup(&c[1]))
		.collect()
}

/// Strip tags and undo [`escape_markup`], for plain-text consumers.
pub fn plain_text(markup: &str) -> String {
	static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));
	unescape_markup(&TAG.replace_all(markup, ""))
}

fn unescape_markup(text: &str) -> String {
	text.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"")
		.replace("&#039;", "'")
		.replace("&amp;", "&")
}
