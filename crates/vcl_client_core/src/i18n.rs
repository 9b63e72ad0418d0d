#![forbid(unsafe_code)]

use rust_embed::RustEmbed;
use serde_json::Value;
use tracing::{debug, warn};
use vcl_domain::{CombatEvent, EventParams};

use crate::ClientCoreError;

/// Language every other table falls back to.
pub const FALLBACK_LANGUAGE: &str = "de";

#[derive(RustEmbed)]
#[folder = "locales"]
#[include = "*.json"]
struct BundledLocales;

/// A loaded translation tree for one language.
///
/// Lookups never fail: a missing or non-text node resolves to the key itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Translations {
	language: String,
	tree: Value,
}

impl Default for Translations {
	fn default() -> Self {
		Self::empty(FALLBACK_LANGUAGE)
	}
}

impl Translations {
	pub fn empty(language: impl Into<String>) -> Self {
		Self {
			language: language.into(),
			tree: Value::Object(Default::default()),
		}
	}

	pub fn from_value(language: impl Into<String>, tree: Value) -> Self {
		Self {
			language: language.into(),
			tree,
		}
	}

	pub fn from_json_str(language: impl Into<String>, raw: &str) -> Result<Self, ClientCoreError> {
		let language = language.into();
		let tree: Value = serde_json::from_str(raw)
			.map_err(|e| ClientCoreError::Protocol(format!("invalid language table '{language}': {e}")))?;
		Ok(Self { language, tree })
	}

	/// Table shipped inside the binary, if one exists for `language`.
	pub fn bundled(language: &str) -> Option<Self> {
		let file = BundledLocales::get(&format!("{language}.json"))?;
		let raw = String::from_utf8_lossy(&file.data);
		match Self::from_json_str(language, &raw) {
			Ok(t) => Some(t),
			Err(e) => {
				warn!(%language, error = %e, "bundled language table is invalid");
				None
			}
		}
	}

	/// Bundled table for `language`, else the bundled fallback language, else empty.
	pub fn bundled_or_fallback(language: &str) -> Self {
		Self::bundled(language)
			.or_else(|| Self::bundled(FALLBACK_LANGUAGE))
			.unwrap_or_else(|| Self::empty(language))
	}

	pub fn language(&self) -> &str {
		&self.language
	}

	/// Raw text stored under a dotted key path.
	pub fn lookup(&self, key: &str) -> Option<&str> {
		let mut node = &self.tree;
		for segment in key.split('.') {
			node = node.get(segment)?;
		}
		node.as_str().filter(|s| !s.is_empty())
	}

	/// Resolve `key` and substitute `{name}` placeholders from `params`.
	pub fn resolve(&self, key: &str, params: &EventParams) -> String {
		match self.lookup(key) {
			Some(text) => substitute(text, params),
			None => {
				debug!(%key, language = %self.language, "translation missing; using key");
				key.to_string()
			}
		}
	}

	/// Resolve a key without parameters.
	pub fn text(&self, key: &str) -> String {
		self.resolve(key, &EventParams::new())
	}

	/// Display text of a combat event before linkification.
	///
	/// Keyed events go through the table; events without a key use their literal message.
	pub fn render_event(&self, event: &CombatEvent) -> String {
		match event.message_key.as_deref().filter(|k| !k.is_empty()) {
			Some(key) => self.resolve(key, &event.params),
			None => event.message.clone().unwrap_or_default(),
		}
	}
}

/// String form of a template parameter.
pub fn param_text(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Null => "null".to_string(),
		other => other.to_string(),
	}
}

/// Replace every `{name}` in `template` whose `name` is a key of `params`.
///
/// Unknown placeholders stay verbatim. Substituted values are not rescanned.
pub fn substitute(template: &str, params: &EventParams) -> String {
	if params.is_empty() {
		return template.to_string();
	}

	let mut out = String::with_capacity(template.len());
	let mut rest = template;
	while let Some(open) = rest.find('{') {
		out.push_str(&rest[..open]);
		let after = &rest[open + 1..];
		match after.find('}') {
			Some(close) => {
				let name = &after[..close];
				match params.get(name) {
					Some(v) => {
						out.push_str(&param_text(v));
						rest = &after[close + 1..];
					}
					None => {
						out.push('{');
						rest = after;
					}
				}
			}
			None => {
				out.push_str(&rest[open..]);
				rest = "";
			}
		}
	}
	out.push_str(rest);
	out
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn params(v: Value) -> EventParams {
		v.as_object().cloned().unwrap_or_default()
	}

	#[test]
	fn resolves_nested_key_with_params() {
		let t = Translations::from_value("de", json!({"a": {"b": "val {n}"}}));
		assert_eq!(t.resolve("a.b", &params(json!({"n": "5"}))), "val 5");
	}

	#[test]
	fn missing_key_falls_back_to_key() {
		let t = Translations::from_value("de", json!({"a": {"b": "x"}}));
		assert_eq!(t.resolve("a.c", &EventParams::new()), "a.c");
		assert_eq!(t.resolve("a", &EventParams::new()), "a");
		assert_eq!(t.text("nope.deeper.still"), "nope.deeper.still");
	}

	#[test]
	fn empty_text_counts_as_missing() {
		let t = Translations::from_value("de", json!({"a": ""}));
		assert_eq!(t.text("a"), "a");
	}

	#[test]
	fn unmatched_placeholders_stay_verbatim() {
		let p = params(json!({"killer": "Bravo"}));
		assert_eq!(substitute("{killer} mit {weapon} {", &p), "Bravo mit {weapon} {");
		assert_eq!(substitute("{{killer}}", &p), "{Bravo}");
	}

	#[test]
	fn every_occurrence_is_replaced_once() {
		let p = params(json!({"a": "{b}", "b": "x", "n": 3, "z": null}));
		assert_eq!(substitute("{a}{a} {b} {n} {z}", &p), "{b}{b} x 3 null");
	}

	#[test]
	fn legacy_event_uses_literal_message() {
		let t = Translations::bundled_or_fallback("de");
		let ts = vcl_domain::parse_timestamp("2024-05-01T12:00:00").unwrap();
		let ev = CombatEvent::literal("server", "🔄 Server-Swap erkannt", ts);
		assert_eq!(t.render_event(&ev), "🔄 Server-Swap erkannt");

		let ev = CombatEvent::keyed("pvp_kill", "events.pvp_kill", params(json!({"victim": "Bravo", "weapon": "P4-AR"})), ts);
		assert_eq!(t.render_event(&ev), "🎯 Bravo mit P4-AR");
	}

	#[test]
	fn bundled_tables_cover_status_keys() {
		for lang in ["de", "en"] {
			let t = Translations::bundled(lang).expect("bundled table");
			for key in ["status.disconnected", "status.monitoring", "status.waiting", "loading.checking_updates"] {
				assert!(t.lookup(key).is_some(), "{lang} missing {key}");
			}
		}
		assert!(Translations::bundled("xx").is_none());
		assert_eq!(Translations::bundled_or_fallback("xx").language(), "de");
	}
}
