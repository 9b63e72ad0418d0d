#![forbid(unsafe_code)]

//! Request/response side of the dashboard: configuration, stats, display
//! names, player profiles and language tables.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use vcl_domain::{PlayerInfo, StatsBundle, StreamId};

use crate::ClientCoreError;
use crate::i18n::{FALLBACK_LANGUAGE, Translations};
use crate::store::NameMappings;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Public citizen page of a player.
pub fn citizen_profile_url(name: &str) -> String {
	format!("https://robertsspaceindustries.com/citizens/{}", urlencoding::encode(name))
}

/// `GET /api/config`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DashboardConfig {
	pub current_version: StreamId,
	#[serde(default)]
	pub player_info: PlayerInfo,
	#[serde(default)]
	pub versions: Vec<StreamId>,
	#[serde(default)]
	pub language: Option<String>,
	#[serde(default)]
	pub log_paths: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EncounterTally {
	#[serde(default)]
	pub total: u64,
	#[serde(default)]
	pub weapons: BTreeMap<String, u64>,
}

/// What the local player knows about another player on one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlayerEncounter {
	#[serde(default)]
	pub kills_by_me: EncounterTally,
	#[serde(default)]
	pub deaths_by_them: EncounterTally,
	#[serde(default)]
	pub my_vehicles_destroyed_by_them: BTreeMap<String, u64>,
	#[serde(default)]
	pub first_encounter: Option<String>,
	#[serde(default)]
	pub last_encounter: Option<String>,
	#[serde(default)]
	pub avatar_url: Option<String>,
}

impl PlayerEncounter {
	/// Kills per death to two decimals, or the plain kill count without deaths.
	pub fn kd_label(&self) -> String {
		let kills = self.kills_by_me.total;
		let deaths = self.deaths_by_them.total;
		if deaths == 0 {
			return kills.to_string();
		}
		format!("{:.2}", kills as f64 / deaths as f64)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CitizenOrg {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub logo: Option<String>,
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub redacted: bool,
	#[serde(default)]
	pub no_org: bool,
}

/// Public profile data of a player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CitizenProfile {
	#[serde(default)]
	pub moniker: Option<String>,
	#[serde(default)]
	pub avatar: Option<String>,
	#[serde(default)]
	pub org: Option<CitizenOrg>,
}

/// Result of activating a player reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerProfile {
	/// Known player: encounter stats plus public profile, if reachable.
	Full {
		name: String,
		encounter: PlayerEncounter,
		citizen: Option<CitizenProfile>,
	},
	/// Unknown player, or the lookup failed.
	Light {
		name: String,
		citizen: Option<CitizenProfile>,
		profile_url: String,
	},
}

impl PlayerProfile {
	pub fn name(&self) -> &str {
		match self {
			PlayerProfile::Full { name, .. } | PlayerProfile::Light { name, .. } => name,
		}
	}

	pub fn avatar(&self) -> Option<&str> {
		match self {
			PlayerProfile::Full { encounter, citizen, .. } => encounter
				.avatar_url
				.as_deref()
				.or_else(|| citizen.as_ref().and_then(|c| c.avatar.as_deref())),
			PlayerProfile::Light { citizen, .. } => citizen.as_ref().and_then(|c| c.avatar.as_deref()),
		}
	}
}

/// The dashboard's request/response endpoints.
#[async_trait]
pub trait DashboardApi: Send + Sync {
	async fn fetch_config(&self) -> Result<DashboardConfig, ClientCoreError>;

	async fn set_active_stream(&self, stream: &StreamId) -> Result<(), ClientCoreError>;

	async fn fetch_stats(&self, stream: &StreamId) -> Result<StatsBundle, ClientCoreError>;

	async fn reset_session(&self, stream: &StreamId, remove_from_total: bool) -> Result<(), ClientCoreError>;

	async fn fetch_name_mappings(&self) -> Result<NameMappings, ClientCoreError>;

	/// Avatar URL of `name`, `None` if the player has none.
	async fn fetch_avatar(&self, stream: &StreamId, name: &str) -> Result<Option<String>, ClientCoreError>;

	async fn fetch_known_players(&self, stream: &StreamId) -> Result<BTreeMap<String, PlayerEncounter>, ClientCoreError>;

	async fn fetch_citizen_profile(&self, stream: &StreamId, name: &str) -> Result<CitizenProfile, ClientCoreError>;

	async fn set_language(&self, language: &str) -> Result<(), ClientCoreError>;

	async fn fetch_language_table(&self, language: &str) -> Result<Value, ClientCoreError>;
}

/// [`DashboardApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDashboardApi {
	base_url: String,
	client: reqwest::Client,
}

#[derive(Serialize)]
struct VersionBody<'a> {
	version: &'a str,
}

#[derive(Serialize)]
struct ResetBody {
	remove_from_total: bool,
}

#[derive(Serialize)]
struct LanguageBody<'a> {
	language: &'a str,
}

#[derive(Deserialize)]
struct WeaponsResponse {
	#[serde(default)]
	weapons: HashMap<String, String>,
}

#[derive(Deserialize)]
struct VehiclesResponse {
	#[serde(default)]
	vehicles: HashMap<String, String>,
}

#[derive(Deserialize)]
struct AvatarResponse {
	#[serde(default)]
	success: bool,
	#[serde(default)]
	avatar: Option<String>,
}

#[derive(Deserialize)]
struct PlayersResponse {
	#[serde(default)]
	players: BTreeMap<String, PlayerEncounter>,
}

impl HttpDashboardApi {
	pub fn new(base_url: impl Into<String>) -> Result<Self, ClientCoreError> {
		let client = reqwest::Client::builder()
			.user_agent(concat!("vcl-client/", env!("CARGO_PKG_VERSION")))
			.timeout(REQUEST_TIMEOUT)
			.build()
			.context("build reqwest client")?;
		Ok(Self {
			base_url: base_url.into(),
			client,
		})
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url.trim_end_matches('/'), path)
	}

	async fn get_json<T: DeserializeOwned>(&self, path: &str, label: &'static str) -> anyhow::Result<T> {
		let resp = self.client.get(self.url(path)).send().await.context(label)?;
		let status = resp.status();
		if !status.is_success() {
			return Err(anyhow!("{label} failed: status={status}"));
		}
		resp.json::<T>().await.with_context(|| format!("{label} decode"))
	}

	async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B, label: &'static str) -> anyhow::Result<()> {
		let resp = self.client.post(self.url(path)).json(body).send().await.context(label)?;
		match resp.status() {
			s if s.is_success() => Ok(()),
			status => Err(anyhow!("{label} failed: status={status}")),
		}
	}
}

fn api_err(e: anyhow::Error) -> ClientCoreError {
	ClientCoreError::Api(format!("{e:#}"))
}

fn seg(s: &str) -> String {
	urlencoding::encode(s).into_owned()
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
	async fn fetch_config(&self) -> Result<DashboardConfig, ClientCoreError> {
		self.get_json("/api/config", "fetch config").await.map_err(api_err)
	}

	async fn set_active_stream(&self, stream: &StreamId) -> Result<(), ClientCoreError> {
		self.post_json("/api/config/version", &VersionBody { version: stream.as_str() }, "switch version")
			.await
			.map_err(api_err)
	}

	async fn fetch_stats(&self, stream: &StreamId) -> Result<StatsBundle, ClientCoreError> {
		self.get_json(&format!("/api/stats/{}", seg(stream.as_str())), "fetch stats")
			.await
			.map_err(api_err)
	}

	async fn reset_session(&self, stream: &StreamId, remove_from_total: bool) -> Result<(), ClientCoreError> {
		self.post_json(
			&format!("/api/stats/{}/reset_session", seg(stream.as_str())),
			&ResetBody { remove_from_total },
			"reset session",
		)
		.await
		.map_err(api_err)
	}

	async fn fetch_name_mappings(&self) -> Result<NameMappings, ClientCoreError> {
		let weapons: WeaponsResponse = self.get_json("/api/weapons", "fetch weapons").await.map_err(api_err)?;
		let vehicles: VehiclesResponse = self.get_json("/api/vehicles", "fetch vehicles").await.map_err(api_err)?;
		Ok(NameMappings {
			weapons: weapons.weapons,
			vehicles: vehicles.vehicles,
		})
	}

	async fn fetch_avatar(&self, stream: &StreamId, name: &str) -> Result<Option<String>, ClientCoreError> {
		let path = format!("/api/player/avatar/{}?version={}", seg(name), seg(stream.as_str()));
		let resp = self
			.client
			.get(self.url(&path))
			.send()
			.await
			.context("fetch avatar")
			.map_err(api_err)?;
		match resp.status() {
			StatusCode::NOT_FOUND => return Ok(None),
			s if !s.is_success() => return Err(ClientCoreError::Api(format!("fetch avatar failed: status={s}"))),
			_ => {}
		}
		let body: AvatarResponse = resp.json().await.context("fetch avatar decode").map_err(api_err)?;
		Ok(body.avatar.filter(|a| body.success && !a.is_empty()))
	}

	async fn fetch_known_players(&self, stream: &StreamId) -> Result<BTreeMap<String, PlayerEncounter>, ClientCoreError> {
		let body: PlayersResponse = self
			.get_json(&format!("/api/players/{}", seg(stream.as_str())), "fetch players")
			.await
			.map_err(api_err)?;
		Ok(body.players)
	}

	async fn fetch_citizen_profile(&self, stream: &StreamId, name: &str) -> Result<CitizenProfile, ClientCoreError> {
		self.get_json(
			&format!("/api/player/profile/{}?version={}", seg(name), seg(stream.as_str())),
			"fetch profile",
		)
		.await
		.map_err(api_err)
	}

	async fn set_language(&self, language: &str) -> Result<(), ClientCoreError> {
		self.post_json("/api/config/language", &LanguageBody { language }, "set language")
			.await
			.map_err(api_err)
	}

	async fn fetch_language_table(&self, language: &str) -> Result<Value, ClientCoreError> {
		self.get_json(&format!("/static/lang/{}.json", seg(language)), "fetch language")
			.await
			.map_err(api_err)
	}
}

/// Resolve what activating a reference to `name` opens. Never fails.
pub async fn lookup_player(api: &dyn DashboardApi, stream: &StreamId, name: &str) -> PlayerProfile {
	let known = match api.fetch_known_players(stream).await {
		Ok(mut players) => players.remove(name),
		Err(e) => {
			warn!(%stream, player = %name, error = %e, "player lookup failed; opening light profile");
			None
		}
	};

	let citizen = match api.fetch_citizen_profile(stream, name).await {
		Ok(p) => Some(p),
		Err(e) => {
			debug!(player = %name, error = %e, "public profile unavailable");
			None
		}
	};

	match known {
		Some(encounter) => PlayerProfile::Full {
			name: name.to_string(),
			encounter,
			citizen,
		},
		None => PlayerProfile::Light {
			name: name.to_string(),
			citizen,
			profile_url: citizen_profile_url(name),
		},
	}
}

/// Load the table for `language`, then the fallback language, then the bundled copy.
pub async fn load_translations(api: &dyn DashboardApi, language: &str) -> Translations {
	match api.fetch_language_table(language).await {
		Ok(tree) => return Translations::from_value(language, tree),
		Err(e) => warn!(%language, error = %e, "language table unavailable"),
	}
	if language != FALLBACK_LANGUAGE {
		match api.fetch_language_table(FALLBACK_LANGUAGE).await {
			Ok(tree) => return Translations::from_value(FALLBACK_LANGUAGE, tree),
			Err(e) => warn!(language = FALLBACK_LANGUAGE, error = %e, "fallback language table unavailable"),
		}
	}
	Translations::bundled_or_fallback(language)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decodes_dashboard_config() {
		let raw = r#"{
			"versions": ["LIVE", "PTU"],
			"current_version": "LIVE",
			"log_paths": {"LIVE": "C:/Games/LIVE/Game.log"},
			"player_info": {"name": "Alpha", "id": 42},
			"language": "en"
		}"#;
		let cfg: DashboardConfig = serde_json::from_str(raw).unwrap();
		assert_eq!(cfg.current_version.as_str(), "LIVE");
		assert_eq!(cfg.versions.len(), 2);
		assert_eq!(cfg.player_info.id.as_deref(), Some("42"));
		assert_eq!(cfg.language.as_deref(), Some("en"));
	}

	#[test]
	fn encounter_kd_label() {
		let mut e: PlayerEncounter =
			serde_json::from_str(r#"{"kills_by_me":{"total":5,"weapons":{"P4-AR":5}},"deaths_by_them":{"total":2}}"#)
				.unwrap();
		assert_eq!(e.kd_label(), "2.50");
		e.deaths_by_them.total = 0;
		assert_eq!(e.kd_label(), "5");
	}

	#[test]
	fn profile_url_is_encoded() {
		assert_eq!(
			citizen_profile_url("Some Name"),
			"https://robertsspaceindustries.com/citizens/Some%20Name"
		);
	}

	#[test]
	fn full_profile_prefers_encounter_avatar() {
		let p = PlayerProfile::Full {
			name: "Bravo".into(),
			encounter: PlayerEncounter {
				avatar_url: Some("db.png".into()),
				..PlayerEncounter::default()
			},
			citizen: Some(CitizenProfile {
				avatar: Some("rsi.png".into()),
				..CitizenProfile::default()
			}),
		};
		assert_eq!(p.avatar(), Some("db.png"));
		assert_eq!(p.name(), "Bravo");
	}
}
