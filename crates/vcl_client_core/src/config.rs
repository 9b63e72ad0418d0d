#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, anyhow};
use serde::Deserialize;
use tracing::info;
use vcl_domain::StreamId;
use vcl_protocol::DEFAULT_MAX_FRAME_SIZE;
use vcl_util::endpoint::ServerEndpoint;

pub const DEFAULT_SERVER_ENDPOINT: &str = "ws://127.0.0.1:5000/ws";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default config path: `<config_dir>/verse-combat-log/client.toml`.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
	let base = dirs::config_dir()
		.or_else(|| dirs::home_dir().map(|h| h.join(".config")))
		.ok_or_else(|| anyhow!("could not determine config directory"))?;
	Ok(base.join("verse-combat-log").join("client.toml"))
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
	pub server_endpoint: String,
	/// UI language. `None` follows the server's setting.
	pub language: Option<String>,
	/// Stream to start on before the server configuration arrives.
	pub initial_stream: Option<StreamId>,
	pub connect_timeout: Duration,
	pub max_frame_bytes: usize,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			server_endpoint: DEFAULT_SERVER_ENDPOINT.to_string(),
			language: None,
			initial_stream: None,
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
			max_frame_bytes: DEFAULT_MAX_FRAME_SIZE,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
	server_endpoint: Option<String>,
	language: Option<String>,
	initial_stream: Option<String>,
	connect_timeout_ms: Option<u64>,
	max_frame_bytes: Option<usize>,
}

impl ClientConfig {
	/// Defaults, then the default config file, then the process environment.
	pub fn load() -> anyhow::Result<Self> {
		let path = default_config_path()?;
		Self::load_from_path(&path, |key| std::env::var(key).ok())
	}

	/// Same as [`ClientConfig::load`] with an explicit path and env lookup.
	pub fn load_from_path(path: &Path, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
		let file_cfg = read_toml_if_exists(path)
			.with_context(|| format!("read config from {}", path.display()))?
			.unwrap_or_default();

		let mut cfg = Self::from_file(file_cfg)?;
		cfg.apply_env_overrides(env)?;
		Ok(cfg)
	}

	fn from_file(file: FileConfig) -> anyhow::Result<Self> {
		let defaults = Self::default();
		let initial_stream = match file.initial_stream.filter(|s| !s.trim().is_empty()) {
			Some(s) => Some(StreamId::new(s.trim()).context("initial_stream")?),
			None => None,
		};
		Ok(Self {
			server_endpoint: file
				.server_endpoint
				.filter(|s| !s.trim().is_empty())
				.unwrap_or(defaults.server_endpoint),
			language: file.language.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
			initial_stream,
			connect_timeout: file
				.connect_timeout_ms
				.filter(|ms| *ms > 0)
				.map(Duration::from_millis)
				.unwrap_or(defaults.connect_timeout),
			max_frame_bytes: file
				.max_frame_bytes
				.filter(|n| *n > 0)
				.unwrap_or(defaults.max_frame_bytes),
		})
	}

	fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
		if let Some(v) = env("VCL_SERVER_ENDPOINT") {
			let v = v.trim().to_string();
			if !v.is_empty() {
				self.server_endpoint = v;
				info!("client config: server_endpoint overridden by env");
			}
		}

		if let Some(v) = env("VCL_LANGUAGE") {
			let v = v.trim().to_string();
			if !v.is_empty() {
				self.language = Some(v);
				info!("client config: language overridden by env");
			}
		}

		if let Some(v) = env("VCL_STREAM") {
			let v = v.trim();
			if !v.is_empty() {
				self.initial_stream = Some(StreamId::new(v).context("VCL_STREAM")?);
				info!("client config: initial_stream overridden by env");
			}
		}

		if let Some(v) = env("VCL_CONNECT_TIMEOUT_MS")
			&& let Ok(ms) = v.trim().parse::<u64>()
			&& ms > 0
		{
			self.connect_timeout = Duration::from_millis(ms);
			info!(ms, "client config: connect_timeout overridden by env");
		}

		Ok(())
	}

	/// Parsed and validated server endpoint.
	pub fn endpoint(&self) -> Result<ServerEndpoint, String> {
		ServerEndpoint::parse(&self.server_endpoint)
	}
}

fn read_toml_if_exists(path: &Path) -> anyhow::Result<Option<FileConfig>> {
	match fs::read_to_string(path) {
		Ok(s) => {
			let cfg: FileConfig = toml::from_str(&s).context("parse TOML")?;
			Ok(Some(cfg))
		}
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(anyhow!(e).context("read config file")),
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;
	use std::io::Write;

	use super::*;

	fn no_env(_: &str) -> Option<String> {
		None
	}

	#[test]
	fn missing_file_yields_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let cfg = ClientConfig::load_from_path(&dir.path().join("client.toml"), no_env).unwrap();
		assert_eq!(cfg.server_endpoint, DEFAULT_SERVER_ENDPOINT);
		assert_eq!(cfg.language, None);
		assert_eq!(cfg.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
		assert_eq!(cfg.max_frame_bytes, DEFAULT_MAX_FRAME_SIZE);
	}

	#[test]
	fn file_then_env_overrides() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			"server_endpoint = \"ws://dash.local:8080/ws\"\nlanguage = \"en\"\ninitial_stream = \"PTU\"\nconnect_timeout_ms = 500"
		)
		.unwrap();

		let env: HashMap<&str, &str> = HashMap::from([("VCL_LANGUAGE", "de"), ("VCL_CONNECT_TIMEOUT_MS", "nope")]);
		let cfg = ClientConfig::load_from_path(file.path(), |k| env.get(k).map(|v| v.to_string())).unwrap();

		assert_eq!(cfg.server_endpoint, "ws://dash.local:8080/ws");
		assert_eq!(cfg.language.as_deref(), Some("de"));
		assert_eq!(cfg.initial_stream.as_ref().map(StreamId::as_str), Some("PTU"));
		assert_eq!(cfg.connect_timeout, Duration::from_millis(500));
	}

	#[test]
	fn malformed_file_is_an_error() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "server_endpoint = [").unwrap();
		assert!(ClientConfig::load_from_path(file.path(), no_env).is_err());
	}

	#[test]
	fn endpoint_is_validated() {
		let cfg = ClientConfig {
			server_endpoint: "ftp://nowhere".into(),
			..ClientConfig::default()
		};
		assert!(cfg.endpoint().is_err());
		assert_eq!(ClientConfig::default().endpoint().unwrap().port, 5000);
	}
}
