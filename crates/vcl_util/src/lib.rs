#![forbid(unsafe_code)]

pub mod endpoint {
	/// Parsed `ws://host:port/path` (or `wss://`) channel endpoint.
	#[derive(Debug, Clone, PartialEq, Eq, Hash)]
	pub struct ServerEndpoint {
		pub secure: bool,
		pub host: String,
		pub port: u16,
		pub path: String,
	}

	impl ServerEndpoint {
		/// Returns `host:port` (host preserved, IPv6 stays bracketed).
		pub fn hostport(&self) -> String {
			format!("{}:{}", self.host, self.port)
		}

		/// Full websocket URL.
		pub fn ws_url(&self) -> String {
			let scheme = if self.secure { "wss" } else { "ws" };
			format!("{scheme}://{}{}", self.hostport(), self.path)
		}

		/// Base URL of the request/response API served next to the channel.
		pub fn http_base(&self) -> String {
			let scheme = if self.secure { "https" } else { "http" };
			format!("{scheme}://{}", self.hostport())
		}

		/// Parse an endpoint string in the form `ws://host[:port][/path]` or `wss://...`.
		///
		/// The port defaults to 80 / 443; the path defaults to `/`.
		pub fn parse(s: &str) -> Result<Self, String> {
			let s = s.trim();
			if s.is_empty() {
				return Err("endpoint must be non-empty (expected ws://host:port/path)".to_string());
			}

			let (secure, rest) = if let Some(rest) = s.strip_prefix("wss://") {
				(true, rest)
			} else if let Some(rest) = s.strip_prefix("ws://") {
				(false, rest)
			} else {
				return Err(format!("invalid endpoint (expected ws:// or wss://): {s}"));
			};

			if rest.contains('?') || rest.contains('#') {
				return Err(format!("invalid endpoint (query/fragment not allowed): {s}"));
			}

			let (authority, path) = match rest.find('/') {
				Some(idx) => (&rest[..idx], &rest[idx..]),
				None => (rest, "/"),
			};

			let (host, port) = split_host_port(authority, s)?;
			let port = match port {
				Some(p) => p,
				None if secure => 443,
				None => 80,
			};

			Ok(Self {
				secure,
				host,
				port,
				path: path.to_string(),
			})
		}
	}

	fn split_host_port(authority: &str, full: &str) -> Result<(String, Option<u16>), String> {
		let authority = authority.trim();
		if authority.is_empty() {
			return Err(format!("invalid endpoint host: {full}"));
		}

		if authority.starts_with('[') {
			let end = authority
				.find(']')
				.ok_or_else(|| format!("invalid endpoint host (unterminated IPv6 bracket): {full}"))?;
			let host = &authority[..=end];
			let tail = &authority[end + 1..];
			if tail.is_empty() {
				return Ok((host.to_string(), None));
			}
			let port_str = tail
				.strip_prefix(':')
				.ok_or_else(|| format!("invalid endpoint host: {full}"))?;
			return Ok((host.to_string(), Some(parse_port(port_str, full)?)));
		}

		match authority.rsplit_once(':') {
			Some((host, _)) if host.contains(':') => Err(format!(
				"invalid endpoint host (IPv6 must be bracketed like ws://[::1]:5000/ws): {full}"
			)),
			Some((host, port_str)) => {
				if host.trim().is_empty() {
					return Err(format!("invalid endpoint host: {full}"));
				}
				Ok((host.trim().to_string(), Some(parse_port(port_str, full)?)))
			}
			None => Ok((authority.to_string(), None)),
		}
	}

	fn parse_port(port_str: &str, full: &str) -> Result<u16, String> {
		let port: u16 = port_str
			.trim()
			.parse()
			.map_err(|_| format!("invalid endpoint port (expected 1..=65535): {full}"))?;
		if port == 0 {
			return Err(format!("invalid endpoint port (expected 1..=65535): {full}"));
		}
		Ok(port)
	}

	/// Validate `ws://host:port/path`.
	pub fn validate_server_endpoint(s: &str) -> Result<(), String> {
		let _ = ServerEndpoint::parse(s)?;
		Ok(())
	}

	#[cfg(test)]
	mod tests {
		use super::*;

		#[test]
		fn parses_local_dev_endpoint() {
			let e = ServerEndpoint::parse("ws://127.0.0.1:5000/ws").unwrap();
			assert!(!e.secure);
			assert_eq!(e.hostport(), "127.0.0.1:5000");
			assert_eq!(e.path, "/ws");
			assert_eq!(e.http_base(), "http://127.0.0.1:5000");
			assert_eq!(e.ws_url(), "ws://127.0.0.1:5000/ws");
		}

		#[test]
		fn secure_endpoint_defaults_port_and_path() {
			let e = ServerEndpoint::parse("wss://combat.example.com").unwrap();
			assert!(e.secure);
			assert_eq!(e.port, 443);
			assert_eq!(e.path, "/");
			assert_eq!(e.http_base(), "https://combat.example.com:443");
		}

		#[test]
		fn parses_bracketed_ipv6() {
			let e = ServerEndpoint::parse("ws://[::1]:5000/ws").unwrap();
			assert_eq!(e.host, "[::1]");
			assert_eq!(e.port, 5000);
			let e = ServerEndpoint::parse("ws://[::1]/ws").unwrap();
			assert_eq!(e.port, 80);
		}

		#[test]
		fn rejects_unbracketed_ipv6() {
			let err = ServerEndpoint::parse("ws://::1:5000").unwrap_err();
			assert!(err.to_lowercase().contains("ipv6"));
		}

		#[test]
		fn rejects_other_schemes_and_bad_ports() {
			assert!(ServerEndpoint::parse("http://127.0.0.1:5000").is_err());
			assert!(ServerEndpoint::parse("ws://127.0.0.1:0/ws").is_err());
			assert!(ServerEndpoint::parse("ws://127.0.0.1:99999").is_err());
			assert!(ServerEndpoint::parse("ws://:5000/ws").is_err());
			assert!(ServerEndpoint::parse("ws://127.0.0.1:5000/ws?x=y").is_err());
			assert!(validate_server_endpoint("").is_err());
		}
	}
}
