#![forbid(unsafe_code)]

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Default maximum frame payload size.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024; // 1 MiB

#[derive(Debug, Error)]
pub enum FramingError {
	#[error("frame exceeds maximum size: len={len} max={max}")]
	FrameTooLarge {
		len: usize,
		max: usize,
	},

	#[error("empty frame")]
	Empty,

	#[error("json decode error: {0}")]
	Decode(#[source] serde_json::Error),

	#[error("json encode error: {0}")]
	Encode(#[source] serde_json::Error),
}

/// Encode a message into a JSON text frame.
pub fn encode_frame<M: Serialize>(msg: &M, max_frame_size: usize) -> Result<String, FramingError> {
	let out = serde_json::to_string(msg).map_err(FramingError::Encode)?;
	if out.len() > max_frame_size {
		return Err(FramingError::FrameTooLarge {
			len: out.len(),
			max: max_frame_size,
		});
	}
	Ok(out)
}

/// Encode a frame using `DEFAULT_MAX_FRAME_SIZE`.
pub fn encode_frame_default<M: Serialize>(msg: &M) -> Result<String, FramingError> {
	encode_frame(msg, DEFAULT_MAX_FRAME_SIZE)
}

/// Decode a single JSON text frame.
pub fn decode_frame<M: DeserializeOwned>(src: &str, max_frame_size: usize) -> Result<M, FramingError> {
	if src.len() > max_frame_size {
		return Err(FramingError::FrameTooLarge {
			len: src.len(),
			max: max_frame_size,
		});
	}
	if src.trim().is_empty() {
		return Err(FramingError::Empty);
	}
	serde_json::from_str(src).map_err(FramingError::Decode)
}

/// Decode a frame using `DEFAULT_MAX_FRAME_SIZE`.
pub fn decode_frame_default<M: DeserializeOwned>(src: &str) -> Result<M, FramingError> {
	decode_frame(src, DEFAULT_MAX_FRAME_SIZE)
}

/// Best-effort read of the `event` name, for logging frames that failed to decode.
pub fn peek_event_name(src: &str) -> Option<String> {
	#[derive(serde::Deserialize)]
	struct Head {
		event: String,
	}
	serde_json::from_str::<Head>(src).ok().map(|h| h.event)
}

#[cfg(test)]
mod tests {
	use serde::Deserialize;

	use super::*;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct TestMsg {
		s: String,
		n: u32,
	}

	#[test]
	fn decode_rejects_empty_frame() {
		let err = decode_frame::<TestMsg>("   ", DEFAULT_MAX_FRAME_SIZE).unwrap_err();
		assert!(matches!(err, FramingError::Empty));
	}

	#[test]
	fn encode_rejects_too_large() {
		let msg = TestMsg {
			s: "a".repeat(10_000),
			n: 1,
		};

		let err = encode_frame(&msg, 32).unwrap_err();
		match err {
			FramingError::FrameTooLarge { len, max } => {
				assert!(len > max);
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[test]
	fn decode_rejects_too_large_before_parsing() {
		let src = format!("{{\"s\":\"{}\",\"n\":1}}", "b".repeat(64));
		let err = decode_frame::<TestMsg>(&src, 16).unwrap_err();
		assert!(matches!(err, FramingError::FrameTooLarge { max: 16, .. }));
	}

	#[test]
	fn peek_reads_event_name_of_unknown_frames() {
		assert_eq!(peek_event_name(r#"{"event":"players_moved","data":{}}"#).as_deref(), Some("players_moved"));
		assert_eq!(peek_event_name("not json"), None);
	}
}
