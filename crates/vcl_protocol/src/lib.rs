#![forbid(unsafe_code)]

//! Wire format of the dashboard's duplex channel.
//!
//! Every frame is a websocket text message holding `{"event": <name>, "data": <payload>}`.

pub mod framing;
pub mod messages;

pub use framing::{
	DEFAULT_MAX_FRAME_SIZE, FramingError, decode_frame, decode_frame_default, encode_frame, encode_frame_default,
	peek_event_name,
};
pub use messages::{
	ClientPush, ConfigUpdate, MessageKind, MonitoringStatus, NameMappingsNotice, NewEvent, PlayerInfoUpdate,
	ServerPush, SessionBoundary, SessionBoundaryAck, StatsUpdate, StreamNotice, StreamRef,
};
