#![forbid(unsafe_code)]

//! The persistent duplex connection: one websocket, one task.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use vcl_protocol::{ClientPush, ServerPush, decode_frame, encode_frame, peek_event_name};
use vcl_util::endpoint::ServerEndpoint;

use crate::ClientCoreError;

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// What the channel task reports.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
	Connected,
	Frame(ServerPush),
	Disconnected { reason: String },
}

/// Owning end of an open channel. Dropping it stops the channel task.
#[derive(Debug)]
pub struct ChannelHandle {
	inbound: mpsc::UnboundedReceiver<ChannelEvent>,
	outbound: mpsc::UnboundedSender<ClientPush>,
	task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
	/// Channel over caller-provided queues, with no transport behind it.
	pub fn from_parts(
		inbound: mpsc::UnboundedReceiver<ChannelEvent>,
		outbound: mpsc::UnboundedSender<ClientPush>,
	) -> Self {
		Self {
			inbound,
			outbound,
			task: None,
		}
	}

	/// Next event, or `None` once the channel task is gone.
	pub async fn recv(&mut self) -> Option<ChannelEvent> {
		self.inbound.recv().await
	}

	pub fn send(&self, push: ClientPush) -> Result<(), ClientCoreError> {
		self.outbound
			.send(push)
			.map_err(|_| ClientCoreError::Transport("channel is closed".to_string()))
	}
}

impl Drop for ChannelHandle {
	fn drop(&mut self) {
		if let Some(task) = self.task.take() {
			task.abort();
		}
	}
}

/// Connect to `endpoint` and spawn the task that owns the websocket.
///
/// The first event delivered is always [`ChannelEvent::Connected`].
pub async fn open_channel(
	endpoint: &ServerEndpoint,
	connect_timeout: Duration,
	max_frame_bytes: usize,
) -> Result<ChannelHandle, ClientCoreError> {
	let url = endpoint.ws_url();
	info!(%url, "connecting");

	let (ws, _) = match tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(url.as_str())).await {
		Ok(Ok(result)) => result,
		Ok(Err(e)) => return Err(ClientCoreError::Connect(format!("{url}: {e}"))),
		Err(_) => return Err(ClientCoreError::Connect(format!("{url}: timed out after {connect_timeout:?}"))),
	};

	let (in_tx, in_rx) = mpsc::unbounded_channel();
	let (out_tx, out_rx) = mpsc::unbounded_channel();
	let _ = in_tx.send(ChannelEvent::Connected);
	let task = tokio::spawn(run_channel(ws, in_tx, out_rx, max_frame_bytes));

	Ok(ChannelHandle {
		inbound: in_rx,
		outbound: out_tx,
		task: Some(task),
	})
}

async fn run_channel(
	mut ws: WsStream,
	in_tx: mpsc::UnboundedSender<ChannelEvent>,
	mut out_rx: mpsc::UnboundedReceiver<ClientPush>,
	max_frame_bytes: usize,
) {
	let reason = loop {
		tokio::select! {
			push = out_rx.recv() => {
				let Some(push) = push else {
					let _ = ws.close(None).await;
					break "closed by client".to_string();
				};
				match encode_frame(&push, max_frame_bytes) {
					Ok(text) => {
						if let Err(err) = ws.send(Message::Text(text.into())).await {
							warn!(error = %err, event = push.event_name(), "send failed");
							break format!("send failed: {err}");
						}
						debug!(event = push.event_name(), "frame sent");
					}
					Err(err) => warn!(error = %err, event = push.event_name(), "outbound frame dropped"),
				}
			}
			msg = ws.next() => {
				let Some(msg) = msg else {
					break "stream ended".to_string();
				};
				match msg {
					Ok(Message::Text(text)) => match decode_frame::<ServerPush>(text.as_str(), max_frame_bytes) {
						Ok(push) => {
							if in_tx.send(ChannelEvent::Frame(push)).is_err() {
								return;
							}
						}
						Err(err) => {
							warn!(error = %err, event = ?peek_event_name(text.as_str()), "undecodable frame skipped");
						}
					},
					Ok(Message::Ping(payload)) => {
						if let Err(err) = ws.send(Message::Pong(payload)).await {
							warn!(error = %err, "pong failed");
						}
					}
					Ok(Message::Close(frame)) => {
						warn!(?frame, "websocket closed by server");
						break "closed by server".to_string();
					}
					Ok(_) => {}
					Err(err) => {
						warn!(error = %err, "websocket error");
						break err.to_string();
					}
				}
			}
		}
	};

	let _ = in_tx.send(ChannelEvent::Disconnected { reason });
}

#[cfg(test)]
mod tests {
	use vcl_domain::{SessionToken, StreamId};

	use super::*;

	#[tokio::test]
	async fn handle_from_parts_relays_both_ways() {
		let (in_tx, in_rx) = mpsc::unbounded_channel();
		let (out_tx, mut out_rx) = mpsc::unbounded_channel();
		let mut handle = ChannelHandle::from_parts(in_rx, out_tx);

		in_tx.send(ChannelEvent::Connected).unwrap();
		assert_eq!(handle.recv().await, Some(ChannelEvent::Connected));

		let push = ClientPush::SessionBoundaryResponse {
			version: StreamId::new("LIVE").unwrap(),
			keep_stats: true,
			new_session_id: SessionToken::new("s1"),
		};
		handle.send(push.clone()).unwrap();
		assert_eq!(out_rx.recv().await, Some(push.clone()));

		drop(out_rx);
		assert!(matches!(handle.send(push), Err(ClientCoreError::Transport(_))));
	}

	#[tokio::test]
	async fn unreachable_server_is_a_connect_error() {
		let endpoint = ServerEndpoint::parse("ws://127.0.0.1:9/ws").unwrap();
		let err = open_channel(&endpoint, Duration::from_secs(2), 1024).await.unwrap_err();
		assert!(matches!(err, ClientCoreError::Connect(_)), "{err:?}");
	}
}
