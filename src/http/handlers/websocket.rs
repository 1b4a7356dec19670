//! Websocket handler: relays bytes between the browser and a session channel.
//!
//! # Data Flow
//! ```text
//! Browser ←── binary frames (channel output) ───  Gateway ←── bytes ─── Remote host
//! Browser ─── {"data": ...} / {"resize": ...} ──→ Gateway ─── bytes ──→ Remote host
//! ```
//!
//! # Design Decisions
//! - A session is claimed only by the client address that opened it
//! - Channel output is forwarded unchanged; the browser decodes it with the
//!   encoding from the connect response
//! - Either side closing ends the relay and releases the connection slot

use std::collections::HashMap;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Query, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use encoding_rs::Encoding;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use super::Inbound;
use crate::http::session::ClaimedSession;
use crate::lifecycle::LoopHandle;
use crate::routing::HandlerFactory;

const BUF_SIZE: usize = 32 * 1024;

/// A text frame from the browser.
#[derive(Debug, Default, Deserialize)]
struct ClientMessage {
    data: Option<String>,
    /// Terminal size as `[cols, rows]`. Accepted, not acted on.
    resize: Option<[u32; 2]>,
}

/// Factory for the `/ws` route.
#[derive(Clone)]
pub struct WsockHandler {
    loop_handle: LoopHandle,
}

impl WsockHandler {
    pub fn new(loop_handle: LoopHandle) -> Self {
        Self { loop_handle }
    }

    async fn upgrade(self, request: Request) -> Response {
        let (mut parts, _body) = request.into_parts();
        let inbound = Inbound::from_parts(&parts);
        if let Some(response) = inbound.screen(&parts.uri, &self.loop_handle) {
            return response;
        }
        if !inbound.origin_allowed(&parts.headers) {
            return (StatusCode::FORBIDDEN, "Cross origin operation is not allowed.").into_response();
        }

        let id = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.get("id").and_then(|id| Uuid::parse_str(id.trim()).ok()));
        let Some(id) = id else {
            return (StatusCode::BAD_REQUEST, "Missing or invalid session id").into_response();
        };

        let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
            Ok(upgrade) => upgrade,
            Err(rejection) => return rejection.into_response(),
        };

        let Some(session) = self.loop_handle.sessions().claim(id, inbound.client.ip()) else {
            tracing::warn!(session = %id, client = %inbound.client, "Websocket authentication failed");
            return (StatusCode::FORBIDDEN, "Websocket authentication failed.").into_response();
        };

        let encoding = Encoding::for_label(self.loop_handle.options().encoding.as_bytes())
            .unwrap_or(encoding_rs::UTF_8);
        let ping = inbound.settings.as_ref().and_then(|s| s.websocket_ping_interval);

        upgrade.on_upgrade(move |socket| relay(socket, session, encoding, ping))
    }
}

impl HandlerFactory for WsockHandler {
    fn method_router(&self) -> MethodRouter {
        let handler = self.clone();
        get(move |request: Request| {
            let handler = handler.clone();
            async move { handler.upgrade(request).await }
        })
    }

    fn name(&self) -> &str {
        "websocket"
    }
}

async fn relay(
    socket: WebSocket,
    session: ClaimedSession,
    encoding: &'static Encoding,
    ping: Option<Duration>,
) {
    let ClaimedSession { id, stream, guard } = session;
    let (mut reader, mut writer) = tokio::io::split(stream);
    let (mut sink, mut source) = socket.split();

    let period = ping.unwrap_or(Duration::from_secs(3600));
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    let mut buf = vec![0u8; BUF_SIZE];

    tracing::info!(session = %id, client = %guard.client(), "Relay started");

    loop {
        tokio::select! {
            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    tracing::debug!(session = %id, "Channel closed by remote host");
                    break;
                }
                Ok(n) => {
                    if sink.send(Message::Binary(Bytes::copy_from_slice(&buf[..n]))).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(session = %id, error = %e, "Channel read failed");
                    break;
                }
            },
            message = source.next() => {
                let input = match message {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                        Ok(ClientMessage { data: Some(data), .. }) => {
                            let (bytes, _, _) = encoding.encode(&data);
                            Bytes::from(bytes.into_owned())
                        }
                        Ok(ClientMessage { resize, .. }) => {
                            tracing::trace!(session = %id, ?resize, "Control message");
                            continue;
                        }
                        Err(e) => {
                            tracing::debug!(session = %id, error = %e, "Ignoring malformed message");
                            continue;
                        }
                    },
                    Some(Ok(Message::Binary(bytes))) => bytes,
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(session = %id, "Websocket closed by browser");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::debug!(session = %id, error = %e, "Websocket error");
                        break;
                    }
                };
                if let Err(e) = writer.write_all(&input).await {
                    tracing::warn!(session = %id, error = %e, "Channel write failed");
                    break;
                }
            },
            _ = ticker.tick(), if ping.is_some() => {
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            },
        }
    }

    let _ = sink.close().await;
    let _ = writer.shutdown().await;
    tracing::info!(session = %id, "Relay finished");
    drop(guard);
}
