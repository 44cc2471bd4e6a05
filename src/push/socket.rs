use super::channel::PushChannel;
use crate::redact::redact_secrets;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const WS_PATH: &str = "/api/ws";

/// Drive one websocket connection to completion. Assumes the channel is
/// already in the `Connecting` state.
pub(super) async fn run(channel: Arc<PushChannel>) {
    let url = ws_url(
        &channel.config.base_url(),
        channel.credentials.resolve().as_deref(),
    );

    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            tracing::warn!(error = %redact_secrets(&e.to_string()), "push connect failed");
            channel.connection_lost(true);
            return;
        }
    };

    let (mut write, mut read) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    channel.connection_ready(tx);
    tracing::debug!("push channel connected");

    // Forward outbound frames into the write half until the channel closes.
    let write_task = tokio::spawn(async move {
        while let Some(raw) = rx.recv().await {
            if write.send(Message::Text(raw.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => channel.dispatch_frame(text.as_str()),
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "push read failed");
                break;
            }
        }
    }

    write_task.abort();
    channel.connection_lost(false);
    tracing::debug!("push channel disconnected");
}

/// Derive the websocket endpoint from the configured base URL, attaching the
/// resolved credential as a query parameter when present.
fn ws_url(base: &str, token: Option<&str>) -> String {
    let base = base.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };

    match token {
        Some(token) => format!("{ws_base}{WS_PATH}?token={}", urlencoding::encode(token)),
        None => format!("{ws_base}{WS_PATH}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_maps_http_schemes_to_ws() {
        assert_eq!(
            ws_url("http://localhost:8080", None),
            "ws://localhost:8080/api/ws"
        );
        assert_eq!(
            ws_url("https://chat.example.org/", None),
            "wss://chat.example.org/api/ws"
        );
    }

    #[test]
    fn ws_url_appends_encoded_token() {
        assert_eq!(
            ws_url("http://localhost:8080", Some("a b")),
            "ws://localhost:8080/api/ws?token=a%20b"
        );
    }
}
