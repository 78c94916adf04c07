use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::AppState;
use crate::fusion::{
    models::{BroadcastSnapshot, ServerEvent},
    FusionState,
};

/// Upgrade to the real-time channel.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| viewer_session(socket, state.fusion))
}

/// One viewer: the current snapshot on connect, then every broadcast until
/// either side goes away. Nothing is kept per viewer beyond the receiver.
async fn viewer_session(mut socket: WebSocket, fusion: FusionState) {
    let (initial, mut updates) = fusion.subscribe().await;
    info!(viewers = fusion.viewer_count(), "Viewer connected");

    if send_snapshot(&mut socket, initial).await.is_err() {
        info!("Viewer disconnected before initial snapshot");
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Viewers have nothing to say; pings are answered by axum.
                Some(Ok(_)) => {}
            },
            update = updates.recv() => match update {
                Ok(snapshot) => {
                    if send_snapshot(&mut socket, snapshot).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Viewer fell behind; snapshots skipped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    drop(updates);
    info!(viewers = fusion.viewer_count(), "Viewer disconnected");
}

async fn send_snapshot(socket: &mut WebSocket, snapshot: BroadcastSnapshot) -> Result<(), axum::Error> {
    let frame = match serde_json::to_string(&ServerEvent::RealtimeUpdate(snapshot)) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "Failed to serialize snapshot; frame dropped");
            return Ok(());
        }
    };
    socket.send(Message::Text(frame.into())).await
}
