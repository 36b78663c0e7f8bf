use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use encore_core::{unix_now_ms, ClientMessage, ServerMessage};

use crate::state::AppState;

/// Handles WebSocket upgrade requests to `/ws`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manages a single client connection.
///
/// On connect the client receives the full show state, then the updated
/// spectator count goes out to everyone. After that the loop forwards
/// session broadcasts and handles inbound events until the socket closes.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let session = state.session;
    let mut rx = session.subscribe();

    let hello = ServerMessage::StateUpdate {
        state: session.snapshot(),
    };
    if send(&mut socket, &hello).await.is_err() {
        return;
    }

    let count = session.client_connected();
    log::info!("client connected ({count} online)");

    // Writer capability for this connection. Granted on request, no
    // credential check: the explicit trust model of the protocol.
    let mut is_admin = false;

    loop {
        tokio::select! {
            Ok(message) = rx.recv() => {
                if send(&mut socket, &message).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(text.as_str()) {
                            Ok(message) => {
                                if handle_message(&mut socket, &session, &mut is_admin, message)
                                    .await
                                    .is_err()
                                {
                                    break;
                                }
                            }
                            Err(err) => log::debug!("ignoring unrecognized message: {err}"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    let count = session.client_disconnected();
    log::info!("client disconnected ({count} online)");
}

async fn handle_message(
    socket: &mut WebSocket,
    session: &crate::state::ShowSession,
    is_admin: &mut bool,
    message: ClientMessage,
) -> Result<(), axum::Error> {
    match message {
        ClientMessage::SyncTime { client_time } => {
            // Reply immediately; any handling delay inflates the client's
            // latency estimate.
            let reply = ServerMessage::SyncTimeReply {
                client_time,
                server_time: unix_now_ms(),
            };
            send(socket, &reply).await?;
        }
        ClientMessage::PromoteToAdmin => {
            *is_admin = true;
            log::info!("writer capability granted");
            send(socket, &ServerMessage::AdminGranted).await?;
        }
        ClientMessage::UpdateState { state } => {
            if *is_admin {
                session.handle_update(state);
            } else {
                log::warn!("refusing update-state from non-writer connection");
            }
        }
        ClientMessage::TriggerRoutine { delay } => {
            if *is_admin {
                session.handle_trigger(delay);
            } else {
                log::warn!("refusing trigger-routine from non-writer connection");
            }
        }
        ClientMessage::ResetRoutine => {
            if *is_admin {
                session.handle_reset();
            } else {
                log::warn!("refusing reset-routine from non-writer connection");
            }
        }
    }
    Ok(())
}

async fn send(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).map_err(axum::Error::new)?;
    socket.send(Message::Text(text.into())).await
}
