use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use fieldlink_db::Database;
use fieldlink_types::api::Claims;
use fieldlink_types::error::ChatError;
use fieldlink_types::events::{ChatCommand, ChatEvent};
use fieldlink_types::models::{NewMessage, timestamp_now};

use crate::hub::{Hub, SessionId};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a single WebSocket connection.
///
/// The client opens with an Identify command carrying its JWT; the server
/// answers with Ready, then runs the session loop: a forwarding task
/// (per-session channel -> socket, with heartbeat) and a command-reading
/// task, torn down together. The hub removes the session from every room
/// on exit, without departure notices.
pub async fn handle_connection(socket: WebSocket, hub: Hub, db: Arc<Database>, jwt_secret: String) {
    let (mut sender, mut receiver) = socket.split();

    let claims = match wait_for_identify(&mut receiver, &jwt_secret).await {
        Some(claims) => claims,
        None => {
            warn!("WebSocket client failed to identify, closing");
            return;
        }
    };

    info!("{} ({}) connected to gateway", claims.name, claims.sub);

    let ready = ChatEvent::Ready {
        technician_id: claims.sub,
        name: claims.name.clone(),
    };
    if sender
        .send(Message::Text(serde_json::to_string(&ready).unwrap().into()))
        .await
        .is_err()
    {
        return;
    }

    let session: SessionId = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel::<ChatEvent>();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward per-session events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to serialize chat event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let hub_recv = hub.clone();
    let claims_recv = claims.clone();
    let tx_recv = tx.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ChatCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(&hub_recv, &db, &claims_recv, session, &tx_recv, cmd).await;
                    }
                    Err(e) => {
                        warn!(
                            "{} ({}) bad command: {} -- raw: {}",
                            claims_recv.name,
                            claims_recv.sub,
                            e,
                            &text[..text.len().min(200)]
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.disconnect(session).await;
    info!("{} ({}) disconnected from gateway", claims.name, claims.sub);
}

async fn wait_for_identify(
    receiver: &mut futures_util::stream::SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<Claims> {
    use jsonwebtoken::{DecodingKey, Validation, decode};

    let timeout = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(ChatCommand::Identify { token }) =
                    serde_json::from_str::<ChatCommand>(&text)
                {
                    let token_data = decode::<Claims>(
                        &token,
                        &DecodingKey::from_secret(jwt_secret.as_bytes()),
                        &Validation::default(),
                    )
                    .ok()?;

                    return Some(token_data.claims);
                }
            }
        }
        None
    });

    timeout.await.ok().flatten()
}

async fn handle_command(
    hub: &Hub,
    db: &Arc<Database>,
    claims: &Claims,
    session: SessionId,
    tx: &mpsc::UnboundedSender<ChatEvent>,
    cmd: ChatCommand,
) {
    match cmd {
        ChatCommand::Identify { .. } => {} // Already handled

        ChatCommand::Join { room, user_name: _ } => {
            // A technician may only join rooms the resolver grants them.
            let resolved = {
                let db = db.clone();
                let technician_id = claims.sub;
                tokio::task::spawn_blocking(move || db.rooms_for_technician(technician_id))
                    .await
                    .map_err(ChatError::persistence)
                    .and_then(|r| r)
            };

            match resolved {
                Ok(rooms) if rooms.contains(&room) => {
                    info!("{} ({}) joining {}", claims.name, claims.sub, room);
                    hub.join(&room, session, tx.clone()).await;
                    // Notice goes out on every join call, even a redundant
                    // re-join of an already-joined room.
                    hub.broadcast_except(
                        &room,
                        session,
                        ChatEvent::notice(
                            room,
                            format!("{} joined the chat", claims.name),
                            timestamp_now(),
                        ),
                    )
                    .await;
                }
                Ok(_) => {
                    warn!("{} ({}) denied join to {}", claims.name, claims.sub, room);
                    let _ = tx.send(ChatEvent::Error {
                        reason: ChatError::Unauthorized(format!("not a member of room {room}"))
                            .to_string(),
                    });
                }
                Err(e) => {
                    let _ = tx.send(ChatEvent::Error { reason: e.to_string() });
                }
            }
        }

        ChatCommand::Leave { room } => {
            if hub.leave(&room, session).await {
                info!("{} ({}) leaving {}", claims.name, claims.sub, room);
                hub.broadcast(
                    &room,
                    ChatEvent::notice(
                        room,
                        format!("{} left the chat", claims.name),
                        timestamp_now(),
                    ),
                )
                .await;
            }
        }

        ChatCommand::Message {
            message,
            recipient_id,
            group_id,
            timestamp,
            ..
        } => {
            // Sender identity comes from the session claims; addressing
            // decides the target room.
            let msg = NewMessage {
                sender_id: claims.sub,
                sender_name: claims.name.clone(),
                recipient_id,
                group_id,
                message,
                timestamp: timestamp.unwrap_or_else(timestamp_now),
            };

            if let Err(e) = hub.publish(db, msg).await {
                // Persistence failed: nothing was broadcast, and only the
                // sending session hears about it.
                let _ = tx.send(ChatEvent::Error { reason: e.to_string() });
            }
        }

        ChatCommand::Typing { room } => {
            hub.broadcast(
                &room,
                ChatEvent::Typing {
                    room,
                    technician_id: claims.sub,
                    name: claims.name.clone(),
                },
            )
            .await;
        }
    }
}
