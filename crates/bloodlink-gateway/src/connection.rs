use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use bloodlink_types::events::{GatewayCommand, GatewayEvent, MessageRef, UserEvent};
use bloodlink_types::models::UserHandle;

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Time a new socket has to send Identify.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle a single chat client connection: Identify handshake, Ready, then
/// relay outgoing messages and inbound presses/text until either side closes.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher) {
    let (mut sender, mut receiver) = socket.split();

    let (user, public_handle) = match wait_for_identify(&mut receiver).await {
        Some(id) => id,
        None => {
            warn!("Chat client failed to identify, closing");
            return;
        }
    };

    info!("User {} connected to gateway", user);
    dispatcher.set_public_handle(user, public_handle).await;

    if !send_event(&mut sender, &GatewayEvent::Ready { user_handle: user }).await {
        return;
    }

    run_connection_loop(sender, receiver, dispatcher, user).await;
}

async fn run_connection_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    dispatcher: Dispatcher,
    user: UserHandle,
) {
    // Registering flushes anything queued while the user was away.
    let (conn_id, mut user_rx) = dispatcher.register_user_channel(user).await;

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = user_rx.recv() => {
                    let Some(event) = result else { break };
                    if !send_event(&mut sender, &event).await {
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
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let dispatcher_recv = dispatcher.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        let Some(event) = command_to_event(user, cmd) else {
                            continue;
                        };
                        if dispatcher_recv.publish(event).await.is_err() {
                            warn!("Engine is gone, closing connection for user {}", user);
                            break;
                        }
                    }
                    Err(e) => warn!("User {} sent a bad command: {}", user, e),
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.unregister_user_channel(user, conn_id).await;
    info!("User {} disconnected from gateway", user);
}

async fn wait_for_identify(
    receiver: &mut SplitStream<WebSocket>,
) -> Option<(UserHandle, Option<String>)> {
    let identify = async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { user_handle, public_handle }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    return Some((user_handle, public_handle));
                }
            }
        }
        None
    };

    tokio::time::timeout(IDENTIFY_TIMEOUT, identify).await.ok().flatten()
}

/// Translate a client command into the event the engine consumes.
fn command_to_event(user: UserHandle, cmd: GatewayCommand) -> Option<UserEvent> {
    match cmd {
        GatewayCommand::Identify { .. } => {
            debug!("User {} sent Identify twice, ignoring", user);
            None
        }
        GatewayCommand::Press { action_id, message_id } => Some(UserEvent::ButtonPressed {
            action_id,
            user,
            message: message_id.map(|message_id| MessageRef { user, message_id }),
        }),
        GatewayCommand::Text { text } => Some(UserEvent::TextReceived { text, user }),
    }
}

/// Returns false once the socket is unusable.
async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &GatewayEvent) -> bool {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode gateway event: {}", e);
            return true;
        }
    };
    sender.send(Message::Text(text.into())).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn press_carries_message_reference() {
        let id = Uuid::new_v4();
        let event = command_to_event(
            UserHandle(8),
            GatewayCommand::Press {
                action_id: "terms:agree".into(),
                message_id: Some(id),
            },
        );
        assert_eq!(
            event,
            Some(UserEvent::ButtonPressed {
                action_id: "terms:agree".into(),
                user: UserHandle(8),
                message: Some(MessageRef { user: UserHandle(8), message_id: id }),
            })
        );
    }

    #[test]
    fn repeated_identify_is_ignored() {
        let cmd = GatewayCommand::Identify {
            user_handle: UserHandle(1),
            public_handle: None,
        };
        assert_eq!(command_to_event(UserHandle(8), cmd), None);
    }

    #[test]
    fn text_becomes_text_received() {
        let event = command_to_event(UserHandle(2), GatewayCommand::Text { text: "/cancel".into() });
        assert_eq!(
            event,
            Some(UserEvent::TextReceived { text: "/cancel".into(), user: UserHandle(2) })
        );
    }
}
