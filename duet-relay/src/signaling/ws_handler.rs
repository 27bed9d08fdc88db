use super::relay_service::RelayService;
use crate::error::RelayError;
use crate::room::{ConnectionId, send_frame};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use duet_core::RelayFrame;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: RelayService) {
    let conn: ConnectionId = Uuid::new_v4();
    info!(%conn, "New WebSocket connection");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sender.send(msg).await.is_err() || closing {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();

        async move {
            // Канал, на который подписано это подключение.
            let mut channel: Option<String> = None;

            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<RelayFrame>(&text) {
                        Ok(frame) => {
                            let seq = frame.publish_seq();
                            if let Err(e) = handle_frame(&service, conn, &tx, &mut channel, frame)
                            {
                                warn!(%conn, "Rejected frame: {}", e);
                                send_frame(&tx, &e.to_frame(seq));
                            }
                        }
                        Err(e) => {
                            warn!(%conn, "Invalid RelayFrame: {:?}", e);
                            send_frame(&tx, &RelayError::BadFrame(e.to_string()).to_frame(None));
                        }
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }

            channel
        }
    });

    let channel = tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
            None
        }
        joined = (&mut recv_task) => {
            send_task.abort();
            joined.ok().flatten()
        }
    };

    match channel {
        Some(channel) => service.registry().leave(&channel, conn),
        None => service.registry().leave_everywhere(conn),
    }
    info!(%conn, "WebSocket disconnected");
}

fn handle_frame(
    service: &RelayService,
    conn: ConnectionId,
    tx: &mpsc::UnboundedSender<Message>,
    channel: &mut Option<String>,
    frame: RelayFrame,
) -> Result<(), RelayError> {
    match frame {
        RelayFrame::Subscribe {
            channel: name,
            member,
        } => {
            if let Some(previous) = channel.take() {
                service.registry().leave(&previous, conn);
            }
            info!(%conn, channel = %name, member = %member.id, "Subscribe");
            let members = service.registry().join(&name, member, conn, tx.clone())?;
            *channel = Some(name);
            send_frame(
                tx,
                &RelayFrame::Subscribed {
                    members,
                    max_message_size: service.registry().max_message_size(),
                },
            );
            Ok(())
        }
        RelayFrame::Publish { event, data, seq } => {
            let name = channel.as_deref().ok_or(RelayError::NotSubscribed)?;
            service.registry().publish(name, conn, event, data)?;
            if let Some(seq) = seq {
                send_frame(tx, &RelayFrame::Published { seq });
            }
            Ok(())
        }
        other => {
            debug!(%conn, "Client sent a relay-only frame: {:?}", other);
            Err(RelayError::BadFrame("relay-only frame".into()))
        }
    }
}
