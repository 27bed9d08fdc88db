use super::pubsub_transport::{PubSubTransport, payload_size};
use super::transport_event::TransportEvent;
use crate::error::TransportError;
use async_trait::async_trait;
use dashmap::DashMap;
use duet_core::{RelayErrorCode, RelayFrame, RoomMember};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// How long `publish` waits for the relay to accept or reject a frame.
pub const PUBLISH_ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Error frame sent by the relay.
#[derive(Debug)]
struct Rejection {
    code: RelayErrorCode,
    message: String,
    limit: Option<usize>,
}

impl Rejection {
    fn into_error(self, channel: &str, size: usize) -> TransportError {
        match self.code {
            RelayErrorCode::CapacityExceeded => TransportError::CapacityExceeded {
                channel: channel.to_owned(),
                capacity: self.limit.unwrap_or_default(),
            },
            RelayErrorCode::PayloadTooLarge => TransportError::PayloadTooLarge {
                size,
                limit: self.limit.unwrap_or_default(),
            },
            RelayErrorCode::BadRequest => TransportError::Rejected(self.message),
        }
    }
}

type PendingPublishes = Arc<DashMap<u64, oneshot::Sender<Result<(), Rejection>>>>;

/// Клиент relay-сервера `duet-relay` поверх WebSocket.
///
/// Каждая публикация нумеруется; `publish` ждёт подтверждения или ошибки
/// от релея с тем же номером.
pub struct WsTransport {
    channel: String,
    member: RoomMember,
    max_message_size: usize,
    outbound: mpsc::UnboundedSender<Message>,
    pending: PendingPublishes,
    next_seq: AtomicU64,
    send_task: JoinHandle<()>,
    recv_task: JoinHandle<()>,
}

impl WsTransport {
    /// Connects to `url`, subscribes to `channel` and waits for the relay to
    /// confirm. The returned receiver starts with `TransportEvent::Subscribed`.
    pub async fn connect(
        url: &str,
        channel: impl Into<String>,
        member: RoomMember,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>), TransportError> {
        let channel = channel.into();
        info!(url, channel = %channel, member = %member.id, "Connecting to relay");

        let (ws, _) = connect_async(url).await?;
        let (mut sink, mut stream) = ws.split();

        let subscribe = RelayFrame::Subscribe {
            channel: channel.clone(),
            member: member.clone(),
        };
        sink.send(Message::Text(serde_json::to_string(&subscribe)?.into()))
            .await?;

        let (members, max_message_size) = loop {
            let Some(msg) = stream.next().await else {
                return Err(TransportError::Closed);
            };
            let Message::Text(text) = msg? else {
                continue;
            };
            match serde_json::from_str::<RelayFrame>(text.as_str())? {
                RelayFrame::Subscribed {
                    members,
                    max_message_size,
                } => break (members, max_message_size),
                RelayFrame::Error {
                    code,
                    message,
                    limit,
                    ..
                } => {
                    let rejection = Rejection {
                        code,
                        message,
                        limit,
                    };
                    return Err(rejection.into_error(&channel, 0));
                }
                other => debug!("Ignoring {:?} before subscription", other),
            }
        };
        info!(channel = %channel, members = members.len(), "Subscribed to relay channel");

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let _ = event_tx.send(TransportEvent::Subscribed { members });

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let pending: PendingPublishes = Arc::new(DashMap::new());

        let send_task = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if sink.send(msg).await.is_err() || closing {
                    break;
                }
            }
        });

        let recv_task = tokio::spawn({
            let pending = pending.clone();

            async move {
                while let Some(Ok(msg)) = stream.next().await {
                    match msg {
                        Message::Text(text) => {
                            match serde_json::from_str::<RelayFrame>(text.as_str()) {
                                Ok(frame) => {
                                    let Some(event) = route_frame(frame, &pending) else {
                                        continue;
                                    };
                                    if event_tx.send(event).is_err() {
                                        break;
                                    }
                                }
                                Err(e) => warn!("Invalid frame from relay: {:?}", e),
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                // Publishes still waiting for a reply fail with `Closed`.
                pending.clear();
                let _ = event_tx.send(TransportEvent::Disconnected);
                info!("Relay connection closed");
            }
        });

        Ok((
            Self {
                channel,
                member,
                max_message_size,
                outbound,
                pending,
                next_seq: AtomicU64::new(1),
                send_task,
                recv_task,
            },
            event_rx,
        ))
    }
}

/// Resolves replies to pending publishes; everything else becomes a transport event.
fn route_frame(frame: RelayFrame, pending: &PendingPublishes) -> Option<TransportEvent> {
    match frame {
        RelayFrame::Subscribed { members, .. } => Some(TransportEvent::Subscribed { members }),
        RelayFrame::MemberJoined { member } => Some(TransportEvent::MemberJoined(member)),
        RelayFrame::MemberLeft { id } => Some(TransportEvent::MemberLeft(id)),
        RelayFrame::Event {
            event,
            data,
            sender,
        } => Some(TransportEvent::Message {
            event,
            payload: data,
            sender: Some(sender),
        }),
        RelayFrame::Published { seq } => {
            match pending.remove(&seq) {
                Some((_, reply)) => {
                    let _ = reply.send(Ok(()));
                }
                None => debug!(seq, "Acknowledgement for an unknown publish"),
            }
            None
        }
        RelayFrame::Error {
            code,
            message,
            limit,
            seq,
        } => {
            error!(?code, ?seq, "Relay reported an error: {}", message);
            if let Some((_, reply)) = seq.and_then(|seq| pending.remove(&seq)) {
                let _ = reply.send(Err(Rejection {
                    code,
                    message,
                    limit,
                }));
            }
            None
        }
        RelayFrame::Subscribe { .. } | RelayFrame::Publish { .. } => {
            warn!("Relay sent a client-only frame");
            None
        }
    }
}

#[async_trait]
impl PubSubTransport for WsTransport {
    fn channel_id(&self) -> &str {
        &self.channel
    }

    fn local_member(&self) -> &RoomMember {
        &self.member
    }

    fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    async fn publish(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        let size = payload_size(&payload)?;
        if size > self.max_message_size {
            return Err(TransportError::PayloadTooLarge {
                size,
                limit: self.max_message_size,
            });
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let frame = RelayFrame::Publish {
            event: event.to_owned(),
            data: payload,
            seq: Some(seq),
        };
        let json = serde_json::to_string(&frame)?;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.insert(seq, reply_tx);
        if self.outbound.send(Message::Text(json.into())).is_err() {
            self.pending.remove(&seq);
            return Err(TransportError::Closed);
        }

        match tokio::time::timeout(PUBLISH_ACK_TIMEOUT, reply_rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(rejection))) => Err(rejection.into_error(&self.channel, size)),
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => {
                self.pending.remove(&seq);
                warn!(seq, event, "Publish was not acknowledged");
                Err(TransportError::Unacknowledged(PUBLISH_ACK_TIMEOUT))
            }
        }
    }

    async fn disconnect(&self) {
        let _ = self.outbound.send(Message::Close(None));
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.send_task.abort();
        self.recv_task.abort();
    }
}
