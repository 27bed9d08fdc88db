use super::pubsub_transport::{PubSubTransport, payload_size};
use super::transport_event::TransportEvent;
use crate::config::{DEFAULT_MAX_CHUNK_SIZE, DEFAULT_ROOM_CAPACITY};
use crate::error::TransportError;
use async_trait::async_trait;
use dashmap::DashMap;
use duet_core::RoomMember;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

struct LocalMember {
    member: RoomMember,
    token: u64,
    tx: mpsc::UnboundedSender<TransportEvent>,
}

struct BusInner {
    channels: DashMap<String, Vec<LocalMember>>,
    next_token: AtomicU64,
    max_message_size: usize,
    capacity: usize,
}

/// Внутрипроцессная шина присутствия: каналы комнат, уведомления join/leave,
/// потолок размера сообщения и вместимость комнаты.
#[derive(Clone)]
pub struct LocalBus {
    inner: Arc<BusInner>,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_SIZE, DEFAULT_ROOM_CAPACITY)
    }
}

impl LocalBus {
    pub fn new(max_message_size: usize, capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                channels: DashMap::new(),
                next_token: AtomicU64::new(1),
                max_message_size,
                capacity,
            }),
        }
    }

    pub fn max_message_size(&self) -> usize {
        self.inner.max_message_size
    }

    /// Subscribes `member` to `channel`.
    ///
    /// A member that is already subscribed under the same id is replaced: its
    /// old connection receives `Disconnected` and the others see no change.
    pub fn connect(
        &self,
        channel: &str,
        member: RoomMember,
    ) -> Result<(LocalBusClient, mpsc::UnboundedReceiver<TransportEvent>), TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);

        {
            let mut members = self.inner.channels.entry(channel.to_owned()).or_default();

            let replaced = match members.iter().position(|m| m.member.id == member.id) {
                Some(pos) => {
                    let old = members.remove(pos);
                    debug!(member = %member.id, channel, "Replacing previous subscription");
                    let _ = old.tx.send(TransportEvent::Disconnected);
                    true
                }
                None => false,
            };

            if !replaced && members.len() >= self.inner.capacity {
                warn!(member = %member.id, channel, "Channel is full");
                return Err(TransportError::CapacityExceeded {
                    channel: channel.to_owned(),
                    capacity: self.inner.capacity,
                });
            }

            if !replaced {
                for other in members.iter() {
                    let _ = other.tx.send(TransportEvent::MemberJoined(member.clone()));
                }
            }

            members.push(LocalMember {
                member: member.clone(),
                token,
                tx: tx.clone(),
            });

            let snapshot = members.iter().map(|m| m.member.clone()).collect();
            let _ = tx.send(TransportEvent::Subscribed { members: snapshot });
        }

        info!(member = %member.id, channel, "Subscribed to local channel");

        let client = LocalBusClient {
            bus: self.clone(),
            channel: channel.to_owned(),
            member,
            token,
        };
        Ok((client, rx))
    }

    pub fn members(&self, channel: &str) -> Vec<RoomMember> {
        self.inner
            .channels
            .get(channel)
            .map(|members| members.iter().map(|m| m.member.clone()).collect())
            .unwrap_or_default()
    }

    fn publish_from(
        &self,
        channel: &str,
        token: u64,
        event: &str,
        payload: Value,
    ) -> Result<(), TransportError> {
        let size = payload_size(&payload)?;
        if size > self.inner.max_message_size {
            return Err(TransportError::PayloadTooLarge {
                size,
                limit: self.inner.max_message_size,
            });
        }

        let members = self.inner.channels.get(channel).ok_or(TransportError::Closed)?;
        let sender = members
            .iter()
            .find(|m| m.token == token)
            .map(|m| m.member.id.clone())
            .ok_or(TransportError::Closed)?;

        for other in members.iter().filter(|m| m.token != token) {
            let _ = other.tx.send(TransportEvent::Message {
                event: event.to_owned(),
                payload: payload.clone(),
                sender: Some(sender.clone()),
            });
        }
        Ok(())
    }

    fn leave(&self, channel: &str, token: u64) {
        let Some(mut members) = self.inner.channels.get_mut(channel) else {
            return;
        };
        let Some(pos) = members.iter().position(|m| m.token == token) else {
            return;
        };
        let gone = members.remove(pos);
        info!(member = %gone.member.id, channel, "Left local channel");

        for other in members.iter() {
            let _ = other.tx.send(TransportEvent::MemberLeft(gone.member.id.clone()));
        }
        let _ = gone.tx.send(TransportEvent::Disconnected);

        let empty = members.is_empty();
        drop(members);
        if empty {
            self.inner.channels.remove_if(channel, |_, m| m.is_empty());
        }
    }
}

/// Подключение одного участника к каналу `LocalBus`.
pub struct LocalBusClient {
    bus: LocalBus,
    channel: String,
    member: RoomMember,
    token: u64,
}

#[async_trait]
impl PubSubTransport for LocalBusClient {
    fn channel_id(&self) -> &str {
        &self.channel
    }

    fn local_member(&self) -> &RoomMember {
        &self.member
    }

    fn max_message_size(&self) -> usize {
        self.bus.max_message_size()
    }

    async fn publish(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        self.bus.publish_from(&self.channel, self.token, event, payload)
    }

    async fn disconnect(&self) {
        self.bus.leave(&self.channel, self.token);
    }
}
