use crate::error::RelayError;
use axum::extract::ws::Message;
use dashmap::DashMap;
use duet_core::{RelayFrame, RoomMember};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Идентификатор одного WebSocket-подключения.
pub type ConnectionId = Uuid;

struct Subscriber {
    member: RoomMember,
    conn: ConnectionId,
    tx: mpsc::UnboundedSender<Message>,
}

/// Каналы комнат и их подписчики.
pub struct RoomRegistry {
    channels: DashMap<String, Vec<Subscriber>>,
    capacity: usize,
    max_message_size: usize,
}

impl RoomRegistry {
    pub fn new(capacity: usize, max_message_size: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
            max_message_size,
        }
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Adds `member` to `channel` and returns the member list, including it.
    ///
    /// A connection that reuses a member id replaces the previous one, which
    /// is closed. Other members are notified only about new ids.
    pub fn join(
        &self,
        channel: &str,
        member: RoomMember,
        conn: ConnectionId,
        tx: mpsc::UnboundedSender<Message>,
    ) -> Result<Vec<RoomMember>, RelayError> {
        let mut subscribers = self.channels.entry(channel.to_owned()).or_default();

        let replaced = match subscribers.iter().position(|s| s.member.id == member.id) {
            Some(pos) => {
                let old = subscribers.remove(pos);
                info!(member = %member.id, channel, "Replacing previous connection");
                let _ = old.tx.send(Message::Close(None));
                true
            }
            None => false,
        };

        if !replaced && subscribers.len() >= self.capacity {
            warn!(member = %member.id, channel, "Channel is full");
            return Err(RelayError::CapacityExceeded {
                channel: channel.to_owned(),
                capacity: self.capacity,
            });
        }

        if !replaced {
            let joined = RelayFrame::MemberJoined {
                member: member.clone(),
            };
            for other in subscribers.iter() {
                send_frame(&other.tx, &joined);
            }
        }

        subscribers.push(Subscriber {
            member,
            conn,
            tx,
        });
        Ok(subscribers.iter().map(|s| s.member.clone()).collect())
    }

    /// Relays an event to every other member of the channel.
    pub fn publish(
        &self,
        channel: &str,
        conn: ConnectionId,
        event: String,
        data: serde_json::Value,
    ) -> Result<(), RelayError> {
        let size = serde_json::to_string(&data)
            .map_err(|e| RelayError::BadFrame(e.to_string()))?
            .len();
        if size > self.max_message_size {
            return Err(RelayError::PayloadTooLarge {
                size,
                limit: self.max_message_size,
            });
        }

        let subscribers = self.channels.get(channel).ok_or(RelayError::NotSubscribed)?;
        let sender = subscribers
            .iter()
            .find(|s| s.conn == conn)
            .map(|s| s.member.id.clone())
            .ok_or(RelayError::NotSubscribed)?;

        debug!(channel, %sender, event = %event, size, "Relaying event");
        let frame = RelayFrame::Event {
            event,
            data,
            sender,
        };
        for other in subscribers.iter().filter(|s| s.conn != conn) {
            send_frame(&other.tx, &frame);
        }
        Ok(())
    }

    /// Removes the connection and notifies the rest of the channel.
    pub fn leave(&self, channel: &str, conn: ConnectionId) {
        let Some(mut subscribers) = self.channels.get_mut(channel) else {
            return;
        };
        let Some(pos) = subscribers.iter().position(|s| s.conn == conn) else {
            return;
        };
        let gone = subscribers.remove(pos);
        info!(member = %gone.member.id, channel, "Member left");

        let left = RelayFrame::MemberLeft {
            id: gone.member.id.clone(),
        };
        for other in subscribers.iter() {
            send_frame(&other.tx, &left);
        }

        let empty = subscribers.is_empty();
        drop(subscribers);
        if empty {
            self.channels.remove_if(channel, |_, s| s.is_empty());
        }
    }

    /// Removes the connection from whatever channel still holds it.
    pub fn leave_everywhere(&self, conn: ConnectionId) {
        let channels: Vec<String> = self
            .channels
            .iter()
            .filter(|entry| entry.value().iter().any(|s| s.conn == conn))
            .map(|entry| entry.key().clone())
            .collect();
        for channel in channels {
            self.leave(&channel, conn);
        }
    }

    pub fn members(&self, channel: &str) -> Vec<RoomMember> {
        self.channels
            .get(channel)
            .map(|s| s.iter().map(|s| s.member.clone()).collect())
            .unwrap_or_default()
    }
}

pub(crate) fn send_frame(tx: &mpsc::UnboundedSender<Message>, frame: &RelayFrame) {
    match serde_json::to_string(frame) {
        Ok(json) => {
            if tx.send(Message::Text(json.into())).is_err() {
                debug!("Dropping frame for a closed connection");
            }
        }
        Err(e) => error!("Failed to serialize relay frame: {}", e),
    }
}
