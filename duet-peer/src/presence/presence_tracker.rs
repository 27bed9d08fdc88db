use super::presence_event::PresenceEvent;
use duet_core::{MemberId, RoomMember};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

/// Текущий состав комнаты, собранный из уведомлений join/leave.
///
/// Локальный участник входит в набор наравне с остальными: так `is_room_full`
/// считает комнату целиком. Подписчики уведомляются синхронно, в момент
/// мутации, и только при реальном изменении набора.
pub struct PresenceTracker {
    local: MemberId,
    members: HashMap<MemberId, RoomMember>,
    subscribers: Vec<mpsc::UnboundedSender<PresenceEvent>>,
}

impl PresenceTracker {
    pub fn new(local: MemberId) -> Self {
        Self {
            local,
            members: HashMap::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn local(&self) -> &MemberId {
        &self.local
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<PresenceEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Returns `true` if the member was not present before.
    pub fn on_join(&mut self, member: RoomMember) -> bool {
        if self.members.contains_key(&member.id) {
            return false;
        }
        debug!(member = %member.id, "Member joined");
        self.members.insert(member.id.clone(), member.clone());
        self.notify(PresenceEvent::Joined(member));
        true
    }

    /// Returns `true` if the member was present.
    pub fn on_leave(&mut self, id: &MemberId) -> bool {
        let Some(member) = self.members.remove(id) else {
            return false;
        };
        debug!(member = %member.id, "Member left");
        self.notify(PresenceEvent::Left(member));
        true
    }

    /// Snapshot ordered by member id.
    pub fn members(&self) -> Vec<RoomMember> {
        let mut members: Vec<RoomMember> = self.members.values().cloned().collect();
        members.sort_by(|a, b| a.id.cmp(&b.id));
        members
    }

    pub fn member(&self, id: &MemberId) -> Option<&RoomMember> {
        self.members.get(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_room_full(&self, capacity: usize) -> bool {
        self.members.len() >= capacity
    }

    pub fn is_alone(&self) -> bool {
        self.peer().is_none()
    }

    /// The one member that is not the local participant.
    pub fn peer(&self) -> Option<&RoomMember> {
        self.members
            .values()
            .filter(|m| m.id != self.local)
            .min_by(|a, b| a.id.cmp(&b.id))
    }

    /// Replaces the set with a subscription snapshot, emitting the difference.
    pub fn reset(&mut self, members: impl IntoIterator<Item = RoomMember>) {
        let incoming: HashMap<MemberId, RoomMember> =
            members.into_iter().map(|m| (m.id.clone(), m)).collect();

        let gone: Vec<MemberId> = self
            .members
            .keys()
            .filter(|id| !incoming.contains_key(*id))
            .cloned()
            .collect();
        for id in gone {
            self.on_leave(&id);
        }

        let mut fresh: Vec<RoomMember> = incoming.into_values().collect();
        fresh.sort_by(|a, b| a.id.cmp(&b.id));
        for member in fresh {
            self.on_join(member);
        }
    }

    /// Transport went away: everyone, the local participant included, has left.
    pub fn clear(&mut self) {
        let mut ids: Vec<MemberId> = self.members.keys().cloned().collect();
        ids.sort();
        for id in ids {
            self.on_leave(&id);
        }
    }

    fn notify(&mut self, event: PresenceEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
