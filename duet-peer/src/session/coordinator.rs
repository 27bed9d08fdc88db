use super::generation::Generation;
use super::session_command::SessionCommand;
use super::session_event::SessionEvent;
use crate::config::SessionConfig;
use crate::error::{MediaError, SessionError};
use crate::media::{MediaEvent, MediaSource, MediaTransport, MediaTransportFactory};
use crate::presence::{PresenceEvent, PresenceTracker};
use crate::signaling::{Delivery, EventKind, Ingest, SignalingChannel};
use crate::transport::TransportEvent;
use duet_core::{
    AnswerPayload, CHUNKED_ANSWER, CHUNKED_OFFER, ChatMessage, Effect, MESSAGE, MediaTrack,
    MemberId, Negotiation, NegotiationError, NegotiationInput, NegotiationState, OfferPayload,
    RemoteStream, Step, USER_JOINED, UserJoined,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Один медиатранспорт со своими локальными треками.
struct ConnectionInstance {
    generation: u64,
    transport: Arc<dyn MediaTransport>,
    local_tracks: Vec<MediaTrack>,
    forwarder: JoinHandle<()>,
}

enum Outcome {
    Done,
    FollowUp(NegotiationInput),
    /// The instance was retired while the effect was awaited.
    Cancelled,
}

pub(crate) struct CoordinatorChannels {
    pub(crate) commands: mpsc::Receiver<SessionCommand>,
    pub(crate) transport: mpsc::UnboundedReceiver<TransportEvent>,
    pub(crate) state: watch::Sender<NegotiationState>,
    pub(crate) stream: watch::Sender<RemoteStream>,
    pub(crate) events: broadcast::Sender<SessionEvent>,
}

/// Актор переговоров одного участника.
/// Владеет составом комнаты, сигнальным каналом и текущим экземпляром соединения.
pub(crate) struct Coordinator {
    config: SessionConfig,
    negotiation: Negotiation,

    presence: PresenceTracker,
    presence_rx: mpsc::UnboundedReceiver<PresenceEvent>,

    signaling: SignalingChannel,
    delivery_rx: mpsc::UnboundedReceiver<Delivery>,

    /// Внешние команды (Session -> Coordinator).
    command_rx: mpsc::Receiver<SessionCommand>,

    /// События pub/sub транспорта.
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,

    /// События медиатранспорта, помеченные поколением экземпляра.
    media_tx: mpsc::UnboundedSender<(u64, MediaEvent)>,
    media_rx: mpsc::UnboundedReceiver<(u64, MediaEvent)>,

    factory: Arc<dyn MediaTransportFactory>,
    media_source: Arc<dyn MediaSource>,

    instance: Option<ConnectionInstance>,
    state: NegotiationState,
    generation: Arc<Generation>,

    state_tx: watch::Sender<NegotiationState>,
    stream_tx: watch::Sender<RemoteStream>,
    events_tx: broadcast::Sender<SessionEvent>,

    deadline: Option<Instant>,
    /// Cleared once the local participant leaves; no instance is opened after that.
    active: bool,
}

impl Coordinator {
    pub(crate) fn new(
        config: SessionConfig,
        negotiation: Negotiation,
        mut signaling: SignalingChannel,
        channels: CoordinatorChannels,
        factory: Arc<dyn MediaTransportFactory>,
        media_source: Arc<dyn MediaSource>,
        generation: Arc<Generation>,
    ) -> Self {
        let mut presence = PresenceTracker::new(negotiation.local().clone());
        let presence_rx = presence.subscribe();

        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        signaling.subscribe_with(CHUNKED_OFFER, EventKind::Chunked, delivery_tx.clone());
        signaling.subscribe_with(CHUNKED_ANSWER, EventKind::Chunked, delivery_tx.clone());
        signaling.subscribe_with(MESSAGE, EventKind::Plain, delivery_tx.clone());
        signaling.subscribe_with(USER_JOINED, EventKind::Plain, delivery_tx);

        let (media_tx, media_rx) = mpsc::unbounded_channel();

        Self {
            config,
            negotiation,
            presence,
            presence_rx,
            signaling,
            delivery_rx,
            command_rx: channels.commands,
            transport_rx: channels.transport,
            media_tx,
            media_rx,
            factory,
            media_source,
            instance: None,
            state: NegotiationState::Idle,
            generation,
            state_tx: channels.state,
            stream_tx: channels.stream,
            events_tx: channels.events,
            deadline: None,
            active: true,
        }
    }

    /// Local join: opens the first connection instance and announces the member.
    ///
    /// Errors here are fatal for the session (e.g. media access denied).
    pub(crate) async fn start(&mut self) -> Result<(), SessionError> {
        let role = self.negotiation.role();
        info!(member = %self.negotiation.local(), %role, "Starting session");
        self.emit(SessionEvent::RoleAssigned(role));

        self.feed(NegotiationInput::LocalJoined).await?;

        let announce = UserJoined {
            user_id: self.negotiation.local().clone(),
        };
        if let Err(e) = self.signaling.publish(USER_JOINED, &announce).await {
            warn!("Failed to announce local member: {}", e);
        }
        Ok(())
    }

    /// Главный цикл актора. Должен быть запущен через tokio::spawn.
    pub(crate) async fn run(mut self) {
        info!("Coordinator event loop started");

        loop {
            let deadline = self.deadline;

            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SessionCommand::Leave { reply }) => {
                            self.leave().await;
                            let _ = reply.send(());
                            break;
                        }
                        Some(SessionCommand::SendChat { body, reply }) => {
                            let _ = reply.send(self.send_chat(body).await);
                        }
                        None => {
                            info!("Session handle dropped. Leaving the room.");
                            self.leave().await;
                            break;
                        }
                    }
                }

                evt = self.transport_rx.recv() => {
                    match evt {
                        Some(TransportEvent::Disconnected) | None => {
                            warn!("Transport disconnected");
                            self.on_disconnected().await;
                            break;
                        }
                        Some(e) => self.handle_transport_event(e).await,
                    }
                }

                Some((generation, event)) = self.media_rx.recv() => {
                    self.handle_media_event(generation, event);
                }

                _ = sleep_until(deadline) => {
                    self.on_deadline().await;
                }
            }
        }

        info!("Coordinator event loop finished");
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Subscribed { members } => {
                debug!(count = members.len(), "Presence snapshot received");
                self.presence.reset(members);
            }
            TransportEvent::MemberJoined(member) => {
                self.presence.on_join(member);
            }
            TransportEvent::MemberLeft(id) => {
                self.presence.on_leave(&id);
            }
            TransportEvent::Message {
                event,
                payload,
                sender,
            } => {
                self.on_message(&event, payload, sender);
            }
            TransportEvent::Disconnected => {}
        }

        self.drain_presence().await;
        self.drain_deliveries().await;
    }

    fn on_message(&mut self, event: &str, payload: Value, sender: Option<MemberId>) {
        match self.signaling.ingest(event, payload, sender) {
            Ingest::Delivered { reassembled: true } => {
                debug!(event, "Chunked payload reassembled");
                self.emit(SessionEvent::ReassemblyCompleted {
                    event: event.to_owned(),
                });
            }
            Ingest::Delivered { reassembled: false } | Ingest::Pending => {}
            Ingest::Unsubscribed => debug!(event, "Ignoring unsubscribed event"),
            Ingest::Malformed(e) => {
                self.emit(SessionEvent::ReassemblyFailed {
                    event: event.to_owned(),
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn drain_presence(&mut self) {
        while let Ok(event) = self.presence_rx.try_recv() {
            self.handle_presence_event(event).await;
        }
    }

    async fn drain_deliveries(&mut self) {
        while let Ok(delivery) = self.delivery_rx.try_recv() {
            self.handle_delivery(delivery).await;
        }
    }

    async fn handle_presence_event(&mut self, event: PresenceEvent) {
        let local = self.negotiation.local().clone();

        match event {
            PresenceEvent::Joined(member) if member.id != local => {
                info!(peer = %member.id, "Peer joined the room");
                if self.presence.len() > self.config.room_capacity {
                    warn!(peer = %member.id, "Room is over capacity");
                    self.emit_error(NegotiationError::CapacityExceeded {
                        channel: self.signaling.transport().channel_id().to_string(),
                        capacity: self.config.room_capacity,
                    });
                }
                self.emit(SessionEvent::PeerJoined(member));

                if !self.active {
                    return;
                }
                if self.state.is_closed() {
                    // New peer after teardown: a fresh instance from Idle.
                    self.set_state(NegotiationState::Idle);
                    self.feed_reporting(NegotiationInput::LocalJoined).await;
                }
                self.feed_reporting(NegotiationInput::PeerJoined).await;
                self.arm_deadline();
            }
            PresenceEvent::Left(member) if member.id != local => {
                info!(peer = %member.id, "Peer left the room");
                self.emit(SessionEvent::PeerLeft(member));

                if self.presence.is_alone() {
                    self.feed_reporting(NegotiationInput::Teardown).await;
                }
            }
            _ => {}
        }
    }

    async fn handle_delivery(&mut self, delivery: Delivery) {
        let Delivery { event, payload, .. } = delivery;

        match event.as_str() {
            CHUNKED_OFFER => {
                if let Some(offer) = self.decode::<OfferPayload>(&event, payload) {
                    self.feed_reporting(NegotiationInput::OfferReceived(offer))
                        .await;
                }
            }
            CHUNKED_ANSWER => {
                if let Some(answer) = self.decode::<AnswerPayload>(&event, payload) {
                    self.feed_reporting(NegotiationInput::AnswerReceived(answer))
                        .await;
                }
            }
            MESSAGE => {
                if let Some(message) = self.decode::<ChatMessage>(&event, payload) {
                    self.emit(SessionEvent::Chat(message));
                }
            }
            USER_JOINED => {
                if let Some(joined) = self.decode::<UserJoined>(&event, payload) {
                    self.emit(SessionEvent::MemberAnnounced(joined.user_id));
                }
            }
            other => debug!(event = other, "No handler for event"),
        }
    }

    fn decode<T: DeserializeOwned>(&self, event: &str, payload: Value) -> Option<T> {
        match serde_json::from_value(payload) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(event, "Malformed payload: {}", e);
                self.emit(SessionEvent::ReassemblyFailed {
                    event: event.to_owned(),
                    reason: e.to_string(),
                });
                self.emit_error(NegotiationError::MalformedReassembly {
                    event: event.to_owned(),
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    fn handle_media_event(&mut self, generation: u64, event: MediaEvent) {
        if !self.generation.is_current(generation) {
            debug!(generation, "Dropping media event of a retired instance");
            return;
        }

        match event {
            MediaEvent::RemoteTrack(track) => {
                let mut added = false;
                self.stream_tx.send_modify(|stream| added = stream.add_track(track.clone()));
                if added {
                    self.emit(SessionEvent::RemoteTrack(track));
                }
            }
            MediaEvent::Connectivity(state) => {
                self.emit(SessionEvent::ConnectivityChanged(state));
            }
        }
    }

    async fn send_chat(&mut self, body: String) -> Result<(), SessionError> {
        let message = ChatMessage {
            body,
            sender_id: self.negotiation.local().clone(),
        };
        self.signaling.publish(MESSAGE, &message).await?;
        Ok(())
    }

    async fn leave(&mut self) {
        info!("Leaving the room");
        self.active = false;
        self.feed_reporting(NegotiationInput::Teardown).await;
        self.signaling.transport().disconnect().await;
    }

    async fn on_disconnected(&mut self) {
        self.active = false;
        self.presence.clear();
        self.drain_presence().await;
        self.feed_reporting(NegotiationInput::Teardown).await;
    }

    async fn on_deadline(&mut self) {
        self.deadline = None;
        let Some(timeout) = self.config.negotiation_timeout else {
            return;
        };
        if matches!(self.state, NegotiationState::Connected | NegotiationState::Closed) {
            return;
        }

        error!(state = %self.state, "Negotiation did not complete in {:?}", timeout);
        self.emit_error(NegotiationError::NegotiationTimedOut(timeout));
        self.feed_reporting(NegotiationInput::Teardown).await;
    }

    fn arm_deadline(&mut self) {
        let Some(timeout) = self.config.negotiation_timeout else {
            return;
        };
        if self.deadline.is_none()
            && !matches!(self.state, NegotiationState::Connected | NegotiationState::Closed)
        {
            self.deadline = Some(Instant::now() + timeout);
        }
    }

    /// Feeds an input and reports a failure as an event instead of returning it.
    async fn feed_reporting(&mut self, input: NegotiationInput) {
        if let Err(e) = self.feed(input).await {
            error!("Negotiation step failed: {}", e);
            self.emit(SessionEvent::Error(Arc::new(e)));
        }
    }

    /// Runs one input and every follow-up it produces through the transition
    /// function. A state is committed only after all of its effects succeeded.
    async fn feed(&mut self, input: NegotiationInput) -> Result<(), SessionError> {
        let mut pending = VecDeque::from([input]);

        while let Some(input) = pending.pop_front() {
            let step = match self.negotiation.step(self.state, &input) {
                Ok(step) => step,
                Err(NegotiationError::StaleEvent { state, input }) => {
                    warn!(input, %state, "Stale negotiation input discarded");
                    self.emit(SessionEvent::StaleEvent { input, state });
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let Step::Advance { next, effects } = step else {
                debug!(input = input.name(), state = %self.state, "Input ignored");
                continue;
            };

            for effect in effects {
                match self.execute(effect).await? {
                    Outcome::Done => {}
                    Outcome::FollowUp(follow_up) => pending.push_back(follow_up),
                    Outcome::Cancelled => {
                        info!(input = input.name(), "In-flight negotiation step cancelled");
                        return Ok(());
                    }
                }
            }

            self.set_state(next);
        }

        Ok(())
    }

    async fn execute(&mut self, effect: Effect) -> Result<Outcome, SessionError> {
        match effect {
            Effect::OpenConnection => {
                self.open_instance().await?;
                Ok(Outcome::Done)
            }

            Effect::Close => {
                let generation = self.close_instance().await;
                self.signaling.reset();
                self.emit(SessionEvent::TornDown {
                    generation: generation.unwrap_or_default(),
                });
                Ok(Outcome::Done)
            }

            Effect::CreateOffer => {
                let (generation, transport) = self.current_transport("create_offer")?;
                let Some(result) = self.cancellable(generation, transport.create_offer()).await
                else {
                    return Ok(Outcome::Cancelled);
                };
                match result? {
                    Some(offer) if !offer.is_empty() => {
                        Ok(Outcome::FollowUp(NegotiationInput::LocalOfferReady(offer)))
                    }
                    _ => Err(NegotiationError::OfferUnavailable.into()),
                }
            }

            Effect::CreateAnswer(offer) => {
                let (generation, transport) = self.current_transport("create_answer")?;
                let Some(result) = self
                    .cancellable(generation, transport.create_answer(&offer))
                    .await
                else {
                    return Ok(Outcome::Cancelled);
                };
                match result? {
                    Some(answer) if !answer.is_empty() => {
                        Ok(Outcome::FollowUp(NegotiationInput::LocalAnswerReady(answer)))
                    }
                    _ => Err(NegotiationError::AnswerUnavailable.into()),
                }
            }

            Effect::ApplyAnswer(answer) => {
                let (generation, transport) = self.current_transport("set_remote_description")?;
                let Some(result) = self
                    .cancellable(generation, transport.set_remote_description(&answer))
                    .await
                else {
                    return Ok(Outcome::Cancelled);
                };
                result?;
                Ok(Outcome::Done)
            }

            Effect::Publish(message) => {
                let (generation, _) = self.current_transport("publish")?;
                let event = message.event();
                let Some(result) = self
                    .cancellable(generation, self.signaling.publish(event.as_str(), &message))
                    .await
                else {
                    return Ok(Outcome::Cancelled);
                };
                let sent = result?;
                debug!(%event, messages = sent, "Session description published");
                Ok(Outcome::Done)
            }
        }
    }

    /// Awaits `fut` unless the instance `generation` is retired first.
    /// Returns `None` when the result must be discarded.
    async fn cancellable<F: Future>(&self, generation: u64, fut: F) -> Option<F::Output> {
        let cancelled = self.generation.cancelled();
        tokio::pin!(cancelled);
        cancelled.as_mut().enable();

        if !self.generation.is_current(generation) {
            return None;
        }

        let output = tokio::select! {
            biased;
            _ = &mut cancelled => return None,
            output = fut => output,
        };

        self.generation.is_current(generation).then_some(output)
    }

    fn current_transport(
        &self,
        operation: &'static str,
    ) -> Result<(u64, Arc<dyn MediaTransport>), NegotiationError> {
        self.instance
            .as_ref()
            .map(|i| (i.generation, i.transport.clone()))
            .ok_or(NegotiationError::TransportUnavailable { operation })
    }

    async fn open_instance(&mut self) -> Result<(), SessionError> {
        self.close_instance().await;

        let tracks = self.media_source.acquire().await.map_err(|e| match e {
            MediaError::AccessDenied(reason) => {
                SessionError::from(NegotiationError::MediaAccessDenied(reason))
            }
            other => SessionError::from(other),
        })?;

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let transport = match self.factory.create(events_tx).await {
            Ok(transport) => transport,
            Err(e) => {
                self.media_source.release(&tracks).await;
                return Err(e.into());
            }
        };

        for track in &tracks {
            if let Err(e) = transport.add_local_track(track).await {
                let _ = transport.close().await;
                self.media_source.release(&tracks).await;
                return Err(e.into());
            }
        }

        let generation = self.generation.advance();
        let media_tx = self.media_tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                if media_tx.send((generation, event)).is_err() {
                    break;
                }
            }
        });

        self.stream_tx.send_replace(RemoteStream::new());
        self.instance = Some(ConnectionInstance {
            generation,
            transport,
            local_tracks: tracks,
            forwarder,
        });

        info!(generation, "Connection instance opened");
        Ok(())
    }

    /// Closes the current instance, if any, and returns its generation.
    async fn close_instance(&mut self) -> Option<u64> {
        let instance = self.instance.take()?;
        self.generation.advance();
        self.deadline = None;

        instance.forwarder.abort();
        if let Err(e) = instance.transport.close().await {
            warn!(generation = instance.generation, "Failed to close media transport: {}", e);
        }
        self.media_source.release(&instance.local_tracks).await;
        self.stream_tx.send_replace(RemoteStream::new());

        info!(generation = instance.generation, "Connection instance closed");
        Some(instance.generation)
    }

    fn set_state(&mut self, next: NegotiationState) {
        if next == self.state {
            return;
        }
        let from = std::mem::replace(&mut self.state, next);
        let generation = self.instance.as_ref().map_or(0, |i| i.generation);
        info!(%from, to = %next, generation, "Negotiation state changed");

        if next == NegotiationState::Connected {
            self.deadline = None;
        }
        self.state_tx.send_replace(next);
        self.emit(SessionEvent::StateChanged {
            from,
            to: next,
            generation,
        });
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events_tx.send(event);
    }

    fn emit_error(&self, err: NegotiationError) {
        self.emit(SessionEvent::Error(Arc::new(err.into())));
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
