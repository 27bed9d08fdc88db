use super::coordinator::{Coordinator, CoordinatorChannels};
use super::generation::Generation;
use super::session_command::SessionCommand;
use super::session_event::SessionEvent;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::media::{MediaSource, MediaTransportFactory};
use crate::signaling::SignalingChannel;
use crate::transport::{PubSubTransport, TransportEvent};
use duet_core::{Negotiation, NegotiationState, RemoteStream, RoomMember, SessionRole};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{error, info};

const EVENT_BUFFER: usize = 256;

/// Участник комнаты: роль, текущее состояние переговоров, удалённый поток.
///
/// Создаётся через [`Session::start`], который подписывается на сигнальные
/// события, открывает первый экземпляр соединения и запускает актор.
pub struct Session {
    role: SessionRole,
    local: RoomMember,
    commands: mpsc::Sender<SessionCommand>,
    generation: Arc<Generation>,
    state_rx: watch::Receiver<NegotiationState>,
    stream_rx: watch::Receiver<RemoteStream>,
    events_tx: broadcast::Sender<SessionEvent>,
    /// Receiver created before startup, handed out by the first `events()` call.
    first_events: Mutex<Option<broadcast::Receiver<SessionEvent>>>,
}

impl Session {
    /// Joins the room behind `transport`.
    ///
    /// `transport_rx` must be the event stream of that same transport. Fails if
    /// the first connection instance cannot be opened; the transport is
    /// disconnected in that case.
    pub async fn start(
        config: SessionConfig,
        transport: Arc<dyn PubSubTransport>,
        transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
        factory: Arc<dyn MediaTransportFactory>,
        media_source: Arc<dyn MediaSource>,
    ) -> Result<Self, SessionError> {
        let local = transport.local_member().clone();
        let role = SessionRole::from_owner(config.is_owner);
        let negotiation = Negotiation::new(role, local.id.clone());

        let (command_tx, command_rx) = mpsc::channel(config.inbox_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(NegotiationState::Idle);
        let (stream_tx, stream_rx) = watch::channel(RemoteStream::new());
        let (events_tx, first_events) = broadcast::channel(EVENT_BUFFER);
        let generation = Arc::new(Generation::default());

        let signaling = SignalingChannel::new(transport.clone(), &config);
        let mut coordinator = Coordinator::new(
            config,
            negotiation,
            signaling,
            CoordinatorChannels {
                commands: command_rx,
                transport: transport_rx,
                state: state_tx,
                stream: stream_tx,
                events: events_tx.clone(),
            },
            factory,
            media_source,
            generation.clone(),
        );

        if let Err(e) = coordinator.start().await {
            error!(member = %local.id, "Failed to start session: {}", e);
            transport.disconnect().await;
            return Err(e);
        }

        tokio::spawn(coordinator.run());
        info!(member = %local.id, %role, channel = transport.channel_id(), "Session started");

        Ok(Self {
            role,
            local,
            commands: command_tx,
            generation,
            state_rx,
            stream_rx,
            events_tx,
            first_events: Mutex::new(Some(first_events)),
        })
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn local_member(&self) -> &RoomMember {
        &self.local
    }

    pub fn state(&self) -> NegotiationState {
        *self.state_rx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<NegotiationState> {
        self.state_rx.clone()
    }

    /// Снимок удалённого потока текущего экземпляра.
    pub fn remote_stream(&self) -> RemoteStream {
        self.stream_rx.borrow().clone()
    }

    pub fn watch_remote_stream(&self) -> watch::Receiver<RemoteStream> {
        self.stream_rx.clone()
    }

    /// Subscribes to session events. The first call also sees the events
    /// emitted during startup.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        let first = match self.first_events.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        first.unwrap_or_else(|| self.events_tx.subscribe())
    }

    /// Waits until the negotiation reaches `target`.
    pub async fn wait_for_state(
        &self,
        target: NegotiationState,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        let mut rx = self.state_rx.clone();
        match tokio::time::timeout(timeout, rx.wait_for(|s| *s == target)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(SessionError::Closed),
            Err(_) => Err(SessionError::WaitTimedOut(self.state())),
        }
    }

    /// Publishes a chat message to the room.
    pub async fn send_chat(&self, body: impl Into<String>) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::SendChat {
                body: body.into(),
                reply,
            })
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Leaves the room: in-flight negotiation work is cancelled, the current
    /// instance is closed and the transport disconnected. Idempotent.
    pub async fn leave(&self) -> Result<(), SessionError> {
        self.generation.invalidate();

        let (reply, rx) = oneshot::channel();
        if self.commands.send(SessionCommand::Leave { reply }).await.is_err() {
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }
}
