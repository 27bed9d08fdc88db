use super::delivery::{Delivery, EventKind, Ingest};
use crate::config::{ChunkMode, SessionConfig};
use crate::error::TransportError;
use crate::transport::{PubSubTransport, payload_size};
use duet_core::{Chunk, ChunkBuffer, MemberId, Reassembly, split};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

struct Subscription {
    kind: EventKind,
    handler: mpsc::UnboundedSender<Delivery>,
    buffer: ChunkBuffer,
}

/// Именованные события поверх pub/sub транспорта одной комнаты.
///
/// Публикация: payload, не влезающий в `max_chunk_size`, режется на чанки
/// `{index, data, isLast}`, которые отправляются по одному, с ожиданием
/// каждого. Приём: на каждое подписанное событие свой буфер сборки.
pub struct SignalingChannel {
    transport: Arc<dyn PubSubTransport>,
    max_chunk_size: usize,
    chunk_mode: ChunkMode,
    subscriptions: HashMap<String, Subscription>,
}

impl SignalingChannel {
    pub fn new(transport: Arc<dyn PubSubTransport>, config: &SessionConfig) -> Self {
        let max_chunk_size = config.max_chunk_size.min(transport.max_message_size()).max(1);
        Self {
            transport,
            max_chunk_size,
            chunk_mode: config.chunk_mode,
            subscriptions: HashMap::new(),
        }
    }

    pub fn transport(&self) -> &Arc<dyn PubSubTransport> {
        &self.transport
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    pub fn subscribe(&mut self, event: &str, kind: EventKind) -> mpsc::UnboundedReceiver<Delivery> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe_with(event, kind, tx);
        rx
    }

    /// Several events may share one handler.
    pub fn subscribe_with(
        &mut self,
        event: &str,
        kind: EventKind,
        handler: mpsc::UnboundedSender<Delivery>,
    ) {
        self.subscriptions.insert(
            event.to_owned(),
            Subscription {
                kind,
                handler,
                buffer: ChunkBuffer::new(),
            },
        );
    }

    /// Publishes `payload` under `event`. Returns the number of transport
    /// messages sent (1 for a plain message).
    pub async fn publish<T: Serialize + ?Sized>(
        &self,
        event: &str,
        payload: &T,
    ) -> Result<usize, TransportError> {
        let value = serde_json::to_value(payload)?;
        let text = serde_json::to_string(&value)?;

        if text.len() <= self.max_chunk_size {
            self.transport.publish(event, value).await?;
            return Ok(1);
        }

        let chunks = self.plan_chunks(&text)?;
        let total = chunks.len();
        debug!(event, total, size = text.len(), "Publishing chunked payload");

        for chunk in chunks {
            self.transport.publish(event, chunk).await?;
        }
        Ok(total)
    }

    /// Splits `text` so that every serialized envelope fits the transport ceiling.
    fn plan_chunks(&self, text: &str) -> Result<Vec<Value>, TransportError> {
        let ceiling = self.transport.max_message_size();
        let mut size = match self.chunk_mode {
            ChunkMode::Halves => text.len().div_ceil(2).min(self.max_chunk_size),
            ChunkMode::Bounded => self.max_chunk_size,
        };

        loop {
            let envelopes = split(text, size)
                .iter()
                .map(Chunk::to_value)
                .collect::<Result<Vec<_>, _>>()?;

            let mut largest = 0;
            for envelope in &envelopes {
                largest = largest.max(payload_size(envelope)?);
            }
            if largest <= ceiling {
                return Ok(envelopes);
            }
            if size <= 1 {
                return Err(TransportError::PayloadTooLarge {
                    size: largest,
                    limit: ceiling,
                });
            }
            size = size.saturating_sub(largest - ceiling).max(1);
            debug!(size, "Envelope overhead exceeds the ceiling, splitting finer");
        }
    }

    /// Routes one inbound transport message to its subscriber.
    pub fn ingest(&mut self, event: &str, payload: Value, sender: Option<MemberId>) -> Ingest {
        let Some(sub) = self.subscriptions.get_mut(event) else {
            return Ingest::Unsubscribed;
        };

        let (payload, reassembled) = match sub.kind {
            EventKind::Plain => (payload, false),
            EventKind::Chunked => match Chunk::from_value(&payload) {
                None => (payload, false),
                Some(chunk) => match sub.buffer.accept::<Value>(chunk) {
                    Reassembly::Pending => return Ingest::Pending,
                    Reassembly::Complete(value) => (value, true),
                    Reassembly::Invalid(e) => {
                        warn!(event, "Discarding malformed chunk sequence: {}", e);
                        return Ingest::Malformed(e);
                    }
                },
            },
        };

        let delivery = Delivery {
            event: event.to_owned(),
            payload,
            sender,
        };
        if sub.handler.send(delivery).is_err() {
            debug!(event, "Subscriber is gone, dropping subscription");
            self.subscriptions.remove(event);
            return Ingest::Unsubscribed;
        }
        Ingest::Delivered { reassembled }
    }

    /// Drops partially received sequences of every event.
    pub fn reset(&mut self) {
        for sub in self.subscriptions.values_mut() {
            sub.buffer.reset();
        }
    }
}
