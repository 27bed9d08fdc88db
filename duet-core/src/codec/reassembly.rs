use crate::error::CodecError;
use crate::model::Chunk;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

#[derive(Debug)]
pub enum Reassembly<T> {
    Pending,
    Complete(T),
    Invalid(CodecError),
}

impl<T> Reassembly<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Буфер сборки одной логической последовательности для пары (канал, событие).
///
/// Последовательность считается полной, когда есть чанк с `index == 0`, чанк с
/// `isLast == true` и все индексы между ними. Повтор уже занятого индекса
/// игнорируется: побеждает первая копия. Идентификатора последовательности в
/// конверте нет, поэтому два разных сообщения, опубликованных подряд под одним
/// именем, могут перемешаться.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: BTreeMap<u32, Chunk>,
    /// Indices currently held by a copy of the last completed sequence. The
    /// buffer never mixes such copies with chunks of a new sequence.
    redelivered: BTreeSet<u32>,
    completed: Vec<Chunk>,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept<T: DeserializeOwned>(&mut self, chunk: Chunk) -> Reassembly<T> {
        let is_redelivery = self.completed.contains(&chunk);

        if is_redelivery && self.holds_fresh_chunks() {
            debug!(index = chunk.index, "Late copy of a completed sequence dropped");
            return Reassembly::Pending;
        }
        if !is_redelivery && !self.redelivered.is_empty() {
            debug!(
                held = self.redelivered.len(),
                "Discarding held copies of the completed sequence"
            );
            let redelivered = std::mem::take(&mut self.redelivered);
            self.chunks.retain(|index, _| !redelivered.contains(index));
        }

        if let Some(existing) = self.chunks.get(&chunk.index) {
            if *existing == chunk {
                debug!(index = chunk.index, "Duplicate chunk ignored");
            } else {
                debug!(index = chunk.index, "Duplicate chunk index ignored");
            }
            return Reassembly::Pending;
        }
        if is_redelivery {
            self.redelivered.insert(chunk.index);
        }
        self.chunks.insert(chunk.index, chunk);

        let Some(last) = self.chunks.values().find(|c| c.is_last).map(|c| c.index) else {
            return Reassembly::Pending;
        };
        if !(0..=last).all(|i| self.chunks.contains_key(&i)) {
            return Reassembly::Pending;
        }

        let mut held = std::mem::take(&mut self.chunks);
        self.redelivered.clear();
        if !held.is_empty() && held.len() as u32 > last + 1 {
            warn!(
                extra = held.len() as u32 - last - 1,
                "Discarding chunks past the end-of-sequence marker"
            );
        }
        let sequence: Vec<Chunk> = (0..=last).filter_map(|i| held.remove(&i)).collect();

        if sequence == self.completed {
            debug!("Redelivered sequence suppressed");
            return Reassembly::Pending;
        }

        let text: String = sequence.iter().map(|c| c.data.as_str()).collect();
        match serde_json::from_str::<T>(&text) {
            Ok(payload) => {
                self.completed = sequence;
                Reassembly::Complete(payload)
            }
            Err(e) => {
                self.completed.clear();
                Reassembly::Invalid(CodecError::Malformed(e.to_string()))
            }
        }
    }

    fn holds_fresh_chunks(&self) -> bool {
        self.chunks.len() > self.redelivered.len()
    }

    pub fn pending_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn reset(&mut self) {
        self.chunks.clear();
        self.redelivered.clear();
        self.completed.clear();
    }
}
