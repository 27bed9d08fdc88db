use duet_core::{CodecError, MemberId};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Plain,
    Chunked,
}

/// Событие, доставленное подписчику: либо как пришло, либо собранное из чанков.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub event: String,
    pub payload: Value,
    pub sender: Option<MemberId>,
}

/// Итог обработки одного входящего сообщения транспорта.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingest {
    Delivered { reassembled: bool },
    /// A chunk was buffered; the sequence is not complete yet.
    Pending,
    Unsubscribed,
    Malformed(CodecError),
}
