use crate::model::Chunk;

/// Splits serialized text into `ceil(len / max_chunk_size)` ordered chunks.
///
/// Split points are moved forward to the next UTF-8 character boundary, so a
/// chunk may exceed `max_chunk_size` by at most three bytes when the text is
/// not ASCII. An empty payload still produces one (empty, last) chunk.
pub fn split(payload: &str, max_chunk_size: usize) -> Vec<Chunk> {
    let max_chunk_size = max_chunk_size.max(1);
    let len = payload.len();

    if len == 0 {
        return vec![Chunk::new(0, "", true)];
    }

    let mut chunks = Vec::with_capacity(len.div_ceil(max_chunk_size));
    let mut start = 0;
    while start < len {
        let mut end = (start + max_chunk_size).min(len);
        while !payload.is_char_boundary(end) {
            end += 1;
        }
        chunks.push(Chunk::new(
            chunks.len() as u32,
            &payload[start..end],
            end == len,
        ));
        start = end;
    }

    chunks
}

/// Two-chunk split at `ceil(len / 2)`.
pub fn split_in_halves(payload: &str) -> Vec<Chunk> {
    split(payload, payload.len().div_ceil(2))
}
