//! Greedy packing of encoded records into slot-sized chunks.

/// Cloud variables hold at most 256 characters.
pub const DEFAULT_CHUNK_CAPACITY: usize = 256;

/// Packs `records` into chunks of at most `capacity` characters, each
/// prefixed by `header`.
///
/// Single pass, order preserving: a record is appended to the current chunk
/// when it fits, otherwise the current chunk is flushed and a new one starts
/// with `header` followed by the record. Records are never split. A record
/// too large for an empty chunk still gets a chunk of its own, which then
/// exceeds `capacity`.
///
/// Every chunk holds at least one record; an empty input yields no chunks.
/// All chunks are returned, including any beyond the number of slots the
/// caller can write.
///
/// ```
/// use followsync::pack_chunks;
///
/// let chunks = pack_chunks("42", ["abc", "defg", "hi"], 7);
/// assert_eq!(chunks, ["42abc", "42defg", "42hi"]);
/// ```
pub fn pack_chunks<I>(header: &str, records: I, capacity: usize) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut chunks = Vec::new();
    let mut current = String::from(header);

    for record in records {
        let record = record.as_ref();
        let holds_record = current.len() > header.len();
        if holds_record && current.len() + record.len() > capacity {
            chunks.push(core::mem::replace(&mut current, String::from(header)));
        }
        current.push_str(record);
    }

    if current.len() > header.len() {
        chunks.push(current);
    }

    chunks
}
