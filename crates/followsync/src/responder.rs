//! Turns one raw request into the chunks written back to the return slots.

use crate::{
    RelationSetResolver, RelationSource, Request, SENTINEL, SlotLayout, TimeSource,
    encode_identifier, length_wrap, pack_chunks,
};
use std::sync::Arc;

/// Chunks produced for one request, in slot order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    chunks: Vec<String>,
}

impl Reply {
    pub const fn new(chunks: Vec<String>) -> Self {
        Self { chunks }
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Chunks that do not fit in the return slots.
    pub fn overflow(&self, slots: &SlotLayout) -> usize {
        self.chunks.len().saturating_sub(slots.return_slots)
    }

    /// The `(slot, value)` writes that publish this reply: one chunk per
    /// return slot, the sentinel in return slots past the last chunk, and
    /// finally the sentinel in the request slot. Chunks beyond the return
    /// slots are dropped.
    ///
    /// ```
    /// use followsync::{Reply, SlotLayout};
    ///
    /// let slots = SlotLayout {
    ///     return_slots: 2,
    ///     ..SlotLayout::default()
    /// };
    /// let writes = Reply::new(vec!["7a".into()]).slot_writes(&slots);
    /// assert_eq!(
    ///     writes,
    ///     [
    ///         ("☁return1".to_string(), "7a".to_string()),
    ///         ("☁return2".to_string(), "0".to_string()),
    ///         ("☁request".to_string(), "0".to_string()),
    ///     ]
    /// );
    /// ```
    pub fn slot_writes(&self, slots: &SlotLayout) -> Vec<(String, String)> {
        let mut writes: Vec<_> = (1..=slots.return_slots)
            .map(|index| {
                let value = self
                    .chunks
                    .get(index - 1)
                    .map_or(SENTINEL, String::as_str);
                (slots.return_slot(index), value.to_owned())
            })
            .collect();
        writes.push((slots.request.clone(), SENTINEL.to_owned()));
        writes
    }
}

/// Computes the reply for a raw request slot value.
///
/// `None` means the request is ignored: nothing is written back, not even the
/// request slot reset.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(&self, raw: String) -> impl Future<Output = Option<Reply>> + Send;
}

impl<H: RequestHandler> RequestHandler for Arc<H> {
    fn handle(&self, raw: String) -> impl Future<Output = Option<Reply>> + Send {
        (**self).handle(raw)
    }
}

/// The production [`RequestHandler`]: parse, resolve, encode, chunk.
pub struct Responder<S, T> {
    resolver: Arc<RelationSetResolver<S, T>>,
    chunk_capacity: usize,
}

impl<S, T> Responder<S, T>
where
    S: RelationSource,
    T: TimeSource + Send + 'static,
{
    pub const fn new(resolver: Arc<RelationSetResolver<S, T>>, chunk_capacity: usize) -> Self {
        Self {
            resolver,
            chunk_capacity,
        }
    }

    pub async fn respond(&self, raw: &str) -> Option<Reply> {
        let request = match Request::parse(raw) {
            Ok(request) => request,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(raw, "ignoring malformed request: {_e}");
                return None;
            }
        };

        #[cfg(feature = "tracing")]
        tracing::info!(
            kind = %request.kind,
            subject = %request.identifier,
            range_start = request.range_start,
            range_end = request.range_end,
            "request"
        );

        let names = self
            .resolver
            .resolve(
                request.kind,
                &request.identifier,
                request.range_start,
                request.range_end,
            )
            .await;
        let records = names
            .iter()
            .map(|name| length_wrap(&encode_identifier(name)));
        let chunks = pack_chunks(&request.correlation_id, records, self.chunk_capacity);

        #[cfg(feature = "tracing")]
        tracing::debug!(records = names.len(), chunks = chunks.len(), "packed reply");
        Some(Reply::new(chunks))
    }
}

impl<S, T> RequestHandler for Responder<S, T>
where
    S: RelationSource,
    T: TimeSource + Send + 'static,
{
    fn handle(&self, raw: String) -> impl Future<Output = Option<Reply>> + Send {
        async move { self.respond(&raw).await }
    }
}
