//! Relation lists and the set views derived from them.
//!
//! [`RelationSetResolver`] reads follow lists page by page from a
//! [`RelationSource`] and answers the five request views:
//!
//! - forward / reverse: a window of one list, fetching only the pages that
//!   cover the requested range;
//! - mutual, forward-only, reverse-only: a window of the primary list,
//!   filtered by membership in the *full* counterpart list.
//!
//! Full lists are cached per `(subject, direction)` with a TTL. Membership is
//! case-insensitive.

mod source;
#[cfg(test)]
mod tests;

pub use source::*;

use crate::{RelationKind, TimeSource, TtlCache};
use core::time::Duration;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Largest page the listing service hands out.
pub const DEFAULT_PAGE_SIZE: usize = 40;

/// How a full list is paged in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchStrategy {
    /// One page at a time until a short page.
    Sequential,
    /// `pages` concurrent requests per round. Results are consumed in offset
    /// order and consumption stops at the first short page; anything fetched
    /// past it is discarded.
    Speculative { pages: usize },
}

#[derive(Clone, Debug)]
pub struct ResolverConfig {
    /// Entries requested per page.
    pub page_size: usize,
    /// Per-page timeout; a page that takes longer counts as empty.
    pub fetch_timeout: Duration,
    /// Assumed upper bound on list length. Paging stops here.
    pub max_list_len: usize,
    pub strategy: FetchStrategy,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            fetch_timeout: Duration::from_secs(10),
            max_list_len: 2_000,
            strategy: FetchStrategy::Speculative { pages: 5 },
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 128,
        }
    }
}

/// A complete relation list with a case-folded membership index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelationList {
    ordered: Vec<String>,
    members: HashSet<String>,
}

impl RelationList {
    pub fn new(ordered: Vec<String>) -> Self {
        let members = ordered.iter().map(|name| name.to_lowercase()).collect();
        Self { ordered, members }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains(&name.to_lowercase())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

type CacheKey = (String, Direction);

/// Resolves request views against a paginated listing service.
///
/// The cache lock is only taken synchronously and never held across an
/// await, so the resolver can be shared behind an [`Arc`]. Two concurrent
/// misses for the same list both fetch and both populate; the later write
/// wins.
pub struct RelationSetResolver<S, T> {
    source: S,
    config: ResolverConfig,
    cache: Mutex<TtlCache<CacheKey, Arc<RelationList>, T>>,
}

impl<S, T> RelationSetResolver<S, T>
where
    S: RelationSource,
    T: TimeSource + Send,
{
    pub fn new(source: S, config: ResolverConfig, clock: T) -> Self {
        let cache = TtlCache::new(config.cache_capacity, config.cache_ttl, clock);
        Self {
            source,
            config,
            cache: Mutex::new(cache),
        }
    }

    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves `kind` for `subject` over the 1-based inclusive range
    /// `[range_start, range_end]`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn resolve(
        &self,
        kind: RelationKind,
        subject: &str,
        range_start: u32,
        range_end: u32,
    ) -> Vec<String> {
        match kind {
            RelationKind::Forward => {
                self.list_window(subject, Direction::Following, range_start, range_end)
                    .await
            }
            RelationKind::Reverse => {
                self.list_window(subject, Direction::Followers, range_start, range_end)
                    .await
            }
            RelationKind::Mutual => {
                self.filtered_window(subject, Direction::Following, range_start, range_end, true)
                    .await
            }
            RelationKind::ForwardOnly => {
                self.filtered_window(subject, Direction::Following, range_start, range_end, false)
                    .await
            }
            RelationKind::ReverseOnly => {
                self.filtered_window(subject, Direction::Followers, range_start, range_end, false)
                    .await
            }
        }
    }

    /// Accounts `subject` follows, positions `range_start..=range_end`.
    pub async fn forward_list(&self, subject: &str, range_start: u32, range_end: u32) -> Vec<String> {
        self.resolve(RelationKind::Forward, subject, range_start, range_end)
            .await
    }

    /// Accounts following `subject`, positions `range_start..=range_end`.
    pub async fn reverse_list(&self, subject: &str, range_start: u32, range_end: u32) -> Vec<String> {
        self.resolve(RelationKind::Reverse, subject, range_start, range_end)
            .await
    }

    pub async fn mutual(&self, subject: &str, range_start: u32, range_end: u32) -> Vec<String> {
        self.resolve(RelationKind::Mutual, subject, range_start, range_end)
            .await
    }

    pub async fn forward_only(&self, subject: &str, range_start: u32, range_end: u32) -> Vec<String> {
        self.resolve(RelationKind::ForwardOnly, subject, range_start, range_end)
            .await
    }

    pub async fn reverse_only(&self, subject: &str, range_start: u32, range_end: u32) -> Vec<String> {
        self.resolve(RelationKind::ReverseOnly, subject, range_start, range_end)
            .await
    }

    /// The complete `direction` list for `subject`, from cache when fresh.
    pub async fn full_list(&self, subject: &str, direction: Direction) -> Arc<RelationList> {
        let key = (subject.to_lowercase(), direction);
        let cached = self.cache.lock().get(&key);
        if let Some(list) = cached {
            #[cfg(feature = "tracing")]
            tracing::debug!(subject, %direction, "cache hit");
            return list;
        }

        let list = Arc::new(RelationList::new(
            self.fetch_all(subject, direction).await,
        ));
        self.cache.lock().insert(key, Arc::clone(&list));
        list
    }

    async fn filtered_window(
        &self,
        subject: &str,
        primary: Direction,
        range_start: u32,
        range_end: u32,
        keep_members: bool,
    ) -> Vec<String> {
        let (window, counterpart) = futures::join!(
            self.list_window(subject, primary, range_start, range_end),
            self.full_list(subject, primary.counterpart()),
        );
        window
            .into_iter()
            .filter(|name| counterpart.contains(name) == keep_members)
            .collect()
    }

    /// Positions `range_start..=range_end` of one list.
    ///
    /// Sliced from a cached full list when one is fresh; otherwise only the
    /// pages overlapping the range are fetched.
    async fn list_window(
        &self,
        subject: &str,
        direction: Direction,
        range_start: u32,
        range_end: u32,
    ) -> Vec<String> {
        let Some((first, last)) = window_bounds(range_start, range_end) else {
            return Vec::new();
        };

        let key = (subject.to_lowercase(), direction);
        let cached = self.cache.lock().get(&key);
        if let Some(list) = cached {
            return apply_range(list.as_slice(), range_start, range_end);
        }

        let page_size = self.config.page_size;
        let last = last.min(self.config.max_list_len.saturating_sub(1));
        if first > last {
            return Vec::new();
        }
        let first_page = first / page_size * page_size;
        let mut collected = Vec::new();
        let mut offset = first_page;

        while offset <= last {
            let page = self.fetch_page(subject, direction, offset).await;
            let short = page.len() < page_size;
            collected.extend(page);
            if short {
                break;
            }
            offset += page_size;
        }

        let skip = first - first_page;
        collected
            .into_iter()
            .skip(skip)
            .take(last + 1 - first)
            .collect()
    }

    async fn fetch_all(&self, subject: &str, direction: Direction) -> Vec<String> {
        let page_size = self.config.page_size;
        let max = self.config.max_list_len;
        let batch = match self.config.strategy {
            FetchStrategy::Sequential => 1,
            FetchStrategy::Speculative { pages } => pages.max(1),
        };

        let mut collected = Vec::new();
        let mut offset = 0;

        'rounds: while offset < max {
            let offsets: Vec<usize> = (0..batch)
                .map(|i| offset + i * page_size)
                .take_while(|&o| o < max)
                .collect();
            let pages = join_all(
                offsets
                    .iter()
                    .map(|&o| self.fetch_page(subject, direction, o)),
            )
            .await;

            // `join_all` yields in request order, whatever order the pages
            // completed in.
            for page in pages {
                let short = page.len() < page_size;
                collected.extend(page);
                if short {
                    break 'rounds;
                }
            }
            offset += offsets.len() * page_size;
        }

        collected.truncate(max);
        #[cfg(feature = "tracing")]
        tracing::debug!(subject, %direction, len = collected.len(), "fetched full list");
        collected
    }

    /// One page; failures and timeouts read as an empty page.
    async fn fetch_page(&self, subject: &str, direction: Direction, offset: usize) -> Vec<String> {
        let page_size = self.config.page_size;
        let fetch = self
            .source
            .fetch_page(subject, direction, offset, page_size);
        match tokio::time::timeout(self.config.fetch_timeout, fetch).await {
            Ok(Ok(page)) => page,
            Ok(Err(_e)) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(subject, %direction, offset, "page fetch failed: {_e}");
                Vec::new()
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(subject, %direction, offset, "page fetch timed out");
                Vec::new()
            }
        }
    }
}

/// Zero-based inclusive bounds for a 1-based inclusive range, `None` when the
/// range is empty. A start of 0 is read as 1.
fn window_bounds(range_start: u32, range_end: u32) -> Option<(usize, usize)> {
    let start = range_start.max(1);
    if range_end < start {
        return None;
    }
    Some((start as usize - 1, range_end as usize - 1))
}

/// Slices `items` to the 1-based inclusive range `[range_start, range_end]`.
///
/// A start past the end yields nothing and an end past the end is clamped.
///
/// ```
/// use followsync::apply_range;
///
/// let items = ["a", "b", "c", "d", "e"];
/// assert_eq!(apply_range(&items, 4, 10), ["d", "e"]);
/// assert!(apply_range(&items, 6, 10).is_empty());
/// ```
pub fn apply_range<T: Clone>(items: &[T], range_start: u32, range_end: u32) -> Vec<T> {
    let Some((first, last)) = window_bounds(range_start, range_end) else {
        return Vec::new();
    };
    if first >= items.len() {
        return Vec::new();
    }
    let last = last.min(items.len() - 1);
    items[first..=last].to_vec()
}
