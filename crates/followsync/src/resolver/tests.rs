use super::*;
use crate::UpstreamError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Clone, Default)]
struct MockTime {
    millis: Arc<AtomicU64>,
}

impl MockTime {
    fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::Relaxed);
    }
}

impl TimeSource for MockTime {
    fn current_millis(&self) -> u64 {
        self.millis.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
struct FakeSource {
    lists: HashMap<(String, Direction), Vec<String>>,
    failing_offsets: HashSet<usize>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeSource {
    fn with(mut self, subject: &str, direction: Direction, names: &[&str]) -> Self {
        self.lists.insert(
            (subject.to_owned(), direction),
            names.iter().map(|n| (*n).to_owned()).collect(),
        );
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl RelationSource for FakeSource {
    fn fetch_page(
        &self,
        subject: &str,
        direction: Direction,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<String>, UpstreamError>> + Send {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let result = if self.failing_offsets.contains(&offset) {
            Err(UpstreamError::Status { status: 500 })
        } else {
            let list = self
                .lists
                .get(&(subject.to_owned(), direction))
                .cloned()
                .unwrap_or_default();
            Ok(list.into_iter().skip(offset).take(limit).collect())
        };
        let delay = self.delay;
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        }
    }
}

fn config(page_size: usize, strategy: FetchStrategy) -> ResolverConfig {
    ResolverConfig {
        page_size,
        strategy,
        ..ResolverConfig::default()
    }
}

fn names(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("user{i}")).collect()
}

fn lower(items: Vec<String>) -> Vec<String> {
    items.into_iter().map(|s| s.to_lowercase()).collect()
}

fn sample_source() -> FakeSource {
    FakeSource::default()
        .with("alice", Direction::Following, &["a", "b", "c"])
        .with("alice", Direction::Followers, &["B", "C", "D"])
}

#[tokio::test]
async fn derives_set_views_case_insensitively() {
    let resolver = RelationSetResolver::new(
        sample_source(),
        config(2, FetchStrategy::Sequential),
        MockTime::default(),
    );

    assert_eq!(lower(resolver.mutual("alice", 1, 100).await), ["b", "c"]);
    assert_eq!(lower(resolver.forward_only("alice", 1, 100).await), ["a"]);
    assert_eq!(lower(resolver.reverse_only("alice", 1, 100).await), ["d"]);
}

#[tokio::test]
async fn subject_lookup_is_case_insensitive_for_the_cache() {
    let resolver = RelationSetResolver::new(
        sample_source(),
        config(2, FetchStrategy::Sequential),
        MockTime::default(),
    );

    resolver.full_list("alice", Direction::Followers).await;
    let calls = resolver.source.calls();
    resolver.full_list("ALICE", Direction::Followers).await;
    assert_eq!(resolver.source.calls(), calls);
}

#[tokio::test]
async fn range_is_clamped_to_the_list_length() {
    let source = FakeSource::default().with(
        "bob",
        Direction::Following,
        &["a", "b", "c", "d", "e"],
    );
    let resolver = RelationSetResolver::new(
        source,
        config(40, FetchStrategy::Sequential),
        MockTime::default(),
    );

    assert_eq!(resolver.forward_list("bob", 4, 10).await, ["d", "e"]);
    assert!(resolver.forward_list("bob", 6, 10).await.is_empty());
}

#[tokio::test]
async fn window_fetches_only_the_covering_pages() {
    let all = names(10);
    let refs: Vec<&str> = all.iter().map(String::as_str).collect();
    let source = FakeSource::default().with("bob", Direction::Followers, &refs);
    let resolver = RelationSetResolver::new(
        source,
        config(2, FetchStrategy::Sequential),
        MockTime::default(),
    );

    assert_eq!(resolver.reverse_list("bob", 5, 6).await, ["user5", "user6"]);
    assert_eq!(resolver.source.calls(), 1);

    // 4..=7 straddles the pages at offsets 2, 4 and 6.
    assert_eq!(
        resolver.reverse_list("bob", 4, 7).await,
        ["user4", "user5", "user6", "user7"]
    );
    assert_eq!(resolver.source.calls(), 4);
}

#[tokio::test]
async fn empty_ranges_do_not_touch_the_network() {
    let resolver = RelationSetResolver::new(
        sample_source(),
        config(2, FetchStrategy::Sequential),
        MockTime::default(),
    );

    assert!(resolver.forward_list("alice", 5, 4).await.is_empty());
    assert_eq!(resolver.source.calls(), 0);
}

#[tokio::test]
async fn range_start_zero_reads_as_one() {
    let resolver = RelationSetResolver::new(
        sample_source(),
        config(2, FetchStrategy::Sequential),
        MockTime::default(),
    );

    assert_eq!(resolver.forward_list("alice", 0, 2).await, ["a", "b"]);
}

#[tokio::test]
async fn full_lists_are_cached_until_the_ttl_lapses() {
    let clock = MockTime::default();
    let resolver = RelationSetResolver::new(
        sample_source(),
        ResolverConfig {
            cache_ttl: Duration::from_secs(60),
            ..config(2, FetchStrategy::Sequential)
        },
        clock.clone(),
    );

    // Window over "following": offsets 0 and 2. Full "followers": 0 and 2.
    resolver.mutual("alice", 1, 3).await;
    assert_eq!(resolver.source.calls(), 4);

    // Followers now come from the cache.
    resolver.mutual("alice", 1, 3).await;
    assert_eq!(resolver.source.calls(), 6);

    clock.advance(60_000);
    resolver.mutual("alice", 1, 3).await;
    assert_eq!(resolver.source.calls(), 10);
}

#[tokio::test]
async fn cached_full_list_serves_windows() {
    let resolver = RelationSetResolver::new(
        sample_source(),
        config(2, FetchStrategy::Sequential),
        MockTime::default(),
    );

    resolver.full_list("alice", Direction::Following).await;
    let calls = resolver.source.calls();

    assert_eq!(resolver.forward_list("alice", 2, 3).await, ["b", "c"]);
    assert_eq!(resolver.source.calls(), calls);
}

#[tokio::test]
async fn speculative_fetch_stops_consuming_at_the_first_short_page() {
    let resolver = RelationSetResolver::new(
        sample_source(),
        config(2, FetchStrategy::Speculative { pages: 4 }),
        MockTime::default(),
    );

    let list = resolver.full_list("alice", Direction::Following).await;

    assert_eq!(list.as_slice(), ["a", "b", "c"]);
    // All four speculative pages went out in one round.
    assert_eq!(resolver.source.calls(), 4);
}

#[tokio::test]
async fn pages_after_a_failed_page_are_discarded() {
    let all = names(10);
    let refs: Vec<&str> = all.iter().map(String::as_str).collect();
    let mut source = FakeSource::default().with("bob", Direction::Following, &refs);
    source.failing_offsets.insert(2);
    let resolver = RelationSetResolver::new(
        source,
        config(2, FetchStrategy::Speculative { pages: 3 }),
        MockTime::default(),
    );

    let list = resolver.full_list("bob", Direction::Following).await;

    assert_eq!(list.as_slice(), ["user1", "user2"]);
}

#[tokio::test]
async fn sequential_and_speculative_agree_on_long_lists() {
    let all = names(95);
    let refs: Vec<&str> = all.iter().map(String::as_str).collect();

    for strategy in [
        FetchStrategy::Sequential,
        FetchStrategy::Speculative { pages: 3 },
    ] {
        let source = FakeSource::default().with("carol", Direction::Followers, &refs);
        let resolver = RelationSetResolver::new(source, config(10, strategy), MockTime::default());
        let list = resolver.full_list("carol", Direction::Followers).await;
        assert_eq!(list.as_slice(), all.as_slice(), "{strategy:?}");
    }
}

#[tokio::test]
async fn paging_stops_at_the_assumed_maximum_length() {
    let all = names(100);
    let refs: Vec<&str> = all.iter().map(String::as_str).collect();
    let source = FakeSource::default().with("dave", Direction::Following, &refs);
    let resolver = RelationSetResolver::new(
        source,
        ResolverConfig {
            max_list_len: 30,
            ..config(10, FetchStrategy::Sequential)
        },
        MockTime::default(),
    );

    let list = resolver.full_list("dave", Direction::Following).await;

    assert_eq!(list.len(), 30);
    assert_eq!(resolver.source.calls(), 3);
    assert!(resolver.forward_list("dave", 31, 40).await.is_empty());
}

#[tokio::test]
async fn failed_pages_read_as_empty() {
    let mut source = sample_source();
    source.failing_offsets.insert(0);
    let resolver = RelationSetResolver::new(
        source,
        config(2, FetchStrategy::Sequential),
        MockTime::default(),
    );

    assert!(resolver.forward_list("alice", 1, 10).await.is_empty());
    assert!(resolver.mutual("alice", 1, 10).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_pages_time_out_as_empty() {
    let mut source = sample_source();
    source.delay = Some(Duration::from_secs(30));
    let resolver = RelationSetResolver::new(
        source,
        ResolverConfig {
            fetch_timeout: Duration::from_secs(10),
            ..config(2, FetchStrategy::Sequential)
        },
        MockTime::default(),
    );

    assert!(resolver.forward_list("alice", 1, 10).await.is_empty());
}

#[test]
fn apply_range_is_one_based_and_inclusive() {
    let items = ["a", "b", "c", "d", "e"];
    assert_eq!(apply_range(&items, 1, 1), ["a"]);
    assert_eq!(apply_range(&items, 2, 4), ["b", "c", "d"]);
    assert_eq!(apply_range(&items, 4, 10), ["d", "e"]);
    assert_eq!(apply_range(&items, 0, 2), ["a", "b"]);
    assert!(apply_range(&items, 6, 9).is_empty());
    assert!(apply_range(&items, 3, 2).is_empty());
    assert!(apply_range::<&str>(&[], 1, 5).is_empty());
}
