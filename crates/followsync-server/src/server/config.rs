use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use followsync::{
    ClientConfig, DEFAULT_CHUNK_CAPACITY, DEFAULT_PAGE_SIZE, DispatcherConfig, FetchStrategy,
    ResolverConfig, SlotLayout,
};
use rand::Rng;
use url::Url;

/// Runtime configuration for the `followsync-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first), with defaults matching the TurboWarp cloud
/// server and the Scratch REST API.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "followsync-server",
    version,
    about = "Answers follow-list requests written to TurboWarp cloud variables"
)]
pub struct CliArgs {
    /// Project whose cloud variables carry requests and replies.
    ///
    /// Environment variable: `PROJECT_ID`
    #[arg(long, env = "PROJECT_ID", default_value_t = String::from("1279558192"))]
    pub project_id: String,

    /// Cloud server WebSocket URL.
    ///
    /// Environment variable: `CLOUD_URL`
    #[arg(long, env = "CLOUD_URL", default_value_t = String::from("wss://clouddata.turbowarp.org"))]
    pub cloud_url: String,

    /// `User-Agent` sent to both the cloud server and the REST API. The cloud
    /// server refuses connections without one.
    ///
    /// Environment variable: `USER_AGENT`
    #[arg(long, env = "USER_AGENT", default_value_t = String::from("FollowSyncServer/1.0"))]
    pub user_agent: String,

    /// Handshake username prefix; random digits are appended per process.
    ///
    /// Environment variable: `IDENTITY_PREFIX`
    #[arg(long, env = "IDENTITY_PREFIX", default_value_t = String::from("FollowSync"))]
    pub identity_prefix: String,

    /// Base URL of the follow-list REST API.
    ///
    /// Environment variable: `API_BASE_URL`
    #[arg(long, env = "API_BASE_URL", default_value_t = String::from("https://api.scratch.mit.edu"))]
    pub api_base_url: String,

    /// Environment variable: `REQUEST_SLOT`
    #[arg(long, env = "REQUEST_SLOT", default_value_t = String::from("☁request"))]
    pub request_slot: String,

    /// Return slots are named `{prefix}1` through `{prefix}{RETURN_SLOTS}`.
    ///
    /// Environment variable: `RETURN_SLOT_PREFIX`
    #[arg(long, env = "RETURN_SLOT_PREFIX", default_value_t = String::from("☁return"))]
    pub return_slot_prefix: String,

    /// Environment variable: `RETURN_SLOTS`
    #[arg(long, env = "RETURN_SLOTS", default_value_t = 9)]
    pub return_slots: usize,

    /// Environment variable: `LIVENESS_SLOT`
    #[arg(long, env = "LIVENESS_SLOT", default_value_t = String::from("☁alive"))]
    pub liveness_slot: String,

    /// Maximum characters per return slot value.
    ///
    /// Environment variable: `CHUNK_CAPACITY`
    #[arg(long, env = "CHUNK_CAPACITY", default_value_t = DEFAULT_CHUNK_CAPACITY)]
    pub chunk_capacity: usize,

    /// Minimum spacing between accepted requests.
    ///
    /// Environment variable: `COOLDOWN_MS`
    #[arg(long, env = "COOLDOWN_MS", default_value_t = 500)]
    pub cooldown_ms: u64,

    /// Requests that may wait behind the one being answered; the oldest is
    /// dropped when full.
    ///
    /// Environment variable: `QUEUE_CAPACITY`
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = 8)]
    pub queue_capacity: usize,

    /// Environment variable: `DRAIN_DELAY_MS`
    #[arg(long, env = "DRAIN_DELAY_MS", default_value_t = 50)]
    pub drain_delay_ms: u64,

    /// Environment variable: `CONNECT_TIMEOUT_SECS`
    #[arg(long, env = "CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Environment variable: `RECONNECT_DELAY_SECS`
    #[arg(long, env = "RECONNECT_DELAY_SECS", default_value_t = 5)]
    pub reconnect_delay_secs: u64,

    /// Delay before retrying after a connect attempt timed out.
    ///
    /// Environment variable: `TIMEOUT_RETRY_DELAY_MS`
    #[arg(long, env = "TIMEOUT_RETRY_DELAY_MS", default_value_t = 1_000)]
    pub timeout_retry_delay_ms: u64,

    /// Environment variable: `HEARTBEAT_SECS`
    #[arg(long, env = "HEARTBEAT_SECS", default_value_t = 30)]
    pub heartbeat_secs: u64,

    /// Cadence of the liveness slot update. Must be shorter than the
    /// heartbeat.
    ///
    /// Environment variable: `LIVENESS_SECS`
    #[arg(long, env = "LIVENESS_SECS", default_value_t = 10)]
    pub liveness_secs: u64,

    /// Entries requested per REST page. The API serves at most 40.
    ///
    /// Environment variable: `PAGE_SIZE`
    #[arg(long, env = "PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Per-page REST timeout; a page that takes longer counts as empty.
    ///
    /// Environment variable: `FETCH_TIMEOUT_SECS`
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// Assumed upper bound on a follow list's length.
    ///
    /// Environment variable: `MAX_LIST_LEN`
    #[arg(long, env = "MAX_LIST_LEN", default_value_t = 2_000)]
    pub max_list_len: usize,

    /// Concurrent page requests per round when fetching a full list; 0
    /// fetches one page at a time.
    ///
    /// Environment variable: `SPECULATIVE_PAGES`
    #[arg(long, env = "SPECULATIVE_PAGES", default_value_t = 5)]
    pub speculative_pages: usize,

    /// Environment variable: `CACHE_TTL_SECS`
    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = 300)]
    pub cache_ttl_secs: u64,

    /// Full lists kept in the cache.
    ///
    /// Environment variable: `CACHE_CAPACITY`
    #[arg(long, env = "CACHE_CAPACITY", default_value_t = 128)]
    pub cache_capacity: usize,

    /// Port of the HTTP health endpoint.
    ///
    /// Environment variable: `PORT`
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub cloud_url: Url,
    pub api_base_url: Url,
    pub user_agent: String,
    pub chunk_capacity: usize,
    pub port: u16,
    pub client: ClientConfig,
    pub resolver: ResolverConfig,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.return_slots == 0 {
            bail!("RETURN_SLOTS must be greater than 0");
        }
        if args.chunk_capacity == 0 {
            bail!("CHUNK_CAPACITY must be greater than 0");
        }
        if args.queue_capacity == 0 {
            bail!("QUEUE_CAPACITY must be greater than 0");
        }
        if args.cache_capacity == 0 {
            bail!("CACHE_CAPACITY must be greater than 0");
        }
        if !(1..=DEFAULT_PAGE_SIZE).contains(&args.page_size) {
            bail!(
                "PAGE_SIZE ({}) must be between 1 and {}",
                args.page_size,
                DEFAULT_PAGE_SIZE
            );
        }
        if args.heartbeat_secs == 0 {
            bail!("HEARTBEAT_SECS must be greater than 0");
        }
        if args.liveness_secs == 0 || args.liveness_secs >= args.heartbeat_secs {
            bail!(
                "LIVENESS_SECS ({}) must be greater than 0 and shorter than HEARTBEAT_SECS ({})",
                args.liveness_secs,
                args.heartbeat_secs
            );
        }

        let cloud_url = Url::parse(&args.cloud_url)?;
        if !matches!(cloud_url.scheme(), "ws" | "wss") {
            bail!("CLOUD_URL must be a ws:// or wss:// URL, got {cloud_url}");
        }
        let api_base_url = Url::parse(&args.api_base_url)?;
        if api_base_url.cannot_be_a_base() {
            bail!("API_BASE_URL must be a base URL, got {api_base_url}");
        }

        let identity = format!(
            "{}{:06}",
            args.identity_prefix,
            rand::rng().random_range(0..1_000_000)
        );
        let strategy = match args.speculative_pages {
            0 => FetchStrategy::Sequential,
            pages => FetchStrategy::Speculative { pages },
        };

        let client = ClientConfig {
            slots: SlotLayout {
                request: args.request_slot,
                return_prefix: args.return_slot_prefix,
                return_slots: args.return_slots,
                liveness: args.liveness_slot,
            },
            connect_timeout: Duration::from_secs(args.connect_timeout_secs),
            reconnect_delay: Duration::from_secs(args.reconnect_delay_secs),
            timeout_retry_delay: Duration::from_millis(args.timeout_retry_delay_ms),
            heartbeat_interval: Duration::from_secs(args.heartbeat_secs),
            liveness_interval: Duration::from_secs(args.liveness_secs),
            dispatcher: DispatcherConfig {
                cooldown: Duration::from_millis(args.cooldown_ms),
                queue_capacity: args.queue_capacity,
                drain_delay: Duration::from_millis(args.drain_delay_ms),
            },
            ..ClientConfig::new(identity, args.project_id)
        };
        let resolver = ResolverConfig {
            page_size: args.page_size,
            fetch_timeout: Duration::from_secs(args.fetch_timeout_secs),
            max_list_len: args.max_list_len,
            strategy,
            cache_ttl: Duration::from_secs(args.cache_ttl_secs),
            cache_capacity: args.cache_capacity,
        };

        Ok(Self {
            cloud_url,
            api_base_url,
            user_agent: args.user_agent,
            chunk_capacity: args.chunk_capacity,
            port: args.port,
            client,
            resolver,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        CliArgs::parse_from(std::iter::once("followsync-server").chain(extra.iter().copied()))
    }

    fn error(extra: &[&str]) -> String {
        ServerConfig::try_from(args(extra)).unwrap_err().to_string()
    }

    #[test]
    fn defaults_are_valid() {
        let config = ServerConfig::try_from(args(&[])).unwrap();

        assert_eq!(config.cloud_url.as_str(), "wss://clouddata.turbowarp.org/");
        assert_eq!(config.client.project_id, "1279558192");
        assert_eq!(config.client.slots, SlotLayout::default());
        assert_eq!(config.client.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.client.liveness_interval, Duration::from_secs(10));
        assert_eq!(config.resolver.page_size, 40);
        assert_eq!(
            config.resolver.strategy,
            FetchStrategy::Speculative { pages: 5 }
        );
        assert_eq!(config.chunk_capacity, 256);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn identity_is_the_prefix_plus_six_digits() {
        let config = ServerConfig::try_from(args(&["--identity-prefix", "Relay"])).unwrap();
        let suffix = config.client.identity.strip_prefix("Relay").unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn zero_speculative_pages_fetches_sequentially() {
        let config = ServerConfig::try_from(args(&["--speculative-pages", "0"])).unwrap();
        assert_eq!(config.resolver.strategy, FetchStrategy::Sequential);
    }

    #[test]
    fn rejects_zero_sized_settings() {
        assert!(error(&["--return-slots", "0"]).contains("RETURN_SLOTS"));
        assert!(error(&["--chunk-capacity", "0"]).contains("CHUNK_CAPACITY"));
        assert!(error(&["--queue-capacity", "0"]).contains("QUEUE_CAPACITY"));
        assert!(error(&["--cache-capacity", "0"]).contains("CACHE_CAPACITY"));
    }

    #[test]
    fn rejects_page_sizes_the_api_cannot_serve() {
        assert!(error(&["--page-size", "0"]).contains("PAGE_SIZE"));
        assert!(error(&["--page-size", "41"]).contains("PAGE_SIZE"));
        assert!(ServerConfig::try_from(args(&["--page-size", "1"])).is_ok());
    }

    #[test]
    fn liveness_must_be_shorter_than_heartbeat() {
        assert!(error(&["--liveness-secs", "30"]).contains("LIVENESS_SECS"));
        assert!(error(&["--liveness-secs", "0"]).contains("LIVENESS_SECS"));
        assert!(ServerConfig::try_from(args(&["--liveness-secs", "29"])).is_ok());
    }

    #[test]
    fn rejects_bad_urls() {
        assert!(ServerConfig::try_from(args(&["--cloud-url", "not a url"])).is_err());
        assert!(error(&["--cloud-url", "https://clouddata.turbowarp.org"]).contains("CLOUD_URL"));
        assert!(error(&["--api-base-url", "mailto:someone@example.com"]).contains("API_BASE_URL"));
    }
}
