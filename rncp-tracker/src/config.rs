//! Configuration for the tracker
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use rncp_gateway::{CacheConfig, DispatcherConfig, FetcherConfig, GatewayConfig, TransportConfig};

/// RNCP Tracker - progress toward RNCP certifications from the 42 intra
#[derive(Parser, Debug, Clone)]
#[command(name = "rncp-tracker")]
#[command(about = "Validate RNCP certifications against 42 intra progress and local simulations")]
pub struct Args {
    /// Intra API base URL
    #[arg(long, env = "INTRA_API_URL", default_value = "https://api.intra.42.fr/v2")]
    pub api_url: String,

    /// Bearer token for the intra API
    #[arg(long, env = "INTRA_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Intra user id; resolved through /me when omitted
    #[arg(long, env = "INTRA_USER_ID")]
    pub user_id: Option<u64>,

    /// Level anchor table (JSON array of {lvl, xp})
    #[arg(long, env = "LEVELS_PATH", default_value = "data/levels.json")]
    pub levels_path: PathBuf,

    /// RNCP certification catalog (JSON)
    #[arg(long, env = "CATALOG_PATH", default_value = "data/rncp.json")]
    pub catalog_path: PathBuf,

    /// Saved simulation state (JSON, optional)
    #[arg(long, env = "SIMULATION_PATH")]
    pub simulation_path: Option<PathBuf>,

    /// Professional experiences (JSON array, optional)
    #[arg(long, env = "EXPERIENCES_PATH")]
    pub experiences_path: Option<PathBuf>,

    /// Minimum delay between two upstream requests
    #[arg(long, env = "MIN_DISPATCH_INTERVAL_MS", default_value = "100")]
    pub min_dispatch_interval_ms: u64,

    /// Records per page for paginated listings
    #[arg(long, env = "PAGE_SIZE", default_value = "100")]
    pub page_size: usize,

    /// Cache time-to-live in seconds (default: 7 days)
    #[arg(long, env = "CACHE_TTL_SECS", default_value = "604800")]
    pub cache_ttl_secs: u64,

    /// Cache age below which refresh requests are ignored (default: 10 minutes)
    #[arg(long, env = "CACHE_COOLDOWN_SECS", default_value = "600")]
    pub cache_cooldown_secs: u64,

    /// Per-request HTTP timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Ask for fresh upstream data (ignored while the cache is in its cooldown)
    #[arg(long)]
    pub refresh: bool,

    /// Only report this certification
    #[arg(long)]
    pub certification: Option<String>,

    /// Re-sync on this interval until interrupted
    #[arg(long, env = "WATCH_INTERVAL_SECS")]
    pub watch_interval_secs: Option<u64>,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.api_url.trim().is_empty() {
            return Err("INTRA_API_URL must not be empty".to_string());
        }

        if self.token.trim().is_empty() {
            return Err("INTRA_TOKEN must not be empty".to_string());
        }

        if self.page_size == 0 {
            return Err("PAGE_SIZE must be at least 1".to_string());
        }

        if self.cache_cooldown_secs > self.cache_ttl_secs {
            return Err("CACHE_COOLDOWN_SECS must be less than or equal to CACHE_TTL_SECS".to_string());
        }

        if self.watch_interval_secs == Some(0) {
            return Err("WATCH_INTERVAL_SECS must be at least 1".to_string());
        }

        Ok(())
    }

    /// Gateway settings derived from the arguments
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            transport: TransportConfig {
                base_url: self.api_url.clone(),
                timeout: Duration::from_millis(self.request_timeout_ms),
            },
            dispatcher: DispatcherConfig {
                min_interval: Duration::from_millis(self.min_dispatch_interval_ms),
            },
            fetcher: FetcherConfig {
                page_size: self.page_size,
            },
            cache: CacheConfig {
                ttl: Duration::from_secs(self.cache_ttl_secs),
                cooldown: Duration::from_secs(self.cache_cooldown_secs),
            },
        }
    }

    /// Default filter directives when `RUST_LOG` is unset
    pub fn log_filter(&self) -> String {
        format!(
            "rncp_tracker={0},rncp_gateway={0},rncp_engine={0},info",
            self.log_level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["rncp-tracker", "--token", "secret", "--api-url", "http://localhost:1/v2"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--cache-ttl-secs", "604800", "--cache-cooldown-secs", "600", "--page-size", "100"]);
        assert!(args.validate().is_ok());

        let config = args.gateway_config();
        assert_eq!(config.cache.ttl, Duration::from_secs(7 * 24 * 3600));
        assert_eq!(config.cache.cooldown, Duration::from_secs(600));
        assert_eq!(config.fetcher.page_size, 100);
        assert_eq!(config.transport.base_url, "http://localhost:1/v2");
    }

    #[test]
    fn test_rejects_zero_page_size() {
        let args = parse(&["--page-size", "0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_rejects_cooldown_longer_than_ttl() {
        let args = parse(&["--cache-ttl-secs", "60", "--cache-cooldown-secs", "600"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_filter() {
        let args = parse(&["--log-level", "debug"]);
        assert_eq!(
            args.log_filter(),
            "rncp_tracker=debug,rncp_gateway=debug,rncp_engine=debug,info"
        );
    }

    #[test]
    fn test_flags() {
        let args = parse(&["--refresh", "--certification", "rncp-6-web", "--user-id", "42"]);
        assert!(args.refresh);
        assert_eq!(args.certification.as_deref(), Some("rncp-6-web"));
        assert_eq!(args.user_id, Some(42));
    }
}
