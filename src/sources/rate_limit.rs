use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use http::Extensions;
use reqwest::Url;
use reqwest_middleware::{Middleware, Next};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

#[derive(Clone, Debug)]
pub(crate) struct RateLimitPolicy {
    pub key: &'static str,
    pub prefix: Cow<'static, str>,
    pub min_interval: Duration,
}

#[derive(Debug)]
pub(crate) struct RateLimiter {
    policies: Vec<RateLimitPolicy>,
    default_min_interval: Duration,
    last_seen: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub(crate) fn from_env() -> Self {
        // RxNav terms of service cap clients at 20 requests per second per IP.
        // openFDA allows 240 requests per minute without an API key.
        // MedlinePlus Connect allows 100 requests per minute per IP.
        let policies = vec![
            policy(
                "rxnav",
                crate::sources::rxnav::RXNAV_BASE_ENV,
                crate::sources::rxnav::RXNAV_BASE,
                Duration::from_millis(50),
            ),
            policy(
                "openfda",
                crate::sources::openfda::OPENFDA_BASE_ENV,
                crate::sources::openfda::OPENFDA_BASE,
                Duration::from_millis(250),
            ),
            policy(
                "rximage",
                crate::sources::rximage::RXIMAGE_BASE_ENV,
                crate::sources::rximage::RXIMAGE_BASE,
                Duration::from_millis(100),
            ),
            policy(
                "medlineplus",
                crate::sources::medlineplus::MEDLINEPLUS_BASE_ENV,
                crate::sources::medlineplus::MEDLINEPLUS_BASE,
                Duration::from_millis(600),
            ),
        ];
        Self::new(policies, Duration::from_millis(20))
    }

    pub(crate) fn new(policies: Vec<RateLimitPolicy>, default_min_interval: Duration) -> Self {
        Self {
            policies,
            default_min_interval,
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    fn resolve_key_and_interval(&self, url: &Url) -> (String, Duration) {
        let full = url.as_str();

        if let Some(policy) = self
            .policies
            .iter()
            .filter(|p| full.starts_with(p.prefix.as_ref()))
            .max_by_key(|p| p.prefix.len())
        {
            return (format!("policy:{}", policy.key), policy.min_interval);
        }

        let origin = format!(
            "{}://{}",
            url.scheme(),
            url.host_str().unwrap_or("unknown-host")
        );
        (format!("default:{origin}"), self.default_min_interval)
    }

    pub(crate) async fn wait_for_url(&self, url: &Url) {
        let (key, min_interval) = self.resolve_key_and_interval(url);
        loop {
            let now = Instant::now();
            let mut map = self.last_seen.lock().await;
            let wait_until = map.get(&key).map(|last| *last + min_interval);

            match wait_until {
                Some(target) if target > now => {
                    drop(map);
                    debug!(key = %key, wait_ms = (target - now).as_millis() as u64, "Throttling upstream request");
                    sleep_until(target).await;
                }
                _ => {
                    map.insert(key, now);
                    return;
                }
            }
        }
    }

    #[cfg(test)]
    fn resolve_key_for_str(&self, raw: &str) -> Option<String> {
        let url = Url::parse(raw).ok()?;
        Some(self.resolve_key_and_interval(&url).0)
    }
}

fn policy(
    key: &'static str,
    env_var: &'static str,
    default_prefix: &'static str,
    min_interval: Duration,
) -> RateLimitPolicy {
    RateLimitPolicy {
        key,
        prefix: crate::sources::env_base(default_prefix, env_var),
        min_interval,
    }
}

static GLOBAL_RATE_LIMITER: OnceLock<Arc<RateLimiter>> = OnceLock::new();

pub(crate) fn global_limiter() -> Arc<RateLimiter> {
    GLOBAL_RATE_LIMITER
        .get_or_init(|| Arc::new(RateLimiter::from_env()))
        .clone()
}

/// Spaces requests per upstream and logs each exchange at debug level.
#[derive(Clone, Debug)]
pub(crate) struct RateLimitMiddleware {
    limiter: Arc<RateLimiter>,
}

impl RateLimitMiddleware {
    pub(crate) fn new() -> Self {
        Self {
            limiter: global_limiter(),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(
        &self,
        req: reqwest::Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        self.limiter.wait_for_url(req.url()).await;

        let method = req.method().clone();
        let url = req.url().clone();
        let start = Instant::now();
        let result = next.run(req, extensions).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(resp) => debug!(
                %method,
                %url,
                status = resp.status().as_u16(),
                elapsed_ms,
                "Upstream request completed"
            ),
            Err(err) => debug!(%method, %url, elapsed_ms, error = %err, "Upstream request failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_policy(key: &'static str, prefix: &str, ms: u64) -> RateLimitPolicy {
        RateLimitPolicy {
            key,
            prefix: Cow::Owned(prefix.to_string()),
            min_interval: Duration::from_millis(ms),
        }
    }

    #[tokio::test]
    async fn rate_limit_blocks_second_request_for_same_prefix() {
        let limiter = RateLimiter::new(
            vec![test_policy("rxnav", "https://rxnav.example.org/REST", 120)],
            Duration::from_millis(1),
        );

        let url = Url::parse("https://rxnav.example.org/REST/drugs.json").unwrap();
        let start = Instant::now();
        limiter.wait_for_url(&url).await;
        limiter.wait_for_url(&url).await;

        assert!(
            start.elapsed() >= Duration::from_millis(100),
            "second request should be throttled for the rxnav prefix"
        );
    }

    #[tokio::test]
    async fn rate_limit_keeps_same_host_prefixes_independent() {
        let limiter = RateLimiter::new(
            vec![
                test_policy("a", "https://nlm.example.org/rxnav", 100),
                test_policy("b", "https://nlm.example.org/medlineplus", 100),
            ],
            Duration::from_millis(1),
        );

        let url_a = Url::parse("https://nlm.example.org/rxnav/drugs.json").unwrap();
        let url_b = Url::parse("https://nlm.example.org/medlineplus/connect").unwrap();

        let start = Instant::now();
        limiter.wait_for_url(&url_a).await;
        limiter.wait_for_url(&url_b).await;

        assert!(
            start.elapsed() < Duration::from_millis(80),
            "same host, different prefixes should not block each other"
        );
    }

    #[test]
    fn rate_limit_uses_longest_matching_prefix() {
        let limiter = RateLimiter::new(
            vec![
                test_policy("short", "https://example.org/REST", 10),
                test_policy("long", "https://example.org/REST/rxcui", 10),
            ],
            Duration::from_millis(1),
        );

        let key = limiter
            .resolve_key_for_str("https://example.org/REST/rxcui/161/related.json")
            .unwrap();
        assert_eq!(key, "policy:long");
    }

    #[test]
    fn rate_limit_falls_back_to_origin_key() {
        let limiter = RateLimiter::new(Vec::new(), Duration::from_millis(1));
        let key = limiter
            .resolve_key_for_str("http://127.0.0.1:8080/drugs.json")
            .unwrap();
        assert_eq!(key, "default:http://127.0.0.1");
    }
}
