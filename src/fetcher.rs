use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, DNT, REFERER, USER_AGENT};
use tracing::{error, info, warn};

use crate::config::{self, RETRY_WAITS_SECS};
use crate::error::{AppError, FetchError, Result};
use crate::pacing::Pacer;
use crate::patterns::PagePatterns;

/// Transport seam: fetch one page as text or fail with a typed [`FetchError`].
#[allow(async_fn_in_trait)]
pub trait PageFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> std::result::Result<String, FetchError>;
}

/// `reqwest`-backed fetcher with a cookie jar and browser-like default headers.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(config::USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(config::ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(config::ACCEPT_LANGUAGE));
        headers.insert(DNT, HeaderValue::from_static("1"));
        let referer = format!("{}/", base_url.trim_end_matches('/'));
        headers.insert(
            REFERER,
            HeaderValue::from_str(&referer)
                .map_err(|_| AppError::Config(format!("BASE_URL is not a valid header value: {base_url}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> std::result::Result<String, FetchError> {
        let resp = self.client.get(url).timeout(timeout).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16(), url));
        }
        Ok(resp.text().await?)
    }
}

/// Wait before each attempt; the number of entries is the attempt budget.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    waits: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(waits: Vec<Duration>) -> Self {
        Self { waits }
    }

    pub fn attempts(&self) -> usize {
        self.waits.len()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RETRY_WAITS_SECS.iter().map(|&s| Duration::from_secs(s)).collect())
    }
}

/// Fetch `url`, retrying transient failures per `policy`.
///
/// Permanent failures are returned at once. When every attempt fails the last
/// transient failure is returned.
pub async fn fetch_with_retry<F: PageFetcher>(
    fetcher: &F,
    pacer: &Pacer,
    policy: &RetryPolicy,
    url: &str,
    timeout: Duration,
    hint: &str,
) -> Result<String> {
    let attempts = policy.attempts();
    let mut last_err = None;

    for (i, wait) in policy.waits.iter().enumerate() {
        let attempt = i + 1;
        if !wait.is_zero() {
            info!("[FETCH] {hint}retry wait {}s (attempt {attempt}/{attempts})", wait.as_secs());
            pacer.sleep(*wait, Duration::ZERO, "retry-sleep").await?;
        } else {
            pacer.ensure_active()?;
        }

        info!("[FETCH] {hint}fetching (attempt {attempt}/{attempts})");
        match fetcher.fetch(url, timeout).await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_retryable() => {
                warn!(attempt, status = ?e.status(), "[FETCH] {hint}{e}");
                last_err = Some(e);
            }
            Err(e) => {
                error!(attempt, status = ?e.status(), "[FETCH] {hint}{e} (not retried)");
                return Err(e.into());
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| FetchError::Transient {
            status: None,
            detail: "retry policy allows no attempts".to_string(),
        })
        .into())
}

/// True when the page matches an anti-bot interstitial signature.
pub fn is_blocked(patterns: &PagePatterns, html: &str) -> bool {
    patterns.blocked.is_match(html)
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedFetcher;
    use super::*;
    use crate::patterns::Patterns;

    fn http(code: u16) -> std::result::Result<String, FetchError> {
        Err(FetchError::from_status(code, "u"))
    }

    async fn run(fetcher: &ScriptedFetcher) -> Result<String> {
        fetch_with_retry(
            fetcher,
            &Pacer::default(),
            &RetryPolicy::default(),
            "https://example.test/s",
            Duration::from_secs(1),
            "",
        )
        .await
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_then_succeeds() {
        let fetcher = ScriptedFetcher::new(vec![http(503), http(429), Ok("ok".into())]);
        let start = tokio::time::Instant::now();
        assert_eq!(run(&fetcher).await.unwrap(), "ok");
        assert_eq!(fetcher.calls(), 3);
        // waits 0 + 2 + 5
        assert!(start.elapsed() >= Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_is_not_retried() {
        let fetcher = ScriptedFetcher::new(vec![http(404), Ok("never".into())]);
        let err = run(&fetcher).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch(FetchError::Permanent { status: 404, .. })));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_surfaces_last_failure() {
        let fetcher = ScriptedFetcher::new(vec![
            http(503),
            Err(FetchError::Transient { status: None, detail: "reset".into() }),
            http(504),
            http(408),
            Ok("too late".into()),
        ]);
        let err = run(&fetcher).await.unwrap_err();
        assert_eq!(fetcher.calls(), 4);
        match err {
            AppError::Fetch(e) => assert_eq!(e.status(), Some(408)),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_policy_fails_without_fetching() {
        let fetcher = ScriptedFetcher::new(vec![Ok("x".into())]);
        let res = fetch_with_retry(
            &fetcher,
            &Pacer::default(),
            &RetryPolicy::new(Vec::new()),
            "u",
            Duration::from_secs(1),
            "",
        )
        .await;
        assert!(res.is_err());
        assert_eq!(fetcher.calls(), 0);
    }

    #[test]
    fn detects_block_pages() {
        let p = Patterns::compile().unwrap();
        assert!(is_blocked(&p.page, "<form action=\"/errors/validateCaptcha\">"));
        assert!(is_blocked(&p.page, "<p>申し訳ございません。</p>"));
        assert!(!is_blocked(&p.page, "<div class=\"s-result-item\"></div>"));
    }
}
