use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use ff_core::{Error, ImageGenerator, Result, RewrittenCopy, TextRewriter};
use tracing::warn;

/// Timeout and retry rules for a single model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    pub timeout: Duration,
    /// Extra attempts after the first one. Never more than [`CallPolicy::MAX_RETRIES`].
    pub retries: u32,
    pub backoff: Duration,
}

impl CallPolicy {
    pub const MAX_RETRIES: u32 = 1;

    pub fn new(timeout: Duration, retries: u32, backoff: Duration) -> Self {
        Self {
            timeout,
            retries: retries.min(Self::MAX_RETRIES),
            backoff,
        }
    }

    /// Runs `call` under the timeout, retrying once more on failure if allowed.
    pub async fn run<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.retries.min(Self::MAX_RETRIES) + 1;
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(format!(
                    "{} took longer than {:?}",
                    what, self.timeout
                ))),
            };
            match result {
                Ok(value) => return Ok(value),
                Err(e @ Error::Config(_)) => return Err(e),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    warn!("{} failed (attempt {}/{}): {}", what, attempt, attempts, e);
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), 1, Duration::from_millis(500))
    }
}

/// Applies a [`CallPolicy`] to every call of the wrapped model.
#[derive(Debug)]
pub struct Guarded<T> {
    inner: T,
    policy: CallPolicy,
}

impl<T> Guarded<T> {
    pub fn new(inner: T, policy: CallPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<T: ImageGenerator> ImageGenerator for Guarded<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate_image(&self, prompt: &str) -> Result<String> {
        self.policy
            .run("image generation", || self.inner.generate_image(prompt))
            .await
    }
}

#[async_trait]
impl<T: TextRewriter> TextRewriter for Guarded<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn rewrite_text(&self, title: &str, description: &str) -> Result<RewrittenCopy> {
        self.policy
            .run("copy rewrite", || self.inner.rewrite_text(title, description))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast(retries: u32) -> CallPolicy {
        CallPolicy::new(Duration::from_millis(50), retries, Duration::from_millis(1))
    }

    /// Fails the first `failures` calls, sleeping `delay` each time.
    struct Flaky {
        failures: usize,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Flaky {
        fn new(failures: usize, delay: Duration) -> Self {
            Self {
                failures,
                delay,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ImageGenerator for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn generate_image(&self, _prompt: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if call < self.failures {
                return Err(Error::Enrichment("gateway hiccup".to_string()));
            }
            Ok("data:image/png;base64,AAAA".to_string())
        }
    }

    #[test]
    fn test_retries_are_clamped() {
        assert_eq!(CallPolicy::new(Duration::from_secs(1), 5, Duration::ZERO).retries, 1);
        assert_eq!(CallPolicy::default().retries, 1);
    }

    #[tokio::test]
    async fn test_single_retry_recovers() {
        let guarded = Guarded::new(Flaky::new(1, Duration::ZERO), fast(1));
        assert!(guarded.generate_image("btc").await.is_ok());
        assert_eq!(guarded.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_one_retry() {
        let guarded = Guarded::new(Flaky::new(5, Duration::ZERO), fast(1));
        assert!(matches!(guarded.generate_image("btc").await, Err(Error::Enrichment(_))));
        assert_eq!(guarded.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_retry_when_disabled() {
        let guarded = Guarded::new(Flaky::new(1, Duration::ZERO), fast(0));
        assert!(guarded.generate_image("btc").await.is_err());
        assert_eq!(guarded.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let guarded = Guarded::new(Flaky::new(0, Duration::from_millis(500)), fast(0));
        assert!(matches!(guarded.generate_image("btc").await, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn test_config_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = fast(1)
            .run("setup", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::Config("missing key".to_string())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
