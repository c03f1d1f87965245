use std::time::{Duration, Instant};

/// Token bucket guarding one socket. Reveal clicks and refresh hints are
/// small and infrequent; anything chattier than the bucket allows is a
/// misbehaving client and gets its connection dropped.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tokens: u32,
    max_tokens: u32,
    refill_rate: Duration,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new() -> Self {
        // 30 events burst, refilling one per second
        Self::new_with_limits(30, Duration::from_secs(1))
    }

    pub fn new_with_limits(max_tokens: u32, refill_rate: Duration) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    pub async fn check_rate_limit(&mut self) -> bool {
        self.refill_tokens();

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill_tokens(&mut self) {
        let elapsed = self.last_refill.elapsed();
        if elapsed >= self.refill_rate {
            let tokens_to_add =
                (elapsed.as_millis() / self.refill_rate.as_millis().max(1)) as u32;
            self.tokens = (self.tokens + tokens_to_add).min(self.max_tokens);
            self.last_refill = Instant::now();
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_drains_the_bucket() {
        let mut limiter = RateLimiter::new_with_limits(3, Duration::from_secs(60));
        assert!(limiter.check_rate_limit().await);
        assert!(limiter.check_rate_limit().await);
        assert!(limiter.check_rate_limit().await);
        assert!(!limiter.check_rate_limit().await);
    }

    #[tokio::test]
    async fn tokens_refill_over_time() {
        let mut limiter = RateLimiter::new_with_limits(1, Duration::from_millis(1));
        assert!(limiter.check_rate_limit().await);
        assert!(!limiter.check_rate_limit().await);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(limiter.check_rate_limit().await);
    }
}
