/// Wallet API rate limiter - sliding one second window shared by every client in the process
use lazy_static::lazy_static;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_REQUESTS_PER_SECOND: usize = 10;

lazy_static! {
    static ref WALLET_API_RATE_LIMITER: Mutex<WalletApiRateLimiter> =
        Mutex::new(WalletApiRateLimiter::new(DEFAULT_MAX_REQUESTS_PER_SECOND));
}

pub struct WalletApiRateLimiter {
    /// Queue of request timestamps (last 1 second)
    request_times: VecDeque<Instant>,
    /// Max requests per second
    max_requests: usize,
    /// Time window (1 second)
    window: Duration,
}

impl WalletApiRateLimiter {
    fn new(max_requests: usize) -> Self {
        Self {
            request_times: VecDeque::new(),
            max_requests: max_requests.max(1),
            window: Duration::from_secs(1),
        }
    }

    fn check_and_record(&mut self) -> Duration {
        let now = Instant::now();

        // Remove old timestamps outside the window
        while let Some(&front) = self.request_times.front() {
            if now.duration_since(front) > self.window {
                self.request_times.pop_front();
            } else {
                break;
            }
        }

        if self.request_times.len() >= self.max_requests {
            if let Some(&oldest) = self.request_times.front() {
                let elapsed = now.duration_since(oldest);
                if elapsed < self.window {
                    return self.window - elapsed;
                }
            }
        }

        self.request_times.push_back(now);
        Duration::from_secs(0)
    }
}

/// Change the per-second budget; takes effect on the next request
pub fn set_wallet_api_rate_limit(max_requests: usize) {
    if let Ok(mut limiter) = WALLET_API_RATE_LIMITER.lock() {
        limiter.max_requests = max_requests.max(1);
    }
}

/// Wait until a request slot is free in the current window, then claim it
pub async fn rate_limit_wallet_api() {
    loop {
        let wait_duration = match WALLET_API_RATE_LIMITER.lock() {
            Ok(mut limiter) => limiter.check_and_record(),
            // A poisoned limiter only loses timing state
            Err(poisoned) => poisoned.into_inner().check_and_record(),
        };

        if wait_duration.is_zero() {
            return;
        }

        tracing::debug!("Wallet API rate limit: waiting {}ms", wait_duration.as_millis());
        tokio::time::sleep(wait_duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_allows_requests_within_limit() {
        let mut limiter = WalletApiRateLimiter::new(10);

        for _ in 0..10 {
            let wait = limiter.check_and_record();
            assert_eq!(wait.as_millis(), 0);
        }
    }

    #[test]
    fn test_rate_limiter_blocks_over_limit() {
        let mut limiter = WalletApiRateLimiter::new(10);

        for _ in 0..10 {
            limiter.check_and_record();
        }

        let wait = limiter.check_and_record();
        assert!(wait.as_millis() > 0);
        // the rejected attempt is not recorded
        assert_eq!(limiter.request_times.len(), 10);
    }

    #[test]
    fn test_zero_budget_is_clamped() {
        let mut limiter = WalletApiRateLimiter::new(0);
        assert!(limiter.check_and_record().is_zero());
        assert!(!limiter.check_and_record().is_zero());
    }
}
