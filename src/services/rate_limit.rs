use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Token bucket over a rolling time window.
///
/// One instance is shared (behind `Arc`) by every outbound source call, so
/// combined parallelism across discovery tasks can never exceed the budget.
/// The limiter is the sole serialization point for outbound requests; no
/// other state is held across a network call.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Waits until a request slot is free within the rolling window, then
    /// consumes it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut stamps = self.timestamps.lock().await;
                let now = Instant::now();
                while let Some(front) = stamps.front() {
                    if now.duration_since(*front) >= self.window {
                        stamps.pop_front();
                    } else {
                        break;
                    }
                }

                if (stamps.len() as u32) < self.max_requests {
                    stamps.push_back(now);
                    return;
                }

                // Budget spent: sleep until the oldest request leaves the
                // window, then re-check (another task may take the slot).
                match stamps.front() {
                    Some(oldest) => self.window.saturating_sub(now.duration_since(*oldest)),
                    None => Duration::ZERO,
                }
            };

            tokio::time::sleep(wait.max(Duration::from_millis(10))).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_acquire_within_budget_is_immediate() {
        let limiter = RateLimiter::new(3, Duration::from_secs(10));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_over_budget_waits_for_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        // Third acquisition must wait for the first to leave the window.
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_frees_slots_over_time() {
        let limiter = RateLimiter::new(1, Duration::from_secs(5));

        limiter.acquire().await;
        tokio::time::sleep(Duration::from_secs(6)).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
