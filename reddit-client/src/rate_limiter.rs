use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Trailing window over which requests are counted.
const WINDOW: Duration = Duration::from_secs(60);

/// Small buffer added when waiting for the window to free up, so a request
/// never lands exactly on the boundary.
const WINDOW_BUFFER: Duration = Duration::from_millis(100);

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct LimiterState {
    request_times: VecDeque<Instant>,
    backoff_delay: Duration,
}

/// Sliding-window rate limiter for the Reddit API (60 requests/minute by
/// default) with exponential backoff after throttling errors.
///
/// Grants are paced: besides the trailing-window cap, a minimum spacing of
/// `60 / requests_per_minute` seconds is enforced between consecutive
/// requests, so traffic stays steady instead of bursting to the cap and then
/// stalling for a minute.
///
/// State is process-local and advisory; there is no cross-instance
/// coordination.
#[derive(Debug)]
pub struct RateLimiter {
    requests_per_minute: u32,
    min_interval: Duration,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let requests_per_minute = requests_per_minute.max(1);
        Self {
            requests_per_minute,
            min_interval: Duration::from_secs_f64(60.0 / requests_per_minute as f64),
            state: Mutex::new(LimiterState {
                request_times: VecDeque::new(),
                backoff_delay: INITIAL_BACKOFF,
            }),
        }
    }

    /// Suspend until it is safe to issue one more request, then record it.
    ///
    /// The internal lock is held across the waits, so concurrent callers are
    /// granted one at a time and the aggregate rate never exceeds the cap.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;

        let now = Instant::now();
        prune_old_requests(&mut state.request_times, now);

        if state.request_times.len() >= self.requests_per_minute as usize {
            if let Some(oldest) = state.request_times.front().copied() {
                let wait = WINDOW
                    .checked_sub(now.duration_since(oldest))
                    .unwrap_or_default()
                    + WINDOW_BUFFER;
                info!(
                    wait_secs = wait.as_secs_f64(),
                    "rate limit window full, waiting"
                );
                sleep(wait).await;
                prune_old_requests(&mut state.request_times, Instant::now());
            }
        }

        if let Some(last) = state.request_times.back().copied() {
            let elapsed = Instant::now().duration_since(last);
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(wait_secs = wait.as_secs_f64(), "pacing between requests");
                sleep(wait).await;
            }
        }

        state.request_times.push_back(Instant::now());
    }

    /// Suspend for the current backoff delay after a throttling error, then
    /// double the delay (capped at 60s). Returns the delay actually waited.
    pub async fn handle_rate_limit_error(&self) -> Duration {
        let delay = {
            let mut state = self.state.lock().await;
            let delay = state.backoff_delay.min(MAX_BACKOFF);
            state.backoff_delay = (delay * 2).min(MAX_BACKOFF);
            delay
        };

        warn!(
            delay_secs = delay.as_secs_f64(),
            "rate limit error, backing off"
        );
        sleep(delay).await;
        delay
    }

    /// Reset the backoff delay after a successful request.
    pub async fn reset_backoff(&self) {
        let mut state = self.state.lock().await;
        state.backoff_delay = INITIAL_BACKOFF;
    }

    /// Requests still allowed within the current trailing window, never negative.
    pub async fn remaining_requests(&self) -> u32 {
        let mut state = self.state.lock().await;
        prune_old_requests(&mut state.request_times, Instant::now());
        self.requests_per_minute
            .saturating_sub(state.request_times.len() as u32)
    }
}

fn prune_old_requests(request_times: &mut VecDeque<Instant>, now: Instant) {
    while let Some(front) = request_times.front() {
        if now.duration_since(*front) > WINDOW {
            request_times.pop_front();
        } else {
            break;
        }
    }
}
