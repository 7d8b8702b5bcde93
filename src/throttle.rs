use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum-interval spacing between outbound requests to one upstream API.
///
/// Each client owns its throttle; the last-call timestamp lives behind a
/// mutex instead of process-global state. One throttle spaces all requests
/// to its API regardless of which handle they are for.
pub struct RequestThrottle {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Sleeps until at least `min_interval` has passed since the previous
    /// call, then records the new timestamp.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        let now = Instant::now();
        if let Some(previous) = *last {
            let elapsed = now.duration_since(previous);
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::RequestThrottle;

    #[test]
    fn first_call_does_not_sleep() {
        tokio_test::block_on(async {
            let throttle = RequestThrottle::from_millis(500);
            let start = tokio::time::Instant::now();
            throttle.wait().await;
            assert!(start.elapsed() < Duration::from_millis(100));
        });
    }

    #[tokio::test]
    async fn spaces_consecutive_calls() {
        let throttle = RequestThrottle::from_millis(50);
        let start = tokio::time::Instant::now();
        throttle.wait().await;
        throttle.wait().await;
        throttle.wait().await;
        // Two spaced gaps after the free first call.
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn elapsed_interval_means_no_extra_delay() {
        let throttle = RequestThrottle::from_millis(20);
        throttle.wait().await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        let start = tokio::time::Instant::now();
        throttle.wait().await;
        assert!(start.elapsed() < Duration::from_millis(15));
    }
}
