//! Ordered release of rate-sensitive outbound requests.
//!
//! Permits are handed out strictly one at a time in submission order, with a
//! minimum delay between consecutive releases. The tokio mutex is fair, so
//! waiters are released FIFO.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// FIFO request gate with a minimum inter-request delay.
pub struct RequestQueue {
    min_interval: Duration,
    last_release: Mutex<Option<Instant>>,
}

impl RequestQueue {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_release: Mutex::new(None),
        }
    }

    /// Wait for this caller's turn. Returns once at least `min_interval` has
    /// passed since the previous release.
    pub async fn acquire(&self) {
        let mut last = self.last_release.lock().await;
        if let Some(prev) = *last {
            let due = prev + self.min_interval;
            let now = Instant::now();
            if due > now {
                tokio::time::sleep_until(due).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_min_interval_between_releases() {
        let queue = RequestQueue::new(Duration::from_millis(100));
        let start = Instant::now();
        queue.acquire().await;
        queue.acquire().await;
        queue.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_releases_preserve_submission_order() {
        let queue = Arc::new(RequestQueue::new(Duration::from_millis(10)));
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut tasks = Vec::new();
        for i in 0..4u32 {
            let queue = queue.clone();
            let order = order.clone();
            tasks.push(tokio::spawn(async move {
                queue.acquire().await;
                order.lock().await.push(i);
            }));
            // Let the spawned task reach the queue before submitting the next.
            tokio::task::yield_now().await;
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(*order.lock().await, vec![0, 1, 2, 3]);
    }
}
