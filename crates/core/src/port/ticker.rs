// Ticker Port
// Scheduled-timer abstraction driving an execution. One ticker per
// execution; dropping it releases the timer.

use async_trait::async_trait;

/// A running periodic timer.
///
/// Firings are serial: `tick` is awaited by a single owner, so a tick body
/// can never overlap the previous one.
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next firing
    async fn tick(&mut self);
}

/// Starts periodic timers
pub trait TickSource: Send + Sync {
    fn start(&self) -> Box<dyn Ticker>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct Counters {
        started: AtomicUsize,
        fired: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    /// Tick source that sleeps a fixed period per tick and counts timer usage.
    ///
    /// Pair with `tokio::time::pause` for deterministic timing.
    #[derive(Clone)]
    pub struct MockTickSource {
        period: Duration,
        counters: Arc<Counters>,
    }

    impl MockTickSource {
        pub fn new(period: Duration) -> Self {
            Self {
                period,
                counters: Arc::new(Counters::default()),
            }
        }

        /// Timers started so far
        pub fn started(&self) -> usize {
            self.counters.started.load(Ordering::SeqCst)
        }

        /// Ticks delivered across all timers
        pub fn fired(&self) -> usize {
            self.counters.fired.load(Ordering::SeqCst)
        }

        /// Timers not yet released
        pub fn active(&self) -> usize {
            self.counters.active.load(Ordering::SeqCst)
        }

        /// Highest number of simultaneously live timers
        pub fn max_active(&self) -> usize {
            self.counters.max_active.load(Ordering::SeqCst)
        }
    }

    impl TickSource for MockTickSource {
        fn start(&self) -> Box<dyn Ticker> {
            self.counters.started.fetch_add(1, Ordering::SeqCst);
            let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.max_active.fetch_max(active, Ordering::SeqCst);
            Box::new(MockTicker {
                period: self.period,
                counters: Arc::clone(&self.counters),
            })
        }
    }

    struct MockTicker {
        period: Duration,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl Ticker for MockTicker {
        async fn tick(&mut self) {
            tokio::time::sleep(self.period).await;
            self.counters.fired.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Drop for MockTicker {
        fn drop(&mut self) {
            self.counters.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
