// Interval-based tick source (tokio timer)
use async_trait::async_trait;
use pushq_core::port::{TickSource, Ticker};
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Starts one `tokio::time::Interval` per execution.
///
/// The first tick fires one full period after start, matching a classic
/// repeating timer rather than tokio's immediate first tick.
#[derive(Debug, Clone, Copy)]
pub struct IntervalTickSource {
    period: Duration,
}

impl IntervalTickSource {
    /// A zero period is bumped to 1ms; tokio rejects zero intervals
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl TickSource for IntervalTickSource {
    fn start(&self) -> Box<dyn Ticker> {
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        // A late tick must not trigger a burst of catch-up ticks
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Box::new(IntervalTicker { interval })
    }
}

struct IntervalTicker {
    interval: Interval,
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_one_period() {
        let source = IntervalTickSource::new(Duration::from_secs(1));
        let mut ticker = source.start();
        let started = Instant::now();

        ticker.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(1));

        ticker.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn test_zero_period_is_clamped() {
        let source = IntervalTickSource::new(Duration::ZERO);
        assert_eq!(source.period(), Duration::from_millis(1));
    }
}
