use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic clock driving the trial loop
pub trait Timer: Clone + Send + Sync {
    type Timestamp: Copy + Clone + Send + Sync;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, ts: Self::Timestamp) -> Duration;
}

/// Wall clock, nanoseconds since construction
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
}

impl Timer for HighPrecisionTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Wall-clock instant of timestamp `ns`, for handing to an event loop
    pub fn instant_at(&self, ns: u64) -> Instant {
        self.start + Duration::from_nanos(ns)
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Virtual clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give the
/// other to the scheduler.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now_ns: Arc<AtomicU64>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    pub fn set(&self, ns: u64) {
        self.now_ns.store(ns, Ordering::SeqCst);
    }
}

impl Timer for ManualTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_timer_clones_share_time() {
        let timer = ManualTimer::new();
        let handle = timer.clone();
        handle.advance_ms(350);
        assert_eq!(timer.now(), 350_000_000);
        assert_eq!(timer.elapsed(100_000_000), Duration::from_millis(250));
    }

    #[test]
    fn high_precision_timer_is_monotonic() {
        let timer = HighPrecisionTimer::new();
        let a = timer.now();
        std::thread::sleep(Duration::from_millis(2));
        let b = timer.now();
        assert!(b >= a + 1_000_000);
    }

    #[test]
    fn instant_at_maps_timestamps_onto_the_wall_clock() {
        let timer = HighPrecisionTimer::new();
        assert_eq!(timer.instant_at(0), timer.start);
        let wake = timer.instant_at(timer.now() + 500_000_000);
        assert!(wake > Instant::now());
        assert_eq!(
            timer.instant_at(3_000_000) - timer.instant_at(1_000_000),
            Duration::from_millis(2)
        );
    }
}
