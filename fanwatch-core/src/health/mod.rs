// fanwatch-core/src/health/mod.rs
//
// Lock-free tally of upstream API calls. Every request made by the creator client is
// recorded here; a periodic task drains the counters into `api_health_stats`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, error};

use fanwatch_common::error::Error;
use fanwatch_common::traits::repository_traits::StatsRepository;

#[derive(Debug, Default)]
pub struct HealthAggregator {
    total: AtomicU64,
    successful: AtomicU64,
}

/// Counts drained by one flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HealthSnapshot {
    pub total: u64,
    pub successful: u64,
}

impl HealthAggregator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_call(&self, success: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Current counts without resetting them.
    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            total: self.total.load(Ordering::Relaxed),
            successful: self.successful.load(Ordering::Relaxed),
        }
    }

    /// Swaps both counters to zero and returns what they held.
    /// The two swaps are separate, so a call recorded between them can leave one interval
    /// with `successful > total`; the next interval absorbs the difference.
    pub fn take(&self) -> HealthSnapshot {
        HealthSnapshot {
            total: self.total.swap(0, Ordering::Relaxed),
            successful: self.successful.swap(0, Ordering::Relaxed),
        }
    }

    /// Drains the counters into the stats store. Nothing is written when no calls were made.
    /// The counters are reset either way; a failed write drops that interval's delta.
    pub async fn flush(&self, service_name: &str, stats: &dyn StatsRepository) -> Result<HealthSnapshot, Error> {
        let snap = self.take();
        if snap.total == 0 {
            return Ok(snap);
        }

        match stats.add_api_health(service_name, snap.total, snap.successful).await {
            Ok(()) => {
                debug!("Flushed API health for {}: {}/{} successful", service_name, snap.successful, snap.total);
                Ok(snap)
            }
            Err(e) => {
                error!("API health flush for {} failed, dropping {} calls: {:?}", service_name, snap.total, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_take() {
        let agg = HealthAggregator::default();
        agg.record_call(true);
        agg.record_call(false);
        agg.record_call(true);

        assert_eq!(agg.snapshot(), HealthSnapshot { total: 3, successful: 2 });
        assert_eq!(agg.take(), HealthSnapshot { total: 3, successful: 2 });
        assert_eq!(agg.snapshot(), HealthSnapshot::default());
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let agg = HealthAggregator::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let a = agg.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        a.record_call(true);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(agg.snapshot().total, 8000);
        assert_eq!(agg.snapshot().successful, 8000);
    }

    #[test]
    fn test_takes_racing_records_lose_nothing_overall() {
        let agg = HealthAggregator::new();
        let recorders: Vec<_> = (0..4)
            .map(|_| {
                let a = agg.clone();
                std::thread::spawn(move || {
                    for i in 0..2000 {
                        a.record_call(i % 2 == 0);
                    }
                })
            })
            .collect();

        let mut taken = HealthSnapshot::default();
        while recorders.iter().any(|h| !h.is_finished()) {
            let snap = agg.take();
            taken.total += snap.total;
            taken.successful += snap.successful;
        }
        for h in recorders {
            h.join().unwrap();
        }
        let rest = agg.take();

        // Individual intervals may be skewed; the sum across intervals is exact.
        assert_eq!(taken.total + rest.total, 8000);
        assert_eq!(taken.successful + rest.successful, 4000);
    }
}
