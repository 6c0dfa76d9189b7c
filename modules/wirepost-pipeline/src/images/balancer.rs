use std::sync::Mutex;

use tracing::info;

use wirepost_common::{ImageSourceKind, UsageStats};

/// Ceiling on the paid-API share of image usage.
pub const MAX_STOCK_RATIO: f64 = 0.2;

#[derive(Default)]
struct UsageCounts {
    editorial: u64,
    stock: u64,
}

/// Keeps stock photo API usage under [`MAX_STOCK_RATIO`] of all runs that
/// used an image. Explicit shared state, injected where needed; counters
/// reset with the process.
pub struct SourceBalancer {
    counts: Mutex<UsageCounts>,
}

impl SourceBalancer {
    pub fn new() -> Self {
        Self {
            counts: Mutex::new(UsageCounts::default()),
        }
    }

    /// Whether the next run should reach for the free editorial source.
    /// A cold start prefers editorial, as does any state where the stock
    /// share has hit the ceiling.
    pub fn prefer_editorial(&self) -> bool {
        let counts = self.counts.lock().unwrap();
        let total = counts.editorial + counts.stock;
        total == 0 || counts.stock as f64 / total as f64 >= MAX_STOCK_RATIO
    }

    /// Record which source actually served a run. Called only when at
    /// least one image was selected.
    pub fn record_usage(&self, kind: ImageSourceKind) {
        let mut counts = self.counts.lock().unwrap();
        match kind {
            ImageSourceKind::Editorial => counts.editorial += 1,
            ImageSourceKind::Stock => counts.stock += 1,
        }
        info!(
            source = kind.as_str(),
            editorial = counts.editorial,
            stock = counts.stock,
            "Recorded image source usage"
        );
    }

    pub fn stats(&self) -> UsageStats {
        let counts = self.counts.lock().unwrap();
        let total = counts.editorial + counts.stock;
        let (editorial_percentage, stock_percentage) = if total == 0 {
            (0.0, 0.0)
        } else {
            (
                counts.editorial as f64 / total as f64 * 100.0,
                counts.stock as f64 / total as f64 * 100.0,
            )
        };
        let next_source = if total == 0 || counts.stock as f64 / total as f64 >= MAX_STOCK_RATIO {
            ImageSourceKind::Editorial
        } else {
            ImageSourceKind::Stock
        };
        UsageStats {
            total_runs: total,
            editorial_usage: counts.editorial,
            stock_usage: counts.stock,
            editorial_percentage,
            stock_percentage,
            next_source,
        }
    }
}

impl Default for SourceBalancer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_start_prefers_editorial() {
        let balancer = SourceBalancer::new();
        assert!(balancer.prefer_editorial());
        assert_eq!(balancer.stats().next_source, ImageSourceKind::Editorial);
    }

    #[test]
    fn stock_allowed_while_under_the_ceiling() {
        let balancer = SourceBalancer::new();
        for _ in 0..9 {
            balancer.record_usage(ImageSourceKind::Editorial);
        }
        balancer.record_usage(ImageSourceKind::Stock);
        // 1 of 10 is 10%, below the 20% cap
        assert!(!balancer.prefer_editorial());
    }

    #[test]
    fn hitting_the_ceiling_steers_back_to_editorial() {
        let balancer = SourceBalancer::new();
        for _ in 0..4 {
            balancer.record_usage(ImageSourceKind::Editorial);
        }
        balancer.record_usage(ImageSourceKind::Stock);
        // 1 of 5 is exactly 20%
        assert!(balancer.prefer_editorial());

        // One more editorial run brings the share back under the cap.
        balancer.record_usage(ImageSourceKind::Editorial);
        assert!(!balancer.prefer_editorial());
    }

    #[test]
    fn stats_reflect_counters() {
        let balancer = SourceBalancer::new();
        balancer.record_usage(ImageSourceKind::Editorial);
        balancer.record_usage(ImageSourceKind::Editorial);
        balancer.record_usage(ImageSourceKind::Editorial);
        balancer.record_usage(ImageSourceKind::Stock);

        let stats = balancer.stats();
        assert_eq!(stats.total_runs, 4);
        assert_eq!(stats.editorial_usage, 3);
        assert_eq!(stats.stock_usage, 1);
        assert!((stats.editorial_percentage - 75.0).abs() < f64::EPSILON);
        assert!((stats.stock_percentage - 25.0).abs() < f64::EPSILON);
        assert_eq!(stats.next_source, ImageSourceKind::Editorial);
    }
}
