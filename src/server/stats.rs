//! Server statistics.
//!
//! Lock-free counters shared by the accept loop and every connection task.
//! [`ConnectionGuard`] keeps the active count correct even when a task ends
//! early.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Connection and request counters.
#[derive(Debug, Default)]
pub struct ServerStats {
    total_connections: AtomicU64,
    active_connections: AtomicUsize,
    total_requests: AtomicU64,
}

/// Point-in-time copy of [`ServerStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total_connections: u64,
    pub active_connections: usize,
    pub total_requests: u64,
}

impl ServerStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection and return a guard that marks it closed on drop.
    pub fn open_connection(self: &Arc<Self>) -> ConnectionGuard {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::AcqRel);
        ConnectionGuard {
            stats: Arc::clone(self),
        }
    }

    /// Record one answered request.
    #[inline]
    pub fn request_handled(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Connections accepted since start.
    #[inline]
    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    /// Connections currently being served.
    #[inline]
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Acquire)
    }

    /// Requests answered since start.
    #[inline]
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Copy all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_connections: self.total_connections(),
            active_connections: self.active_connections(),
            total_requests: self.total_requests(),
        }
    }
}

/// Decrements the active connection count on drop.
pub struct ConnectionGuard {
    stats: Arc<ServerStats>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.stats.active_connections.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Hand a snapshot of `stats` to `report` every `period`, forever.
///
/// The first report comes one full period after the call. Run it on its own
/// task and abort the task to stop reporting.
pub async fn report_periodically<F>(stats: Arc<ServerStats>, period: Duration, mut report: F)
where
    F: FnMut(StatsSnapshot),
{
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticks.tick().await;
        report(stats.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_stats_start_at_zero() {
        let stats = ServerStats::new();
        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                total_connections: 0,
                active_connections: 0,
                total_requests: 0,
            }
        );
    }

    #[test]
    fn test_guard_tracks_active_connections() {
        let stats = Arc::new(ServerStats::new());

        let first = stats.open_connection();
        let second = stats.open_connection();
        assert_eq!(stats.active_connections(), 2);
        assert_eq!(stats.total_connections(), 2);

        drop(first);
        assert_eq!(stats.active_connections(), 1);

        drop(second);
        assert_eq!(stats.active_connections(), 0);
        assert_eq!(stats.total_connections(), 2);
    }

    #[test]
    fn test_request_counter() {
        let stats = ServerStats::new();
        for _ in 0..5 {
            stats.request_handled();
        }
        assert_eq!(stats.total_requests(), 5);
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = Arc::new(ServerStats::new());
        let _guard = stats.open_connection();
        stats.request_handled();

        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["total_connections"], 1);
        assert_eq!(json["active_connections"], 1);
        assert_eq!(json["total_requests"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_reports() {
        let stats = Arc::new(ServerStats::new());
        let reports = Arc::new(Mutex::new(Vec::new()));

        let sink = reports.clone();
        let reporter = tokio::spawn(report_periodically(
            stats.clone(),
            Duration::from_secs(60),
            move |snapshot| sink.lock().unwrap().push(snapshot),
        ));

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(reports.lock().unwrap().is_empty());

        stats.request_handled();
        tokio::time::sleep(Duration::from_secs(62)).await;
        reporter.abort();

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|snapshot| snapshot.total_requests == 1));
    }
}
