//! Single-flight detection trigger
//!
//! At most one detection run executes at a time per trigger (and its
//! clones). A request that arrives while a run is in flight is dropped, not
//! queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::DetectionConfig;
use crate::db::{Database, RunTrigger};
use crate::error::Result;
use crate::recurring::{DetectionResults, RecurringDetector};

/// Clears the in-flight flag when dropped, including on error or panic
struct RunGuard {
    running: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Shared handle for starting detection runs
#[derive(Clone)]
pub struct DetectionTrigger {
    db: Database,
    config: DetectionConfig,
    running: Arc<AtomicBool>,
}

impl DetectionTrigger {
    pub fn new(db: Database, config: DetectionConfig) -> Self {
        Self {
            db,
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a run is currently in flight
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard {
                running: Arc::clone(&self.running),
            })
    }

    /// Run detection on the calling thread
    ///
    /// Returns `Ok(None)` without doing anything if another run is in flight.
    /// Store errors are returned and leave the stored patterns untouched.
    pub fn run_detection(&self) -> Result<Option<DetectionResults>> {
        let Some(_guard) = self.try_acquire() else {
            debug!("Recurring detection already running, skipping");
            return Ok(None);
        };

        RecurringDetector::with_config(&self.db, self.config.clone())
            .run()
            .map(Some)
    }

    /// Start detection in the background and return immediately
    ///
    /// Returns whether a run was started. Failures are only logged. Uses the
    /// tokio blocking pool when called inside a runtime, a plain thread
    /// otherwise.
    pub fn trigger_async(&self) -> bool {
        let Some(guard) = self.try_acquire() else {
            debug!("Recurring detection already running, trigger ignored");
            return false;
        };

        let db = self.db.clone();
        let config = self.config.clone();
        let job = move || {
            let _guard = guard;
            match RecurringDetector::with_config(&db, config)
                .triggered_by(RunTrigger::Background)
                .run()
            {
                Ok(results) => info!(
                    patterns = results.patterns_found(),
                    "Background recurring detection finished"
                ),
                Err(e) => error!(error = %e, "Background recurring detection failed"),
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => {
                if let Err(e) = std::thread::Builder::new()
                    .name("cadence-detect".to_string())
                    .spawn(job)
                {
                    // The job (and its guard) were dropped, so the flag is free again
                    error!(error = %e, "Failed to spawn detection thread");
                    return false;
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatternFilter;
    use crate::test_utils::netflix_monthly;
    use std::time::Duration;

    fn trigger_with_data() -> DetectionTrigger {
        let db = Database::in_memory().unwrap();
        db.import_file("bank.csv", &netflix_monthly()).unwrap();
        DetectionTrigger::new(db, DetectionConfig::default())
    }

    fn wait_until_idle(trigger: &DetectionTrigger) {
        for _ in 0..200 {
            if !trigger.is_running() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("detection did not finish");
    }

    #[test]
    fn test_run_detection() {
        let trigger = trigger_with_data();
        let results = trigger.run_detection().unwrap().unwrap();
        assert_eq!(results.patterns_found(), 1);
        assert!(!trigger.is_running());

        let runs = trigger.db.list_detection_runs(10).unwrap();
        assert_eq!(runs[0].trigger, RunTrigger::Manual);
    }

    #[test]
    fn test_second_run_is_noop_while_in_flight() {
        let trigger = trigger_with_data();
        let guard = trigger.try_acquire().unwrap();
        assert!(trigger.is_running());

        assert!(trigger.run_detection().unwrap().is_none());
        assert!(!trigger.trigger_async());

        // Clones share the same flag
        let clone = trigger.clone();
        assert!(clone.run_detection().unwrap().is_none());

        drop(guard);
        assert!(!trigger.is_running());
        assert!(trigger.run_detection().unwrap().is_some());
    }

    #[test]
    fn test_check_and_set_is_exclusive() {
        let trigger = trigger_with_data();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let trigger = trigger.clone();
                std::thread::spawn(move || trigger.try_acquire().map(std::mem::forget).is_some())
            })
            .collect();

        let acquired = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(acquired, 1);
    }

    #[test]
    fn test_flag_released_on_error() {
        let trigger = trigger_with_data();
        {
            let conn = trigger.db.conn().unwrap();
            conn.execute_batch("DROP TABLE recurring_transactions;")
                .unwrap();
        }

        assert!(trigger.run_detection().is_err());
        assert!(!trigger.is_running());
    }

    #[test]
    fn test_trigger_async_without_runtime() {
        let trigger = trigger_with_data();
        assert!(trigger.trigger_async());
        wait_until_idle(&trigger);

        let response = trigger.db.list_patterns(&PatternFilter::default()).unwrap();
        assert_eq!(response.patterns.len(), 1);

        let runs = trigger.db.list_detection_runs(10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].trigger, RunTrigger::Background);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_trigger_async_in_runtime() {
        let trigger = trigger_with_data();
        assert!(trigger.trigger_async());

        for _ in 0..200 {
            if !trigger.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!trigger.is_running());

        let response = trigger.db.list_patterns(&PatternFilter::default()).unwrap();
        assert_eq!(response.patterns.len(), 1);
    }
}
