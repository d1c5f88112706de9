//! Per-credential quarantine state with a fixed cooldown.
//!
//! A credential enters quarantine when the caller reports a failure (rate
//! limiting, typically) and leaves it automatically once the cooldown has
//! elapsed. Expiry is lazy: records are swept whenever selection or reporting
//! reads health state, never by a background timer.
//!
//! Records are keyed by credential handle, not by pool position. Handles are
//! never reused, so removing an unrelated credential cannot remap a
//! quarantine record onto the wrong pool member.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::registry::CredentialHandle;

/// How long a credential stays quarantined after a reported failure
pub const COOLDOWN: Duration = Duration::from_secs(60);

/// Failure state for one provider's pool.
#[derive(Debug)]
pub struct HealthTracker {
    cooldown: Duration,
    failed_at: HashMap<CredentialHandle, Instant>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self::with_cooldown(COOLDOWN)
    }

    /// Tracker with a custom cooldown (tests use short windows)
    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            cooldown,
            failed_at: HashMap::new(),
        }
    }

    /// Record a failure for this handle, overwriting any earlier mark
    pub fn mark_failed(&mut self, handle: &str) {
        self.failed_at.insert(handle.to_string(), Instant::now());
    }

    pub fn is_quarantined(&self, handle: &str) -> bool {
        self.failed_at
            .get(handle)
            .is_some_and(|failed| failed.elapsed() < self.cooldown)
    }

    /// Drop records whose cooldown has elapsed
    pub fn sweep(&mut self) {
        let cooldown = self.cooldown;
        self.failed_at.retain(|_, failed| failed.elapsed() < cooldown);
    }

    /// Drop the record for one handle (its credential was removed)
    pub fn forget(&mut self, handle: &str) {
        self.failed_at.remove(handle);
    }

    /// Clear every record for this provider
    pub fn reset(&mut self) {
        self.failed_at.clear();
    }

    pub fn quarantined_count(&self) -> usize {
        self.failed_at
            .values()
            .filter(|failed| failed.elapsed() < self.cooldown)
            .count()
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_mark_and_expire() {
        let mut health = HealthTracker::with_cooldown(Duration::from_millis(30));
        health.mark_failed("h1");
        assert!(health.is_quarantined("h1"));
        assert_eq!(health.quarantined_count(), 1);

        sleep(Duration::from_millis(40));
        assert!(!health.is_quarantined("h1"));
        assert_eq!(health.quarantined_count(), 0);

        // Lazy sweep drops the expired record entirely
        health.sweep();
        assert_eq!(health.failed_at.len(), 0);
    }

    #[test]
    fn test_remark_overwrites_earlier_failure() {
        let mut health = HealthTracker::with_cooldown(Duration::from_millis(50));
        health.mark_failed("h1");
        sleep(Duration::from_millis(30));
        health.mark_failed("h1");
        sleep(Duration::from_millis(30));
        // 60ms after the first mark but only 30ms after the second
        assert!(health.is_quarantined("h1"));
    }

    #[test]
    fn test_forget_and_reset() {
        let mut health = HealthTracker::new();
        health.mark_failed("h1");
        health.mark_failed("h2");

        health.forget("h1");
        assert!(!health.is_quarantined("h1"));
        assert!(health.is_quarantined("h2"));

        health.reset();
        assert!(!health.is_quarantined("h2"));
    }
}
