//! Round-robin selection over a provider's pool, skipping quarantined members.
//!
//! Pure in-memory logic: callers hand in a pool snapshot, the last-used
//! cursor and the provider's health tracker, and get back a position to
//! serve. With no quarantines every credential is visited before any
//! repeats; with quarantines the ring skips marked members but never
//! starves.

use crate::health::HealthTracker;
use crate::registry::CredentialHandle;

/// Outcome of one selection pass over a pool snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The pool is empty; the caller has a configuration problem.
    Empty,
    /// Exactly one credential: served directly, no cursor or health bookkeeping.
    Single,
    /// Chosen position, to be persisted as the new cursor. `quarantine_reset`
    /// is set when every member was quarantined and availability won over
    /// cooldown adherence: all records were cleared and position 0 served.
    Next {
        position: usize,
        quarantine_reset: bool,
    },
}

/// Pick the next pool position to serve.
///
/// `cursor` is the last-used position, or `None` after startup or a
/// membership change. Stale out-of-bounds cursors are treated as `None`.
pub fn select_next(
    pool: &[CredentialHandle],
    cursor: Option<usize>,
    health: &mut HealthTracker,
) -> Selection {
    if pool.is_empty() {
        return Selection::Empty;
    }
    if pool.len() == 1 {
        return Selection::Single;
    }

    health.sweep();

    if pool.iter().all(|handle| health.is_quarantined(handle)) {
        health.reset();
        return Selection::Next {
            position: 0,
            quarantine_reset: true,
        };
    }

    let start = match cursor.filter(|c| *c < pool.len()) {
        Some(last_used) => last_used + 1,
        None => 0,
    };

    for step in 0..pool.len() {
        let position = (start + step) % pool.len();
        if !health.is_quarantined(&pool[position]) {
            return Selection::Next {
                position,
                quarantine_reset: false,
            };
        }
    }

    // Unreachable: at least one member was healthy above
    Selection::Next {
        position: start % pool.len(),
        quarantine_reset: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pool(names: &[&str]) -> Vec<CredentialHandle> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn position(selection: Selection) -> usize {
        match selection {
            Selection::Next { position, .. } => position,
            other => panic!("expected Next, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_pool() {
        let mut health = HealthTracker::new();
        assert_eq!(select_next(&[], None, &mut health), Selection::Empty);
    }

    #[test]
    fn test_singleton_pool_skips_bookkeeping() {
        let mut health = HealthTracker::new();
        let pool = pool(&["h1"]);
        // Even a quarantined singleton is served directly
        health.mark_failed("h1");
        assert_eq!(select_next(&pool, None, &mut health), Selection::Single);
    }

    #[test]
    fn test_pure_round_robin_visits_all_before_repeating() {
        let mut health = HealthTracker::new();
        let pool = pool(&["h1", "h2", "h3", "h4"]);

        let mut cursor = None;
        let mut seen = Vec::new();
        for _ in 0..pool.len() {
            let pos = position(select_next(&pool, cursor, &mut health));
            cursor = Some(pos);
            seen.push(pos);
        }
        let mut sorted = seen.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3], "selections must be a permutation");
        assert_eq!(seen, vec![0, 1, 2, 3], "ring order is insertion order");

        // Fifth selection wraps around
        assert_eq!(position(select_next(&pool, cursor, &mut health)), 0);
    }

    #[test]
    fn test_quarantined_member_skipped() {
        let mut health = HealthTracker::new();
        let pool = pool(&["h1", "h2", "h3"]);
        health.mark_failed("h2");

        assert_eq!(position(select_next(&pool, None, &mut health)), 0);
        assert_eq!(position(select_next(&pool, Some(0), &mut health)), 2);
        assert_eq!(position(select_next(&pool, Some(2), &mut health)), 0);
    }

    #[test]
    fn test_all_quarantined_resets_and_serves_first() {
        let mut health = HealthTracker::new();
        let pool = pool(&["h1", "h2"]);
        health.mark_failed("h1");
        health.mark_failed("h2");

        assert_eq!(
            select_next(&pool, Some(0), &mut health),
            Selection::Next {
                position: 0,
                quarantine_reset: true
            }
        );
        // Side effect: all quarantine state cleared
        assert!(!health.is_quarantined("h1"));
        assert!(!health.is_quarantined("h2"));
    }

    #[test]
    fn test_expired_quarantine_swept_on_selection() {
        let mut health = HealthTracker::with_cooldown(Duration::from_millis(10));
        let pool = pool(&["h1", "h2"]);
        health.mark_failed("h2");
        std::thread::sleep(Duration::from_millis(20));

        // h2 is past cooldown and selectable again
        assert_eq!(position(select_next(&pool, Some(0), &mut health)), 1);
    }

    #[test]
    fn test_stale_cursor_treated_as_none() {
        let mut health = HealthTracker::new();
        let pool = pool(&["h1", "h2"]);
        assert_eq!(position(select_next(&pool, Some(17), &mut health)), 0);
    }
}
