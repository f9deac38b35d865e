use crate::models::SprintRecord;

pub const MIN_WINDOW: usize = 2;
pub const MAX_WINDOW: usize = 10;

/// The `n` most recent sprints by start date, most recent first.
pub fn recent_window(records: &[SprintRecord], n: usize) -> Vec<&SprintRecord> {
    let mut sorted: Vec<&SprintRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    sorted.truncate(n.min(records.len()));
    sorted
}

/// The same `n` most recent sprints, oldest first.
pub fn chronological_window(records: &[SprintRecord], n: usize) -> Vec<&SprintRecord> {
    let mut window = recent_window(records, n);
    window.reverse();
    window
}

/// Bounds a user-requested window size to `[2, min(10, total)]`.
///
/// With fewer than two sprints on record there is nothing to bound against, so
/// the whole collection is used.
pub fn clamp_window(requested: usize, total: usize) -> usize {
    if total < MIN_WINDOW {
        return total;
    }
    requested.clamp(MIN_WINDOW, MAX_WINDOW.min(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::sprint;

    #[test]
    fn recent_window_is_most_recent_first() {
        let records = vec![
            sprint(1, 10.0, 10.0, 100.0),
            sprint(3, 30.0, 30.0, 100.0),
            sprint(0, 5.0, 5.0, 100.0),
            sprint(2, 20.0, 20.0, 100.0),
        ];

        let window = recent_window(&records, 3);
        let velocities: Vec<f64> = window.iter().map(|r| r.velocity()).collect();
        assert_eq!(velocities, vec![30.0, 20.0, 10.0]);
    }

    #[test]
    fn window_never_exceeds_collection() {
        let records = vec![sprint(0, 5.0, 5.0, 100.0), sprint(1, 6.0, 6.0, 100.0)];
        assert_eq!(recent_window(&records, 10).len(), 2);
        assert!(recent_window(&[], 5).is_empty());
    }

    #[test]
    fn chronological_window_is_oldest_first() {
        let records = vec![
            sprint(2, 20.0, 20.0, 100.0),
            sprint(0, 5.0, 5.0, 100.0),
            sprint(1, 10.0, 10.0, 100.0),
        ];

        let window = chronological_window(&records, 2);
        let velocities: Vec<f64> = window.iter().map(|r| r.velocity()).collect();
        assert_eq!(velocities, vec![10.0, 20.0]);
    }

    #[test]
    fn clamp_window_respects_bounds() {
        assert_eq!(clamp_window(1, 8), 2);
        assert_eq!(clamp_window(5, 8), 5);
        assert_eq!(clamp_window(12, 8), 8);
        assert_eq!(clamp_window(12, 40), 10);
        assert_eq!(clamp_window(5, 1), 1);
        assert_eq!(clamp_window(5, 0), 0);
    }
}
