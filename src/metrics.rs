use crate::models::{MetricsResult, SprintRecord};
use crate::stats::{mean, std_dev, weighted_velocity};
use crate::window::recent_window;

pub fn compute_metrics(records: &[SprintRecord], window_size: usize) -> MetricsResult {
    let window = recent_window(records, window_size);
    if window.is_empty() {
        return MetricsResult::default();
    }

    let velocities: Vec<f64> = window.iter().map(|r| r.velocity()).collect();
    let ratios: Vec<f64> = window.iter().map(|r| r.completion_ratio()).collect();
    let availability: Vec<f64> = window.iter().map(|r| r.team_availability).collect();

    MetricsResult {
        average_velocity: mean(&velocities).round() as i64,
        average_completion_ratio: mean(&ratios).round() as i64,
        team_availability_consistency: (100.0 - std_dev(&availability)).max(0.0).round() as i64,
        predicted_velocity: weighted_velocity(&window).round() as i64,
        total_sprints: window.len(),
    }
}

/// Mean availability over the recent window, if there is one.
pub fn historical_availability(records: &[SprintRecord], window_size: usize) -> Option<f64> {
    let window = recent_window(records, window_size);
    if window.is_empty() {
        return None;
    }
    let availability: Vec<f64> = window.iter().map(|r| r.team_availability).collect();
    Some(mean(&availability))
}

/// Points a team can take on at the given availability, from its average velocity.
pub fn team_capacity(average_velocity: f64, availability: f64) -> f64 {
    (average_velocity * availability / 100.0).round()
}
