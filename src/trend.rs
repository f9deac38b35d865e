use crate::models::{SprintRecord, TrendAnalysis, TrendResult};
use crate::stats::coefficient_of_variation;
use crate::window::chronological_window;

/// Least-squares slope of `series` against its index, oldest value first.
pub fn compute_trend(series: &[f64]) -> TrendResult {
    let n = series.len() as f64;
    if series.len() < 2 {
        return TrendResult { slope: 0.0 };
    }

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;

    for (i, &value) in series.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += value;
        sum_xy += x * value;
        sum_x2 += x * x;
    }

    let denom = n * sum_x2 - sum_x * sum_x;
    if denom.abs() < 1e-10 {
        return TrendResult { slope: 0.0 };
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    TrendResult {
        slope: if slope.is_finite() { slope } else { 0.0 },
    }
}

/// `1 - CoV`, floored at 0. Short series are trivially consistent.
pub fn compute_consistency(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return 1.0;
    }
    (1.0 - coefficient_of_variation(series, 0.0)).max(0.0)
}

pub fn analyze_trends(records: &[SprintRecord], window_size: usize) -> TrendAnalysis {
    let window = chronological_window(records, window_size);
    let velocity: Vec<f64> = window.iter().map(|r| r.velocity()).collect();
    let completion: Vec<f64> = window.iter().map(|r| r.completion_ratio()).collect();
    let availability: Vec<f64> = window.iter().map(|r| r.team_availability).collect();

    TrendAnalysis {
        sprint_count: window.len(),
        velocity: compute_trend(&velocity),
        completion_ratio: compute_trend(&completion),
        team_availability: compute_trend(&availability),
        velocity_consistency: compute_consistency(&velocity),
        completion_consistency: compute_consistency(&completion),
        availability_consistency: compute_consistency(&availability),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{sprint, with_velocities};

    #[test]
    fn linear_series_recovers_step() {
        let slope = compute_trend(&[10.0, 13.0, 16.0, 19.0, 22.0]).slope;
        assert!((slope - 3.0).abs() < 1e-9);

        let falling = compute_trend(&[40.0, 37.5, 35.0]).slope;
        assert!((falling + 2.5).abs() < 1e-9);
    }

    #[test]
    fn degenerate_series_have_flat_trend() {
        assert_eq!(compute_trend(&[]).slope, 0.0);
        assert_eq!(compute_trend(&[42.0]).slope, 0.0);
        assert_eq!(compute_trend(&[5.0, 5.0, 5.0]).slope, 0.0);
    }

    #[test]
    fn non_finite_input_reports_flat_trend() {
        assert_eq!(compute_trend(&[1.0, f64::NAN, 3.0]).slope, 0.0);
    }

    #[test]
    fn constant_series_is_fully_consistent() {
        assert_eq!(compute_consistency(&[12.0, 12.0, 12.0]), 1.0);
        assert_eq!(compute_consistency(&[0.0, 0.0]), 1.0);
        assert_eq!(compute_consistency(&[7.0]), 1.0);
        assert_eq!(compute_consistency(&[]), 1.0);
    }

    #[test]
    fn outlier_drives_consistency_to_zero() {
        assert_eq!(compute_consistency(&[1.0, 1.0, 1.0, 1000.0]), 0.0);
        let mild = compute_consistency(&[20.0, 22.0, 21.0]);
        assert!(mild > 0.9 && mild < 1.0);
    }

    #[test]
    fn analysis_reads_window_oldest_first() {
        let records = with_velocities(&[50.0, 10.0, 20.0, 30.0]);
        let analysis = analyze_trends(&records, 3);
        assert_eq!(analysis.sprint_count, 3);
        assert!((analysis.velocity.slope - 10.0).abs() < 1e-9);
        assert_eq!(analysis.completion_ratio.slope, 0.0);
        assert_eq!(analysis.team_availability.slope, 0.0);
        assert_eq!(analysis.availability_consistency, 1.0);
    }

    #[test]
    fn availability_trend_tracks_decline() {
        let records = vec![
            sprint(0, 20.0, 20.0, 100.0),
            sprint(1, 20.0, 20.0, 90.0),
            sprint(2, 20.0, 20.0, 80.0),
        ];
        let analysis = analyze_trends(&records, 3);
        assert!((analysis.team_availability.slope + 10.0).abs() < 1e-9);
    }
}
