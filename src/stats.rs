use crate::models::SprintRecord;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// `std_dev / mean`, or `zero_mean` when the mean is not positive.
pub fn coefficient_of_variation(values: &[f64], zero_mean: f64) -> f64 {
    let avg = mean(values);
    if avg > 0.0 {
        std_dev(values) / avg
    } else {
        zero_mean
    }
}

/// Recency-weighted mean velocity over a window ordered most recent first.
///
/// The sprint at position `i` of a window of length `L` weighs `L - i`, so the
/// latest sprint counts most. Metrics and forecasting both go through here.
pub fn weighted_velocity(window: &[&SprintRecord]) -> f64 {
    let len = window.len();
    let (weighted_sum, total_weight) = window.iter().enumerate().fold(
        (0.0, 0.0),
        |(sum, total), (index, record)| {
            let weight = (len - index) as f64;
            (sum + record.velocity() * weight, total + weight)
        },
    );

    if total_weight > 0.0 {
        weighted_sum / total_weight
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::with_velocities;
    use crate::window::recent_window;

    #[test]
    fn mean_and_std_dev_of_empty_are_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
    }

    #[test]
    fn std_dev_is_population() {
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((sd - 2.0).abs() < 1e-9);
    }

    #[test]
    fn coefficient_of_variation_uses_sentinel_on_zero_mean() {
        assert_eq!(coefficient_of_variation(&[0.0, 0.0], 1.0), 1.0);
        assert_eq!(coefficient_of_variation(&[], 0.0), 0.0);
        assert_eq!(coefficient_of_variation(&[5.0, 5.0], 1.0), 0.0);
    }

    #[test]
    fn latest_sprint_weighs_most() {
        // chronological 28 then 30, so the window is [30, 28] with weights [2, 1]
        let records = with_velocities(&[28.0, 30.0]);
        let window = recent_window(&records, 2);
        let weighted = weighted_velocity(&window);
        assert!((weighted - (30.0 * 2.0 + 28.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn weighted_velocity_of_empty_window_is_zero() {
        assert_eq!(weighted_velocity(&[]), 0.0);
    }
}
