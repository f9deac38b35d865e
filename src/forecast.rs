use crate::metrics::compute_metrics;
use crate::models::{ForecastResult, PlanningScenarios, SprintRecord};
use crate::stats::{coefficient_of_variation, mean, weighted_velocity};
use crate::window::recent_window;

/// Share of the availability gap that is taken off the confidence score.
pub const AVAILABILITY_DIFFERENCE_DAMPING: f64 = 0.5;
/// Share of historical availability variation taken off the confidence score.
pub const AVAILABILITY_VARIATION_DAMPING: f64 = 0.3;

pub const CONSERVATIVE_FACTOR: f64 = 0.8;
pub const AGGRESSIVE_FACTOR: f64 = 1.2;

pub const HIGH_CONFIDENCE: u32 = 80;
pub const MODERATE_CONFIDENCE: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    High,
    Moderate,
    Low,
}

impl ConfidenceBand {
    pub fn label(self) -> &'static str {
        match self {
            ConfidenceBand::High => "high",
            ConfidenceBand::Moderate => "moderate",
            ConfidenceBand::Low => "low",
        }
    }
}

/// Forecasts next sprint's points from the `window_size` most recent sprints.
///
/// The recency-weighted velocity is scaled by `next_availability`. Confidence
/// drops with velocity variation, with the gap between `next_availability`
/// and the historical average, and with how much availability has varied.
pub fn compute_forecast(
    records: &[SprintRecord],
    window_size: usize,
    next_availability: f64,
) -> ForecastResult {
    if records.len() < 2 {
        let average = compute_metrics(records, records.len()).average_velocity;
        return ForecastResult {
            recommended_planning: average.max(0) as u32,
            confidence_level: 0,
            based_on_sprints: records.len(),
        };
    }

    let window = recent_window(records, window_size);
    let weighted = weighted_velocity(&window);
    let adjusted = weighted * (next_availability / 100.0);

    let velocities: Vec<f64> = window.iter().map(|r| r.velocity()).collect();
    let velocity_variation = coefficient_of_variation(&velocities, 1.0);
    let base_confidence = ((1.0 - velocity_variation) * 100.0).clamp(0.0, 100.0);

    let availability: Vec<f64> = window.iter().map(|r| r.team_availability).collect();
    let average_availability = mean(&availability);
    let availability_variation = coefficient_of_variation(&availability, 0.0);
    let availability_difference = (next_availability - average_availability).abs() / 100.0;

    let confidence = (base_confidence
        * (1.0 - availability_difference * AVAILABILITY_DIFFERENCE_DAMPING)
        * (1.0 - availability_variation * AVAILABILITY_VARIATION_DAMPING))
        .clamp(0.0, 100.0);

    ForecastResult {
        recommended_planning: adjusted.round().max(0.0) as u32,
        confidence_level: confidence.round() as u32,
        based_on_sprints: window.len(),
    }
}

pub fn planning_scenarios(forecast: &ForecastResult) -> PlanningScenarios {
    let points = forecast.recommended_planning as f64;
    PlanningScenarios {
        conservative: (points * CONSERVATIVE_FACTOR).round() as u32,
        recommended: forecast.recommended_planning,
        aggressive: (points * AGGRESSIVE_FACTOR).round() as u32,
    }
}

pub fn confidence_band(confidence: u32) -> ConfidenceBand {
    if confidence >= HIGH_CONFIDENCE {
        ConfidenceBand::High
    } else if confidence >= MODERATE_CONFIDENCE {
        ConfidenceBand::Moderate
    } else {
        ConfidenceBand::Low
    }
}
