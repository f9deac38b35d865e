use std::fmt::Write;

use serde::Serialize;

use crate::forecast::{compute_forecast, confidence_band, planning_scenarios};
use crate::metrics::{compute_metrics, historical_availability};
use crate::models::{
    AnalysisSettings, ForecastResult, MetricsResult, PlanningScenarios, Recommendation,
    SprintRecord, TrendAnalysis,
};
use crate::recommend::generate_recommendations;
use crate::trend::analyze_trends;
use crate::window::recent_window;

const RECENT_PERFORMANCE_SPRINTS: usize = 5;

/// Every derived figure for one snapshot of the sprint collection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub metrics: MetricsResult,
    pub forecast: ForecastResult,
    pub scenarios: PlanningScenarios,
    pub trends: TrendAnalysis,
    pub recommendations: Vec<Recommendation>,
}

pub fn analyze(records: &[SprintRecord], settings: &AnalysisSettings) -> Analysis {
    let metrics = compute_metrics(records, settings.recent_sprints);
    let forecast = compute_forecast(records, settings.recent_sprints, settings.next_availability);
    let average_availability = historical_availability(records, settings.recent_sprints)
        .unwrap_or(settings.next_availability);
    let recommendations = generate_recommendations(
        records,
        settings.trend_sprints,
        settings.next_availability,
        average_availability,
        &forecast,
    );

    Analysis {
        metrics,
        scenarios: planning_scenarios(&forecast),
        forecast,
        trends: analyze_trends(records, settings.trend_sprints),
        recommendations,
    }
}

pub fn build_report(records: &[SprintRecord], settings: &AnalysisSettings) -> String {
    let analysis = analyze(records, settings);
    let mut output = String::new();

    let _ = writeln!(output, "# Sprint Velocity Report");
    let _ = writeln!(
        output,
        "Based on {} sprints (metrics window {}, trend window {}, next sprint availability {:.0}%)",
        records.len(),
        settings.recent_sprints,
        settings.trend_sprints,
        settings.next_availability
    );
    let _ = writeln!(output);

    let metrics = &analysis.metrics;
    let _ = writeln!(output, "## Metrics");
    let _ = writeln!(output, "- Average velocity: {} pts", metrics.average_velocity);
    let _ = writeln!(output, "- Completion rate: {}%", metrics.average_completion_ratio);
    let _ = writeln!(output, "- Predicted velocity: {} pts", metrics.predicted_velocity);
    let _ = writeln!(
        output,
        "- Availability stability: {}%",
        metrics.team_availability_consistency
    );
    let _ = writeln!(output, "- Sprints in window: {}", metrics.total_sprints);
    let _ = writeln!(output);

    let forecast = &analysis.forecast;
    let scenarios = &analysis.scenarios;
    let _ = writeln!(output, "## Next Sprint Forecast");
    let _ = writeln!(
        output,
        "Plan for approximately {} points ({}% confidence, {}; based on {} sprints).",
        forecast.recommended_planning,
        forecast.confidence_level,
        confidence_band(forecast.confidence_level).label(),
        forecast.based_on_sprints
    );
    let _ = writeln!(output, "- Conservative: {} pts", scenarios.conservative);
    let _ = writeln!(output, "- Recommended: {} pts", scenarios.recommended);
    let _ = writeln!(output, "- Aggressive: {} pts", scenarios.aggressive);
    let _ = writeln!(output);

    let trends = &analysis.trends;
    let _ = writeln!(output, "## Trends");
    if trends.sprint_count < 2 {
        let _ = writeln!(output, "Not enough sprints for trend analysis.");
    } else {
        let _ = writeln!(
            output,
            "- Velocity: {:+.1} pts/sprint (consistency {:.1}%)",
            trends.velocity.slope,
            trends.velocity_consistency * 100.0
        );
        let _ = writeln!(
            output,
            "- Completion rate: {:+.1}%/sprint (consistency {:.1}%)",
            trends.completion_ratio.slope,
            trends.completion_consistency * 100.0
        );
        let _ = writeln!(
            output,
            "- Availability: {:+.1}%/sprint (consistency {:.1}%)",
            trends.team_availability.slope,
            trends.availability_consistency * 100.0
        );
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "## Recommendations");
    if analysis.recommendations.is_empty() {
        let _ = writeln!(output, "No recommendations for this snapshot.");
    } else {
        for recommendation in analysis.recommendations.iter() {
            let _ = writeln!(
                output,
                "- [{}] {}: {}",
                recommendation.kind.label(),
                recommendation.title,
                recommendation.message
            );
        }
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "## Recent Performance");
    let recent = recent_window(records, RECENT_PERFORMANCE_SPRINTS);
    if recent.is_empty() {
        let _ = writeln!(output, "No sprints recorded yet.");
    } else {
        for sprint in recent {
            let _ = writeln!(
                output,
                "- {} ({} to {}): {:.1}% complete, {} pts",
                sprint.name,
                sprint.start_date,
                sprint.end_date,
                sprint.completion_ratio(),
                sprint.velocity()
            );
        }
    }

    output
}
