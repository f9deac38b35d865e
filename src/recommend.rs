use crate::models::{ForecastResult, Recommendation, RecommendationKind, SprintRecord};
use crate::trend::analyze_trends;
use crate::window::chronological_window;

pub const MIN_TREND_SPRINTS: usize = 2;
pub const VELOCITY_SLOPE_THRESHOLD: f64 = 1.0;
pub const COMPLETION_SLOPE_THRESHOLD: f64 = 5.0;
pub const AVAILABILITY_SLOPE_THRESHOLD: f64 = 5.0;
pub const VELOCITY_CONSISTENCY_FLOOR: f64 = 0.7;
pub const COMPLETION_CONSISTENCY_FLOOR: f64 = 0.7;
pub const OVERCOMMITTED_RATIO: f64 = 80.0;
pub const FULLY_DELIVERED_RATIO: f64 = 100.0;
pub const AVAILABILITY_DELTA: f64 = 10.0;
pub const AVAILABILITY_REDUCTION_FACTOR: f64 = 0.8;
pub const LOW_AVAILABILITY: f64 = 70.0;
pub const LOW_CONFIDENCE: u32 = 60;
pub const SUFFICIENT_SPRINTS: usize = 5;

/// Runs the advisory rules in their fixed order. Every rule that applies adds
/// one entry; nothing is re-sorted.
pub fn generate_recommendations(
    records: &[SprintRecord],
    trend_window_size: usize,
    next_availability: f64,
    average_availability: f64,
    forecast: &ForecastResult,
) -> Vec<Recommendation> {
    let window = chronological_window(records, trend_window_size);
    let mut recommendations = Vec::new();

    if window.len() < MIN_TREND_SPRINTS {
        recommendations.push(Recommendation::new(
            RecommendationKind::Info,
            "Insufficient Trend Data",
            format!(
                "At least {MIN_TREND_SPRINTS} sprints are needed for trend analysis; {} available.",
                window.len()
            ),
        ));
    } else {
        trend_rules(records, trend_window_size, &mut recommendations);
        commitment_rules(
            &window.iter().map(|r| r.completion_ratio()).collect::<Vec<_>>(),
            &mut recommendations,
        );
    }

    availability_rules(next_availability, average_availability, &mut recommendations);

    if forecast.confidence_level < LOW_CONFIDENCE {
        recommendations.push(Recommendation::new(
            RecommendationKind::Warning,
            "Low Forecast Confidence",
            format!(
                "Forecast confidence is {}%. Velocity or availability varies significantly; review what drives the variation before committing.",
                forecast.confidence_level
            ),
        ));
    }

    if window.len() < SUFFICIENT_SPRINTS {
        recommendations.push(Recommendation::new(
            RecommendationKind::Info,
            "More Data Recommended",
            format!(
                "Trends are based on {} sprints. Tracking at least {SUFFICIENT_SPRINTS} sprints improves forecast accuracy.",
                window.len()
            ),
        ));
    }

    recommendations
}

fn trend_rules(records: &[SprintRecord], window_size: usize, out: &mut Vec<Recommendation>) {
    let analysis = analyze_trends(records, window_size);

    let velocity = analysis.velocity.slope;
    if velocity > VELOCITY_SLOPE_THRESHOLD {
        out.push(Recommendation::new(
            RecommendationKind::Success,
            "Velocity Improving",
            format!("Velocity is rising by {velocity:.1} points per sprint. Great progress!"),
        ));
    } else if velocity < -VELOCITY_SLOPE_THRESHOLD {
        out.push(Recommendation::new(
            RecommendationKind::Warning,
            "Velocity Declining",
            format!(
                "Velocity is falling by {:.1} points per sprint. Look for blockers or growing technical debt.",
                velocity.abs()
            ),
        ));
    }

    let completion = analysis.completion_ratio.slope;
    if completion > COMPLETION_SLOPE_THRESHOLD {
        out.push(Recommendation::new(
            RecommendationKind::Success,
            "Completion Rate Improving",
            format!("Completion rate is rising by {completion:.1}% per sprint."),
        ));
    } else if completion < -COMPLETION_SLOPE_THRESHOLD {
        out.push(Recommendation::new(
            RecommendationKind::Warning,
            "Completion Rate Declining",
            format!(
                "Completion rate is falling by {:.1}% per sprint. Commitments may be drifting above capacity.",
                completion.abs()
            ),
        ));
    }

    let availability = analysis.team_availability.slope;
    if availability < -AVAILABILITY_SLOPE_THRESHOLD {
        out.push(Recommendation::new(
            RecommendationKind::Warning,
            "Availability Declining",
            format!(
                "Team availability is falling by {:.1}% per sprint. Factor upcoming absences into planning.",
                availability.abs()
            ),
        ));
    }

    if analysis.velocity_consistency < VELOCITY_CONSISTENCY_FLOOR {
        out.push(Recommendation::new(
            RecommendationKind::Warning,
            "Inconsistent Velocity",
            format!(
                "Velocity consistency is {:.1}%. Large swings make forecasts unreliable.",
                analysis.velocity_consistency * 100.0
            ),
        ));
    }

    if analysis.completion_consistency < COMPLETION_CONSISTENCY_FLOOR {
        out.push(Recommendation::new(
            RecommendationKind::Info,
            "Variable Completion Rate",
            format!(
                "Completion consistency is {:.1}%. Check whether estimates are applied evenly across sprints.",
                analysis.completion_consistency * 100.0
            ),
        ));
    }
}

fn commitment_rules(ratios: &[f64], out: &mut Vec<Recommendation>) {
    let total = ratios.len();
    let below = ratios.iter().filter(|r| **r < OVERCOMMITTED_RATIO).count();
    let delivered = ratios.iter().filter(|r| **r >= FULLY_DELIVERED_RATIO).count();

    // more than half
    if below * 2 > total {
        out.push(Recommendation::new(
            RecommendationKind::Warning,
            "Possible Overcommitment",
            format!(
                "{below} of {total} recent sprints ({:.1}%) finished below {OVERCOMMITTED_RATIO:.0}% completion. Consider planning fewer points.",
                share(below, total)
            ),
        ));
    }

    // more than 60%
    if delivered * 10 > total * 6 {
        out.push(Recommendation::new(
            RecommendationKind::Info,
            "Room for More Work",
            format!(
                "{delivered} of {total} recent sprints ({:.1}%) delivered everything planned. The team may be able to take on more.",
                share(delivered, total)
            ),
        ));
    }
}

fn availability_rules(next: f64, average: f64, out: &mut Vec<Recommendation>) {
    if next < average - AVAILABILITY_DELTA {
        let reduction = ((average - next) * AVAILABILITY_REDUCTION_FACTOR).round();
        out.push(Recommendation::new(
            RecommendationKind::Warning,
            "Reduced Availability",
            format!(
                "Next sprint availability ({next:.1}%) is well below the historical average ({average:.1}%). Consider planning about {reduction:.0} fewer points."
            ),
        ));
    } else if next > average + AVAILABILITY_DELTA {
        out.push(Recommendation::new(
            RecommendationKind::Success,
            "Increased Availability",
            format!(
                "Next sprint availability ({next:.1}%) is above the historical average ({average:.1}%). There may be room for extra work."
            ),
        ));
    }

    if next < LOW_AVAILABILITY {
        out.push(Recommendation::new(
            RecommendationKind::Warning,
            "Low Team Availability",
            format!(
                "Only {next:.1}% of the team is available next sprint. Keep the commitment small and protect focus time."
            ),
        ));
    }
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{sample, sprint, with_velocities};

    fn confident() -> ForecastResult {
        ForecastResult {
            recommended_planning: 30,
            confidence_level: 90,
            based_on_sprints: 5,
        }
    }

    fn titles(recommendations: &[Recommendation]) -> Vec<&str> {
        recommendations.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn no_trend_data_still_checks_availability_and_confidence() {
        let records = vec![sprint(0, 30.0, 30.0, 100.0)];
        let forecast = ForecastResult {
            recommended_planning: 30,
            confidence_level: 0,
            based_on_sprints: 1,
        };
        let recs = generate_recommendations(&records, 5, 60.0, 100.0, &forecast);
        assert_eq!(
            titles(&recs),
            vec![
                "Insufficient Trend Data",
                "Reduced Availability",
                "Low Team Availability",
                "Low Forecast Confidence",
                "More Data Recommended",
            ]
        );
        assert_eq!(recs[0].kind, RecommendationKind::Info);
        assert!(recs[1].message.contains("about 32 fewer points"));
    }

    #[test]
    fn steady_history_only_asks_for_more_data() {
        let records = with_velocities(&[30.0, 30.0, 30.0]);
        let recs = generate_recommendations(&records, 3, 100.0, 100.0, &confident());
        assert_eq!(titles(&recs), vec!["Room for More Work", "More Data Recommended"]);
    }

    #[test]
    fn sample_history_does_not_flag_overcommitment() {
        // ratios 87.5, 100, 74.3: one of three below 80%
        let recs = generate_recommendations(&sample(), 3, 100.0, 91.7, &confident());
        let found = titles(&recs);
        assert!(!found.contains(&"Possible Overcommitment"));
        assert!(!found.contains(&"Room for More Work"));
        // velocity 28, 30, 26 has a slope of exactly -1
        assert!(!found.contains(&"Velocity Declining"));
        let declining = recs
            .iter()
            .find(|r| r.title == "Completion Rate Declining")
            .unwrap();
        assert!(declining.message.contains("6.6% per sprint"));
    }

    #[test]
    fn overcommitment_needs_strict_majority() {
        let half = vec![
            sprint(0, 100.0, 70.0, 100.0),
            sprint(1, 100.0, 70.0, 100.0),
            sprint(2, 100.0, 90.0, 100.0),
            sprint(3, 100.0, 90.0, 100.0),
        ];
        let recs = generate_recommendations(&half, 4, 100.0, 100.0, &confident());
        assert!(!titles(&recs).contains(&"Possible Overcommitment"));

        let majority = vec![
            sprint(0, 100.0, 70.0, 100.0),
            sprint(1, 100.0, 70.0, 100.0),
            sprint(2, 100.0, 90.0, 100.0),
        ];
        let recs = generate_recommendations(&majority, 3, 100.0, 100.0, &confident());
        let over = recs.iter().find(|r| r.title == "Possible Overcommitment").unwrap();
        assert_eq!(over.kind, RecommendationKind::Warning);
        assert!(over.message.contains("2 of 3 recent sprints (66.7%)"));
    }

    #[test]
    fn underutilization_needs_more_than_sixty_percent() {
        // 3 of 5 is exactly 60%
        let records = vec![
            sprint(0, 20.0, 20.0, 100.0),
            sprint(1, 20.0, 20.0, 100.0),
            sprint(2, 20.0, 20.0, 100.0),
            sprint(3, 20.0, 19.0, 100.0),
            sprint(4, 20.0, 19.0, 100.0),
        ];
        let recs = generate_recommendations(&records, 5, 100.0, 100.0, &confident());
        assert!(!titles(&recs).contains(&"Room for More Work"));

        let records = vec![
            sprint(0, 20.0, 20.0, 100.0),
            sprint(1, 20.0, 20.0, 100.0),
            sprint(2, 20.0, 22.0, 100.0),
            sprint(3, 20.0, 20.0, 100.0),
            sprint(4, 20.0, 19.0, 100.0),
        ];
        let recs = generate_recommendations(&records, 5, 100.0, 100.0, &confident());
        assert!(titles(&recs).contains(&"Room for More Work"));
    }

    #[test]
    fn rising_history_is_celebrated() {
        let records = vec![
            sprint(0, 30.0, 15.0, 100.0),
            sprint(1, 30.0, 21.0, 100.0),
            sprint(2, 30.0, 27.0, 100.0),
            sprint(3, 30.0, 30.0, 100.0),
            sprint(4, 30.0, 30.0, 100.0),
        ];
        let recs = generate_recommendations(&records, 5, 100.0, 100.0, &confident());
        let found = titles(&recs);
        assert_eq!(recs[0].title, "Velocity Improving");
        assert_eq!(recs[0].kind, RecommendationKind::Success);
        assert!(found.contains(&"Completion Rate Improving"));
        assert!(!found.contains(&"More Data Recommended"));
    }

    #[test]
    fn falling_availability_and_erratic_velocity_warn() {
        let records = vec![
            sprint(0, 40.0, 40.0, 100.0),
            sprint(1, 40.0, 4.0, 85.0),
            sprint(2, 40.0, 36.0, 70.0),
        ];
        let recs = generate_recommendations(&records, 3, 70.0, 85.0, &confident());
        let found = titles(&recs);
        assert!(found.contains(&"Availability Declining"));
        assert!(found.contains(&"Inconsistent Velocity"));
        assert!(found.contains(&"Variable Completion Rate"));
        assert!(found.contains(&"Reduced Availability"));
        assert!(!found.contains(&"Low Team Availability"));
    }

    #[test]
    fn availability_delta_boundaries_are_strict() {
        let records = with_velocities(&[30.0, 30.0, 30.0, 30.0, 30.0]);
        let at_edge = generate_recommendations(&records, 5, 80.0, 90.0, &confident());
        assert!(!titles(&at_edge).contains(&"Reduced Availability"));

        let above = generate_recommendations(&records, 5, 100.0, 85.0, &confident());
        let increased = above.iter().find(|r| r.title == "Increased Availability").unwrap();
        assert_eq!(increased.kind, RecommendationKind::Success);
        assert!(increased.message.contains("(85.0%)"));
    }

    #[test]
    fn low_confidence_is_flagged() {
        let records = with_velocities(&[30.0, 30.0, 30.0, 30.0, 30.0]);
        let shaky = ForecastResult {
            recommended_planning: 30,
            confidence_level: 59,
            based_on_sprints: 5,
        };
        let recs = generate_recommendations(&records, 5, 100.0, 100.0, &shaky);
        let low = recs.last().unwrap();
        assert_eq!(low.title, "Low Forecast Confidence");
        assert!(low.message.contains("59%"));

        let edge = ForecastResult {
            confidence_level: 60,
            ..shaky
        };
        let recs = generate_recommendations(&records, 5, 100.0, 100.0, &edge);
        assert!(!titles(&recs).contains(&"Low Forecast Confidence"));
    }

    #[test]
    fn rules_are_repeatable() {
        let records = sample();
        let first = generate_recommendations(&records, 3, 80.0, 91.7, &confident());
        let second = generate_recommendations(&records, 3, 80.0, 91.7, &confident());
        assert_eq!(first, second);
    }
}
