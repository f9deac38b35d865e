use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// Fields a user supplies for a sprint. Derived figures are never part of a draft.
#[derive(Debug, Clone, PartialEq)]
pub struct SprintDraft {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub planned_points: f64,
    pub completed_points: f64,
    pub team_availability: f64,
    pub team_capacity: Option<f64>,
    pub notes: String,
}

/// One historical sprint.
///
/// `completion_ratio` and `velocity` are recomputed whenever the point totals
/// change, so they are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintRecord {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    planned_points: f64,
    completed_points: f64,
    completion_ratio: f64,
    velocity: f64,
    pub team_availability: f64,
    pub team_capacity: Option<f64>,
    pub notes: String,
}

impl SprintRecord {
    pub fn from_draft(id: Uuid, draft: SprintDraft) -> Self {
        let mut record = SprintRecord {
            id,
            name: draft.name,
            start_date: draft.start_date,
            end_date: draft.end_date,
            planned_points: 0.0,
            completed_points: 0.0,
            completion_ratio: 0.0,
            velocity: 0.0,
            team_availability: draft.team_availability,
            team_capacity: draft.team_capacity,
            notes: draft.notes,
        };
        record.set_points(draft.planned_points, draft.completed_points);
        record
    }

    /// Replaces every user-editable field, keeping the id.
    pub fn apply(&mut self, draft: SprintDraft) {
        let id = self.id;
        *self = SprintRecord::from_draft(id, draft);
    }

    pub fn set_points(&mut self, planned: f64, completed: f64) {
        self.planned_points = planned;
        self.completed_points = completed;
        self.completion_ratio = completion_ratio(planned, completed);
        self.velocity = completed;
    }

    pub fn planned_points(&self) -> f64 {
        self.planned_points
    }

    pub fn completed_points(&self) -> f64 {
        self.completed_points
    }

    pub fn completion_ratio(&self) -> f64 {
        self.completion_ratio
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn to_draft(&self) -> SprintDraft {
        SprintDraft {
            name: self.name.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            planned_points: self.planned_points,
            completed_points: self.completed_points,
            team_availability: self.team_availability,
            team_capacity: self.team_capacity,
            notes: self.notes.clone(),
        }
    }
}

pub fn completion_ratio(planned: f64, completed: f64) -> f64 {
    if planned > 0.0 {
        completed / planned * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResult {
    pub average_velocity: i64,
    pub average_completion_ratio: i64,
    pub team_availability_consistency: i64,
    pub predicted_velocity: i64,
    pub total_sprints: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub recommended_planning: u32,
    pub confidence_level: u32,
    pub based_on_sprints: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningScenarios {
    pub conservative: u32,
    pub recommended: u32,
    pub aggressive: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendResult {
    pub slope: f64,
}

/// Slopes and consistency scores over a chronological window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub sprint_count: usize,
    pub velocity: TrendResult,
    pub completion_ratio: TrendResult,
    pub team_availability: TrendResult,
    pub velocity_consistency: f64,
    pub completion_consistency: f64,
    pub availability_consistency: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Success,
    Warning,
    Info,
}

impl RecommendationKind {
    pub fn label(self) -> &'static str {
        match self {
            RecommendationKind::Success => "success",
            RecommendationKind::Warning => "warning",
            RecommendationKind::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub title: String,
    pub message: String,
}

impl Recommendation {
    pub fn new(kind: RecommendationKind, title: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

/// Per-invocation tuning knobs. Threaded explicitly through every analysis call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisSettings {
    pub recent_sprints: usize,
    pub trend_sprints: usize,
    pub next_availability: f64,
}
