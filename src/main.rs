use std::path::{Path, PathBuf};

use anyhow::{ensure, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

mod csv_io;
mod db;
mod forecast;
mod metrics;
mod models;
mod recommend;
mod report;
mod stats;
mod team;
mod trend;
mod window;

use models::{AnalysisSettings, SprintDraft, SprintRecord};

#[derive(Parser)]
#[command(name = "sprint-velocity")]
#[command(about = "Sprint velocity tracking and next-sprint forecasting", long_about = None)]
struct Cli {
    /// Postgres connection string for the sprint store
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load the sample sprints
    Seed,
    /// Record a sprint
    Add {
        #[command(flatten)]
        sprint: SprintArgs,
    },
    /// Change fields of an existing sprint
    Edit {
        id: Uuid,
        #[command(flatten)]
        changes: SprintChanges,
    },
    /// Remove a sprint
    Delete { id: Uuid },
    /// Append sprints from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Replace every stored sprint with the contents of a CSV file
    Replace {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Export stored sprints to CSV
    Export {
        #[arg(long, default_value = "sprints_export.csv")]
        out: PathBuf,
    },
    /// Write a CSV import template
    Template {
        #[arg(long, default_value = "sprint_template.csv")]
        out: PathBuf,
    },
    /// List sprints, most recent first
    List {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Summary statistics over the recent window
    Metrics {
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Recommended points and confidence for the next sprint
    Forecast {
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Velocity, completion and availability trends
    Trends {
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Planning advisories
    Recommend {
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, default_value = "velocity_report.md")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct SprintArgs {
    #[arg(long)]
    name: String,
    #[arg(long, value_parser = parse_date_arg)]
    start: NaiveDate,
    #[arg(long, value_parser = parse_date_arg)]
    end: NaiveDate,
    #[arg(long)]
    planned: f64,
    #[arg(long)]
    completed: f64,
    #[arg(long, default_value_t = 100.0)]
    availability: f64,
    #[arg(long)]
    capacity: Option<f64>,
    #[arg(long, default_value = "")]
    notes: String,
}

#[derive(Args)]
struct SprintChanges {
    #[arg(long)]
    name: Option<String>,
    #[arg(long, value_parser = parse_date_arg)]
    start: Option<NaiveDate>,
    #[arg(long, value_parser = parse_date_arg)]
    end: Option<NaiveDate>,
    #[arg(long)]
    planned: Option<f64>,
    #[arg(long)]
    completed: Option<f64>,
    #[arg(long)]
    availability: Option<f64>,
    #[arg(long)]
    capacity: Option<f64>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args)]
struct SourceArgs {
    /// Analyze a CSV file instead of the database
    #[arg(long)]
    from_csv: Option<PathBuf>,
    /// Print JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args)]
struct AnalysisArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Sprints in the metrics and forecast window
    #[arg(long, default_value_t = 5)]
    recent: usize,
    /// Sprints in the trend window
    #[arg(long, default_value_t = 3)]
    trend_window: usize,
    /// Expected team availability next sprint, in percent
    #[arg(long, default_value_t = 100.0)]
    next_availability: f64,
    /// Team roster CSV (name,totalSprintDays,daysAvailable); overrides --next-availability
    #[arg(long)]
    team: Option<PathBuf>,
}

impl AnalysisArgs {
    fn settings(&self, total: usize) -> anyhow::Result<AnalysisSettings> {
        let next_availability = match &self.team {
            Some(path) => team::overall_availability(&team::read_team_file(path)?),
            None => self.next_availability,
        };
        ensure!(
            (0.0..=100.0).contains(&next_availability),
            "next sprint availability must be between 0 and 100"
        );

        Ok(AnalysisSettings {
            recent_sprints: window::clamp_window(self.recent, total),
            trend_sprints: window::clamp_window(self.trend_window, total),
            next_availability,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let database_url = cli.database_url.as_deref();

    match cli.command {
        Commands::InitDb => {
            let pool = connect(database_url).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(database_url).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Add { sprint } => {
            let draft = sprint.into_draft();
            validate(&draft)?;
            let pool = connect(database_url).await?;
            let record = db::insert_sprint(&pool, draft).await?;
            println!("Added {} ({}).", record.name, record.id);
        }
        Commands::Edit { id, changes } => {
            let pool = connect(database_url).await?;
            let existing = db::fetch_sprint(&pool, id)
                .await?
                .with_context(|| format!("sprint {id} not found"))?;
            let draft = changes.apply_to(existing.to_draft());
            validate(&draft)?;
            let record = db::update_sprint(&pool, id, draft).await?;
            println!(
                "Updated {}: {:.1}% complete, velocity {}.",
                record.name,
                record.completion_ratio(),
                record.velocity()
            );
        }
        Commands::Delete { id } => {
            let pool = connect(database_url).await?;
            if db::delete_sprint(&pool, id).await? {
                println!("Deleted sprint {id}.");
            } else {
                println!("No sprint with id {id}.");
            }
        }
        Commands::Import { csv } => {
            let pool = connect(database_url).await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} sprints from {}.", csv.display());
        }
        Commands::Replace { csv } => {
            let drafts = csv_io::read_sprints_file(&csv)?;
            let pool = connect(database_url).await?;
            let count = db::replace_sprints(&pool, drafts).await?;
            println!("Replaced sprint collection with {count} sprints.");
        }
        Commands::Export { out } => {
            let pool = connect(database_url).await?;
            let records = db::fetch_sprints(&pool).await?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            csv_io::write_sprints(file, &records)?;
            println!("Exported {} sprints to {}.", records.len(), out.display());
        }
        Commands::Template { out } => {
            std::fs::write(&out, csv_io::template()?)?;
            println!("Template written to {}.", out.display());
        }
        Commands::List { source } => {
            let records = load_records(database_url, &source).await?;
            let recent = window::recent_window(&records, records.len());
            if source.json {
                print_json(&recent)?;
            } else if recent.is_empty() {
                println!("No sprints recorded yet.");
            } else {
                for sprint in recent {
                    println!(
                        "- {} {} ({} to {}): {}/{} pts, {:.1}% complete, {:.0}% available",
                        sprint.id,
                        sprint.name,
                        sprint.start_date,
                        sprint.end_date,
                        sprint.completed_points(),
                        sprint.planned_points(),
                        sprint.completion_ratio(),
                        sprint.team_availability
                    );
                }
            }
        }
        Commands::Metrics { analysis } => {
            let records = load_records(database_url, &analysis.source).await?;
            let settings = analysis.settings(records.len())?;
            let result = metrics::compute_metrics(&records, settings.recent_sprints);
            if analysis.source.json {
                print_json(&result)?;
            } else {
                println!("Average velocity: {} pts", result.average_velocity);
                println!("Completion rate: {}%", result.average_completion_ratio);
                println!("Predicted velocity: {} pts", result.predicted_velocity);
                println!(
                    "Availability stability: {}%",
                    result.team_availability_consistency
                );
                println!("Sprints in window: {}", result.total_sprints);
            }
        }
        Commands::Forecast { analysis } => {
            let records = load_records(database_url, &analysis.source).await?;
            let settings = analysis.settings(records.len())?;
            let result = forecast::compute_forecast(
                &records,
                settings.recent_sprints,
                settings.next_availability,
            );
            let scenarios = forecast::planning_scenarios(&result);
            if analysis.source.json {
                print_json(&serde_json::json!({
                    "forecast": result,
                    "scenarios": scenarios,
                }))?;
            } else {
                println!(
                    "Plan for approximately {} points next sprint.",
                    result.recommended_planning
                );
                println!(
                    "Confidence: {}% ({}), based on {} sprints at {:.0}% availability.",
                    result.confidence_level,
                    forecast::confidence_band(result.confidence_level).label(),
                    result.based_on_sprints,
                    settings.next_availability
                );
                println!(
                    "Scenarios: conservative {} / recommended {} / aggressive {}",
                    scenarios.conservative, scenarios.recommended, scenarios.aggressive
                );
            }
        }
        Commands::Trends { analysis } => {
            let records = load_records(database_url, &analysis.source).await?;
            let settings = analysis.settings(records.len())?;
            let result = trend::analyze_trends(&records, settings.trend_sprints);
            if analysis.source.json {
                print_json(&result)?;
            } else if result.sprint_count < 2 {
                println!("Not enough sprints for trend analysis.");
            } else {
                println!(
                    "Velocity: {:+.1} pts/sprint (consistency {:.1}%)",
                    result.velocity.slope,
                    result.velocity_consistency * 100.0
                );
                println!(
                    "Completion rate: {:+.1}%/sprint (consistency {:.1}%)",
                    result.completion_ratio.slope,
                    result.completion_consistency * 100.0
                );
                println!(
                    "Availability: {:+.1}%/sprint (consistency {:.1}%)",
                    result.team_availability.slope,
                    result.availability_consistency * 100.0
                );
            }
        }
        Commands::Recommend { analysis } => {
            let records = load_records(database_url, &analysis.source).await?;
            let settings = analysis.settings(records.len())?;
            let result = report::analyze(&records, &settings);
            if analysis.source.json {
                print_json(&result.recommendations)?;
            } else {
                for recommendation in result.recommendations.iter() {
                    println!(
                        "[{}] {}: {}",
                        recommendation.kind.label(),
                        recommendation.title,
                        recommendation.message
                    );
                }
            }
        }
        Commands::Report { analysis, out } => {
            let records = load_records(database_url, &analysis.source).await?;
            let settings = analysis.settings(records.len())?;
            if analysis.source.json {
                print_json(&report::analyze(&records, &settings))?;
            } else {
                let report = report::build_report(&records, &settings);
                std::fs::write(&out, report)?;
                println!("Report written to {}.", out.display());
            }
        }
    }

    Ok(())
}

impl SprintArgs {
    fn into_draft(self) -> SprintDraft {
        SprintDraft {
            name: self.name,
            start_date: self.start,
            end_date: self.end,
            planned_points: self.planned,
            completed_points: self.completed,
            team_availability: self.availability,
            team_capacity: self.capacity,
            notes: self.notes,
        }
    }
}

impl SprintChanges {
    fn apply_to(self, mut draft: SprintDraft) -> SprintDraft {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(start) = self.start {
            draft.start_date = start;
        }
        if let Some(end) = self.end {
            draft.end_date = end;
        }
        if let Some(planned) = self.planned {
            draft.planned_points = planned;
        }
        if let Some(completed) = self.completed {
            draft.completed_points = completed;
        }
        if let Some(availability) = self.availability {
            draft.team_availability = availability;
        }
        if self.capacity.is_some() {
            draft.team_capacity = self.capacity;
        }
        if let Some(notes) = self.notes {
            draft.notes = notes;
        }
        draft
    }
}

fn validate(draft: &SprintDraft) -> anyhow::Result<()> {
    ensure!(!draft.name.trim().is_empty(), "sprint name must not be empty");
    ensure!(
        draft.planned_points >= 0.0 && draft.completed_points >= 0.0,
        "points must not be negative"
    );
    ensure!(
        (0.0..=100.0).contains(&draft.team_availability),
        "team availability must be between 0 and 100"
    );
    if draft.end_date <= draft.start_date {
        tracing::warn!(
            start = %draft.start_date,
            end = %draft.end_date,
            "sprint ends before it starts"
        );
    }
    Ok(())
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    csv_io::parse_date(value).ok_or_else(|| format!("unrecognized date: {value}"))
}

async fn connect(database_url: Option<&str>) -> anyhow::Result<PgPool> {
    let url = database_url.context("DATABASE_URL must be set to a Postgres instance")?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(url)
        .await
        .context("failed to connect to Postgres")
}

/// Takes an owned snapshot from the CSV file or the store.
async fn load_records(
    database_url: Option<&str>,
    source: &SourceArgs,
) -> anyhow::Result<Vec<SprintRecord>> {
    match &source.from_csv {
        Some(path) => records_from_csv(path),
        None => {
            let pool = connect(database_url).await?;
            db::fetch_sprints(&pool).await
        }
    }
}

fn records_from_csv(path: &Path) -> anyhow::Result<Vec<SprintRecord>> {
    Ok(csv_io::read_sprints_file(path)?
        .into_iter()
        .map(|draft| SprintRecord::from_draft(Uuid::new_v4(), draft))
        .collect())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
