use anyhow::{bail, Context};
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};
use uuid::Uuid;

use crate::csv_io;
use crate::metrics::team_capacity;
use crate::models::{SprintDraft, SprintRecord};
use crate::stats::mean;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let sprints = vec![
        (
            Uuid::parse_str("6f1c2a4e-8d3b-4f57-9a0e-1b2c3d4e5f60")?,
            "Sprint 1",
            (2024, 1, 1),
            (2024, 1, 14),
            32.0,
            28.0,
            90.0,
            "Good sprint, one story moved to next sprint",
        ),
        (
            Uuid::parse_str("8a2d3b5f-9e4c-4a68-8b1f-2c3d4e5f6071")?,
            "Sprint 2",
            (2024, 1, 15),
            (2024, 1, 28),
            30.0,
            30.0,
            100.0,
            "Excellent delivery, all stories completed",
        ),
        (
            Uuid::parse_str("9b3e4c6a-0f5d-4b79-9c2a-3d4e5f607182")?,
            "Sprint 3",
            (2024, 1, 29),
            (2024, 2, 11),
            35.0,
            26.0,
            85.0,
            "One team member on vacation, technical debt addressed",
        ),
    ];

    let mut tx = pool.begin().await?;
    for (id, name, start, end, planned, completed, availability, notes) in sprints {
        let record = SprintRecord::from_draft(
            id,
            SprintDraft {
                name: name.to_string(),
                start_date: date(start)?,
                end_date: date(end)?,
                planned_points: planned,
                completed_points: completed,
                team_availability: availability,
                team_capacity: None,
                notes: notes.to_string(),
            },
        );

        sqlx::query(
            r#"
            INSERT INTO sprint_velocity.sprints
            (id, name, start_date, end_date, planned_points, completed_points,
             team_availability, team_capacity, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(record.planned_points())
        .bind(record.completed_points())
        .bind(record.team_availability)
        .bind(record.team_capacity)
        .bind(&record.notes)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    tracing::info!("seeded sample sprints");
    Ok(())
}

pub async fn fetch_sprints(pool: &PgPool) -> anyhow::Result<Vec<SprintRecord>> {
    let rows = sqlx::query(
        "SELECT id, name, start_date, end_date, planned_points, completed_points, \
         team_availability, team_capacity, notes \
         FROM sprint_velocity.sprints \
         ORDER BY start_date, created_at",
    )
    .fetch_all(pool)
    .await
    .context("failed to load sprints")?;

    let records: Vec<SprintRecord> = rows.iter().map(record_from_row).collect();
    tracing::debug!(count = records.len(), "loaded sprint snapshot");
    Ok(records)
}

pub async fn fetch_sprint(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<SprintRecord>> {
    let row = sqlx::query(
        "SELECT id, name, start_date, end_date, planned_points, completed_points, \
         team_availability, team_capacity, notes \
         FROM sprint_velocity.sprints WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(record_from_row))
}

pub async fn insert_sprint(pool: &PgPool, draft: SprintDraft) -> anyhow::Result<SprintRecord> {
    let record = SprintRecord::from_draft(Uuid::new_v4(), draft);
    insert_record(pool, &record).await?;
    tracing::info!(id = %record.id, name = %record.name, "added sprint");
    Ok(record)
}

pub async fn update_sprint(
    pool: &PgPool,
    id: Uuid,
    draft: SprintDraft,
) -> anyhow::Result<SprintRecord> {
    let Some(mut record) = fetch_sprint(pool, id).await? else {
        bail!("sprint {id} not found");
    };
    record.apply(draft);

    sqlx::query(
        r#"
        UPDATE sprint_velocity.sprints
        SET name = $2, start_date = $3, end_date = $4, planned_points = $5,
            completed_points = $6, team_availability = $7, team_capacity = $8, notes = $9
        WHERE id = $1
        "#,
    )
    .bind(record.id)
    .bind(&record.name)
    .bind(record.start_date)
    .bind(record.end_date)
    .bind(record.planned_points())
    .bind(record.completed_points())
    .bind(record.team_availability)
    .bind(record.team_capacity)
    .bind(&record.notes)
    .execute(pool)
    .await?;

    tracing::info!(%id, "updated sprint");
    Ok(record)
}

pub async fn delete_sprint(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM sprint_velocity.sprints WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    let deleted = result.rows_affected() > 0;
    tracing::info!(%id, deleted, "delete sprint");
    Ok(deleted)
}

/// Swaps the whole collection for `drafts` in one transaction.
pub async fn replace_sprints(pool: &PgPool, mut drafts: Vec<SprintDraft>) -> anyhow::Result<usize> {
    let velocities: Vec<f64> = drafts.iter().map(|d| d.completed_points).collect();
    fill_team_capacity(&mut drafts, mean(&velocities).round());

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM sprint_velocity.sprints")
        .execute(&mut *tx)
        .await?;
    for draft in drafts.iter() {
        let record = SprintRecord::from_draft(Uuid::new_v4(), draft.clone());
        insert_record(&mut *tx, &record).await?;
    }
    tx.commit().await?;

    tracing::info!(count = drafts.len(), "replaced sprint collection");
    Ok(drafts.len())
}

/// Appends the sprints in a CSV file.
pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut drafts = csv_io::read_sprints_file(csv_path)?;
    let existing = fetch_sprints(pool).await?;
    let velocities: Vec<f64> = existing.iter().map(|r| r.velocity()).collect();
    fill_team_capacity(&mut drafts, mean(&velocities).round());

    let mut tx = pool.begin().await?;
    for draft in drafts.iter() {
        let record = SprintRecord::from_draft(Uuid::new_v4(), draft.clone());
        insert_record(&mut *tx, &record).await?;
    }
    tx.commit().await?;

    tracing::info!(count = drafts.len(), path = %csv_path.display(), "imported sprints");
    Ok(drafts.len())
}

async fn insert_record<'e, E>(executor: E, record: &SprintRecord) -> anyhow::Result<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO sprint_velocity.sprints
        (id, name, start_date, end_date, planned_points, completed_points,
         team_availability, team_capacity, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(record.id)
    .bind(&record.name)
    .bind(record.start_date)
    .bind(record.end_date)
    .bind(record.planned_points())
    .bind(record.completed_points())
    .bind(record.team_availability)
    .bind(record.team_capacity)
    .bind(&record.notes)
    .execute(executor)
    .await?;
    Ok(())
}

fn record_from_row(row: &PgRow) -> SprintRecord {
    SprintRecord::from_draft(
        row.get("id"),
        SprintDraft {
            name: row.get("name"),
            start_date: row.get("start_date"),
            end_date: row.get("end_date"),
            planned_points: row.get("planned_points"),
            completed_points: row.get("completed_points"),
            team_availability: row.get("team_availability"),
            team_capacity: row.get("team_capacity"),
            notes: row.get("notes"),
        },
    )
}

fn fill_team_capacity(drafts: &mut [SprintDraft], average_velocity: f64) {
    for draft in drafts.iter_mut() {
        if draft.team_capacity.is_none() {
            draft.team_capacity = Some(team_capacity(average_velocity, draft.team_availability));
        }
    }
}

fn date((year, month, day): (i32, u32, u32)) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).context("invalid date")
}
