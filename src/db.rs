use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::error::DataResult;
use crate::models::{
    new_id, parse_time, Announcement, CoachNote, DailyCheckin, FollowupTask, MemberProfile,
    MessageLog, TaskStatus, Time, WeeklyCheckin,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn tag<T>(row: &PgRow, column: &'static str) -> anyhow::Result<T>
where
    T: std::str::FromStr<Err = crate::error::DataError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>()
        .with_context(|| format!("invalid {column} in stored row"))
}

fn member_from_row(row: &PgRow) -> anyhow::Result<MemberProfile> {
    Ok(MemberProfile {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        age: row.try_get("age")?,
        gender: tag(row, "gender")?,
        whatsapp_phone: row.try_get("whatsapp_phone")?,
        height_cm: row.try_get("height_cm")?,
        starting_weight: row.try_get("starting_weight")?,
        current_weight: row.try_get("current_weight")?,
        target_weight: row.try_get("target_weight")?,
        program_type: row.try_get("program_type")?,
        consent_status: tag(row, "consent_status")?,
        reminder_preference: tag(row, "reminder_preference")?,
    })
}

const MEMBER_COLUMNS: &str = "id, name, age, gender, whatsapp_phone, height_cm, starting_weight, \
     current_weight, target_weight, program_type, consent_status, reminder_preference";

pub async fn fetch_members(pool: &PgPool) -> anyhow::Result<Vec<MemberProfile>> {
    let query = format!("SELECT {MEMBER_COLUMNS} FROM wellness_coach.members ORDER BY name");
    let rows = sqlx::query(&query).fetch_all(pool).await?;
    rows.iter().map(member_from_row).collect()
}

pub async fn fetch_member(pool: &PgPool, id: &str) -> anyhow::Result<Option<MemberProfile>> {
    let query = format!("SELECT {MEMBER_COLUMNS} FROM wellness_coach.members WHERE id = $1");
    let row = sqlx::query(&query).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(member_from_row).transpose()
}

fn daily_from_row(row: &PgRow) -> Result<DailyCheckin, sqlx::Error> {
    Ok(DailyCheckin {
        id: row.try_get("id")?,
        member_id: row.try_get("member_id")?,
        date: row.try_get("date")?,
        compliance_score: row.try_get("compliance_score")?,
        mood_score: row.try_get("mood_score")?,
        digestion_score: row.try_get("digestion_score")?,
        water_intake: row.try_get("water_intake")?,
        workout_minutes: row.try_get("workout_minutes")?,
        steps: row.try_get("steps")?,
        sleep_hours: row.try_get("sleep_hours")?,
        notes: row.try_get("notes")?,
    })
}

pub async fn fetch_daily_checkins(pool: &PgPool) -> anyhow::Result<Vec<DailyCheckin>> {
    let rows = sqlx::query(
        "SELECT id, member_id, date, compliance_score, mood_score, digestion_score, \
         water_intake, workout_minutes, steps, sleep_hours, notes \
         FROM wellness_coach.daily_checkins",
    )
    .fetch_all(pool)
    .await?;

    let checkins = rows.iter().map(daily_from_row).collect::<Result<_, _>>()?;
    Ok(checkins)
}

fn weekly_from_row(row: &PgRow) -> Result<WeeklyCheckin, sqlx::Error> {
    Ok(WeeklyCheckin {
        id: row.try_get("id")?,
        member_id: row.try_get("member_id")?,
        date: row.try_get("date")?,
        weight: row.try_get("weight")?,
        waist: row.try_get("waist")?,
        hip: row.try_get("hip")?,
        chest: row.try_get("chest")?,
        wins: row.try_get("wins")?,
        struggles: row.try_get("struggles")?,
    })
}

pub async fn fetch_weekly_checkins(pool: &PgPool) -> anyhow::Result<Vec<WeeklyCheckin>> {
    let rows = sqlx::query(
        "SELECT id, member_id, date, weight, waist, hip, chest, wins, struggles \
         FROM wellness_coach.weekly_checkins",
    )
    .fetch_all(pool)
    .await?;

    let checkins = rows.iter().map(weekly_from_row).collect::<Result<_, _>>()?;
    Ok(checkins)
}

pub async fn fetch_coach_notes(pool: &PgPool) -> anyhow::Result<Vec<CoachNote>> {
    let rows = sqlx::query("SELECT id, member_id, timestamp, content FROM wellness_coach.coach_notes")
        .fetch_all(pool)
        .await?;

    let mut notes = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        notes.push(CoachNote {
            id: row.try_get("id")?,
            member_id: row.try_get("member_id")?,
            timestamp: row.try_get("timestamp")?,
            content: row.try_get("content")?,
        });
    }

    Ok(notes)
}

pub async fn fetch_message_logs(pool: &PgPool) -> anyhow::Result<Vec<MessageLog>> {
    let rows = sqlx::query(
        "SELECT id, member_id, template_id, status, timestamp FROM wellness_coach.message_logs",
    )
    .fetch_all(pool)
    .await?;

    let mut logs = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        logs.push(MessageLog {
            id: row.try_get("id")?,
            member_id: row.try_get("member_id")?,
            template_id: row.try_get("template_id")?,
            status: row.try_get("status")?,
            timestamp: row.try_get("timestamp")?,
        });
    }

    Ok(logs)
}

pub async fn fetch_announcements(pool: &PgPool) -> anyhow::Result<Vec<Announcement>> {
    let rows = sqlx::query(
        "SELECT id, title, content, scheduled_time, published, target_segment \
         FROM wellness_coach.announcements",
    )
    .fetch_all(pool)
    .await?;

    let mut announcements = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        announcements.push(Announcement {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            scheduled_time: row.try_get("scheduled_time")?,
            published: row.try_get("published")?,
            target_segment: row.try_get("target_segment")?,
        });
    }

    Ok(announcements)
}

pub async fn fetch_followup_tasks(pool: &PgPool) -> anyhow::Result<Vec<FollowupTask>> {
    let rows = sqlx::query(
        "SELECT id, member_id, description, due_date, status, completion_date, coach_note_id \
         FROM wellness_coach.followup_tasks ORDER BY due_date",
    )
    .fetch_all(pool)
    .await?;

    let mut tasks = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        tasks.push(FollowupTask {
            id: row.try_get("id")?,
            member_id: row.try_get("member_id")?,
            description: row.try_get("description")?,
            due_date: row.try_get("due_date")?,
            status: tag(row, "status")?,
            completion_date: row.try_get("completion_date")?,
            coach_note_id: row.try_get("coach_note_id")?,
        });
    }

    Ok(tasks)
}

/// Marks a follow-up as completed now. Returns false when no task has that id.
pub async fn complete_task(pool: &PgPool, id: &str) -> anyhow::Result<bool> {
    update_task_status(pool, id, TaskStatus::Completed).await
}

fn to_nanos(at: DateTime<Utc>) -> anyhow::Result<Time> {
    at.timestamp_nanos_opt()
        .context("timestamp out of range for nanosecond storage")
}

pub fn now_nanos() -> anyhow::Result<Time> {
    to_nanos(Utc::now())
}

fn days_ago(days: i64) -> anyhow::Result<Time> {
    to_nanos(Utc::now() - Duration::days(days))
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let members = vec![
        (
            "member-priya",
            "Priya Nair",
            34,
            "female",
            "+919800000001",
            160.0,
            80.0,
            Some(65.0),
            "TRF 16:8",
            "active",
            "both",
        ),
        (
            "member-marcus",
            "Marcus Webb",
            47,
            "male",
            "+14155550123",
            182.0,
            104.0,
            Some(90.0),
            "Metabolic Reset",
            "active",
            "daily",
        ),
        (
            "member-ines",
            "Ines Duarte",
            29,
            "female",
            "+351910000000",
            165.0,
            68.0,
            None,
            "Maintenance",
            "optedOut",
            "weekly",
        ),
    ];

    for (
        id,
        name,
        age,
        gender,
        phone,
        height_cm,
        starting_weight,
        target_weight,
        program,
        consent,
        preference,
    ) in members
    {
        sqlx::query(
            r#"
            INSERT INTO wellness_coach.members
            (id, name, age, gender, whatsapp_phone, height_cm, starting_weight,
             current_weight, target_weight, program_type, consent_status, reminder_preference)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, program_type = EXCLUDED.program_type
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(age)
        .bind(gender)
        .bind(phone)
        .bind(height_cm)
        .bind(starting_weight)
        .bind(target_weight)
        .bind(program)
        .bind(consent)
        .bind(preference)
        .execute(pool)
        .await?;
    }

    let daily = vec![
        ("seed-daily-001", "member-priya", days_ago(2)?, 4, 5),
        ("seed-daily-002", "member-priya", days_ago(1)?, 5, 4),
        ("seed-daily-003", "member-marcus", days_ago(3)?, 2, 3),
    ];

    for (id, member_id, date, compliance, mood) in daily {
        sqlx::query(
            r#"
            INSERT INTO wellness_coach.daily_checkins
            (id, member_id, date, compliance_score, mood_score, digestion_score,
             water_intake, workout_minutes, steps, sleep_hours, notes)
            VALUES ($1, $2, $3, $4, $5, 3, 2.5, 30, 7500, 7.0, NULL)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(member_id)
        .bind(date)
        .bind(compliance)
        .bind(mood)
        .execute(pool)
        .await?;
    }

    let weekly = vec![
        ("seed-weekly-001", "member-priya", days_ago(14)?, 78.4),
        ("seed-weekly-002", "member-priya", days_ago(7)?, 77.6),
        ("seed-weekly-003", "member-marcus", days_ago(7)?, 101.2),
    ];

    for (id, member_id, date, weight) in weekly {
        sqlx::query(
            r#"
            INSERT INTO wellness_coach.weekly_checkins (id, member_id, date, weight)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(member_id)
        .bind(date)
        .bind(weight)
        .execute(pool)
        .await?;
    }

    let note_id = "seed-note-001";
    sqlx::query(
        r#"
        INSERT INTO wellness_coach.coach_notes (id, member_id, timestamp, content)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(note_id)
    .bind("member-marcus")
    .bind(days_ago(3)?)
    .bind("Low compliance this week, travelling for work")
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO wellness_coach.message_logs (id, member_id, template_id, status, timestamp)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind("seed-message-001")
    .bind("member-marcus")
    .bind("missed_checkin")
    .bind("sent")
    .bind(days_ago(1)?)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO wellness_coach.announcements
        (id, title, content, scheduled_time, published, target_segment)
        VALUES ($1, $2, $3, $4, TRUE, 'all')
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind("seed-announcement-001")
    .bind("Hydration challenge")
    .bind("Aim for 2.5 litres of water every day this week.")
    .bind(days_ago(5)?)
    .execute(pool)
    .await?;

    let tasks = vec![
        (
            "seed-task-001",
            "member-marcus",
            "Call about travel meal plan",
            days_ago(2)?,
            "overdue",
            Some(note_id),
        ),
        (
            "seed-task-002",
            "member-priya",
            "Celebrate 2 kg milestone",
            now_nanos()?,
            "dueToday",
            None,
        ),
    ];

    for (id, member_id, description, due_date, status, coach_note_id) in tasks {
        sqlx::query(
            r#"
            INSERT INTO wellness_coach.followup_tasks
            (id, member_id, description, due_date, status, coach_note_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(member_id)
        .bind(description)
        .bind(due_date)
        .bind(status)
        .bind(coach_note_id)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn create_member(pool: &PgPool, member: &MemberProfile) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO wellness_coach.members
        (id, name, age, gender, whatsapp_phone, height_cm, starting_weight,
         current_weight, target_weight, program_type, consent_status, reminder_preference)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(&member.id)
    .bind(&member.name)
    .bind(member.age)
    .bind(member.gender.as_str())
    .bind(&member.whatsapp_phone)
    .bind(member.height_cm)
    .bind(member.starting_weight)
    .bind(member.current_weight)
    .bind(member.target_weight)
    .bind(&member.program_type)
    .bind(member.consent_status.as_str())
    .bind(member.reminder_preference.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn insert_daily_checkin<'e, E>(executor: E, checkin: &DailyCheckin) -> anyhow::Result<bool>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO wellness_coach.daily_checkins
        (id, member_id, date, compliance_score, mood_score, digestion_score,
         water_intake, workout_minutes, steps, sleep_hours, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(&checkin.id)
    .bind(&checkin.member_id)
    .bind(checkin.date)
    .bind(checkin.compliance_score)
    .bind(checkin.mood_score)
    .bind(checkin.digestion_score)
    .bind(checkin.water_intake)
    .bind(checkin.workout_minutes)
    .bind(checkin.steps)
    .bind(checkin.sleep_hours)
    .bind(&checkin.notes)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn submit_daily_checkin(pool: &PgPool, checkin: &DailyCheckin) -> anyhow::Result<bool> {
    checkin.validate()?;
    insert_daily_checkin(pool, checkin).await
}

/// Stores a weekly check-in and moves the member's current weight to it.
pub async fn submit_weekly_checkin(pool: &PgPool, checkin: &WeeklyCheckin) -> anyhow::Result<bool> {
    checkin.validate()?;
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO wellness_coach.weekly_checkins
        (id, member_id, date, weight, waist, hip, chest, wins, struggles)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(&checkin.id)
    .bind(&checkin.member_id)
    .bind(checkin.date)
    .bind(checkin.weight)
    .bind(checkin.waist)
    .bind(checkin.hip)
    .bind(checkin.chest)
    .bind(&checkin.wins)
    .bind(&checkin.struggles)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() > 0 {
        sqlx::query("UPDATE wellness_coach.members SET current_weight = $2 WHERE id = $1")
            .bind(&checkin.member_id)
            .bind(checkin.weight)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_current_weight(pool: &PgPool, member_id: &str, weight: f64) -> anyhow::Result<bool> {
    let result = sqlx::query("UPDATE wellness_coach.members SET current_weight = $2 WHERE id = $1")
        .bind(member_id)
        .bind(weight)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn add_coach_note(pool: &PgPool, note: &CoachNote) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO wellness_coach.coach_notes (id, member_id, timestamp, content)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(&note.id)
    .bind(&note.member_id)
    .bind(note.timestamp)
    .bind(&note.content)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn log_message(pool: &PgPool, log: &MessageLog) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO wellness_coach.message_logs (id, member_id, template_id, status, timestamp)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&log.id)
    .bind(&log.member_id)
    .bind(&log.template_id)
    .bind(&log.status)
    .bind(log.timestamp)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_announcement(pool: &PgPool, announcement: &Announcement) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO wellness_coach.announcements
        (id, title, content, scheduled_time, published, target_segment)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&announcement.id)
    .bind(&announcement.title)
    .bind(&announcement.content)
    .bind(announcement.scheduled_time)
    .bind(announcement.published)
    .bind(&announcement.target_segment)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_followup_task(pool: &PgPool, task: &FollowupTask) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO wellness_coach.followup_tasks
        (id, member_id, description, due_date, status, completion_date, coach_note_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(&task.id)
    .bind(&task.member_id)
    .bind(&task.description)
    .bind(task.due_date)
    .bind(task.status.as_str())
    .bind(task.completion_date)
    .bind(&task.coach_note_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Sets a follow-up's status. Completing stamps the completion date; any
/// other status clears it.
pub async fn update_task_status(pool: &PgPool, id: &str, status: TaskStatus) -> anyhow::Result<bool> {
    let completion_date = match status {
        TaskStatus::Completed => Some(now_nanos()?),
        TaskStatus::DueToday | TaskStatus::Overdue => None,
    };
    let result = sqlx::query(
        "UPDATE wellness_coach.followup_tasks \
         SET status = $2, completion_date = $3 \
         WHERE id = $1",
    )
    .bind(id)
    .bind(status.as_str())
    .bind(completion_date)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
}

#[derive(Debug, serde::Deserialize)]
struct DailyCsvRow {
    id: Option<String>,
    member_id: String,
    date: String,
    compliance_score: i32,
    mood_score: i32,
    digestion_score: i32,
    water_intake: f64,
    workout_minutes: i32,
    steps: i32,
    sleep_hours: f64,
    notes: Option<String>,
}

impl DailyCsvRow {
    fn into_checkin(self) -> DataResult<DailyCheckin> {
        let checkin = DailyCheckin {
            date: parse_time(&self.date)?,
            id: self.id.unwrap_or_else(|| new_id("daily")),
            member_id: self.member_id,
            compliance_score: self.compliance_score,
            mood_score: self.mood_score,
            digestion_score: self.digestion_score,
            water_intake: self.water_intake,
            workout_minutes: self.workout_minutes,
            steps: self.steps,
            sleep_hours: self.sleep_hours,
            notes: self.notes.filter(|notes| !notes.trim().is_empty()),
        };
        checkin.validate()?;
        Ok(checkin)
    }
}

#[derive(Debug, Default)]
pub struct ParsedDailyImport {
    pub checkins: Vec<DailyCheckin>,
    pub skipped: usize,
}

/// Reads daily check-ins from CSV. Rows that fail to deserialize, carry an
/// unreadable date, or have out-of-range values are logged and skipped; only
/// I/O failures abort.
pub fn read_daily_csv<R: Read>(source: R) -> anyhow::Result<ParsedDailyImport> {
    let mut reader = csv::Reader::from_reader(source);
    let mut parsed = ParsedDailyImport::default();

    for (index, result) in reader.deserialize::<DailyCsvRow>().enumerate() {
        let line = index + 2;
        let row = match result {
            Ok(row) => row,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                tracing::warn!(line, error = %err, "skipping unreadable daily check-in row");
                parsed.skipped += 1;
                continue;
            }
        };

        let member_id = row.member_id.clone();
        match row.into_checkin() {
            Ok(checkin) => parsed.checkins.push(checkin),
            Err(err) => {
                tracing::warn!(line, member_id = %member_id, error = %err, "skipping daily check-in");
                parsed.skipped += 1;
            }
        }
    }

    Ok(parsed)
}

/// Imports daily check-ins in a single transaction. Malformed rows are
/// skipped; duplicate ids are ignored.
pub async fn import_daily_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<ImportSummary> {
    let file = File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let parsed = read_daily_csv(file)?;
    let mut summary = ImportSummary {
        inserted: 0,
        skipped: parsed.skipped,
    };

    let mut tx = pool.begin().await?;
    for checkin in &parsed.checkins {
        if insert_daily_checkin(&mut *tx, checkin).await? {
            summary.inserted += 1;
        }
    }
    tx.commit().await?;

    tracing::info!(
        inserted = summary.inserted,
        skipped = summary.skipped,
        "daily check-in import finished"
    );
    Ok(summary)
}
