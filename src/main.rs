use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use wellness_coach::config::Config;
use wellness_coach::export::{
    write_csv, DailyCheckinRow, MemberRow, MessageLogRow, WeeklyCheckinRow,
};
use wellness_coach::models::{
    format_millis, nanos_to_date, nanos_to_millis, new_id, parse_time, Announcement, CoachNote,
    ConsentStatus, DailyCheckin, FollowupTask, Gender, MemberProfile, MessageLog,
    ReminderPreference, TaskStatus, Time, WeeklyCheckin,
};
use wellness_coach::roster::{MessageTemplate, MESSAGE_TEMPLATES};
use wellness_coach::tasks::{coach_digest, derive_status, TaskBoard};
use wellness_coach::timeline::{build_timeline, filter_by_type, TimelineFilter, TimelineItem};
use wellness_coach::{db, logging, progress, report, roster};

#[derive(Parser)]
#[command(name = "wellness-coach")]
#[command(about = "Coaching back office for wellness programs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportKind {
    Members,
    Daily,
    Weekly,
    Messages,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import daily check-ins from a CSV file
    ImportDaily {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Register a new member
    AddMember {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: i32,
        /// female, male or other
        #[arg(long)]
        gender: Gender,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        height_cm: f64,
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        target_weight: Option<f64>,
        #[arg(long)]
        program: String,
        /// active, pending or optedOut
        #[arg(long, default_value = "pending")]
        consent: ConsentStatus,
        /// daily, weekly, both or none
        #[arg(long, default_value = "daily")]
        reminders: ReminderPreference,
    },
    /// List members, optionally filtered by name, program or id
    Members {
        #[arg(long)]
        search: Option<String>,
    },
    /// Set a member's current weight
    UpdateWeight {
        #[arg(long)]
        member: String,
        #[arg(long)]
        weight: f64,
    },
    /// Record a daily check-in
    SubmitDaily {
        #[arg(long)]
        member: String,
        #[arg(long)]
        compliance: i32,
        #[arg(long)]
        mood: i32,
        #[arg(long)]
        digestion: i32,
        #[arg(long, default_value_t = 0.0)]
        water: f64,
        #[arg(long, default_value_t = 0)]
        workout_minutes: i32,
        #[arg(long, default_value_t = 0)]
        steps: i32,
        #[arg(long, default_value_t = 0.0)]
        sleep: f64,
        #[arg(long)]
        notes: Option<String>,
        /// Nanoseconds or RFC 3339; defaults to now
        #[arg(long, value_parser = parse_time)]
        at: Option<Time>,
    },
    /// Record a weekly check-in and update the member's current weight
    SubmitWeekly {
        #[arg(long)]
        member: String,
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        waist: Option<f64>,
        #[arg(long)]
        hip: Option<f64>,
        #[arg(long)]
        chest: Option<f64>,
        #[arg(long)]
        wins: Option<String>,
        #[arg(long)]
        struggles: Option<String>,
        #[arg(long, value_parser = parse_time)]
        at: Option<Time>,
    },
    /// Add a coach note to a member
    AddNote {
        #[arg(long)]
        member: String,
        #[arg(long)]
        content: String,
    },
    /// Show WhatsApp templates filled in for a member
    Templates {
        #[arg(long)]
        member: String,
    },
    /// Record an outbound WhatsApp message
    LogMessage {
        #[arg(long)]
        member: String,
        #[arg(long)]
        template: String,
        #[arg(long, default_value = "sent")]
        status: String,
    },
    /// Create an announcement
    Announce {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long, value_parser = parse_time)]
        scheduled: Option<Time>,
        #[arg(long, default_value = "all")]
        segment: String,
        /// Save without publishing
        #[arg(long)]
        draft: bool,
    },
    /// Show published announcements
    Announcements,
    /// Show a member's activity timeline, newest first
    Timeline {
        #[arg(long)]
        member: String,
        /// all, daily, weekly, note, message or announcement
        #[arg(long, default_value = "all")]
        filter: TimelineFilter,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Show weight, BMI and check-in progress for a member
    Progress {
        #[arg(long)]
        member: String,
    },
    /// Show member and follow-up counts for the coach
    Dashboard,
    /// List members who still need today's check-in reminder
    Reminders,
    /// Summarize overdue and due-today follow-ups
    Digest {
        #[arg(long)]
        json: bool,
    },
    /// Create a follow-up task
    CreateTask {
        #[arg(long)]
        member: String,
        #[arg(long)]
        description: String,
        /// Nanoseconds or RFC 3339; defaults to now
        #[arg(long, value_parser = parse_time)]
        due: Option<Time>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Set a follow-up task's status
    SetTaskStatus {
        #[arg(long)]
        id: String,
        /// completed, dueToday or overdue
        #[arg(long)]
        status: TaskStatus,
    },
    /// Mark a follow-up task as completed
    CompleteTask {
        #[arg(long)]
        id: String,
    },
    /// Export a collection as CSV
    Export {
        #[arg(long, value_enum)]
        kind: ExportKind,
        #[arg(long)]
        out: PathBuf,
    },
    /// Generate a markdown member report
    Report {
        #[arg(long)]
        member: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value = "member-report.md")]
        out: PathBuf,
    },
}

async fn require_member(pool: &PgPool, member_id: &str) -> anyhow::Result<MemberProfile> {
    db::fetch_member(pool, member_id)
        .await?
        .with_context(|| format!("no member with id {member_id}"))
}

async fn load_timeline(pool: &PgPool, member_id: &str) -> anyhow::Result<Vec<TimelineItem>> {
    let daily = db::fetch_daily_checkins(pool).await?;
    let weekly = db::fetch_weekly_checkins(pool).await?;
    let notes = db::fetch_coach_notes(pool).await?;
    let messages = db::fetch_message_logs(pool).await?;
    let announcements = db::fetch_announcements(pool).await?;

    Ok(build_timeline(
        member_id,
        &daily,
        &weekly,
        &notes,
        &messages,
        &announcements,
    ))
}

async fn load_tasks(pool: &PgPool) -> anyhow::Result<Vec<FollowupTask>> {
    let mut tasks = db::fetch_followup_tasks(pool).await?;
    let today = Utc::now().date_naive();
    for task in tasks.iter_mut() {
        task.status = derive_status(task, today);
    }
    Ok(tasks)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init()?;
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportDaily { csv } => {
            let summary = db::import_daily_csv(&pool, &csv).await?;
            println!(
                "Inserted {} daily check-ins from {} ({} skipped).",
                summary.inserted,
                csv.display(),
                summary.skipped
            );
        }
        Commands::AddMember {
            id,
            name,
            age,
            gender,
            phone,
            height_cm,
            weight,
            target_weight,
            program,
            consent,
            reminders,
        } => {
            let member = MemberProfile {
                id: id.unwrap_or_else(|| new_id("member")),
                name,
                age,
                gender,
                whatsapp_phone: phone,
                height_cm,
                starting_weight: weight,
                current_weight: weight,
                target_weight,
                program_type: program,
                consent_status: consent,
                reminder_preference: reminders,
            };
            if !db::create_member(&pool, &member).await? {
                anyhow::bail!("a member with id {} already exists", member.id);
            }
            println!("Member {} created.", member.id);
        }
        Commands::Members { search } => {
            let members = db::fetch_members(&pool).await?;
            let matches = roster::search_members(&members, search.as_deref().unwrap_or(""));

            if matches.is_empty() {
                println!("No members found.");
                return Ok(());
            }
            for member in matches {
                println!(
                    "- {} [{}] {} ({} consent, {} kg)",
                    member.name,
                    member.id,
                    member.program_type,
                    member.consent_status.as_str(),
                    member.current_weight
                );
            }
        }
        Commands::UpdateWeight { member, weight } => {
            if !db::update_current_weight(&pool, &member, weight).await? {
                anyhow::bail!("no member with id {member}");
            }
            println!("Current weight for {member} set to {weight} kg.");
        }
        Commands::SubmitDaily {
            member,
            compliance,
            mood,
            digestion,
            water,
            workout_minutes,
            steps,
            sleep,
            notes,
            at,
        } => {
            require_member(&pool, &member).await?;
            let checkin = DailyCheckin {
                id: new_id("daily"),
                member_id: member,
                date: at.map_or_else(db::now_nanos, Ok)?,
                compliance_score: compliance,
                mood_score: mood,
                digestion_score: digestion,
                water_intake: water,
                workout_minutes,
                steps,
                sleep_hours: sleep,
                notes,
            };
            db::submit_daily_checkin(&pool, &checkin).await?;
            println!("Daily check-in {} recorded.", checkin.id);
        }
        Commands::SubmitWeekly {
            member,
            weight,
            waist,
            hip,
            chest,
            wins,
            struggles,
            at,
        } => {
            require_member(&pool, &member).await?;
            let checkin = WeeklyCheckin {
                id: new_id("weekly"),
                member_id: member,
                date: at.map_or_else(db::now_nanos, Ok)?,
                weight,
                waist,
                hip,
                chest,
                wins,
                struggles,
            };
            db::submit_weekly_checkin(&pool, &checkin).await?;
            println!("Weekly check-in {} recorded.", checkin.id);
        }
        Commands::AddNote { member, content } => {
            require_member(&pool, &member).await?;
            let note = CoachNote {
                id: new_id("note"),
                member_id: member,
                timestamp: db::now_nanos()?,
                content,
            };
            db::add_coach_note(&pool, &note).await?;
            println!("Note {} added.", note.id);
        }
        Commands::Templates { member } => {
            let profile = require_member(&pool, &member).await?;
            println!("Templates for {} ({}):", profile.name, profile.whatsapp_phone);
            for template in MESSAGE_TEMPLATES.iter() {
                println!("\n[{}] {}", template.id, template.name);
                println!("{}", template.render(&profile.name));
            }
        }
        Commands::LogMessage {
            member,
            template,
            status,
        } => {
            require_member(&pool, &member).await?;
            let known = MessageTemplate::find(&template)
                .with_context(|| format!("unknown message template {template}"))?;
            let log = MessageLog {
                id: new_id("msg"),
                member_id: member,
                template_id: known.id.to_string(),
                status,
                timestamp: db::now_nanos()?,
            };
            db::log_message(&pool, &log).await?;
            println!("Logged {} message {}.", log.template_id, log.id);
        }
        Commands::Announce {
            title,
            content,
            scheduled,
            segment,
            draft,
        } => {
            let announcement = Announcement {
                id: new_id("announcement"),
                title,
                content,
                scheduled_time: scheduled,
                published: !draft,
                target_segment: segment,
            };
            db::create_announcement(&pool, &announcement).await?;
            println!("Announcement {} created.", announcement.id);
        }
        Commands::Announcements => {
            let announcements = db::fetch_announcements(&pool).await?;
            let feed = roster::published_announcements(&announcements);

            if feed.is_empty() {
                println!("No announcements yet");
                return Ok(());
            }
            for announcement in feed {
                let when = announcement
                    .scheduled_time
                    .map(|time| format_millis(nanos_to_millis(time)))
                    .unwrap_or_else(|| "unscheduled".to_string());
                println!("- {} ({}): {}", announcement.title, when, announcement.content);
            }
        }
        Commands::Timeline {
            member,
            filter,
            limit,
            json,
        } => {
            let items = load_timeline(&pool, &member).await?;
            let mut items = filter_by_type(&items, filter);
            if let Some(limit) = limit {
                items.truncate(limit);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if items.is_empty() {
                println!("No timeline items");
            } else {
                for item in &items {
                    println!("- {item}");
                }
            }
        }
        Commands::Progress { member } => {
            let profile = require_member(&pool, &member).await?;
            let daily = db::fetch_daily_checkins(&pool).await?;
            let weekly = db::fetch_weekly_checkins(&pool).await?;
            let progress = progress::member_progress(&profile, &daily, &weekly);
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
        Commands::Dashboard => {
            let members = db::fetch_members(&pool).await?;
            let daily = db::fetch_daily_checkins(&pool).await?;
            let tasks = load_tasks(&pool).await?;
            let active = roster::active_this_week(&daily, Utc::now().timestamp_millis());
            let board = TaskBoard::from_tasks(&tasks);

            println!("Total members: {}", members.len());
            println!("Active this week: {}", active.len());
            println!("Overdue follow-ups: {}", board.overdue.len());
            println!("Due today: {}", board.due_today.len());
        }
        Commands::Reminders => {
            let members = db::fetch_members(&pool).await?;
            let daily = db::fetch_daily_checkins(&pool).await?;
            let queue = roster::reminder_queue(&members, &daily, Utc::now().date_naive());

            if queue.is_empty() {
                println!("All members have checked in today!");
                return Ok(());
            }

            println!("Pending reminders ({}):", queue.len());
            for member in queue {
                println!(
                    "- {} ({}, {})",
                    member.name, member.program_type, member.whatsapp_phone
                );
            }
        }
        Commands::Digest { json } => {
            let members = db::fetch_members(&pool).await?;
            let tasks = load_tasks(&pool).await?;
            let digest = coach_digest(&tasks, &members);

            if json {
                println!("{}", serde_json::to_string_pretty(&digest)?);
                return Ok(());
            }

            println!(
                "{} overdue follow-ups, {} due today.",
                digest.overdue_count, digest.due_today_count
            );
            if digest.priority_actions.is_empty() {
                println!("Great job! No overdue follow-ups.");
            }
            for action in &digest.priority_actions {
                println!("- {}: {}", action.member_name, action.description);
            }
        }
        Commands::CreateTask {
            member,
            description,
            due,
            note,
        } => {
            require_member(&pool, &member).await?;
            let mut task = FollowupTask {
                id: new_id("task"),
                member_id: member,
                description,
                due_date: due.map_or_else(db::now_nanos, Ok)?,
                status: TaskStatus::DueToday,
                completion_date: None,
                coach_note_id: note,
            };
            task.status = derive_status(&task, Utc::now().date_naive());
            db::create_followup_task(&pool, &task).await?;
            println!(
                "Task {} created (due {}, {}).",
                task.id,
                nanos_to_date(task.due_date),
                task.status
            );
        }
        Commands::SetTaskStatus { id, status } => {
            if !db::update_task_status(&pool, &id, status).await? {
                anyhow::bail!("no follow-up task with id {id}");
            }
            println!("Task {id} is now {status}.");
        }
        Commands::CompleteTask { id } => {
            if db::complete_task(&pool, &id).await? {
                println!("Task {id} completed.");
            } else {
                anyhow::bail!("no follow-up task with id {id}");
            }
        }
        Commands::Export { kind, out } => {
            let file = File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let written = match kind {
                ExportKind::Members => {
                    let members = db::fetch_members(&pool).await?;
                    write_csv(file, members.iter().map(MemberRow::from))?
                }
                ExportKind::Daily => {
                    let daily = db::fetch_daily_checkins(&pool).await?;
                    write_csv(file, daily.iter().map(DailyCheckinRow::from))?
                }
                ExportKind::Weekly => {
                    let weekly = db::fetch_weekly_checkins(&pool).await?;
                    write_csv(file, weekly.iter().map(WeeklyCheckinRow::from))?
                }
                ExportKind::Messages => {
                    let logs = db::fetch_message_logs(&pool).await?;
                    write_csv(file, logs.iter().map(MessageLogRow::from))?
                }
            };
            println!("Exported {written} rows to {}.", out.display());
        }
        Commands::Report { member, limit, out } => {
            let profile = require_member(&pool, &member).await?;
            let daily = db::fetch_daily_checkins(&pool).await?;
            let weekly = db::fetch_weekly_checkins(&pool).await?;
            let notes = db::fetch_coach_notes(&pool).await?;
            let messages = db::fetch_message_logs(&pool).await?;
            let announcements = db::fetch_announcements(&pool).await?;

            let progress = progress::member_progress(&profile, &daily, &weekly);
            let timeline =
                build_timeline(&member, &daily, &weekly, &notes, &messages, &announcements);

            let tasks: Vec<FollowupTask> = load_tasks(&pool)
                .await?
                .into_iter()
                .filter(|task| task.member_id == member)
                .collect();
            let board = TaskBoard::from_tasks(&tasks);

            let report = report::build_member_report(&profile, &progress, &timeline, &board, limit);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
