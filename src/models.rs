use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DataError, DataResult};

/// Nanoseconds since the Unix epoch, as stored by the backend.
pub type Time = i64;

pub const NANOS_PER_MILLI: i64 = 1_000_000;

pub fn nanos_to_millis(time: Time) -> i64 {
    time / NANOS_PER_MILLI
}

pub fn nanos_to_datetime(time: Time) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(time)
}

pub fn nanos_to_date(time: Time) -> NaiveDate {
    nanos_to_datetime(time).date_naive()
}

/// Record id in the backend's `<prefix>_<unique>` shape.
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

/// Renders epoch milliseconds as `YYYY-MM-DD HH:MM` in UTC.
pub fn format_millis(millis: i64) -> String {
    nanos_to_datetime(millis.saturating_mul(NANOS_PER_MILLI))
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> DataResult<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(DataError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// Accepts either integer nanoseconds or an RFC 3339 timestamp.
pub fn parse_time(raw: &str) -> DataResult<Time> {
    let trimmed = raw.trim();
    if let Ok(nanos) = trimmed.parse::<i64>() {
        return Ok(nanos);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .and_then(|parsed| parsed.timestamp_nanos_opt())
        .ok_or_else(|| DataError::MalformedTimestamp(raw.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsentStatus {
    Active,
    Pending,
    OptedOut,
}

impl ConsentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsentStatus::Active => "active",
            ConsentStatus::Pending => "pending",
            ConsentStatus::OptedOut => "optedOut",
        }
    }
}

impl FromStr for ConsentStatus {
    type Err = DataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(ConsentStatus::Active),
            "pending" => Ok(ConsentStatus::Pending),
            "optedOut" => Ok(ConsentStatus::OptedOut),
            other => Err(DataError::UnknownTag {
                field: "consent_status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReminderPreference {
    Both,
    None,
    Daily,
    Weekly,
}

impl ReminderPreference {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderPreference::Both => "both",
            ReminderPreference::None => "none",
            ReminderPreference::Daily => "daily",
            ReminderPreference::Weekly => "weekly",
        }
    }

    pub fn wants_daily(self) -> bool {
        matches!(self, ReminderPreference::Daily | ReminderPreference::Both)
    }
}

impl FromStr for ReminderPreference {
    type Err = DataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "both" => Ok(ReminderPreference::Both),
            "none" => Ok(ReminderPreference::None),
            "daily" => Ok(ReminderPreference::Daily),
            "weekly" => Ok(ReminderPreference::Weekly),
            other => Err(DataError::UnknownTag {
                field: "reminder_preference",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Gender {
    Female,
    Male,
    Other,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = DataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "female" => Ok(Gender::Female),
            "male" => Ok(Gender::Male),
            "other" => Ok(Gender::Other),
            other => Err(DataError::UnknownTag {
                field: "gender",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    Completed,
    DueToday,
    Overdue,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Completed => "completed",
            TaskStatus::DueToday => "dueToday",
            TaskStatus::Overdue => "overdue",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = DataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "completed" => Ok(TaskStatus::Completed),
            "dueToday" => Ok(TaskStatus::DueToday),
            "overdue" => Ok(TaskStatus::Overdue),
            other => Err(DataError::UnknownTag {
                field: "task_status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    pub id: String,
    pub name: String,
    pub age: i32,
    pub gender: Gender,
    pub whatsapp_phone: String,
    pub height_cm: f64,
    pub starting_weight: f64,
    pub current_weight: f64,
    pub target_weight: Option<f64>,
    pub program_type: String,
    pub consent_status: ConsentStatus,
    pub reminder_preference: ReminderPreference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCheckin {
    pub id: String,
    pub member_id: String,
    pub date: Time,
    pub compliance_score: i32,
    pub mood_score: i32,
    pub digestion_score: i32,
    pub water_intake: f64,
    pub workout_minutes: i32,
    pub steps: i32,
    pub sleep_hours: f64,
    pub notes: Option<String>,
}

impl DailyCheckin {
    /// Scores are on a 1-5 scale; quantities cannot be negative.
    pub fn validate(&self) -> DataResult<()> {
        check_range("compliance_score", self.compliance_score.into(), 1.0, 5.0)?;
        check_range("mood_score", self.mood_score.into(), 1.0, 5.0)?;
        check_range("digestion_score", self.digestion_score.into(), 1.0, 5.0)?;
        check_range("water_intake", self.water_intake, 0.0, f64::MAX)?;
        check_range("workout_minutes", self.workout_minutes.into(), 0.0, f64::MAX)?;
        check_range("steps", self.steps.into(), 0.0, f64::MAX)?;
        check_range("sleep_hours", self.sleep_hours, 0.0, 24.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyCheckin {
    pub id: String,
    pub member_id: String,
    pub date: Time,
    pub weight: f64,
    pub waist: Option<f64>,
    pub hip: Option<f64>,
    pub chest: Option<f64>,
    pub wins: Option<String>,
    pub struggles: Option<String>,
}

impl WeeklyCheckin {
    pub fn validate(&self) -> DataResult<()> {
        check_range("weight", self.weight, 1.0, 500.0)?;
        for (field, value) in [("waist", self.waist), ("hip", self.hip), ("chest", self.chest)] {
            if let Some(value) = value {
                check_range(field, value, 1.0, 300.0)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachNote {
    pub id: String,
    pub member_id: String,
    pub timestamp: Time,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageLog {
    pub id: String,
    pub member_id: String,
    pub template_id: String,
    pub status: String,
    pub timestamp: Time,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub content: String,
    pub scheduled_time: Option<Time>,
    pub published: bool,
    pub target_segment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowupTask {
    pub id: String,
    pub member_id: String,
    pub description: String,
    pub due_date: Time,
    pub status: TaskStatus,
    pub completion_date: Option<Time>,
    pub coach_note_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_nanoseconds_to_milliseconds() {
        assert_eq!(nanos_to_millis(1_700_000_000_000_000_000), 1_700_000_000_000);
        assert_eq!(nanos_to_millis(999_999), 0);
    }

    #[test]
    fn parses_integer_and_rfc3339_timestamps() {
        assert_eq!(parse_time(" 1700000000000000000 "), Ok(1_700_000_000_000_000_000));
        assert_eq!(
            parse_time("2023-11-14T22:13:20Z"),
            Ok(1_700_000_000_000_000_000)
        );
        assert_eq!(
            parse_time("yesterday"),
            Err(DataError::MalformedTimestamp("yesterday".to_string()))
        );
    }

    #[test]
    fn formats_millis_in_utc() {
        assert_eq!(format_millis(1_700_000_000_000), "2023-11-14 22:13");
    }

    fn checkin() -> DailyCheckin {
        DailyCheckin {
            id: "d1".to_string(),
            member_id: "m1".to_string(),
            date: 0,
            compliance_score: 4,
            mood_score: 5,
            digestion_score: 3,
            water_intake: 2.0,
            workout_minutes: 30,
            steps: 9000,
            sleep_hours: 7.0,
            notes: None,
        }
    }

    #[test]
    fn daily_checkin_scores_must_be_on_five_point_scale() {
        assert!(checkin().validate().is_ok());

        let mut bad = checkin();
        bad.mood_score = 6;
        assert_eq!(
            bad.validate(),
            Err(DataError::OutOfRange {
                field: "mood_score",
                value: 6.0,
                min: 1.0,
                max: 5.0,
            })
        );

        let mut bad = checkin();
        bad.compliance_score = 0;
        assert!(bad.validate().is_err());

        let mut bad = checkin();
        bad.steps = -10;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn weekly_checkin_rejects_impossible_measurements() {
        let mut weekly = WeeklyCheckin {
            id: "w1".to_string(),
            member_id: "m1".to_string(),
            date: 0,
            weight: 82.0,
            waist: Some(90.0),
            hip: None,
            chest: None,
            wins: None,
            struggles: None,
        };
        assert!(weekly.validate().is_ok());

        weekly.hip = Some(-4.0);
        assert!(weekly.validate().is_err());

        weekly.hip = None;
        weekly.weight = f64::NAN;
        assert!(weekly.validate().is_err());
    }

    #[test]
    fn status_tags_round_trip_through_strings() {
        for status in [TaskStatus::Completed, TaskStatus::DueToday, TaskStatus::Overdue] {
            assert_eq!(status.as_str().parse::<TaskStatus>(), Ok(status));
        }
        assert_eq!("optedOut".parse::<ConsentStatus>(), Ok(ConsentStatus::OptedOut));
        assert!("archived".parse::<ConsentStatus>().is_err());
    }

    #[test]
    fn only_daily_and_both_want_daily_reminders() {
        assert!(ReminderPreference::Daily.wants_daily());
        assert!(ReminderPreference::Both.wants_daily());
        assert!(!ReminderPreference::Weekly.wants_daily());
        assert!(!ReminderPreference::None.wants_daily());
    }

    #[test]
    fn serializes_enums_with_backend_tags() {
        let json = serde_json::to_string(&TaskStatus::DueToday).unwrap();
        assert_eq!(json, "\"dueToday\"");
    }
}
