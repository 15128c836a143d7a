use std::io::Write;

use serde::Serialize;

use crate::models::{
    nanos_to_date, nanos_to_datetime, DailyCheckin, MemberProfile, MessageLog, WeeklyCheckin,
};

const NOT_AVAILABLE: &str = "N/A";

fn or_not_available(value: Option<f64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[derive(Debug, Serialize)]
pub struct MemberRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Age")]
    pub age: i32,
    #[serde(rename = "Gender")]
    pub gender: &'static str,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Current Weight")]
    pub current_weight: f64,
    #[serde(rename = "Target Weight")]
    pub target_weight: String,
    #[serde(rename = "Program")]
    pub program: String,
    #[serde(rename = "Consent Status")]
    pub consent_status: &'static str,
}

impl From<&MemberProfile> for MemberRow {
    fn from(member: &MemberProfile) -> Self {
        MemberRow {
            name: member.name.clone(),
            age: member.age,
            gender: member.gender.as_str(),
            phone: member.whatsapp_phone.clone(),
            current_weight: member.current_weight,
            target_weight: or_not_available(member.target_weight),
            program: member.program_type.clone(),
            consent_status: member.consent_status.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DailyCheckinRow {
    #[serde(rename = "Member ID")]
    pub member_id: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Water")]
    pub water: f64,
    #[serde(rename = "Workout Minutes")]
    pub workout_minutes: i32,
    #[serde(rename = "Steps")]
    pub steps: i32,
    #[serde(rename = "Sleep")]
    pub sleep: f64,
    #[serde(rename = "Mood")]
    pub mood: i32,
    #[serde(rename = "Digestion")]
    pub digestion: i32,
    #[serde(rename = "Compliance")]
    pub compliance: i32,
}

impl From<&DailyCheckin> for DailyCheckinRow {
    fn from(checkin: &DailyCheckin) -> Self {
        DailyCheckinRow {
            member_id: checkin.member_id.clone(),
            date: nanos_to_date(checkin.date).to_string(),
            water: checkin.water_intake,
            workout_minutes: checkin.workout_minutes,
            steps: checkin.steps,
            sleep: checkin.sleep_hours,
            mood: checkin.mood_score,
            digestion: checkin.digestion_score,
            compliance: checkin.compliance_score,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WeeklyCheckinRow {
    #[serde(rename = "Member ID")]
    pub member_id: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Weight")]
    pub weight: f64,
    #[serde(rename = "Waist")]
    pub waist: String,
    #[serde(rename = "Hip")]
    pub hip: String,
    #[serde(rename = "Chest")]
    pub chest: String,
}

impl From<&WeeklyCheckin> for WeeklyCheckinRow {
    fn from(checkin: &WeeklyCheckin) -> Self {
        WeeklyCheckinRow {
            member_id: checkin.member_id.clone(),
            date: nanos_to_date(checkin.date).to_string(),
            weight: checkin.weight,
            waist: or_not_available(checkin.waist),
            hip: or_not_available(checkin.hip),
            chest: or_not_available(checkin.chest),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageLogRow {
    #[serde(rename = "Member ID")]
    pub member_id: String,
    #[serde(rename = "Template")]
    pub template: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
}

impl From<&MessageLog> for MessageLogRow {
    fn from(log: &MessageLog) -> Self {
        MessageLogRow {
            member_id: log.member_id.clone(),
            template: log.template_id.clone(),
            status: log.status.clone(),
            timestamp: nanos_to_datetime(log.timestamp)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        }
    }
}

/// Writes `rows` as CSV with a header line. Nothing is written for an empty set.
pub fn write_csv<W, R>(writer: W, rows: impl IntoIterator<Item = R>) -> anyhow::Result<usize>
where
    W: Write,
    R: Serialize,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut written = 0usize;

    for row in rows {
        csv_writer.serialize(row)?;
        written += 1;
    }

    csv_writer.flush()?;
    Ok(written)
}
