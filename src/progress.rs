use serde::Serialize;

use crate::models::{DailyCheckin, MemberProfile, WeeklyCheckin};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProgress {
    pub member_id: String,
    pub checkin_streak: usize,
    pub starting_weight: f64,
    pub current_weight: f64,
    pub target_weight: Option<f64>,
    pub weight_change_percent: Option<f64>,
    pub bmi: Option<f64>,
}

pub fn bmi(weight_kg: f64, height_cm: f64) -> Option<f64> {
    if height_cm <= 0.0 || !height_cm.is_finite() {
        return None;
    }
    let height_m = height_cm / 100.0;
    Some(weight_kg / (height_m * height_m))
}

pub fn weight_change_percent(starting: f64, current: f64) -> Option<f64> {
    if starting <= 0.0 || !starting.is_finite() {
        return None;
    }
    Some((current - starting) / starting * 100.0)
}

/// Number of daily check-ins the member has recorded.
pub fn checkin_streak(member_id: &str, daily: &[DailyCheckin]) -> usize {
    daily
        .iter()
        .filter(|checkin| checkin.member_id == member_id)
        .count()
}

/// Weight from the latest weekly check-in, falling back to the profile.
pub fn current_weight(profile: &MemberProfile, weekly: &[WeeklyCheckin]) -> f64 {
    weekly
        .iter()
        .filter(|checkin| checkin.member_id == profile.id)
        .max_by_key(|checkin| checkin.date)
        .map(|checkin| checkin.weight)
        .unwrap_or(profile.current_weight)
}

pub fn member_progress(
    profile: &MemberProfile,
    daily: &[DailyCheckin],
    weekly: &[WeeklyCheckin],
) -> MemberProgress {
    let current = current_weight(profile, weekly);

    MemberProgress {
        member_id: profile.id.clone(),
        checkin_streak: checkin_streak(&profile.id, daily),
        starting_weight: profile.starting_weight,
        current_weight: current,
        target_weight: profile.target_weight,
        weight_change_percent: weight_change_percent(profile.starting_weight, current),
        bmi: bmi(current, profile.height_cm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConsentStatus, Gender, ReminderPreference};

    fn sample_profile() -> MemberProfile {
        MemberProfile {
            id: "m1".to_string(),
            name: "Priya Nair".to_string(),
            age: 34,
            gender: Gender::Female,
            whatsapp_phone: "+919800000001".to_string(),
            height_cm: 160.0,
            starting_weight: 80.0,
            current_weight: 78.0,
            target_weight: Some(65.0),
            program_type: "TRF".to_string(),
            consent_status: ConsentStatus::Active,
            reminder_preference: ReminderPreference::Both,
        }
    }

    fn weigh_in(member_id: &str, date: i64, weight: f64) -> WeeklyCheckin {
        WeeklyCheckin {
            id: format!("w-{date}"),
            member_id: member_id.to_string(),
            date,
            weight,
            waist: None,
            hip: None,
            chest: None,
            wins: None,
            struggles: None,
        }
    }

    #[test]
    fn computes_bmi_from_height_in_centimetres() {
        let value = bmi(64.0, 160.0).unwrap();
        assert!((value - 25.0).abs() < 0.001);
        assert_eq!(bmi(64.0, 0.0), None);
    }

    #[test]
    fn computes_weight_change_percentage() {
        let change = weight_change_percent(80.0, 76.0).unwrap();
        assert!((change + 5.0).abs() < 0.001);
        assert_eq!(weight_change_percent(0.0, 76.0), None);
    }

    #[test]
    fn prefers_latest_weekly_weight() {
        let profile = sample_profile();
        let weekly = vec![
            weigh_in("m1", 100, 77.0),
            weigh_in("m1", 300, 75.5),
            weigh_in("m2", 400, 90.0),
            weigh_in("m1", 200, 76.0),
        ];
        assert_eq!(current_weight(&profile, &weekly), 75.5);
        assert_eq!(current_weight(&profile, &[]), 78.0);
    }

    #[test]
    fn streak_counts_only_the_members_checkins() {
        let checkin = |id: &str, member_id: &str| DailyCheckin {
            id: id.to_string(),
            member_id: member_id.to_string(),
            date: 0,
            compliance_score: 5,
            mood_score: 5,
            digestion_score: 5,
            water_intake: 3.0,
            workout_minutes: 45,
            steps: 10_000,
            sleep_hours: 8.0,
            notes: Some("great day".to_string()),
        };
        let daily = vec![checkin("d1", "m1"), checkin("d2", "m2"), checkin("d3", "m1")];
        assert_eq!(checkin_streak("m1", &daily), 2);
        assert_eq!(checkin_streak("m3", &daily), 0);
    }

    #[test]
    fn bundles_progress_for_a_member() {
        let profile = sample_profile();
        let weekly = vec![weigh_in("m1", 100, 76.8)];
        let progress = member_progress(&profile, &[], &weekly);

        assert_eq!(progress.checkin_streak, 0);
        assert_eq!(progress.current_weight, 76.8);
        assert_eq!(progress.target_weight, Some(65.0));
        let change = progress.weight_change_percent.unwrap();
        assert!((change + 4.0).abs() < 0.001);
        let bmi = progress.bmi.unwrap();
        assert!((bmi - 30.0).abs() < 0.001);
    }
}
