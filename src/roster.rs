use std::collections::HashSet;

use chrono::{Duration, NaiveDate};

use crate::models::{
    nanos_to_date, nanos_to_millis, Announcement, ConsentStatus, DailyCheckin, MemberProfile,
};

pub fn search_members<'a>(members: &'a [MemberProfile], query: &str) -> Vec<&'a MemberProfile> {
    let needle = query.trim().to_lowercase();
    members
        .iter()
        .filter(|member| {
            needle.is_empty()
                || member.name.to_lowercase().contains(&needle)
                || member.program_type.to_lowercase().contains(&needle)
                || member.id.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Members who opted into daily reminders and have not checked in on `today`.
pub fn reminder_queue<'a>(
    members: &'a [MemberProfile],
    daily: &[DailyCheckin],
    today: NaiveDate,
) -> Vec<&'a MemberProfile> {
    let checked_in: HashSet<&str> = daily
        .iter()
        .filter(|checkin| nanos_to_date(checkin.date) == today)
        .map(|checkin| checkin.member_id.as_str())
        .collect();

    members
        .iter()
        .filter(|member| {
            member.consent_status == ConsentStatus::Active
                && member.reminder_preference.wants_daily()
                && !checked_in.contains(member.id.as_str())
        })
        .collect()
}

/// Distinct members with a daily check-in in the seven days before `now_millis`.
pub fn active_this_week(daily: &[DailyCheckin], now_millis: i64) -> HashSet<&str> {
    let week_ago = now_millis - Duration::days(7).num_milliseconds();
    daily
        .iter()
        .filter(|checkin| nanos_to_millis(checkin.date) > week_ago)
        .map(|checkin| checkin.member_id.as_str())
        .collect()
}

pub fn published_announcements(announcements: &[Announcement]) -> Vec<&Announcement> {
    announcements
        .iter()
        .filter(|announcement| announcement.published)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub content: &'static str,
}

impl MessageTemplate {
    pub fn render(&self, member_name: &str) -> String {
        self.content.replace("{{name}}", member_name)
    }

    pub fn find(id: &str) -> Option<&'static MessageTemplate> {
        MESSAGE_TEMPLATES.iter().find(|template| template.id == id)
    }
}

pub static MESSAGE_TEMPLATES: [MessageTemplate; 4] = [
    MessageTemplate {
        id: "weekly_followup",
        name: "Weekly Follow-up",
        content: "Hi {{name}} 😊 Quick follow-up for this week. Please update your weight + waist and share how your energy and digestion were. I'm here to help you stay on track 💪",
    },
    MessageTemplate {
        id: "daily_reminder",
        name: "Daily Check-in Reminder",
        content: "Hi {{name}} 👋 30-sec check-in time! Reply in the app (water, workout, sleep, mood). Small steps daily = big change 🌿",
    },
    MessageTemplate {
        id: "missed_checkin",
        name: "Missed Check-in",
        content: "Hi {{name}} 😊 Noticed no update today. Just reply with 1–5 for compliance and 1 line on how you feel.",
    },
    MessageTemplate {
        id: "congrats",
        name: "Congratulations",
        content: "Proud of you {{name}} 🎉 Your consistency is showing. Keep going, one day at a time!",
    },
];
