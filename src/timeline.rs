//! Member activity timeline.
//!
//! Merges a member's daily and weekly check-ins, coach notes and WhatsApp
//! message logs with the broadcast announcements into one feed, newest first.
//! Everything here is a pure function of its arguments; the only ambient input
//! is the wall clock used by [`build_timeline`] for unscheduled announcements.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::models::{
    format_millis, nanos_to_millis, Announcement, CoachNote, DailyCheckin, MessageLog, WeeklyCheckin,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineKind {
    Daily,
    Weekly,
    Note,
    Message,
    Announcement,
}

impl TimelineKind {
    pub const ALL: [TimelineKind; 5] = [
        TimelineKind::Daily,
        TimelineKind::Weekly,
        TimelineKind::Note,
        TimelineKind::Message,
        TimelineKind::Announcement,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimelineKind::Daily => "daily",
            TimelineKind::Weekly => "weekly",
            TimelineKind::Note => "note",
            TimelineKind::Message => "message",
            TimelineKind::Announcement => "announcement",
        }
    }
}

impl fmt::Display for TimelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimelineFilter {
    #[default]
    All,
    Kind(TimelineKind),
}

impl TimelineFilter {
    pub fn matches(self, kind: TimelineKind) -> bool {
        match self {
            TimelineFilter::All => true,
            TimelineFilter::Kind(wanted) => wanted == kind,
        }
    }
}

impl FromStr for TimelineFilter {
    type Err = DataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "all" {
            return Ok(TimelineFilter::All);
        }

        TimelineKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .map(TimelineFilter::Kind)
            .ok_or_else(|| DataError::UnknownTimelineFilter(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TimelineKind,
    pub timestamp_millis: i64,
    pub title: String,
    pub content: String,
}

impl fmt::Display for TimelineItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            format_millis(self.timestamp_millis),
            self.kind,
            self.title,
            self.content
        )
    }
}

impl From<&DailyCheckin> for TimelineItem {
    fn from(checkin: &DailyCheckin) -> Self {
        TimelineItem {
            id: checkin.id.clone(),
            kind: TimelineKind::Daily,
            timestamp_millis: nanos_to_millis(checkin.date),
            title: "Daily Check-in".to_string(),
            content: format!(
                "Compliance: {}/5, Mood: {}/5",
                checkin.compliance_score, checkin.mood_score
            ),
        }
    }
}

impl From<&WeeklyCheckin> for TimelineItem {
    fn from(checkin: &WeeklyCheckin) -> Self {
        TimelineItem {
            id: checkin.id.clone(),
            kind: TimelineKind::Weekly,
            timestamp_millis: nanos_to_millis(checkin.date),
            title: "Weekly Check-in".to_string(),
            content: format!("Weight: {} kg", checkin.weight),
        }
    }
}

impl From<&CoachNote> for TimelineItem {
    fn from(note: &CoachNote) -> Self {
        TimelineItem {
            id: note.id.clone(),
            kind: TimelineKind::Note,
            timestamp_millis: nanos_to_millis(note.timestamp),
            title: "Coach Note".to_string(),
            content: note.content.clone(),
        }
    }
}

impl From<&MessageLog> for TimelineItem {
    fn from(log: &MessageLog) -> Self {
        TimelineItem {
            id: log.id.clone(),
            kind: TimelineKind::Message,
            timestamp_millis: nanos_to_millis(log.timestamp),
            title: "WhatsApp Message".to_string(),
            content: format!("Template: {} - {}", log.template_id, log.status),
        }
    }
}

fn announcement_item(announcement: &Announcement, now_millis: i64) -> TimelineItem {
    TimelineItem {
        id: announcement.id.clone(),
        kind: TimelineKind::Announcement,
        timestamp_millis: announcement
            .scheduled_time
            .map(nanos_to_millis)
            .unwrap_or(now_millis),
        title: announcement.title.clone(),
        content: announcement.content.clone(),
    }
}

/// Builds the timeline for `member_id`, placing unscheduled announcements at
/// the current wall-clock time.
pub fn build_timeline(
    member_id: &str,
    daily: &[DailyCheckin],
    weekly: &[WeeklyCheckin],
    notes: &[CoachNote],
    messages: &[MessageLog],
    announcements: &[Announcement],
) -> Vec<TimelineItem> {
    build_timeline_at(
        Utc::now().timestamp_millis(),
        member_id,
        daily,
        weekly,
        notes,
        messages,
        announcements,
    )
}

/// Same as [`build_timeline`] with the fallback time for unscheduled
/// announcements supplied by the caller.
///
/// Member-scoped records are kept only when their `member_id` matches;
/// announcements are broadcast and always included. The result is sorted by
/// `timestamp_millis`, newest first. Ties keep input order, which callers
/// should not rely on.
pub fn build_timeline_at(
    now_millis: i64,
    member_id: &str,
    daily: &[DailyCheckin],
    weekly: &[WeeklyCheckin],
    notes: &[CoachNote],
    messages: &[MessageLog],
    announcements: &[Announcement],
) -> Vec<TimelineItem> {
    let mut items: Vec<TimelineItem> = daily
        .iter()
        .filter(|checkin| checkin.member_id == member_id)
        .map(TimelineItem::from)
        .chain(
            weekly
                .iter()
                .filter(|checkin| checkin.member_id == member_id)
                .map(TimelineItem::from),
        )
        .chain(
            notes
                .iter()
                .filter(|note| note.member_id == member_id)
                .map(TimelineItem::from),
        )
        .chain(
            messages
                .iter()
                .filter(|log| log.member_id == member_id)
                .map(TimelineItem::from),
        )
        .chain(
            announcements
                .iter()
                .map(|announcement| announcement_item(announcement, now_millis)),
        )
        .collect();

    items.sort_by(|a, b| b.timestamp_millis.cmp(&a.timestamp_millis));

    tracing::debug!(member_id, items = items.len(), "built member timeline");
    items
}

/// Returns the items matching `filter`, keeping their order.
pub fn filter_by_type(items: &[TimelineItem], filter: TimelineFilter) -> Vec<TimelineItem> {
    items
        .iter()
        .filter(|item| filter.matches(item.kind))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NOW: i64 = 1_800_000_000_000;

    fn daily(id: &str, member_id: &str, date: i64, compliance: i32, mood: i32) -> DailyCheckin {
        DailyCheckin {
            id: id.to_string(),
            member_id: member_id.to_string(),
            date,
            compliance_score: compliance,
            mood_score: mood,
            digestion_score: 3,
            water_intake: 2.5,
            workout_minutes: 30,
            steps: 8000,
            sleep_hours: 7.5,
            notes: None,
        }
    }

    fn weekly(id: &str, member_id: &str, date: i64, weight: f64) -> WeeklyCheckin {
        WeeklyCheckin {
            id: id.to_string(),
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

    fn note(id: &str, member_id: &str, timestamp: i64, content: &str) -> CoachNote {
        CoachNote {
            id: id.to_string(),
            member_id: member_id.to_string(),
            timestamp,
            content: content.to_string(),
        }
    }

    fn message(id: &str, member_id: &str, timestamp: i64) -> MessageLog {
        MessageLog {
            id: id.to_string(),
            member_id: member_id.to_string(),
            template_id: "daily_reminder".to_string(),
            status: "sent".to_string(),
            timestamp,
        }
    }

    fn announcement(id: &str, scheduled_time: Option<i64>) -> Announcement {
        Announcement {
            id: id.to_string(),
            title: "Hydration week".to_string(),
            content: "Two litres a day".to_string(),
            scheduled_time,
            published: true,
            target_segment: "all".to_string(),
        }
    }

    #[test]
    fn keeps_only_the_member_and_orders_newest_first() {
        let daily = vec![
            daily("d1", "m1", 1_700_000_000_000_000_000, 4, 5),
            daily("d2", "m2", 1_700_000_050_000_000_000, 1, 1),
        ];
        let notes = vec![note("n1", "m1", 1_700_000_100_000_000_000, "Doing well")];

        let items = build_timeline_at(NOW, "m1", &daily, &[], &notes, &[], &[]);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "n1");
        assert_eq!(items[0].kind, TimelineKind::Note);
        assert_eq!(items[0].title, "Coach Note");
        assert_eq!(items[0].content, "Doing well");
        assert_eq!(items[0].timestamp_millis, 1_700_000_100_000);
        assert_eq!(items[1].id, "d1");
        assert_eq!(items[1].title, "Daily Check-in");
        assert_eq!(items[1].content, "Compliance: 4/5, Mood: 5/5");
    }

    #[test]
    fn projects_weekly_and_message_records() {
        let weekly = vec![weekly("w1", "m1", 2_000_000_000, 81.5)];
        let messages = vec![message("msg1", "m1", 1_000_000_000)];

        let items = build_timeline_at(NOW, "m1", &[], &weekly, &[], &messages, &[]);

        assert_eq!(items[0].title, "Weekly Check-in");
        assert_eq!(items[0].content, "Weight: 81.5 kg");
        assert_eq!(items[0].timestamp_millis, 2_000);
        assert_eq!(items[1].title, "WhatsApp Message");
        assert_eq!(items[1].content, "Template: daily_reminder - sent");
    }

    #[test]
    fn includes_announcements_for_every_member() {
        let announcements = vec![
            announcement("a1", Some(5_000_000_000)),
            announcement("a2", None),
        ];

        let items = build_timeline_at(NOW, "nobody", &[], &[], &[], &[], &announcements);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "a2");
        assert_eq!(items[0].timestamp_millis, NOW);
        assert_eq!(items[0].title, "Hydration week");
        assert_eq!(items[0].content, "Two litres a day");
        assert_eq!(items[1].timestamp_millis, 5_000);
    }

    #[test]
    fn empty_inputs_yield_an_empty_timeline() {
        let items = build_timeline("m1", &[], &[], &[], &[], &[]);
        assert!(items.is_empty());
    }

    #[test]
    fn unmatched_member_yields_an_empty_timeline() {
        let daily = vec![daily("d1", "m2", 1, 3, 3)];
        let items = build_timeline_at(NOW, "m1", &daily, &[], &[], &[], &[]);
        assert!(items.is_empty());
    }

    #[test]
    fn parses_filters() {
        assert_eq!("all".parse::<TimelineFilter>(), Ok(TimelineFilter::All));
        assert_eq!(
            "message".parse::<TimelineFilter>(),
            Ok(TimelineFilter::Kind(TimelineKind::Message))
        );
        assert_eq!(
            "Daily".parse::<TimelineFilter>(),
            Err(DataError::UnknownTimelineFilter("Daily".to_string()))
        );
    }

    #[test]
    fn filter_keeps_order_of_matching_items() {
        let daily = vec![daily("d1", "m1", 3_000_000, 3, 3), daily("d2", "m1", 1_000_000, 2, 2)];
        let notes = vec![note("n1", "m1", 2_000_000, "check sleep")];
        let items = build_timeline_at(NOW, "m1", &daily, &[], &notes, &[], &[]);

        let only_daily = filter_by_type(&items, TimelineFilter::Kind(TimelineKind::Daily));
        let ids: Vec<&str> = only_daily.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d2"]);

        assert_eq!(filter_by_type(&items, TimelineFilter::All), items);
        assert!(filter_by_type(&items, TimelineFilter::Kind(TimelineKind::Weekly)).is_empty());
    }

    #[test]
    fn serializes_kind_under_type_key() {
        let item = TimelineItem::from(&note("n1", "m1", 7_000_000, "hi"));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "note");
        assert_eq!(json["timestampMillis"], 7);
    }

    #[test]
    fn displays_as_a_dated_line() {
        let item = TimelineItem::from(&note("n1", "m1", 1_700_000_000_000_000_000, "Sleep improving"));
        assert_eq!(
            item.to_string(),
            "2023-11-14 22:13 [note] Coach Note: Sleep improving"
        );
    }

    fn member_strategy() -> impl Strategy<Value = String> {
        prop_oneof![Just("m1".to_string()), Just("m2".to_string())]
    }

    fn daily_strategy() -> impl Strategy<Value = Vec<DailyCheckin>> {
        prop::collection::vec(
            (member_strategy(), any::<i64>(), 1..=5i32, 1..=5i32),
            0..12,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (member, date, compliance, mood))| {
                    daily(&format!("d{i}"), &member, date, compliance, mood)
                })
                .collect()
        })
    }

    fn weekly_strategy() -> impl Strategy<Value = Vec<WeeklyCheckin>> {
        prop::collection::vec((member_strategy(), any::<i64>(), 40.0..160.0f64), 0..12).prop_map(
            |rows| {
                rows.into_iter()
                    .enumerate()
                    .map(|(i, (member, date, weight))| weekly(&format!("w{i}"), &member, date, weight))
                    .collect()
            },
        )
    }

    fn note_strategy() -> impl Strategy<Value = Vec<CoachNote>> {
        prop::collection::vec((member_strategy(), any::<i64>()), 0..12).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (member, timestamp))| note(&format!("n{i}"), &member, timestamp, "note"))
                .collect()
        })
    }

    fn message_strategy() -> impl Strategy<Value = Vec<MessageLog>> {
        prop::collection::vec((member_strategy(), any::<i64>()), 0..12).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (member, timestamp))| message(&format!("m{i}"), &member, timestamp))
                .collect()
        })
    }

    fn announcement_strategy() -> impl Strategy<Value = Vec<Announcement>> {
        prop::collection::vec(proptest::option::of(any::<i64>()), 0..6).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, scheduled)| announcement(&format!("a{i}"), scheduled))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn timeline_properties_hold(
            daily in daily_strategy(),
            weekly in weekly_strategy(),
            notes in note_strategy(),
            messages in message_strategy(),
            announcements in announcement_strategy(),
        ) {
            let items = build_timeline_at(NOW, "m1", &daily, &weekly, &notes, &messages, &announcements);

            let expected = daily.iter().filter(|c| c.member_id == "m1").count()
                + weekly.iter().filter(|c| c.member_id == "m1").count()
                + notes.iter().filter(|n| n.member_id == "m1").count()
                + messages.iter().filter(|m| m.member_id == "m1").count()
                + announcements.len();
            prop_assert_eq!(items.len(), expected);

            for pair in items.windows(2) {
                prop_assert!(pair[0].timestamp_millis >= pair[1].timestamp_millis);
            }

            prop_assert_eq!(filter_by_type(&items, TimelineFilter::All), items.clone());

            for kind in TimelineKind::ALL {
                let filtered = filter_by_type(&items, TimelineFilter::Kind(kind));
                prop_assert!(filtered.iter().all(|item| item.kind == kind));
                let expected_order: Vec<&TimelineItem> =
                    items.iter().filter(|item| item.kind == kind).collect();
                let actual_order: Vec<&TimelineItem> = filtered.iter().collect();
                prop_assert_eq!(actual_order, expected_order);
            }

            let again = build_timeline_at(NOW, "m1", &daily, &weekly, &notes, &messages, &announcements);
            prop_assert_eq!(again, items);
        }
    }
}
