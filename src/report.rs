use std::fmt::Write;

use crate::models::{nanos_to_date, MemberProfile};
use crate::progress::MemberProgress;
use crate::tasks::TaskBoard;
use crate::timeline::TimelineItem;

pub fn build_member_report(
    profile: &MemberProfile,
    progress: &MemberProgress,
    timeline: &[TimelineItem],
    tasks: &TaskBoard<'_>,
    limit: usize,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Member Report: {}", profile.name);
    let _ = writeln!(
        output,
        "Program {} ({} consent)",
        profile.program_type,
        profile.consent_status.as_str()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Progress");
    let _ = writeln!(output, "- Check-ins recorded: {}", progress.checkin_streak);
    let _ = writeln!(output, "- Starting weight: {} kg", progress.starting_weight);
    let _ = writeln!(output, "- Current weight: {} kg", progress.current_weight);
    if let Some(target) = progress.target_weight {
        let _ = writeln!(output, "- Target weight: {} kg", target);
    }
    match progress.weight_change_percent {
        Some(change) => {
            let _ = writeln!(output, "- Total change: {:.1}%", change);
        }
        None => {
            let _ = writeln!(output, "- Total change: N/A");
        }
    }
    match progress.bmi {
        Some(bmi) => {
            let _ = writeln!(output, "- BMI: {:.1}", bmi);
        }
        None => {
            let _ = writeln!(output, "- BMI: N/A");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Activity");

    if timeline.is_empty() {
        let _ = writeln!(output, "No timeline items");
    } else {
        for item in timeline.iter().take(limit) {
            let _ = writeln!(output, "- {item}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Open Follow-ups");

    let mut open = tasks.open().peekable();
    if open.peek().is_none() {
        let _ = writeln!(output, "No open follow-ups.");
    } else {
        for task in open {
            let _ = writeln!(
                output,
                "- {} (due {}, {})",
                task.description,
                nanos_to_date(task.due_date),
                task.status
            );
        }
    }

    output
}
