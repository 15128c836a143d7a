use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{nanos_to_date, FollowupTask, MemberProfile, TaskStatus};

const PRIORITY_ACTION_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskBoard<'a> {
    pub due_today: Vec<&'a FollowupTask>,
    pub overdue: Vec<&'a FollowupTask>,
    pub completed: Vec<&'a FollowupTask>,
}

impl<'a> TaskBoard<'a> {
    pub fn from_tasks(tasks: &'a [FollowupTask]) -> Self {
        let mut board = TaskBoard::default();
        for task in tasks {
            match task.status {
                TaskStatus::DueToday => board.due_today.push(task),
                TaskStatus::Overdue => board.overdue.push(task),
                TaskStatus::Completed => board.completed.push(task),
            }
        }
        board
    }

    /// Open follow-ups, overdue ones first.
    pub fn open(&self) -> impl Iterator<Item = &'a FollowupTask> + '_ {
        self.overdue.iter().chain(self.due_today.iter()).copied()
    }
}

pub fn derive_status(task: &FollowupTask, today: NaiveDate) -> TaskStatus {
    if task.completion_date.is_some() {
        TaskStatus::Completed
    } else if nanos_to_date(task.due_date) < today {
        TaskStatus::Overdue
    } else {
        TaskStatus::DueToday
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityAction {
    pub task_id: String,
    pub member_id: String,
    pub member_name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachDigest {
    pub overdue_count: usize,
    pub due_today_count: usize,
    pub priority_actions: Vec<PriorityAction>,
}

pub fn coach_digest(tasks: &[FollowupTask], members: &[MemberProfile]) -> CoachDigest {
    let board = TaskBoard::from_tasks(tasks);

    let priority_actions = board
        .overdue
        .iter()
        .take(PRIORITY_ACTION_LIMIT)
        .map(|task| PriorityAction {
            task_id: task.id.clone(),
            member_id: task.member_id.clone(),
            member_name: members
                .iter()
                .find(|member| member.id == task.member_id)
                .map(|member| member.name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            description: task.description.clone(),
        })
        .collect();

    CoachDigest {
        overdue_count: board.overdue.len(),
        due_today_count: board.due_today.len(),
        priority_actions,
    }
}
