//! Dashboard statistics.

use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;

use crate::attendance::AttendanceRecord;
use crate::directory::Employee;
use crate::util;
use crate::workflow::{Task, TaskStatus};

const ACTIVITY_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCount {
    pub date: String,
    pub completed: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Completion timestamps inside the window, oldest first
    pub completed_at: Vec<i64>,
    /// One bucket per calendar day, ending today
    pub days: Vec<DayCount>,
}

/// Completed-task activity for the last seven days.
pub fn activity(tasks: &[Task], now: i64) -> Activity {
    let since = now - ACTIVITY_WINDOW_DAYS * 24 * 60 * 60 * 1000;
    let mut completed_at: Vec<i64> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .map(Task::last_touched)
        .filter(|ts| *ts >= since && *ts <= now)
        .collect();
    completed_at.sort_unstable();

    let today = util::local_date_of(now)
        .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
        .unwrap_or_else(|| Local::now().date_naive());
    let days = (0..ACTIVITY_WINDOW_DAYS)
        .rev()
        .map(|back| {
            let date = (today - Duration::days(back)).format("%Y-%m-%d").to_string();
            let completed = completed_at
                .iter()
                .filter(|ts| util::local_date_of(**ts).as_deref() == Some(date.as_str()))
                .count();
            DayCount { date, completed }
        })
        .collect();

    Activity { completed_at, days }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub active_tasks: usize,
    pub awaiting_hr: usize,
    pub active_employees: usize,
    pub online_employees: usize,
    pub present_today: usize,
    pub late_today: usize,
}

pub fn summary(
    tasks: &[Task],
    employees: &[Employee],
    attendance: &[AttendanceRecord],
    today: &str,
) -> Summary {
    let todays: Vec<&AttendanceRecord> = attendance.iter().filter(|r| r.date == today).collect();
    let mut present: Vec<&str> = todays.iter().map(|r| r.employee_id.as_str()).collect();
    present.sort_unstable();
    present.dedup();

    Summary {
        total_tasks: tasks.len(),
        completed_tasks: tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count(),
        active_tasks: tasks.iter().filter(|t| t.status.is_active()).count(),
        awaiting_hr: tasks.iter().filter(|t| crate::workflow::in_hr_queue(t)).count(),
        active_employees: employees.iter().filter(|e| e.is_active()).count(),
        online_employees: employees.iter().filter(|e| e.is_online).count(),
        present_today: present.len(),
        late_today: todays.iter().filter(|r| r.is_late).count(),
    }
}
