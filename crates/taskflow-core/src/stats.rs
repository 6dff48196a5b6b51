use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::task::Task;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    pub completion_rate: u32,
}

/// Aggregates over the full, unfiltered collection.
pub fn compute_stats(tasks: &[Task], today: NaiveDate) -> Stats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|task| task.completed).count();
    let overdue = tasks.iter().filter(|task| task.is_overdue(today)).count();

    Stats {
        total,
        completed,
        pending: total - completed,
        overdue,
        completion_rate: completion_rate(completed, total),
    }
}

// round half up, integer only
fn completion_rate(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let rate = (200 * completed + total) / (2 * total);
    u32::try_from(rate).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::task::{Priority, new_task_id};

    fn task(completed: bool, date: Option<NaiveDate>) -> Task {
        Task {
            id: new_task_id(),
            title: "t".to_string(),
            description: String::new(),
            date,
            priority: Priority::None,
            tags: vec![],
            completed,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            order: 0,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 15).unwrap()
    }

    #[test]
    fn empty_collection_has_zero_rate() {
        assert_eq!(compute_stats(&[], today()), Stats::default());
    }

    #[test]
    fn yesterday_is_overdue_only_while_incomplete() {
        let yesterday = today() - Duration::days(1);
        let open = compute_stats(&[task(false, Some(yesterday))], today());
        assert_eq!(open.overdue, 1);
        let done = compute_stats(&[task(true, Some(yesterday))], today());
        assert_eq!(done.overdue, 0);
    }

    #[test]
    fn today_and_undated_are_not_overdue() {
        let stats = compute_stats(&[task(false, Some(today())), task(false, None)], today());
        assert_eq!(stats.overdue, 0);
        assert_eq!(stats.pending, 2);
    }

    #[test]
    fn counts_and_rounds_rate() {
        let tasks = vec![task(true, None), task(false, None), task(false, None)];
        let stats = compute_stats(&tasks, today());
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.completion_rate, 33);

        let tasks = vec![task(true, None), task(true, None), task(false, None)];
        assert_eq!(compute_stats(&tasks, today()).completion_rate, 67);

        let tasks = vec![task(true, None), task(false, None)];
        assert_eq!(compute_stats(&tasks, today()).completion_rate, 50);
    }

    #[test]
    fn wire_names_are_camel_case() {
        let value = serde_json::to_value(Stats::default()).unwrap();
        assert!(value.get("completionRate").is_some());
    }
}
