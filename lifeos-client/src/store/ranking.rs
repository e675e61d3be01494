/// Task ranking
///
/// "Next task" order: pending only, priority descending, then oldest first,
/// then by id so the choice never depends on fetch order.

use lifeos_shared::models::Task;
use std::cmp::Ordering;

/// Total order used to pick the next task
pub fn next_task_order(a: &Task, b: &Task) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Highest-ranked pending task
pub fn next_task(tasks: &[Task]) -> Option<&Task> {
    tasks
        .iter()
        .filter(|t| t.is_pending())
        .min_by(|a, b| next_task_order(a, b))
}

/// Stable sort by priority, highest first
///
/// Tasks of equal priority keep their incoming order.
pub fn sort_by_priority<T: std::borrow::Borrow<Task>>(tasks: &mut [T]) {
    tasks.sort_by(|a, b| b.borrow().priority.cmp(&a.borrow().priority));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use lifeos_shared::models::{Category, Priority, TaskStatus};
    use uuid::Uuid;

    fn task(title: &str, priority: u8, age_minutes: i64, status: TaskStatus) -> Task {
        let created_at = Utc::now() - Duration::minutes(age_minutes);
        Task {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            title: title.to_string(),
            priority: Priority::new(priority).unwrap(),
            category: Category::Personal,
            status,
            created_at,
            completed_at: (status == TaskStatus::Completed).then_some(created_at),
        }
    }

    #[test]
    fn test_next_task_highest_priority() {
        let tasks = vec![
            task("low", 2, 10, TaskStatus::Pending),
            task("high", 5, 1, TaskStatus::Pending),
            task("mid", 3, 20, TaskStatus::Pending),
        ];
        assert_eq!(next_task(&tasks).unwrap().title, "high");
    }

    #[test]
    fn test_next_task_tie_goes_to_oldest() {
        let tasks = vec![
            task("newer", 4, 1, TaskStatus::Pending),
            task("older", 4, 30, TaskStatus::Pending),
        ];
        assert_eq!(next_task(&tasks).unwrap().title, "older");
    }

    #[test]
    fn test_next_task_skips_completed() {
        let tasks = vec![
            task("done", 5, 10, TaskStatus::Completed),
            task("todo", 1, 5, TaskStatus::Pending),
        ];
        assert_eq!(next_task(&tasks).unwrap().title, "todo");
    }

    #[test]
    fn test_next_task_none() {
        assert!(next_task(&[]).is_none());
        assert!(next_task(&[task("done", 5, 1, TaskStatus::Completed)]).is_none());
    }

    #[test]
    fn test_next_task_full_tie_is_deterministic() {
        let mut a = task("a", 3, 5, TaskStatus::Pending);
        let mut b = a.clone();
        a.id = Uuid::from_u128(2);
        b.id = Uuid::from_u128(1);
        b.title = "b".to_string();

        assert_eq!(next_task(&[a.clone(), b.clone()]).unwrap().title, "b");
        assert_eq!(next_task(&[b, a]).unwrap().title, "b");
    }

    #[test]
    fn test_sort_by_priority_is_stable() {
        let mut tasks = vec![
            task("p3-first", 3, 1, TaskStatus::Pending),
            task("p5", 5, 2, TaskStatus::Pending),
            task("p3-second", 3, 3, TaskStatus::Pending),
        ];
        sort_by_priority(&mut tasks);

        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["p5", "p3-first", "p3-second"]);
    }
}
