#![forbid(unsafe_code)]

pub mod json;
pub mod memory;

use crate::task::model::{Task, TaskDraft, TaskPatch};

/// Persistence contract for tasks.
///
/// Every operation either succeeds or degrades to a sentinel (empty list,
/// `None`, `false`). Implementations absorb their own failures and log to
/// stderr; no error crosses this boundary into the reconciliation core.
pub trait TaskStore: Send + Sync {
    /// All tasks, ascending by `order` (ties by `created_at`, then id),
    /// restricted to `owner` when given. Empty on failure.
    fn list(&self, owner: Option<&str>) -> Vec<Task>;

    /// Creates a task from a draft. The store assigns id, timestamps,
    /// `TODO` status, the next order slot in TODO, and the owner.
    fn create(&self, draft: TaskDraft, owner: Option<&str>) -> Option<Task>;

    /// Partial update; unset patch fields are left unchanged. Returns the
    /// updated task, or `None` on failure or unknown id. Not owner-filtered.
    fn update(&self, id: &str, patch: TaskPatch) -> Option<Task>;

    /// Deletes by id. `true` only when the task existed and is gone.
    /// Not owner-filtered.
    fn delete(&self, id: &str) -> bool;
}

/// Sort used by `list`: persisted order first, creation time and id as
/// tie-breakers so repeated loads are stable.
pub(crate) fn sort_for_listing(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Next `order` for a newly created TODO task given the current task set.
pub(crate) fn next_todo_order(tasks: &[Task]) -> i64 {
    tasks
        .iter()
        .filter(|t| t.status == crate::task::model::TaskStatus::Todo)
        .map(|t| t.order)
        .max()
        .unwrap_or(0)
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::test_support::task;
    use crate::task::model::TaskStatus;

    #[test]
    fn listing_sort_is_order_then_created_then_id() {
        let mut a = task("a", TaskStatus::Todo, 2);
        let mut b = task("b", TaskStatus::Todo, 1);
        let mut c = task("c", TaskStatus::Done, 1);
        a.created_at = "2026-01-02T00:00:00Z".to_owned();
        b.created_at = "2026-01-01T00:00:00Z".to_owned();
        c.created_at = "2026-01-01T00:00:00Z".to_owned();

        let mut tasks = vec![a, b, c];
        sort_for_listing(&mut tasks);
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn todo_order_counts_only_todo_column() {
        let tasks = vec![
            task("a", TaskStatus::Done, 9),
            task("b", TaskStatus::Todo, 3),
        ];
        assert_eq!(next_todo_order(&tasks), 4);
        assert_eq!(next_todo_order(&[]), 1);
    }
}
