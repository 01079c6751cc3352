#![forbid(unsafe_code)]

pub mod drag;

use crate::task::model::{Task, TaskStatus};

/// One of the three fixed task groupings. Identity is the status enum;
/// `title` is only a display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub id: TaskStatus,
    pub title: String,
    pub tasks: Vec<Task>,
}

/// The in-memory source of truth for rendering: exactly three columns,
/// fixed identities, only their task sequences ever change.
///
/// Two invariants hold after every operation: a task's `status` field
/// equals the id of the column holding it, and every task sits in exactly
/// one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    columns: [Column; 3],
}

impl BoardState {
    /// Builds an empty board with the given column display titles, in the
    /// fixed TODO / IN_PROGRESS / DONE order.
    #[must_use]
    pub fn empty(titles: [String; 3]) -> Self {
        let [todo, in_progress, done] = titles;
        Self {
            columns: [
                Column {
                    id: TaskStatus::Todo,
                    title: todo,
                    tasks: Vec::new(),
                },
                Column {
                    id: TaskStatus::InProgress,
                    title: in_progress,
                    tasks: Vec::new(),
                },
                Column {
                    id: TaskStatus::Done,
                    title: done,
                    tasks: Vec::new(),
                },
            ],
        }
    }

    /// Partitions a flat task list into the three columns by status.
    /// Insertion order within each column follows the source sequence, so
    /// callers should hand in tasks already sorted by persisted `order`
    /// (the store's `list` does).
    #[must_use]
    pub fn load(tasks: Vec<Task>) -> Self {
        let mut board = Self::empty([
            TaskStatus::Todo.default_title().to_owned(),
            TaskStatus::InProgress.default_title().to_owned(),
            TaskStatus::Done.default_title().to_owned(),
        ]);
        board.replace_tasks(tasks);
        board
    }

    /// Re-fills the columns from a flat task list, keeping column titles.
    pub fn replace_tasks(&mut self, tasks: Vec<Task>) {
        for column in &mut self.columns {
            column.tasks.clear();
        }
        for task in tasks {
            let status = task.status;
            self.column_mut(status).tasks.push(task);
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[Column; 3] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, id: TaskStatus) -> &Column {
        &self.columns[Self::index_of(id)]
    }

    fn column_mut(&mut self, id: TaskStatus) -> &mut Column {
        &mut self.columns[Self::index_of(id)]
    }

    fn index_of(id: TaskStatus) -> usize {
        match id {
            TaskStatus::Todo => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Done => 2,
        }
    }

    /// Column currently holding the task, by membership lookup.
    #[must_use]
    pub fn column_of_task(&self, task_id: &str) -> Option<TaskStatus> {
        self.columns
            .iter()
            .find(|c| c.tasks.iter().any(|t| t.id == task_id))
            .map(|c| c.id)
    }

    #[must_use]
    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.columns
            .iter()
            .flat_map(|c| c.tasks.iter())
            .find(|t| t.id == task_id)
    }

    /// Index of a task within the column that holds it.
    #[must_use]
    pub fn index_in_column(&self, column: TaskStatus, task_id: &str) -> Option<usize> {
        self.column(column).tasks.iter().position(|t| t.id == task_id)
    }

    #[must_use]
    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }

    /// Next `order` value for a task appended to the column: one past the
    /// current maximum, 1 for an empty column.
    #[must_use]
    pub fn next_order(&self, column: TaskStatus) -> i64 {
        self.column(column)
            .tasks
            .iter()
            .map(|t| t.order)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Moves a task to the end of another column, rewriting its status to
    /// the destination identity. Same source and destination is a no-op
    /// (identity compared by status value); so is an id absent from the
    /// source column.
    pub fn move_between_columns(
        &mut self,
        task_id: &str,
        from: TaskStatus,
        to: TaskStatus,
    ) -> bool {
        if from == to {
            return false;
        }
        let source = self.column_mut(from);
        let Some(pos) = source.tasks.iter().position(|t| t.id == task_id) else {
            return false;
        };
        let mut task = source.tasks.remove(pos);
        task.status = to;
        self.column_mut(to).tasks.push(task);
        true
    }

    /// Remove-and-reinsert within one column. Out-of-bounds or equal
    /// indices are a silent no-op, not an error.
    pub fn reorder_within_column(
        &mut self,
        column: TaskStatus,
        from_index: usize,
        to_index: usize,
    ) -> bool {
        let tasks = &mut self.column_mut(column).tasks;
        if from_index == to_index || from_index >= tasks.len() || to_index >= tasks.len() {
            return false;
        }
        let task = tasks.remove(from_index);
        tasks.insert(to_index, task);
        true
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::task;
    use super::*;

    fn sample_board() -> BoardState {
        BoardState::load(vec![
            task("a", TaskStatus::Todo, 1),
            task("b", TaskStatus::Todo, 2),
            task("c", TaskStatus::Todo, 3),
            task("d", TaskStatus::InProgress, 1),
            task("e", TaskStatus::Done, 1),
        ])
    }

    fn ids(board: &BoardState, column: TaskStatus) -> Vec<String> {
        board
            .column(column)
            .tasks
            .iter()
            .map(|t| t.id.clone())
            .collect()
    }

    #[test]
    fn load_partitions_every_task_into_matching_column() {
        let board = sample_board();
        assert_eq!(board.task_count(), 5);
        for column in board.columns() {
            for t in &column.tasks {
                assert_eq!(t.status, column.id);
            }
        }
        assert_eq!(ids(&board, TaskStatus::Todo), ["a", "b", "c"]);
        assert_eq!(ids(&board, TaskStatus::InProgress), ["d"]);
        assert_eq!(ids(&board, TaskStatus::Done), ["e"]);
    }

    #[test]
    fn move_between_same_columns_is_noop() {
        let mut board = sample_board();
        let before = board.clone();
        assert!(!board.move_between_columns("a", TaskStatus::Todo, TaskStatus::Todo));
        assert_eq!(board, before);
    }

    #[test]
    fn move_between_columns_appends_and_rewrites_status() {
        let mut board = sample_board();
        assert!(board.move_between_columns("b", TaskStatus::Todo, TaskStatus::InProgress));

        assert_eq!(ids(&board, TaskStatus::Todo), ["a", "c"]);
        assert_eq!(ids(&board, TaskStatus::InProgress), ["d", "b"]);
        let moved = board.task("b").unwrap();
        assert_eq!(moved.status, TaskStatus::InProgress);
        // Orders are untouched in memory; only position changed.
        assert_eq!(moved.order, 2);
        assert_eq!(board.task_count(), 5);
    }

    #[test]
    fn move_is_idempotent_for_same_destination() {
        let mut board = sample_board();
        board.move_between_columns("b", TaskStatus::Todo, TaskStatus::Done);
        let once = board.clone();
        // Second call: source column no longer holds the task, so nothing
        // changes; a repeat from its current column is the same-column guard.
        assert!(!board.move_between_columns("b", TaskStatus::Todo, TaskStatus::Done));
        assert!(!board.move_between_columns("b", TaskStatus::Done, TaskStatus::Done));
        assert_eq!(board, once);
    }

    #[test]
    fn moving_last_task_leaves_column_empty() {
        let mut board = sample_board();
        assert!(board.move_between_columns("d", TaskStatus::InProgress, TaskStatus::Done));
        assert!(board.column(TaskStatus::InProgress).tasks.is_empty());
        assert_eq!(ids(&board, TaskStatus::Done), ["e", "d"]);
    }

    #[test]
    fn reorder_preserves_multiset_and_changes_order_only() {
        let mut board = sample_board();
        assert!(board.reorder_within_column(TaskStatus::Todo, 0, 2));
        assert_eq!(ids(&board, TaskStatus::Todo), ["b", "c", "a"]);

        let mut sorted = ids(&board, TaskStatus::Todo);
        sorted.sort();
        assert_eq!(sorted, ["a", "b", "c"]);
    }

    #[test]
    fn reorder_rejects_bad_indices_silently() {
        let mut board = sample_board();
        let before = board.clone();
        assert!(!board.reorder_within_column(TaskStatus::Todo, 1, 1));
        assert!(!board.reorder_within_column(TaskStatus::Todo, 0, 3));
        assert!(!board.reorder_within_column(TaskStatus::Todo, 5, 0));
        assert_eq!(board, before);
    }

    #[test]
    fn next_order_defaults_to_one_on_empty_column() {
        let board = BoardState::load(vec![task("z", TaskStatus::Done, 7)]);
        assert_eq!(board.next_order(TaskStatus::Todo), 1);
        assert_eq!(board.next_order(TaskStatus::Done), 8);
    }
}
