#![forbid(unsafe_code)]

//! Drag gesture reconciliation.
//!
//! A gesture has two phases with distinct semantics. Drag-over fires
//! repeatedly while hovering and only previews state in memory; drag-end
//! fires once and yields the writes to persist. Nothing here touches the
//! store: callers apply the returned [`StoreWrite`]s however they like
//! (the TUI spawns them fire-and-forget).

use crate::board::BoardState;
use crate::task::model::{TaskPatch, TaskStatus};

/// What the pointer is over. A gesture event carries `Option<DropTarget>`;
/// `None` means outside any droppable region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    Column(TaskStatus),
    Task(String),
}

/// State captured when a card is picked up.
///
/// `origin` is the column the task sat in at that moment, i.e. the status
/// the backend last saw. Intermediate drag-over steps rewrite the task's
/// in-memory status to whatever column it is previewed in, so the terminal
/// status write is decided against this captured value, not the live field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragGesture {
    task_id: String,
    origin: TaskStatus,
}

impl DragGesture {
    /// Starts a gesture for the given task. `None` if the board does not
    /// hold the task.
    #[must_use]
    pub fn begin(board: &BoardState, task_id: &str) -> Option<Self> {
        let origin = board.column_of_task(task_id)?;
        Some(Self {
            task_id: task_id.to_owned(),
            origin,
        })
    }

    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    #[must_use]
    pub fn origin(&self) -> TaskStatus {
        self.origin
    }
}

/// One pending backend call. Order and status changes are deliberately
/// separate writes with no transaction around them; a failure of one does
/// not roll back the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreWrite {
    pub task_id: String,
    pub patch: TaskPatch,
}

/// Resolves the column a drop target refers to: the column itself, or the
/// column currently containing the target task.
#[must_use]
pub fn resolve_over_column(board: &BoardState, over: &DropTarget) -> Option<TaskStatus> {
    match over {
        DropTarget::Column(status) => Some(*status),
        DropTarget::Task(id) => board.column_of_task(id),
    }
}

/// Intermediate drag-over step. Purely optimistic: when the dragged task
/// hovers over a different column it is relocated to the end of that
/// column (status rewritten in memory only). Returns whether the board
/// changed, so callers can skip redundant re-renders while the pointer
/// stays put.
pub fn drag_over(board: &mut BoardState, gesture: &DragGesture, over: Option<&DropTarget>) -> bool {
    let Some(over) = over else {
        return false;
    };
    // Membership lookup, not a stored pointer: a prior drag-over may have
    // already relocated the task.
    let Some(active_column) = board.column_of_task(gesture.task_id()) else {
        return false;
    };
    let Some(over_column) = resolve_over_column(board, over) else {
        return false;
    };
    if active_column == over_column {
        return false;
    }
    board.move_between_columns(gesture.task_id(), active_column, over_column)
}

/// Terminal drag-end step. Mutates the board for any final within-column
/// reorder and returns the writes to persist:
///
/// - an `order` write when the task landed on a different index within its
///   final column (the persisted value is the new positional index);
/// - a `status` write when the final column differs from the gesture's
///   origin column.
///
/// `over = None` is a cancelled gesture: no state change, no writes.
pub fn drag_end(
    board: &mut BoardState,
    gesture: &DragGesture,
    over: Option<&DropTarget>,
) -> Vec<StoreWrite> {
    let Some(over) = over else {
        return Vec::new();
    };
    let Some(active_column) = board.column_of_task(gesture.task_id()) else {
        return Vec::new();
    };

    let mut writes = Vec::new();

    let old_index = board.index_in_column(active_column, gesture.task_id());
    let new_index = match over {
        // Dropping on a column body, or on a task that is not (or no
        // longer) in the active column, needs no reordering.
        DropTarget::Column(_) => None,
        DropTarget::Task(over_id) => board.index_in_column(active_column, over_id),
    };

    if let (Some(old_index), Some(new_index)) = (old_index, new_index)
        && old_index != new_index
        && board.reorder_within_column(active_column, old_index, new_index)
    {
        writes.push(StoreWrite {
            task_id: gesture.task_id().to_owned(),
            patch: TaskPatch {
                order: Some(i64::try_from(new_index).unwrap_or(i64::MAX)),
                ..TaskPatch::default()
            },
        });
    }

    if active_column != gesture.origin() {
        writes.push(StoreWrite {
            task_id: gesture.task_id().to_owned(),
            patch: TaskPatch {
                status: Some(active_column),
                ..TaskPatch::default()
            },
        });
    }

    writes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::test_support::task;

    fn ids(board: &BoardState, column: TaskStatus) -> Vec<String> {
        board
            .column(column)
            .tasks
            .iter()
            .map(|t| t.id.clone())
            .collect()
    }

    /// Three tasks in TODO; dragging the middle one over IN_PROGRESS moves
    /// it there in memory, and drag-end persists exactly one status update.
    #[test]
    fn cross_column_drag_previews_then_persists_status_once() {
        let mut board = BoardState::load(vec![
            task("t1", TaskStatus::Todo, 1),
            task("t2", TaskStatus::Todo, 2),
            task("t3", TaskStatus::Todo, 3),
        ]);
        let gesture = DragGesture::begin(&board, "t2").unwrap();

        let over = DropTarget::Column(TaskStatus::InProgress);
        assert!(drag_over(&mut board, &gesture, Some(&over)));

        assert_eq!(ids(&board, TaskStatus::Todo), ["t1", "t3"]);
        assert_eq!(ids(&board, TaskStatus::InProgress), ["t2"]);
        assert_eq!(
            board.task("t2").unwrap().status,
            TaskStatus::InProgress
        );
        // Orders untouched in memory.
        assert_eq!(board.task("t1").unwrap().order, 1);
        assert_eq!(board.task("t3").unwrap().order, 3);

        let writes = drag_end(&mut board, &gesture, Some(&over));
        assert_eq!(
            writes,
            vec![StoreWrite {
                task_id: "t2".to_owned(),
                patch: TaskPatch {
                    status: Some(TaskStatus::InProgress),
                    ..TaskPatch::default()
                },
            }]
        );
    }

    /// TODO holds [a, b, c]; dropping `a` onto `c` yields [b, c, a] and one
    /// order write with the post-move index.
    #[test]
    fn within_column_drop_reorders_and_persists_positional_index() {
        let mut board = BoardState::load(vec![
            task("a", TaskStatus::Todo, 1),
            task("b", TaskStatus::Todo, 2),
            task("c", TaskStatus::Todo, 3),
        ]);
        let gesture = DragGesture::begin(&board, "a").unwrap();

        let over = DropTarget::Task("c".to_owned());
        // Same column: drag-over carries no cross-column information.
        assert!(!drag_over(&mut board, &gesture, Some(&over)));

        let writes = drag_end(&mut board, &gesture, Some(&over));
        assert_eq!(ids(&board, TaskStatus::Todo), ["b", "c", "a"]);
        assert_eq!(
            writes,
            vec![StoreWrite {
                task_id: "a".to_owned(),
                patch: TaskPatch {
                    order: Some(2),
                    ..TaskPatch::default()
                },
            }]
        );
    }

    /// Dropping outside any droppable region cancels the gesture.
    #[test]
    fn drop_outside_any_target_is_a_noop() {
        let mut board = BoardState::load(vec![
            task("a", TaskStatus::Todo, 1),
            task("b", TaskStatus::Todo, 2),
        ]);
        let gesture = DragGesture::begin(&board, "a").unwrap();
        let before = board.clone();

        assert!(!drag_over(&mut board, &gesture, None));
        let writes = drag_end(&mut board, &gesture, None);

        assert!(writes.is_empty());
        assert_eq!(board, before);
    }

    #[test]
    fn drop_on_itself_produces_no_write() {
        let mut board = BoardState::load(vec![
            task("a", TaskStatus::Todo, 1),
            task("b", TaskStatus::Todo, 2),
        ]);
        let gesture = DragGesture::begin(&board, "a").unwrap();

        let over = DropTarget::Task("a".to_owned());
        let writes = drag_end(&mut board, &gesture, Some(&over));
        assert!(writes.is_empty());
        assert_eq!(ids(&board, TaskStatus::Todo), ["a", "b"]);
    }

    /// Hovering over a task resolves to that task's column.
    #[test]
    fn drag_over_resolves_column_through_target_task() {
        let mut board = BoardState::load(vec![
            task("a", TaskStatus::Todo, 1),
            task("x", TaskStatus::Done, 1),
        ]);
        let gesture = DragGesture::begin(&board, "a").unwrap();

        let over = DropTarget::Task("x".to_owned());
        assert!(drag_over(&mut board, &gesture, Some(&over)));
        assert_eq!(ids(&board, TaskStatus::Done), ["x", "a"]);
        assert_eq!(board.task("a").unwrap().status, TaskStatus::Done);
    }

    /// Repeated drag-over events against the same destination change
    /// nothing after the first one.
    #[test]
    fn repeated_drag_over_is_idempotent() {
        let mut board = BoardState::load(vec![
            task("a", TaskStatus::Todo, 1),
            task("b", TaskStatus::Todo, 2),
        ]);
        let gesture = DragGesture::begin(&board, "a").unwrap();
        let over = DropTarget::Column(TaskStatus::InProgress);

        assert!(drag_over(&mut board, &gesture, Some(&over)));
        let once = board.clone();
        assert!(!drag_over(&mut board, &gesture, Some(&over)));
        assert!(!drag_over(&mut board, &gesture, Some(&over)));
        assert_eq!(board, once);
    }

    /// Crossing columns and landing on a task there produces both writes,
    /// as two independent entries.
    #[test]
    fn cross_column_drop_on_task_emits_order_and_status_writes() {
        let mut board = BoardState::load(vec![
            task("a", TaskStatus::Todo, 1),
            task("x", TaskStatus::InProgress, 1),
            task("y", TaskStatus::InProgress, 2),
        ]);
        let gesture = DragGesture::begin(&board, "a").unwrap();

        let hover = DropTarget::Task("x".to_owned());
        assert!(drag_over(&mut board, &gesture, Some(&hover)));
        assert_eq!(ids(&board, TaskStatus::InProgress), ["x", "y", "a"]);

        let writes = drag_end(&mut board, &gesture, Some(&hover));
        assert_eq!(ids(&board, TaskStatus::InProgress), ["a", "x", "y"]);
        assert_eq!(writes.len(), 2);
        assert_eq!(
            writes[0].patch.order,
            Some(0),
            "order write carries the post-move index"
        );
        assert_eq!(writes[1].patch.status, Some(TaskStatus::InProgress));
    }

    #[test]
    fn gesture_for_unknown_task_cannot_begin() {
        let board = BoardState::load(vec![task("a", TaskStatus::Todo, 1)]);
        assert!(DragGesture::begin(&board, "ghost").is_none());
    }
}
