#![forbid(unsafe_code)]

use std::sync::Mutex;

use crate::store::{TaskStore, next_todo_order, sort_for_listing};
use crate::task::model::{Task, TaskDraft, TaskPatch, TaskStatus, now_rfc3339};

/// In-memory store for tests. Per-operation fail switches let tests drive
/// the sentinel degradation paths without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    tasks: Vec<Task>,
    fail: FailSwitches,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FailSwitches {
    pub list: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl MemoryTaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                tasks,
                fail: FailSwitches::default(),
            }),
        }
    }

    pub fn set_fail(&self, fail: FailSwitches) {
        self.lock().fail = fail;
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Only poisoned if a holder panicked; the task data is still usable.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl TaskStore for MemoryTaskStore {
    fn list(&self, owner: Option<&str>) -> Vec<Task> {
        let inner = self.lock();
        if inner.fail.list {
            eprintln!("task list failed: injected failure");
            return Vec::new();
        }
        let mut tasks: Vec<Task> = inner
            .tasks
            .iter()
            .filter(|t| owner.is_none_or(|o| t.user_id.as_deref() == Some(o)))
            .cloned()
            .collect();
        sort_for_listing(&mut tasks);
        tasks
    }

    fn create(&self, draft: TaskDraft, owner: Option<&str>) -> Option<Task> {
        let mut inner = self.lock();
        if inner.fail.create {
            eprintln!("task create failed: injected failure");
            return None;
        }
        let now = now_rfc3339();
        let owned: Vec<Task> = inner
            .tasks
            .iter()
            .filter(|t| owner.is_none() || t.user_id.as_deref() == owner)
            .cloned()
            .collect();
        let task = Task {
            id: Task::new_id(),
            title: draft.title,
            description: draft.description,
            status: TaskStatus::Todo,
            due_date: draft.due_date,
            tags: draft.tags,
            order: next_todo_order(&owned),
            created_at: now.clone(),
            updated_at: now,
            user_id: owner.map(str::to_owned),
        };
        inner.tasks.push(task.clone());
        Some(task)
    }

    fn update(&self, id: &str, patch: TaskPatch) -> Option<Task> {
        let mut inner = self.lock();
        if inner.fail.update {
            eprintln!("task update failed: injected failure");
            return None;
        }
        let task = inner.tasks.iter_mut().find(|t| t.id == id)?;
        patch.apply(task);
        task.updated_at = now_rfc3339();
        Some(task.clone())
    }

    fn delete(&self, id: &str) -> bool {
        let mut inner = self.lock();
        if inner.fail.delete {
            eprintln!("task delete failed: injected failure");
            return false;
        }
        let before = inner.tasks.len();
        inner.tasks.retain(|t| t.id != id);
        inner.tasks.len() != before
    }
}
