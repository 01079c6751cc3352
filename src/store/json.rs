#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::store::{TaskStore, next_todo_order, sort_for_listing};
use crate::task::model::{Task, TaskDraft, TaskPatch, TaskStatus, now_rfc3339};

/// File-per-task JSON store: `task-<id>.json` under a data directory,
/// written atomically via a temp file and rename.
#[derive(Debug, Clone)]
pub struct JsonTaskStore {
    dir: PathBuf,
}

impl JsonTaskStore {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create task dir {}", self.dir.display()))
    }

    fn task_path(&self, id: &str) -> anyhow::Result<PathBuf> {
        validate_task_id(id)?;
        Ok(self.dir.join(format!("task-{id}.json")))
    }

    fn save(&self, task: &Task) -> anyhow::Result<()> {
        self.ensure_dir()?;
        let path = self.task_path(&task.id)?;
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(task)?;
        std::fs::write(&tmp, &data).with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("failed to rename {} -> {}", tmp.display(), path.display()))?;
        Ok(())
    }

    fn load(&self, id: &str) -> anyhow::Result<Task> {
        let path = self.task_path(id)?;
        let data =
            std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let task: Task = serde_json::from_slice(&data)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(task)
    }

    fn list_all(&self) -> anyhow::Result<Vec<Task>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut tasks: Vec<Task> = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read {}", self.dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            // Unreadable or malformed entries degrade to "not shown".
            let Ok(data) = std::fs::read(&path) else {
                continue;
            };
            let Ok(task) = serde_json::from_slice(&data) else {
                continue;
            };
            tasks.push(task);
        }
        Ok(tasks)
    }

    fn create_inner(&self, draft: TaskDraft, owner: Option<&str>) -> anyhow::Result<Task> {
        let mut existing = self.list_all()?;
        if let Some(owner) = owner {
            existing.retain(|t| t.user_id.as_deref() == Some(owner));
        }
        let now = now_rfc3339();
        let task = Task {
            id: Task::new_id(),
            title: draft.title,
            description: draft.description,
            status: TaskStatus::Todo,
            due_date: draft.due_date,
            tags: draft.tags,
            order: next_todo_order(&existing),
            created_at: now.clone(),
            updated_at: now,
            user_id: owner.map(str::to_owned),
        };
        self.save(&task)?;
        Ok(task)
    }

    fn update_inner(&self, id: &str, patch: TaskPatch) -> anyhow::Result<Task> {
        let mut task = self.load(id)?;
        patch.apply(&mut task);
        task.updated_at = now_rfc3339();
        self.save(&task)?;
        Ok(task)
    }

    fn delete_inner(&self, id: &str) -> anyhow::Result<bool> {
        let path = self.task_path(id)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)
            .with_context(|| format!("failed to remove {}", path.display()))?;
        Ok(true)
    }
}

impl TaskStore for JsonTaskStore {
    fn list(&self, owner: Option<&str>) -> Vec<Task> {
        let mut tasks = match self.list_all() {
            Ok(tasks) => tasks,
            Err(e) => {
                eprintln!("task list failed: {e:#}");
                return Vec::new();
            }
        };
        if let Some(owner) = owner {
            tasks.retain(|t| t.user_id.as_deref() == Some(owner));
        }
        sort_for_listing(&mut tasks);
        tasks
    }

    fn create(&self, draft: TaskDraft, owner: Option<&str>) -> Option<Task> {
        match self.create_inner(draft, owner) {
            Ok(task) => Some(task),
            Err(e) => {
                eprintln!("task create failed: {e:#}");
                None
            }
        }
    }

    fn update(&self, id: &str, patch: TaskPatch) -> Option<Task> {
        match self.update_inner(id, patch) {
            Ok(task) => Some(task),
            Err(e) => {
                eprintln!("task update failed: {e:#}");
                None
            }
        }
    }

    fn delete(&self, id: &str) -> bool {
        match self.delete_inner(id) {
            Ok(deleted) => deleted,
            Err(e) => {
                eprintln!("task delete failed: {e:#}");
                false
            }
        }
    }
}

fn validate_task_id(id: &str) -> anyhow::Result<()> {
    if id.trim().is_empty() {
        anyhow::bail!("task ID is required");
    }
    if id.contains('/') || id.contains('\\') {
        anyhow::bail!("invalid task ID '{id}': must not contain path separators");
    }
    if id.contains("..") {
        anyhow::bail!("invalid task ID '{id}': must not contain '..'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::TaskTag;

    fn store() -> (tempfile::TempDir, JsonTaskStore) {
        let td = tempfile::tempdir().expect("tempdir");
        let store = JsonTaskStore::new(td.path().join("tasks"));
        (td, store)
    }

    #[test]
    fn create_assigns_id_timestamps_and_todo_defaults() {
        let (_td, store) = store();

        let first = store
            .create(TaskDraft::new("first").unwrap(), None)
            .unwrap();
        assert_eq!(first.status, TaskStatus::Todo);
        assert_eq!(first.order, 1);
        assert!(!first.id.is_empty());
        assert!(!first.created_at.is_empty());

        let second = store
            .create(TaskDraft::new("second").unwrap(), None)
            .unwrap();
        assert_eq!(second.order, 2);
    }

    #[test]
    fn list_is_ascending_by_order_and_owner_filtered() {
        let (_td, store) = store();
        let a = store
            .create(TaskDraft::new("mine").unwrap(), Some("u1"))
            .unwrap();
        let b = store
            .create(TaskDraft::new("theirs").unwrap(), Some("u2"))
            .unwrap();
        store.update(
            &a.id,
            TaskPatch {
                order: Some(9),
                ..TaskPatch::default()
            },
        );

        let all = store.list(None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, b.id);
        assert_eq!(all[1].id, a.id);

        let mine = store.list(Some("u1"));
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, a.id);
    }

    #[test]
    fn update_is_partial_and_bumps_updated_at() {
        let (_td, store) = store();
        let created = store
            .create(
                TaskDraft {
                    title: "review queue".to_owned(),
                    description: "triage".to_owned(),
                    due_date: Some("2026-03-01".to_owned()),
                    tags: vec![TaskTag::Review],
                },
                None,
            )
            .unwrap();

        let updated = store
            .update(
                &created.id,
                TaskPatch {
                    status: Some(TaskStatus::InProgress),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        assert_eq!(updated.status, TaskStatus::InProgress);
        assert_eq!(updated.title, "review queue");
        assert_eq!(updated.due_date.as_deref(), Some("2026-03-01"));
        assert_eq!(updated.tags, vec![TaskTag::Review]);

        // Round-trip through the file.
        let listed = store.list(None);
        assert_eq!(listed[0].status, TaskStatus::InProgress);
    }

    #[test]
    fn update_of_unknown_id_degrades_to_none() {
        let (_td, store) = store();
        assert!(store.update("missing", TaskPatch::default()).is_none());
    }

    #[test]
    fn delete_reports_whether_anything_was_removed() {
        let (_td, store) = store();
        let t = store.create(TaskDraft::new("gone soon").unwrap(), None).unwrap();
        assert!(store.delete(&t.id));
        assert!(!store.delete(&t.id));
        assert!(store.list(None).is_empty());
    }

    #[test]
    fn traversal_ids_are_rejected() {
        let (_td, store) = store();
        assert!(!store.delete("../escape"));
        assert!(store.update("a/b", TaskPatch::default()).is_none());
    }

    #[test]
    fn unreadable_dir_degrades_to_empty_list() {
        let store = JsonTaskStore::new(PathBuf::from("/nonexistent/kanri-tasks"));
        assert!(store.list(None).is_empty());
    }
}
