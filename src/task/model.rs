#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::KanriError;

/// The three fixed board columns. Serialized names match the persisted
/// wire format (`"TODO"`, `"IN_PROGRESS"`, `"DONE"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }

    #[must_use]
    pub fn default_title(self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = KanriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "TODO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" | "DOING" => Ok(TaskStatus::InProgress),
            "DONE" => Ok(TaskStatus::Done),
            _ => Err(KanriError::UnknownStatus(s.to_owned())),
        }
    }
}

/// Task labels. Order here is display order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TaskTag {
    Bug,
    Feature,
    Review,
}

impl TaskTag {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskTag::Bug => "bug",
            TaskTag::Feature => "feature",
            TaskTag::Review => "review",
        }
    }
}

impl fmt::Display for TaskTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskTag {
    type Err = KanriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bug" => Ok(TaskTag::Bug),
            "feature" => Ok(TaskTag::Feature),
            "review" => Ok(TaskTag::Review),
            _ => Err(KanriError::UnknownTag(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<TaskTag>,
    pub order: i64,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Task {
    #[must_use]
    pub fn new_id() -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Creation payload. The store assigns id, timestamps, status and order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due_date: Option<String>,
    pub tags: Vec<TaskTag>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Result<Self, KanriError> {
        let title = title.into();
        validate_title(&title)?;
        Ok(Self {
            title,
            ..Self::default()
        })
    }
}

/// Partial update. `None` fields are left unchanged; `due_date` is doubly
/// optional so that `Some(None)` clears the date.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TaskTag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl TaskPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            task.description.clone_from(description);
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due_date) = &self.due_date {
            task.due_date.clone_from(due_date);
        }
        if let Some(tags) = &self.tags {
            task.tags.clone_from(tags);
        }
        if let Some(order) = self.order {
            task.order = order;
        }
    }
}

pub fn validate_title(title: &str) -> Result<(), KanriError> {
    if title.trim().is_empty() {
        return Err(KanriError::EmptyTitle);
    }
    Ok(())
}

/// Checks a `YYYY-MM-DD` due date string.
pub fn validate_due_date(input: &str) -> Result<(), KanriError> {
    let format = time::format_description::parse("[year]-[month]-[day]")
        .map_err(|e| KanriError::Other(format!("bad date format description: {e}")))?;
    time::Date::parse(input.trim(), &format)
        .map(|_| ())
        .map_err(|_| KanriError::InvalidDueDate(input.to_owned()))
}

/// Parses a comma- or repeat-separated tag list, dropping duplicates but
/// keeping first-seen order.
pub fn parse_tags(inputs: &[String]) -> Result<Vec<TaskTag>, KanriError> {
    let mut tags: Vec<TaskTag> = Vec::new();
    for raw in inputs {
        for part in raw.split(',') {
            if part.trim().is_empty() {
                continue;
            }
            let tag: TaskTag = part.parse()?;
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    Ok(tags)
}

#[must_use]
pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_names() {
        for status in TaskStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            let back: TaskStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
    }

    #[test]
    fn status_parses_loosely() {
        assert_eq!("todo".parse::<TaskStatus>().unwrap(), TaskStatus::Todo);
        assert_eq!(
            "in-progress".parse::<TaskStatus>().unwrap(),
            TaskStatus::InProgress
        );
        assert!("blocked".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn patch_applies_only_set_fields() {
        let mut task = Task {
            id: Task::new_id(),
            title: "write report".to_owned(),
            description: String::new(),
            status: TaskStatus::Todo,
            due_date: Some("2026-01-31".to_owned()),
            tags: vec![TaskTag::Feature],
            order: 1,
            created_at: now_rfc3339(),
            updated_at: now_rfc3339(),
            user_id: None,
        };

        let patch = TaskPatch {
            status: Some(TaskStatus::Done),
            due_date: Some(None),
            ..TaskPatch::default()
        };
        patch.apply(&mut task);

        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.due_date, None);
        assert_eq!(task.title, "write report");
        assert_eq!(task.tags, vec![TaskTag::Feature]);
    }

    #[test]
    fn tag_parsing_dedupes_and_rejects_unknown() {
        let tags = parse_tags(&["bug,review".to_owned(), "bug".to_owned()]).unwrap();
        assert_eq!(tags, vec![TaskTag::Bug, TaskTag::Review]);
        assert!(parse_tags(&["urgent".to_owned()]).is_err());
    }

    #[test]
    fn due_date_validation() {
        assert!(validate_due_date("2026-02-28").is_ok());
        assert!(validate_due_date("2026-2-28").is_err());
        assert!(validate_due_date("soon").is_err());
    }

    #[test]
    fn draft_rejects_empty_title() {
        assert!(TaskDraft::new("   ").is_err());
        assert!(TaskDraft::new("fix login").is_ok());
    }
}
