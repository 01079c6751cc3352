#![forbid(unsafe_code)]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KanriError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid config key '{0}'")]
    InvalidConfigKey(String),

    #[error("invalid config value for '{key}': {msg}")]
    InvalidConfigValue { key: String, msg: String },

    #[error("task title must not be empty")]
    EmptyTitle,

    #[error("invalid due date '{0}': expected YYYY-MM-DD")]
    InvalidDueDate(String),

    #[error("unknown tag '{0}': expected bug, feature or review")]
    UnknownTag(String),

    #[error("unknown status '{0}': expected TODO, IN_PROGRESS or DONE")]
    UnknownStatus(String),

    #[error("no task found with id '{0}'")]
    TaskNotFound(String),

    #[error("not signed in")]
    NotSignedIn,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account already exists for '{0}'")]
    EmailTaken(String),

    #[error("{0}")]
    Other(String),
}
